//! Logical endpoint roles of the routing layer under test

use std::fmt;

/// Logical endpoint category of the routing proxy.
///
/// Each role maps to a fixed listener port on the proxy host. The protocol
/// behind each port is opaque to this crate; only host, port, and credentials
/// matter here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
   /// The read/write-splitting router. Workers drive their cycle loops here.
   ReadWrite,

   /// Routes every statement to the current master.
   MasterOnly,

   /// Routes every statement to a slave.
   SlaveOnly,
}

impl Role {
   /// Fixed listener port for this role on the proxy host.
   pub fn port(self) -> u16 {
      match self {
         Role::ReadWrite => 4006,
         Role::MasterOnly => 4008,
         Role::SlaveOnly => 4009,
      }
   }
}

impl fmt::Display for Role {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let name = match self {
         Role::ReadWrite => "read/write-split",
         Role::MasterOnly => "master-only",
         Role::SlaveOnly => "slave-only",
      };
      f.write_str(name)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_role_port_map_is_fixed() {
      assert_eq!(Role::ReadWrite.port(), 4006);
      assert_eq!(Role::MasterOnly.port(), 4008);
      assert_eq!(Role::SlaveOnly.port(), 4009);
   }

   #[test]
   fn test_role_display() {
      assert_eq!(Role::ReadWrite.to_string(), "read/write-split");
      assert_eq!(Role::MasterOnly.to_string(), "master-only");
      assert_eq!(Role::SlaveOnly.to_string(), "slave-only");
   }
}
