//! Invocation of the external provisioning step
//!
//! The routing layer is reconfigured for a scenario by an external script the
//! harness treats as a black box returning success or failure. After it
//! succeeds, the proxy needs a settle period before the first connection
//! attempt.

use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::error::{Error, Result};

/// Default settle period after the provisioning command succeeds.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// Runs `command` through the shell, then waits out the settle period.
pub async fn run(command: &str, settle: Duration) -> Result<()> {
   info!(command, "running provisioning command");
   let status = Command::new("sh").arg("-c").arg(command).status().await?;
   if !status.success() {
      return Err(Error::ProvisionCommand(status));
   }

   info!(
      settle_secs = settle.as_secs(),
      "provisioned, waiting for the routing layer to settle"
   );
   tokio::time::sleep(settle).await;
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[tokio::test]
   async fn test_successful_command_returns_ok() {
      run("exit 0", Duration::ZERO).await.unwrap();
   }

   #[tokio::test]
   async fn test_failing_command_is_reported() {
      let err = run("exit 3", Duration::ZERO).await.unwrap_err();
      assert!(matches!(err, Error::ProvisionCommand(_)));
      assert!(err.to_string().contains("3"));
   }
}
