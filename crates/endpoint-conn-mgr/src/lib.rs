//! # endpoint-conn-mgr
//!
//! Resolves the logical endpoints of a database-routing proxy and opens
//! per-worker SQLx connections to them.
//!
//! ## Core Types
//!
//! - **[`Role`]**: logical endpoint category (read/write-split, master-only,
//!   slave-only), each mapped to a fixed port on the proxy host
//! - **[`EndpointRegistry`]**: resolves roles to connection parameters from
//!   externally supplied configuration
//! - **[`EndpointDescriptor`]**: immutable connection parameters for one
//!   endpoint
//! - **[`Error`]**: error type for resolution and connection failures
//!
//! ## Architecture
//!
//! - **Fail-fast resolution**: missing or empty configuration is rejected
//!   before any connection is attempted
//! - **One connection per call**: [`connect`] never pools or shares; a broken
//!   connection affects only its owner
//! - **Backend-agnostic**: built on SQLx's `Any` driver, so the same code
//!   talks to the MySQL-protocol proxy in production and to SQLite files in
//!   tests

mod connect;
mod error;
mod registry;
mod role;

// Re-export public types
pub use connect::{PING_TIMEOUT, connect, ping_within};
pub use error::{Error, Result};
pub use registry::{
   ENDPOINT_IP, ENDPOINT_PASSWORD, ENDPOINT_USER, EndpointDescriptor, EndpointRegistry, SMOKE_MODE,
};
pub use role::Role;
