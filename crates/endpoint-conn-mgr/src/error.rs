//! Error types for endpoint-conn-mgr

use std::time::Duration;

use thiserror::Error;

use crate::role::Role;

/// Errors that may occur when resolving endpoints or opening connections
#[derive(Error, Debug)]
pub enum Error {
   /// A required configuration value was not supplied
   #[error("missing required configuration value: {key}")]
   MissingValue { key: &'static str },

   /// A required configuration value was supplied but empty
   #[error("configuration value {key} must not be empty")]
   EmptyValue { key: &'static str },

   /// Opening a connection to an endpoint failed
   #[error("failed to connect to {role} endpoint: {source}")]
   Connect {
      role: Role,
      #[source]
      source: sqlx::Error,
   },

   /// A liveness check did not complete within its bound
   #[error("liveness check timed out after {0:?}")]
   PingTimeout(Duration),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
