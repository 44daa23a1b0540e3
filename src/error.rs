//! Error types for the harness

use std::process::ExitStatus;

use thiserror::Error;

/// Errors that end a run before or outside the worker pool
#[derive(Error, Debug)]
pub enum Error {
   /// Endpoint resolution or connection setup failed
   #[error(transparent)]
   Endpoint(#[from] endpoint_conn_mgr::Error),

   /// Schema bootstrap against the master-only endpoint failed
   #[error("schema bootstrap failed: {0}")]
   Provisioning(#[source] sqlx::Error),

   /// The external provisioning command reported failure
   #[error("provisioning command exited with {0}")]
   ProvisionCommand(ExitStatus),

   /// IO error launching the provisioning command
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
