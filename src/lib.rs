//! # rwsplit-harness
//!
//! Concurrent transactional workload harness for a database-routing proxy.
//!
//! Drives the proxy's read/write-split endpoint from a fixed pool of
//! independent workers, each with its own connection, and verifies after
//! every committed insert that the same worker's read path observes the
//! write. A divergence between write path and read path ends the whole run
//! immediately with a non-zero exit: it means the routing layer has served
//! inconsistent state, and generating more traffic would only bury the
//! evidence.
//!
//! ## Core Types
//!
//! - **[`Worker`]**: runs one private connection through a fixed number of
//!   insert/select cycles
//! - **[`HarnessOutcome`]**: aggregate pass/fail assembled by the coordinator
//! - **[`EndpointRegistry`]** (re-exported): resolves the proxy's logical
//!   endpoints from the environment
//! - **[`Error`]**: errors that end a run outside the worker pool
//!
//! ## Architecture
//!
//! - **One connection per worker**: never pooled or shared; a broken session
//!   affects only its owner
//! - **Write-once abort flag**: the only state shared between workers,
//!   observed at cycle boundaries
//! - **No retries**: every failure is terminal for the worker or for the
//!   run; retries would mask exactly the bug class under test

pub mod coordinator;
pub mod error;
pub mod provision;
pub mod schema;
pub mod worker;

// Re-export public types
pub use coordinator::{HarnessOutcome, RunEndpoints, execute};
pub use endpoint_conn_mgr::{EndpointDescriptor, EndpointRegistry, Role};
pub use error::{Error, Result};
pub use worker::{FailureReason, Outcome, WorkRecord, Worker, WorkerResult};

/// Cycles per worker in a full-length run.
pub const FULL_CYCLES: u64 = 1000;

/// Cycles per worker when `smoke_mode=yes` asks for a fast sanity run.
pub const SMOKE_CYCLES: u64 = 50;

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 5;
