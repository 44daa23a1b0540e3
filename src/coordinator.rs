//! Fan-out/fan-in of workers and aggregation of the final outcome

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::Connection;
use tokio::task::JoinSet;
use tracing::{error, info};

use endpoint_conn_mgr::{EndpointDescriptor, EndpointRegistry, Role, connect};

use crate::error::Result;
use crate::schema;
use crate::worker::{FailureReason, Outcome, Worker, WorkerResult};

/// The two endpoints one run needs: master-only for the schema bootstrap,
/// read/write-split for the workers.
#[derive(Debug, Clone)]
pub struct RunEndpoints {
   pub master: EndpointDescriptor,
   pub rwsplit: EndpointDescriptor,
}

impl RunEndpoints {
   pub fn from_registry(registry: &EndpointRegistry) -> Self {
      Self {
         master: registry.descriptor(Role::MasterOnly),
         rwsplit: registry.descriptor(Role::ReadWrite),
      }
   }
}

/// Aggregate result of one harness run.
///
/// Assembled only after every worker has terminated, except under the
/// fatal-abort path, where it is returned as soon as the divergence is
/// observed and the remaining tasks are cancelled.
#[derive(Debug)]
pub struct HarnessOutcome {
   results: Vec<WorkerResult>,
   fatal: bool,
}

impl HarnessOutcome {
   /// True when every worker completed every cycle.
   pub fn all_success(&self) -> bool {
      !self.fatal
         && self
            .results
            .iter()
            .all(|result| result.outcome == Outcome::Success)
   }

   /// Per-worker results, ordered by worker id.
   pub fn results(&self) -> &[WorkerResult] {
      &self.results
   }

   /// Results of workers that did not succeed, ordered by worker id.
   pub fn failures(&self) -> impl Iterator<Item = &WorkerResult> {
      self
         .results
         .iter()
         .filter(|result| result.outcome != Outcome::Success)
   }

   /// True when a divergence, or a worker panic, ended the run early.
   pub fn fatal(&self) -> bool {
      self.fatal
   }

   fn finish(mut results: Vec<WorkerResult>, fatal: bool) -> Self {
      results.sort_by_key(|result| result.worker_id);
      Self { results, fatal }
   }
}

/// Bootstraps the schema and runs the full concurrent workload.
///
/// Each worker opens its own read/write-split connection inside its task; a
/// connection that fails to open marks only that worker failed. The first
/// divergence result (or worker panic) ends the run immediately: the
/// outcome is returned with `fatal` set and the remaining tasks are
/// cancelled when the join set drops. There is no graceful drain; traffic
/// generated after a divergence only obscures the root cause.
pub async fn execute(
   endpoints: &RunEndpoints,
   worker_count: usize,
   cycle_count: u64,
) -> Result<HarnessOutcome> {
   let mut master = connect(&endpoints.master).await?;
   schema::prepare(&mut master).await?;
   let _ = master.close().await;

   let abort = Arc::new(AtomicBool::new(false));
   let mut tasks = JoinSet::new();

   for id in 0..worker_count {
      let descriptor = endpoints.rwsplit.clone();
      let abort = Arc::clone(&abort);
      tasks.spawn(async move {
         match connect(&descriptor).await {
            Ok(conn) => Worker::new(id, conn, cycle_count, abort).run().await,
            Err(err) => {
               error!(worker = id, error = %err, "failed to open worker connection");
               WorkerResult {
                  worker_id: id,
                  cycles_completed: 0,
                  outcome: Outcome::Failure(FailureReason::ConnectionLost),
               }
            }
         }
      });
   }

   info!(
      workers = worker_count,
      cycles = cycle_count,
      "workload started"
   );

   let mut results = Vec::with_capacity(worker_count);
   while let Some(joined) = tasks.join_next().await {
      match joined {
         Ok(result) => {
            let diverged = matches!(
               result.outcome,
               Outcome::Failure(FailureReason::Divergence(_))
            );
            results.push(result);
            if diverged {
               abort.store(true, Ordering::SeqCst);
               return Ok(HarnessOutcome::finish(results, true));
            }
         }
         Err(err) => {
            // A panicking worker is as fatal as a divergence: whatever it
            // observed before dying cannot be trusted.
            error!(error = %err, "worker task aborted abnormally");
            abort.store(true, Ordering::SeqCst);
            return Ok(HarnessOutcome::finish(results, true));
         }
      }
   }

   Ok(HarnessOutcome::finish(results, false))
}
