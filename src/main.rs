//! CLI entry point for the workload harness

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rwsplit_harness::coordinator::{self, RunEndpoints};
use rwsplit_harness::{DEFAULT_WORKERS, EndpointRegistry, FULL_CYCLES, SMOKE_CYCLES, provision};

/// Concurrent transactional workload harness for a database-routing proxy.
///
/// Endpoint configuration comes from the environment: `endpoint_ip`,
/// `endpoint_user`, `endpoint_password`, and optionally `smoke_mode=yes`.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
   /// Number of concurrent workers
   #[arg(long, env = "harness_workers", default_value_t = DEFAULT_WORKERS)]
   workers: usize,

   /// Cycles per worker (defaults to 50 in smoke mode, 1000 otherwise)
   #[arg(long, env = "harness_cycles")]
   cycles: Option<u64>,

   /// Shell command that reconfigures the routing layer before the run
   #[arg(long)]
   provision: Option<String>,

   /// Seconds to wait after provisioning before the first connection
   #[arg(long, default_value_t = provision::DEFAULT_SETTLE.as_secs())]
   settle_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .init();

   let args = Args::parse();

   if let Some(command) = &args.provision {
      if let Err(err) = provision::run(command, Duration::from_secs(args.settle_secs)).await {
         error!(error = %err, "provisioning failed");
         return ExitCode::FAILURE;
      }
   }

   let registry = match EndpointRegistry::from_env() {
      Ok(registry) => registry,
      Err(err) => {
         error!(error = %err, "endpoint configuration is incomplete");
         return ExitCode::FAILURE;
      }
   };

   let cycles = args.cycles.unwrap_or(if registry.smoke() {
      SMOKE_CYCLES
   } else {
      FULL_CYCLES
   });

   let endpoints = RunEndpoints::from_registry(&registry);
   let outcome = match coordinator::execute(&endpoints, args.workers, cycles).await {
      Ok(outcome) => outcome,
      Err(err) => {
         error!(error = %err, "harness aborted before the workers could run");
         return ExitCode::FAILURE;
      }
   };

   for result in outcome.failures() {
      error!(
         worker = result.worker_id,
         cycles = result.cycles_completed,
         outcome = ?result.outcome,
         "worker failed"
      );
   }

   if outcome.fatal() {
      error!("routing layer served state inconsistent between write and read paths");
      return ExitCode::from(2);
   }
   if !outcome.all_success() {
      return ExitCode::FAILURE;
   }

   info!(
      workers = args.workers,
      cycles, "all workers verified their writes"
   );
   ExitCode::SUCCESS
}
