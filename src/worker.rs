//! The core unit of concurrency: one connection, one cycle loop
//!
//! A worker owns its connection for its entire lifetime and runs a fixed
//! number of insert/select cycles, verifying after every commit that its own
//! read path observes the write. The only state shared with the rest of the
//! harness is a write-once abort flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::AnyConnection;
use sqlx::{Connection, Row};
use tracing::{error, info, warn};

use endpoint_conn_mgr::{PING_TIMEOUT, ping_within};

const INSERT_SQL: &str = "INSERT INTO t1 (worker_id, seq, payload) VALUES (?, ?, ?)";
const SELECT_SQL: &str = "SELECT payload FROM t1 WHERE worker_id = ? AND seq = ?";

/// One logical row written by a worker during a cycle.
///
/// `sequence_id` is worker-local and monotonically increasing across the
/// cycle loop. It is deliberately not globally unique across workers; the
/// table's primary key is server-generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRecord {
   pub sequence_id: u64,
   pub payload: String,
}

impl WorkRecord {
   fn for_cycle(sequence_id: u64) -> Self {
      Self {
         payload: sequence_id.to_string(),
         sequence_id,
      }
   }
}

/// Why a worker stopped before completing its cycle count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
   /// The connection failed to open, or the session died mid-run.
   ConnectionLost,

   /// An insert or its commit failed.
   Write,

   /// A read did not reflect this worker's own committed write. Fatal to the
   /// entire run, not just this worker: the routing layer has served state
   /// that is inconsistent between its write path and its read path.
   Divergence(String),

   /// Stopped early because another worker signalled divergence.
   Aborted,
}

/// Terminal state of one worker's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
   Success,
   Failure(FailureReason),
}

/// Published by each worker to the coordinator once it terminates.
/// Read-only from that point on.
#[derive(Debug, Clone)]
pub struct WorkerResult {
   pub worker_id: usize,
   pub cycles_completed: u64,
   pub outcome: Outcome,
}

/// Runs a fixed-length sequence of transactional insert/select cycles
/// against a private connection.
pub struct Worker {
   id: usize,
   conn: AnyConnection,
   cycle_count: u64,
   abort: Arc<AtomicBool>,
}

impl Worker {
   pub fn new(id: usize, conn: AnyConnection, cycle_count: u64, abort: Arc<AtomicBool>) -> Self {
      Self {
         id,
         conn,
         cycle_count,
         abort,
      }
   }

   /// Runs the full cycle loop and reports the result.
   ///
   /// Strictly sequential within the worker: liveness check, transactional
   /// insert, liveness check, select, verify, advance. The abort flag is
   /// observed at every cycle boundary, so a divergence detected elsewhere
   /// stops this worker promptly. There is no retry path anywhere; every
   /// failure is terminal for the worker or for the run.
   pub async fn run(mut self) -> WorkerResult {
      let mut completed = 0u64;

      for cycle in 0..self.cycle_count {
         if self.abort.load(Ordering::SeqCst) {
            return self.finish(completed, Outcome::Failure(FailureReason::Aborted));
         }

         if let Err(reason) = self.cycle(cycle).await {
            if let FailureReason::Divergence(detail) = &reason {
               error!(
                  worker = self.id,
                  cycle,
                  detail = %detail,
                  "read diverged from committed write, aborting the whole run"
               );
               self.abort.store(true, Ordering::SeqCst);
            }
            return self.finish(completed, Outcome::Failure(reason));
         }
         completed += 1;

         if completed % 10 == 0 {
            info!(
               worker = self.id,
               cycles = completed,
               of = self.cycle_count,
               "progress"
            );
         }
      }

      self.finish(completed, Outcome::Success)
   }

   fn finish(self, cycles_completed: u64, outcome: Outcome) -> WorkerResult {
      WorkerResult {
         worker_id: self.id,
         cycles_completed,
         outcome,
      }
   }

   async fn cycle(&mut self, sequence_id: u64) -> std::result::Result<(), FailureReason> {
      let record = WorkRecord::for_cycle(sequence_id);

      self.check_liveness(&record).await?;

      if let Err(err) = self.insert(&record).await {
         warn!(worker = self.id, seq = record.sequence_id, error = %err, "insert failed");
         return Err(FailureReason::Write);
      }

      if self.abort.load(Ordering::SeqCst) {
         return Err(FailureReason::Aborted);
      }
      self.check_liveness(&record).await?;

      self.verify(&record).await
   }

   async fn check_liveness(&mut self, record: &WorkRecord) -> std::result::Result<(), FailureReason> {
      if let Err(err) = ping_within(&mut self.conn, PING_TIMEOUT).await {
         warn!(worker = self.id, seq = record.sequence_id, error = %err, "connection is not usable");
         return Err(FailureReason::ConnectionLost);
      }
      Ok(())
   }

   async fn insert(&mut self, record: &WorkRecord) -> sqlx::Result<()> {
      let mut tx = self.conn.begin().await?;
      sqlx::query(INSERT_SQL)
         .bind(self.id as i64)
         .bind(record.sequence_id as i64)
         .bind(record.payload.as_str())
         .execute(&mut *tx)
         .await?;
      tx.commit().await
   }

   /// Reads back the row just committed and checks it survived the round
   /// trip. The select is scoped to this worker's own rows; other workers'
   /// writes never enter the read set.
   async fn verify(&mut self, record: &WorkRecord) -> std::result::Result<(), FailureReason> {
      let rows = match sqlx::query(SELECT_SQL)
         .bind(self.id as i64)
         .bind(record.sequence_id as i64)
         .fetch_all(&mut self.conn)
         .await
      {
         Ok(rows) => rows,
         Err(err) => {
            warn!(worker = self.id, seq = record.sequence_id, error = %err, "select failed, treating session as lost");
            return Err(FailureReason::ConnectionLost);
         }
      };

      if rows.is_empty() {
         return Err(FailureReason::Divergence(format!(
            "seq {} not visible after commit",
            record.sequence_id
         )));
      }

      for row in &rows {
         let payload: String = match row.try_get(0) {
            Ok(payload) => payload,
            Err(err) => {
               return Err(FailureReason::Divergence(format!(
                  "seq {}: payload column unreadable: {err}",
                  record.sequence_id
               )));
            }
         };
         if payload != record.payload {
            return Err(FailureReason::Divergence(format!(
               "seq {}: wrote {:?}, read back {:?}",
               record.sequence_id, record.payload, payload
            )));
         }
      }

      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::schema;
   use endpoint_conn_mgr::{EndpointDescriptor, Role, connect};

   async fn prepared_conn(temp: &tempfile::NamedTempFile) -> AnyConnection {
      let descriptor = EndpointDescriptor::new(
         Role::ReadWrite,
         format!("sqlite://{}", temp.path().display()),
      );
      let mut conn = connect(&descriptor).await.unwrap();
      schema::prepare(&mut conn).await.unwrap();
      conn
   }

   #[tokio::test]
   async fn test_worker_completes_all_cycles() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let conn = prepared_conn(&temp).await;

      let abort = Arc::new(AtomicBool::new(false));
      let result = Worker::new(3, conn, 20, Arc::clone(&abort)).run().await;

      assert_eq!(result.worker_id, 3);
      assert_eq!(result.cycles_completed, 20);
      assert_eq!(result.outcome, Outcome::Success);
      assert!(!abort.load(Ordering::SeqCst));
   }

   #[tokio::test]
   async fn test_preset_abort_flag_stops_before_first_cycle() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let conn = prepared_conn(&temp).await;

      let abort = Arc::new(AtomicBool::new(true));
      let result = Worker::new(0, conn, 20, abort).run().await;

      assert_eq!(result.cycles_completed, 0);
      assert_eq!(result.outcome, Outcome::Failure(FailureReason::Aborted));
   }

   #[tokio::test]
   async fn test_missing_row_is_divergence_and_sets_abort() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let mut conn = prepared_conn(&temp).await;

      // Swallow every insert after it lands: the commit succeeds, but the
      // read-back sees nothing.
      sqlx::query(
         "CREATE TRIGGER vanish AFTER INSERT ON t1 \
          BEGIN DELETE FROM t1 WHERE id = NEW.id; END",
      )
      .execute(&mut conn)
      .await
      .unwrap();

      let abort = Arc::new(AtomicBool::new(false));
      let result = Worker::new(1, conn, 5, Arc::clone(&abort)).run().await;

      assert_eq!(result.cycles_completed, 0);
      assert!(matches!(
         result.outcome,
         Outcome::Failure(FailureReason::Divergence(_))
      ));
      assert!(abort.load(Ordering::SeqCst));
   }

   #[tokio::test]
   async fn test_payload_mismatch_is_divergence() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let mut conn = prepared_conn(&temp).await;

      sqlx::query(
         "CREATE TRIGGER mangle AFTER INSERT ON t1 \
          BEGIN UPDATE t1 SET payload = 'bogus' WHERE id = NEW.id; END",
      )
      .execute(&mut conn)
      .await
      .unwrap();

      let abort = Arc::new(AtomicBool::new(false));
      let result = Worker::new(2, conn, 5, abort).run().await;

      match result.outcome {
         Outcome::Failure(FailureReason::Divergence(detail)) => {
            assert!(detail.contains("bogus"), "detail was: {detail}");
         }
         other => panic!("expected divergence, got {other:?}"),
      }
   }

   #[tokio::test]
   async fn test_sequence_ids_are_worker_local_and_monotonic() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let conn = prepared_conn(&temp).await;

      let abort = Arc::new(AtomicBool::new(false));
      let result = Worker::new(7, conn, 12, abort).run().await;
      assert_eq!(result.outcome, Outcome::Success);

      let descriptor = EndpointDescriptor::new(
         Role::ReadWrite,
         format!("sqlite://{}", temp.path().display()),
      );
      let mut check = connect(&descriptor).await.unwrap();
      let rows = sqlx::query("SELECT seq, payload FROM t1 WHERE worker_id = 7 ORDER BY seq")
         .fetch_all(&mut check)
         .await
         .unwrap();

      assert_eq!(rows.len(), 12);
      for (i, row) in rows.iter().enumerate() {
         assert_eq!(row.try_get::<i64, _>(0).unwrap(), i as i64);
         assert_eq!(row.try_get::<String, _>(1).unwrap(), i.to_string());
      }
   }
}
