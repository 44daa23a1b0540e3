//! One-shot bootstrap of the working table
//!
//! Runs exactly once, against the master-only endpoint, before any worker
//! starts. Not re-entrant-safe for concurrent callers: it is the single
//! serialization point that precedes all concurrency.

use sqlx::AnyConnection;
use tracing::info;

use crate::error::{Error, Result};

/// Table the workers write to and read back from.
pub const WORKING_TABLE: &str = "t1";

/// Drops and recreates the working table.
///
/// Strictly drop-if-exists then create, each statement completing before the
/// next is issued. Rows left behind by a prior run are never a valid
/// baseline. Idempotent: running it twice yields an empty table both times.
pub async fn prepare(conn: &mut AnyConnection) -> Result<()> {
   let drop_sql = format!("DROP TABLE IF EXISTS {WORKING_TABLE}");
   let create_sql = create_ddl(conn.backend_name());

   sqlx::query(&drop_sql)
      .execute(&mut *conn)
      .await
      .map_err(Error::Provisioning)?;
   sqlx::query(&create_sql)
      .execute(&mut *conn)
      .await
      .map_err(Error::Provisioning)?;

   info!(table = WORKING_TABLE, "working table recreated");
   Ok(())
}

/// DDL for the working table, per backend dialect.
///
/// The primary key is server-generated. `worker_id` and `seq` identify the
/// logical row a worker wrote; `payload` is the value it verifies on
/// read-back.
fn create_ddl(backend: &str) -> String {
   let id_column = if backend.eq_ignore_ascii_case("sqlite") {
      "id INTEGER PRIMARY KEY AUTOINCREMENT"
   } else {
      "id INT AUTO_INCREMENT PRIMARY KEY"
   };

   format!(
      "CREATE TABLE {WORKING_TABLE} ({id_column}, \
       worker_id INT NOT NULL, seq INT NOT NULL, payload VARCHAR(64) NOT NULL)"
   )
}

#[cfg(test)]
mod tests {
   use super::*;
   use endpoint_conn_mgr::{EndpointDescriptor, Role, connect};

   async fn sqlite_conn(temp: &tempfile::NamedTempFile) -> AnyConnection {
      let descriptor = EndpointDescriptor::new(
         Role::MasterOnly,
         format!("sqlite://{}", temp.path().display()),
      );
      connect(&descriptor).await.unwrap()
   }

   #[test]
   fn test_ddl_uses_backend_dialect() {
      assert!(create_ddl("SQLite").contains("AUTOINCREMENT"));
      assert!(create_ddl("MySQL").contains("AUTO_INCREMENT PRIMARY KEY"));
   }

   #[tokio::test]
   async fn test_prepare_discards_rows_from_a_prior_run() {
      let temp = tempfile::NamedTempFile::new().unwrap();
      let mut conn = sqlite_conn(&temp).await;

      prepare(&mut conn).await.unwrap();
      sqlx::query("INSERT INTO t1 (worker_id, seq, payload) VALUES (0, 0, 'stale')")
         .execute(&mut conn)
         .await
         .unwrap();

      prepare(&mut conn).await.unwrap();

      let rows = sqlx::query("SELECT payload FROM t1")
         .fetch_all(&mut conn)
         .await
         .unwrap();
      assert!(rows.is_empty());
   }
}
