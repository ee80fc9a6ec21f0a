//! Test fixtures shared by the unit tests of this crate.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::config::DbConfig;
use crate::connection::Database;
use crate::driver::{Driver, DriverOutput, ExecMode, SqliteDriver};
use crate::error::DbResult;
use crate::schema;

/// In-memory database with the reference schema applied.
pub(crate) async fn memory_db() -> Database {
    let db = Database::open(&DbConfig::in_memory()).await.unwrap();
    schema::apply(&db).await.unwrap();
    db
}

/// Like [`memory_db`], but every statement after schema setup is recorded.
pub(crate) async fn recording_db() -> (Database, Arc<RecordingDriver>) {
    let config = DbConfig::in_memory();
    let recorder = Arc::new(RecordingDriver {
        inner: SqliteDriver::connect(&config).await.unwrap(),
        statements: Mutex::new(Vec::new()),
    });

    let db = Database::with_driver(recorder.clone(), config.search.clone());
    schema::apply(&db).await.unwrap();
    recorder.clear();

    (db, recorder)
}

/// Driver wrapper that logs the SQL text of every statement it forwards.
#[derive(Debug)]
pub(crate) struct RecordingDriver {
    inner: SqliteDriver,
    statements: Mutex<Vec<String>>,
}

impl RecordingDriver {
    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.statements.lock().unwrap().clear();
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn execute(&self, sql: &str, params: &[Value], mode: ExecMode) -> DbResult<DriverOutput> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.inner.execute(sql, params, mode).await
    }
}
