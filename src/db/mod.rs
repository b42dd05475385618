use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task;
use crate::error::{Result, FinbotError};

/// Store client owning a single long-lived SQLite connection.
///
/// Opened once at process start and handed to every component by reference.
/// All statements go through [`Db::with_connection`], which runs them on the
/// blocking pool one at a time.
pub struct Db {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open the database file (created if missing) and apply connection pragmas
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(FinbotError::Database)?;

        // WAL for readers during a load, foreign keys so join rows can't dangle
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY;"
        )?;

        log::debug!("Opened database at {}", path.display());

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path the connection was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a closure with the shared connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            // A panic in an earlier closure leaves SQLite itself consistent
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut *guard)
        })
        .await
        .map_err(|e| FinbotError::Io(std::io::Error::other(format!("database task failed: {}", e))))?
    }

    /// Close the connection, surfacing any error SQLite reports on shutdown
    pub fn close(self) -> Result<()> {
        let mutex = Arc::try_unwrap(self.conn).map_err(|_| {
            FinbotError::InvalidInput("database connection is still in use".to_string())
        })?;
        let conn = mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        conn.close().map_err(|(_, e)| FinbotError::Database(e))?;
        log::debug!("Closed database at {}", self.path.display());
        Ok(())
    }
}

pub mod migrate;
