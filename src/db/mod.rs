pub mod schema;
pub mod store;

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Journal database: team members, entries, and the result cache table.
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database. Without an explicit path, uses the
  /// platform data directory.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| Error::Storage(format!("failed to open database at {}: {}", path.display(), e)))?;

    Self::init(conn)
  }

  /// In-memory database for tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::Storage(format!("failed to open in-memory database: {}", e)))?;
    Self::init(conn)
  }

  fn init(conn: Connection) -> Result<Self> {
    // journal_mode reports the resulting mode back as a row
    conn
      .query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
      .map_err(|e| Error::Storage(format!("failed to set WAL mode: {}", e)))?;
    conn
      .execute_batch("PRAGMA foreign_keys = ON")
      .map_err(|e| Error::Storage(format!("failed to enable foreign keys: {}", e)))?;

    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Get the default database path
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Storage("could not determine data directory".to_string()))?;

    Ok(data_dir.join("cadence").join("journal.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| Error::Storage(format!("failed to run migrations: {}", e)))?;
    Ok(())
  }

  /// Lock and return the connection.
  pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|_| Error::Storage("connection lock poisoned".to_string()))
  }
}
