//! Error taxonomy shared across the crate.
//!
//! Callers branch on these variants: `NotFound` surfaces to the user,
//! while request/parse failures from Jira or the generation provider are
//! recovered locally and degrade the affected section of the output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A record or remote identity that was expected to exist.
  #[error("{0} not found")]
  NotFound(String),

  /// Non-2xx response from a remote API, with body kept for diagnostics.
  #[error("request returned {status}: {body}")]
  Request { status: u16, body: String },

  /// Malformed response body or stored value.
  #[error("{0}")]
  Parse(String),

  /// A capability (Jira credentials, generation provider) is not set up.
  #[error("{0}")]
  ConfigurationMissing(String),

  /// SQLite-level failure on the journal database.
  #[error("storage error: {0}")]
  Storage(String),

  /// Transport-level failure (connect, timeout, body read).
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Error::Storage(e.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Parse(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
