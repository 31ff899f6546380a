//! Namespaced, TTL-bounded result cache keyed by content fingerprint.
//!
//! The cache is an optimization, never a correctness dependency: storage
//! errors are logged and reported as misses, and callers recompute.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::params;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use crate::db::Database;

const CACHE_TTL_DAYS: i64 = 30;

/// Deterministic, order-sensitive digest over a sequence of parts.
///
/// Each part is hashed followed by a 0x00 sentinel, so `["a", "b"]`,
/// `["ab"]`, and `["b", "a"]` all produce distinct fingerprints.
pub fn fingerprint(parts: &[&str]) -> String {
  let mut hasher = Sha256::new();
  for part in parts {
    hasher.update(part.as_bytes());
    hasher.update([0u8]);
  }
  hex::encode(hasher.finalize())
}

/// Result cache over the `cache` table, one live record per
/// `(fingerprint, category)` pair.
#[derive(Clone)]
pub struct Cache {
  db: Arc<Database>,
  ttl: Duration,
}

impl Cache {
  pub fn new(db: Arc<Database>) -> Self {
    Self {
      db,
      ttl: Duration::days(CACHE_TTL_DAYS),
    }
  }

  /// Override the time-to-live (tests).
  #[allow(dead_code)]
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Look up a cached value. Expired records are deleted on read.
  pub fn get(&self, key: &str, category: &str) -> Option<String> {
    match self.try_get(key, category) {
      Ok(hit) => hit,
      Err(e) => {
        warn!(category, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  /// Upsert a value under `(key, category)` and sweep expired records
  /// across all categories. Failures are logged, never propagated.
  pub fn set(&self, key: &str, category: &str, value: &str) {
    if let Err(e) = self.try_set(key, category, value) {
      warn!(category, error = %e, "cache write failed");
    }
  }

  fn try_get(&self, key: &str, category: &str) -> crate::error::Result<Option<String>> {
    let conn = self.db.conn()?;

    let record: Option<(String, String)> = conn
      .query_row(
        "SELECT value, created_at FROM cache WHERE key = ? AND category = ?",
        params![key, category],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .map(Some)
      .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
      })?;

    let (value, created_at) = match record {
      Some(r) => r,
      None => return Ok(None),
    };

    // Unparseable timestamps count as expired
    let expired = DateTime::parse_from_rfc3339(&created_at)
      .map(|t| Utc::now() - t.with_timezone(&Utc) > self.ttl)
      .unwrap_or(true);

    if expired {
      conn.execute(
        "DELETE FROM cache WHERE key = ? AND category = ?",
        params![key, category],
      )?;
      return Ok(None);
    }

    Ok(Some(value))
  }

  fn try_set(&self, key: &str, category: &str, value: &str) -> crate::error::Result<()> {
    let now = Utc::now();
    let conn = self.db.conn()?;

    conn.execute(
      "INSERT OR REPLACE INTO cache (key, category, value, created_at) VALUES (?, ?, ?, ?)",
      params![key, category, value, rfc3339(now)],
    )?;

    // Lazy cleanup: RFC 3339 UTC strings sort chronologically
    let cutoff = rfc3339(now - self.ttl);
    conn.execute("DELETE FROM cache WHERE created_at < ?", params![cutoff])?;

    Ok(())
  }
}

fn rfc3339(t: DateTime<Utc>) -> String {
  t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
