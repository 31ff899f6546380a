//! Briefing assembly: journal history, Jira activity, and a generated
//! narrative, cached under a fingerprint of every contributing input.

pub mod structured;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ai::Provider;
use crate::cache::{fingerprint, Cache};
use crate::db::store::TeamMember;
use crate::db::Database;
use crate::error::Result;
use crate::jira::activity::fetch_activity;
use crate::jira::client::JiraClient;
use crate::jira::types::{JiraTicket, SprintStats};
use self::structured::{build_prep_prompt, compute_structured, PrepActionItem, ScorePoint, TagCount};

/// How many entries feed a briefing.
const RECENT_ENTRY_LIMIT: u32 = 5;

const PREP_CATEGORY: &str = "prep";

pub const NO_ENTRIES_BRIEFING: &str = "No entries yet for this team member.";
pub const NO_PROVIDER_BRIEFING: &str = "No API key configured. Showing structured data only.";
pub const FAILED_BRIEFING: &str = "Failed to generate AI briefing. Showing structured data only.";

/// The full briefing payload. Jira sections appear only when the
/// integration is configured and an identity resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepResponse {
  pub briefing: String,
  #[serde(default)]
  pub open_items_mine: Vec<PrepActionItem>,
  #[serde(default)]
  pub open_items_theirs: Vec<PrepActionItem>,
  #[serde(default)]
  pub recent_tags: Vec<TagCount>,
  #[serde(default)]
  pub unresolved_blockers: Vec<String>,
  #[serde(default)]
  pub morale_scores: Vec<ScorePoint>,
  #[serde(default)]
  pub growth_scores: Vec<ScorePoint>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub jira_assigned: Vec<JiraTicket>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub jira_completed: Vec<JiraTicket>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub jira_blocked: Vec<JiraTicket>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub jira_sprint_stats: Option<SprintStats>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub jira_board_url: Option<String>,
}

/// Briefing assembler. One instance per process; cheap to share.
pub struct Prep {
  db: Arc<Database>,
  cache: Cache,
  jira: Option<JiraClient>,
  provider: Option<Provider>,
  http: reqwest::Client,
  /// Per-fingerprint locks so concurrent misses for the same briefing
  /// converge on one computation.
  in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Prep {
  pub fn new(
    db: Arc<Database>,
    cache: Cache,
    jira: Option<JiraClient>,
    provider: Option<Provider>,
    http: reqwest::Client,
  ) -> Self {
    Self {
      db,
      cache,
      jira,
      provider,
      http,
      in_flight: Mutex::new(HashMap::new()),
    }
  }

  /// Build (or fetch from cache) the briefing for a member.
  ///
  /// Only member/entry lookups can fail; everything downstream degrades
  /// a section of the payload instead of erroring.
  pub async fn build_briefing(&self, member_id: &str, force: bool) -> Result<PrepResponse> {
    let member = self.db.get_member(member_id)?;
    let entries = self.db.list_recent_entries(member_id, RECENT_ENTRY_LIMIT)?;

    if entries.is_empty() {
      return Ok(PrepResponse {
        briefing: NO_ENTRIES_BRIEFING.to_string(),
        ..Default::default()
      });
    }

    // Fingerprint every contributing input. Today's date makes Jira
    // sections refresh daily; entry updated_at invalidates on edit.
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let mut parts: Vec<&str> = vec![member_id, &today];
    for entry in &entries {
      parts.push(&entry.id);
      if let Some(updated) = &entry.updated_at {
        parts.push(updated);
      }
    }
    if let Some(account_id) = &member.jira_account_id {
      parts.push(account_id);
    }
    let key = fingerprint(&parts);

    let flight = self.acquire_flight(&key).await;
    let _guard = flight.lock().await;

    if !force {
      if let Some(cached) = self.cache.get(&key, PREP_CATEGORY) {
        if let Ok(response) = serde_json::from_str::<PrepResponse>(&cached) {
          info!(member = %member.name, "briefing served from cache");
          self.release_flight(&key).await;
          return Ok(response);
        }
      }
    }

    let response = self.compute_briefing(&member, entries, &key).await;
    self.release_flight(&key).await;
    Ok(response)
  }

  async fn compute_briefing(
    &self,
    member: &TeamMember,
    entries: Vec<crate::db::store::Entry>,
    key: &str,
  ) -> PrepResponse {
    let prep = compute_structured(&entries);

    // Jira activity, when configured. Resolution and fetch failures
    // degrade to a briefing without tracker sections.
    let mut jira_ctx = None;
    let mut account_id = member.jira_account_id.clone();
    if let Some(client) = &self.jira {
      if account_id.is_none() {
        match client.resolve_user(&member.name).await {
          Ok(resolved) => {
            if let Err(e) = self.db.set_jira_account_id(&member.id, &resolved) {
              warn!(member = %member.name, error = %e, "failed to persist Jira account id");
            }
            info!(member = %member.name, account_id = %resolved, "resolved Jira account");
            account_id = Some(resolved);
          }
          Err(e) => warn!(member = %member.name, error = %e, "Jira user resolution failed"),
        }
      }

      if let Some(id) = &account_id {
        let schema = client.discover_field_schema().await;
        // Oldest loaded entry bounds the completed-since query
        let since = &entries[entries.len() - 1].date;
        let ctx = fetch_activity(client, id, since, &schema).await;
        info!(
          member = %member.name,
          assigned = ctx.assigned.len(),
          completed = ctx.completed.len(),
          blocked = ctx.blocked.len(),
          "fetched Jira activity"
        );
        jira_ctx = Some(ctx);
      }
    }

    let briefing = match &self.provider {
      None => NO_PROVIDER_BRIEFING.to_string(),
      Some(provider) => {
        let prompt = build_prep_prompt(&member.name, &entries, jira_ctx.as_ref());
        match provider.complete(&self.http, &prompt).await {
          Ok(text) => text.trim().to_string(),
          Err(e) => {
            warn!(provider = provider.name(), error = %e, "briefing generation failed");
            FAILED_BRIEFING.to_string()
          }
        }
      }
    };

    let mut response = PrepResponse {
      briefing,
      open_items_mine: prep.open_items_mine,
      open_items_theirs: prep.open_items_theirs,
      recent_tags: prep.recent_tags,
      unresolved_blockers: prep.unresolved_blockers,
      morale_scores: prep.morale_scores,
      growth_scores: prep.growth_scores,
      ..Default::default()
    };

    if let Some(ctx) = jira_ctx {
      response.jira_assigned = ctx.assigned;
      response.jira_completed = ctx.completed;
      response.jira_blocked = ctx.blocked;
      response.jira_sprint_stats = ctx.sprint_stats;
      if let (Some(client), Some(id)) = (&self.jira, &account_id) {
        response.jira_board_url = Some(format!("{}/jira/people/{}", client.base_url(), id));
      }
    }

    if let Ok(json) = serde_json::to_string(&response) {
      self.cache.set(key, PREP_CATEGORY, &json);
    }

    response
  }

  async fn acquire_flight(&self, key: &str) -> Arc<Mutex<()>> {
    let mut map = self.in_flight.lock().await;
    map
      .entry(key.to_string())
      .or_insert_with(|| Arc::new(Mutex::new(())))
      .clone()
  }

  /// Drop the map entry once the caller's handle is the last one out;
  /// waiters still holding the Arc keep serializing on the same lock.
  async fn release_flight(&self, key: &str) {
    let mut map = self.in_flight.lock().await;
    if let Some(lock) = map.get(key) {
      // Two counts remain when only the map and the caller hold it
      if Arc::strong_count(lock) <= 2 {
        map.remove(key);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::store::{ActionItem, Entry, TeamMember};

  fn test_prep() -> Prep {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let cache = Cache::new(db.clone());
    Prep::new(db, cache, None, None, reqwest::Client::new())
  }

  fn seed_member(prep: &Prep, id: &str, name: &str) {
    prep
      .db
      .insert_member(&TeamMember {
        id: id.to_string(),
        name: name.to_string(),
        role: "Engineer".to_string(),
        color: "#81B29A".to_string(),
        jira_account_id: None,
        prep_notes: None,
      })
      .unwrap();
  }

  fn seed_entry(prep: &Prep, id: &str, member_id: &str, date: &str) {
    prep
      .db
      .insert_entry(&Entry {
        id: id.to_string(),
        member_id: member_id.to_string(),
        date: date.to_string(),
        tags: vec!["morale".to_string()],
        action_items_mine: vec![ActionItem {
          text: "share roadmap".to_string(),
          completed: false,
        }],
        updated_at: Some("2026-08-20T10:00:00Z".to_string()),
        ..Default::default()
      })
      .unwrap();
  }

  fn cache_row_count(prep: &Prep) -> i64 {
    prep
      .db
      .conn()
      .unwrap()
      .query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))
      .unwrap()
  }

  #[tokio::test]
  async fn unknown_member_is_not_found() {
    let prep = test_prep();
    assert!(matches!(
      prep.build_briefing("ghost", false).await,
      Err(crate::error::Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn zero_entries_returns_sentinel_without_caching() {
    let prep = test_prep();
    seed_member(&prep, "m1", "Jane Doe");

    let response = prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(response.briefing, NO_ENTRIES_BRIEFING);
    assert!(response.open_items_mine.is_empty());
    assert!(response.recent_tags.is_empty());
    assert!(response.jira_assigned.is_empty());
    assert_eq!(cache_row_count(&prep), 0);
  }

  #[tokio::test]
  async fn no_provider_returns_structured_data_and_caches() {
    let prep = test_prep();
    seed_member(&prep, "m1", "Jane Doe");
    seed_entry(&prep, "e1", "m1", "2026-08-15");

    let response = prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(response.briefing, NO_PROVIDER_BRIEFING);
    assert_eq!(response.open_items_mine.len(), 1);
    assert_eq!(response.recent_tags[0].tag, "morale");
    assert_eq!(cache_row_count(&prep), 1);
  }

  #[tokio::test]
  async fn cache_hit_short_circuits() {
    let prep = test_prep();
    seed_member(&prep, "m1", "Jane Doe");
    seed_entry(&prep, "e1", "m1", "2026-08-15");

    let first = prep.build_briefing("m1", false).await.unwrap();

    // Doctor the cached payload; a hit must return it verbatim
    prep
      .db
      .conn()
      .unwrap()
      .execute(
        "UPDATE cache SET value = ? WHERE category = 'prep'",
        rusqlite::params![r#"{"briefing": "from the cache"}"#],
      )
      .unwrap();

    let second = prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(second.briefing, "from the cache");
    assert_ne!(first.briefing, second.briefing);
  }

  #[tokio::test]
  async fn force_bypasses_cache_and_overwrites() {
    let prep = test_prep();
    seed_member(&prep, "m1", "Jane Doe");
    seed_entry(&prep, "e1", "m1", "2026-08-15");

    prep.build_briefing("m1", false).await.unwrap();
    prep
      .db
      .conn()
      .unwrap()
      .execute(
        "UPDATE cache SET value = ? WHERE category = 'prep'",
        rusqlite::params![r#"{"briefing": "stale"}"#],
      )
      .unwrap();

    let forced = prep.build_briefing("m1", true).await.unwrap();
    assert_eq!(forced.briefing, NO_PROVIDER_BRIEFING);

    // The forced rebuild also replaced the cached payload
    let after = prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(after.briefing, NO_PROVIDER_BRIEFING);
  }

  #[tokio::test]
  async fn editing_an_entry_changes_the_fingerprint() {
    let prep = test_prep();
    seed_member(&prep, "m1", "Jane Doe");
    seed_entry(&prep, "e1", "m1", "2026-08-15");

    prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(cache_row_count(&prep), 1);

    prep
      .db
      .conn()
      .unwrap()
      .execute(
        "UPDATE entries SET updated_at = '2026-08-21T09:00:00Z' WHERE id = 'e1'",
        [],
      )
      .unwrap();

    prep.build_briefing("m1", false).await.unwrap();
    assert_eq!(cache_row_count(&prep), 2);
  }

  #[tokio::test]
  async fn flight_entry_survives_until_last_holder_releases() {
    let prep = test_prep();
    let first = prep.acquire_flight("k1").await;
    let second = prep.acquire_flight("k1").await;
    assert!(Arc::ptr_eq(&first, &second));

    // First caller finishes while the second still holds its handle: the
    // entry must stay so a third caller joins the same lock
    prep.release_flight("k1").await;
    assert!(prep.in_flight.lock().await.contains_key("k1"));
    let third = prep.acquire_flight("k1").await;
    assert!(Arc::ptr_eq(&second, &third));

    drop(second);
    drop(third);
    prep.release_flight("k1").await;
    assert!(!prep.in_flight.lock().await.contains_key("k1"));
  }

  #[tokio::test]
  async fn concurrent_builds_converge_on_one_computation() {
    let prep = Arc::new(test_prep());
    seed_member(&prep, "m1", "Jane Doe");
    seed_entry(&prep, "e1", "m1", "2026-08-15");

    let a = tokio::spawn({
      let prep = prep.clone();
      async move { prep.build_briefing("m1", false).await.unwrap() }
    });
    let b = tokio::spawn({
      let prep = prep.clone();
      async move { prep.build_briefing("m1", false).await.unwrap() }
    });

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.briefing, b.briefing);
    assert_eq!(cache_row_count(&prep), 1);
  }
}
