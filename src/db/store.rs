//! Persistence for team members and journal entries.
//!
//! List-valued entry columns (tags, action items, quotes, blockers, wins)
//! are stored as JSON text. Malformed stored JSON degrades to an empty
//! list rather than failing the whole row.

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
  pub id: String,
  pub name: String,
  pub role: String,
  pub color: String,
  pub jira_account_id: Option<String>,
  pub prep_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionItem {
  pub text: String,
  #[serde(default)]
  pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub member_id: String,
  pub date: String,
  pub summary: Option<String>,
  pub morale_score: Option<i64>,
  pub growth_score: Option<i64>,
  pub morale_rationale: Option<String>,
  pub growth_rationale: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub action_items_mine: Vec<ActionItem>,
  #[serde(default)]
  pub action_items_theirs: Vec<ActionItem>,
  #[serde(default)]
  pub notable_quotes: Vec<String>,
  #[serde(default)]
  pub blockers: Vec<String>,
  #[serde(default)]
  pub wins: Vec<String>,
  pub private_note: Option<String>,
  pub transcript: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

/// SELECT column list for entries, matching `entry_from_row` order.
const ENTRY_COLS: &str = "id, member_id, date, summary, morale_score, growth_score, \
   morale_rationale, growth_rationale, tags, action_items_mine, action_items_theirs, \
   notable_quotes, blockers, wins, private_note, transcript, created_at, updated_at";

impl Database {
  // ==========================================================================
  // Team members
  // ==========================================================================

  pub fn insert_member(&self, member: &TeamMember) -> Result<()> {
    self.conn()?.execute(
      "INSERT INTO team_members (id, name, role, color, jira_account_id, prep_notes)
       VALUES (?, ?, ?, ?, ?, ?)",
      params![
        member.id,
        member.name,
        member.role,
        member.color,
        member.jira_account_id,
        member.prep_notes
      ],
    )?;
    Ok(())
  }

  pub fn get_member(&self, id: &str) -> Result<TeamMember> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare(
      "SELECT id, name, role, color, jira_account_id, prep_notes
       FROM team_members WHERE id = ?",
    )?;

    stmt
      .query_row(params![id], member_from_row)
      .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!("member {}", id)),
        other => other.into(),
      })
  }

  pub fn list_members(&self) -> Result<Vec<TeamMember>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare(
      "SELECT id, name, role, color, jira_account_id, prep_notes
       FROM team_members ORDER BY name",
    )?;

    let members = stmt
      .query_map([], member_from_row)?
      .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(members)
  }

  /// Overwrite every mutable member field. Setting `jira_account_id`
  /// to None clears a stored resolution so the next briefing re-resolves.
  pub fn update_member(&self, member: &TeamMember) -> Result<()> {
    let changed = self.conn()?.execute(
      "UPDATE team_members
       SET name = ?, role = ?, color = ?, jira_account_id = ?, prep_notes = ?
       WHERE id = ?",
      params![
        member.name,
        member.role,
        member.color,
        member.jira_account_id,
        member.prep_notes,
        member.id
      ],
    )?;
    if changed == 0 {
      return Err(Error::NotFound(format!("member {}", member.id)));
    }
    Ok(())
  }

  /// Persist a freshly resolved Jira account id so later briefings skip
  /// name resolution.
  pub fn set_jira_account_id(&self, member_id: &str, account_id: &str) -> Result<()> {
    let changed = self.conn()?.execute(
      "UPDATE team_members SET jira_account_id = ? WHERE id = ?",
      params![account_id, member_id],
    )?;
    if changed == 0 {
      return Err(Error::NotFound(format!("member {}", member_id)));
    }
    Ok(())
  }

  pub fn set_prep_notes(&self, member_id: &str, notes: Option<&str>) -> Result<()> {
    let changed = self.conn()?.execute(
      "UPDATE team_members SET prep_notes = ? WHERE id = ?",
      params![notes, member_id],
    )?;
    if changed == 0 {
      return Err(Error::NotFound(format!("member {}", member_id)));
    }
    Ok(())
  }

  pub fn delete_member(&self, member_id: &str) -> Result<()> {
    let conn = self.conn()?;
    conn.execute("DELETE FROM entries WHERE member_id = ?", params![member_id])?;
    let changed = conn.execute("DELETE FROM team_members WHERE id = ?", params![member_id])?;
    if changed == 0 {
      return Err(Error::NotFound(format!("member {}", member_id)));
    }
    Ok(())
  }

  // ==========================================================================
  // Entries
  // ==========================================================================

  pub fn insert_entry(&self, entry: &Entry) -> Result<()> {
    self.conn()?.execute(
      &format!(
        "INSERT OR REPLACE INTO entries ({ENTRY_COLS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
      ),
      params![
        entry.id,
        entry.member_id,
        entry.date,
        entry.summary,
        entry.morale_score,
        entry.growth_score,
        entry.morale_rationale,
        entry.growth_rationale,
        serde_json::to_string(&entry.tags)?,
        serde_json::to_string(&entry.action_items_mine)?,
        serde_json::to_string(&entry.action_items_theirs)?,
        serde_json::to_string(&entry.notable_quotes)?,
        serde_json::to_string(&entry.blockers)?,
        serde_json::to_string(&entry.wins)?,
        entry.private_note,
        entry.transcript,
        entry.created_at,
        entry.updated_at,
      ],
    )?;
    Ok(())
  }

  /// The most recent entries for a member, newest first.
  pub fn list_recent_entries(&self, member_id: &str, limit: u32) -> Result<Vec<Entry>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare(&format!(
      "SELECT {ENTRY_COLS} FROM entries WHERE member_id = ? ORDER BY date DESC LIMIT ?"
    ))?;

    let entries = stmt
      .query_map(params![member_id, limit], entry_from_row)?
      .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(entries)
  }

  pub fn delete_entry(&self, entry_id: &str) -> Result<()> {
    let changed = self
      .conn()?
      .execute("DELETE FROM entries WHERE id = ?", params![entry_id])?;
    if changed == 0 {
      return Err(Error::NotFound(format!("entry {}", entry_id)));
    }
    Ok(())
  }
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<TeamMember> {
  Ok(TeamMember {
    id: row.get(0)?,
    name: row.get(1)?,
    role: row.get(2)?,
    color: row.get(3)?,
    jira_account_id: row.get(4)?,
    prep_notes: row.get(5)?,
  })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
  Ok(Entry {
    id: row.get(0)?,
    member_id: row.get(1)?,
    date: row.get(2)?,
    summary: row.get(3)?,
    morale_score: row.get(4)?,
    growth_score: row.get(5)?,
    morale_rationale: row.get(6)?,
    growth_rationale: row.get(7)?,
    tags: json_list(row.get::<_, Option<String>>(8)?),
    action_items_mine: json_items(row.get::<_, Option<String>>(9)?),
    action_items_theirs: json_items(row.get::<_, Option<String>>(10)?),
    notable_quotes: json_list(row.get::<_, Option<String>>(11)?),
    blockers: json_list(row.get::<_, Option<String>>(12)?),
    wins: json_list(row.get::<_, Option<String>>(13)?),
    private_note: row.get(14)?,
    transcript: row.get(15)?,
    created_at: row.get(16)?,
    updated_at: row.get(17)?,
  })
}

fn json_list(raw: Option<String>) -> Vec<String> {
  raw
    .and_then(|s| serde_json::from_str(&s).ok())
    .unwrap_or_default()
}

fn json_items(raw: Option<String>) -> Vec<ActionItem> {
  raw
    .and_then(|s| serde_json::from_str(&s).ok())
    .unwrap_or_default()
}
