use serde::{Deserialize, Serialize};

/// A ticket as it appears in a briefing, derived from a raw Jira issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraTicket {
  pub key: String,
  pub summary: String,
  pub status: String,
  pub flagged: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub epic_name: Option<String>,
}

/// Committed/completed story points for the current sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintStats {
  pub points_committed: i64,
  pub points_completed: i64,
  pub carryover: i64,
}

impl SprintStats {
  pub fn new(committed: i64, completed: i64) -> Self {
    Self {
      points_committed: committed,
      points_completed: completed,
      carryover: (committed - completed).max(0),
    }
  }
}

/// Classified activity for one Jira identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraContext {
  pub assigned: Vec<JiraTicket>,
  pub completed: Vec<JiraTicket>,
  pub blocked: Vec<JiraTicket>,
  pub sprint_stats: Option<SprintStats>,
}

impl JiraContext {
  /// Whether any bucket holds tickets. Empty context still renders the
  /// board link but contributes nothing to the prompt.
  pub fn has_tickets(&self) -> bool {
    !self.assigned.is_empty() || !self.completed.is_empty() || !self.blocked.is_empty()
  }
}

/// Tenant field ids for logical concepts, discovered at runtime.
///
/// Multiple story-point candidates are kept because different projects
/// populate different custom fields for the same concept; the first
/// candidate with a positive value on an issue wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
  pub story_point_fields: Vec<String>,
  pub epic_name_field: String,
}

impl Default for FieldSchema {
  fn default() -> Self {
    Self {
      story_point_fields: vec![super::fields::DEFAULT_STORY_POINT_FIELD.to_string()],
      epic_name_field: super::fields::DEFAULT_EPIC_NAME_FIELD.to_string(),
    }
  }
}
