//! Dynamic field handling for Jira issues.
//!
//! Jira's field schema is tenant-specific, so issues arrive as raw JSON
//! and every ambiguous field gets one coercion rule here. Absent or
//! malformed sub-fields degrade to empty/false rather than failing the
//! whole record.

use serde_json::Value;

use super::types::{FieldSchema, JiraTicket};

/// Conventional story-point custom field, used when discovery finds none.
pub const DEFAULT_STORY_POINT_FIELD: &str = "customfield_10016";
/// Conventional epic-name custom field.
pub const DEFAULT_EPIC_NAME_FIELD: &str = "customfield_10014";

/// Map raw field metadata (`/rest/api/3/field`) to a schema.
///
/// Label matching is case-insensitive and exact. Story-point candidates
/// keep response order; the epic field takes the first match.
pub fn schema_from_fields(fields: &[Value]) -> FieldSchema {
  let mut story_points = Vec::new();
  let mut epic_name = None;

  for field in fields {
    let (Some(id), Some(name)) = (
      field.get("id").and_then(Value::as_str),
      field.get("name").and_then(Value::as_str),
    ) else {
      continue;
    };

    match name.to_lowercase().as_str() {
      "story points" | "story point estimate" => story_points.push(id.to_string()),
      "epic name" => {
        if epic_name.is_none() {
          epic_name = Some(id.to_string());
        }
      }
      _ => {}
    }
  }

  if story_points.is_empty() {
    story_points.push(DEFAULT_STORY_POINT_FIELD.to_string());
  }

  FieldSchema {
    story_point_fields: story_points,
    epic_name_field: epic_name.unwrap_or_else(|| DEFAULT_EPIC_NAME_FIELD.to_string()),
  }
}

/// Extract a ticket from a raw search result issue.
pub fn parse_issue(issue: &Value, epic_field: &str) -> JiraTicket {
  let fields = issue.get("fields");

  JiraTicket {
    key: str_field(Some(issue), "key"),
    summary: str_field(fields, "summary"),
    // Status is nested: fields.status.name
    status: fields
      .and_then(|f| f.get("status"))
      .and_then(|s| s.get("name"))
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string(),
    flagged: parse_flagged(fields.and_then(|f| f.get("flagged"))),
    epic_name: fields
      .and_then(|f| f.get(epic_field))
      .and_then(Value::as_str)
      .filter(|s| !s.is_empty())
      .map(String::from),
  }
}

/// Flagged may arrive as a bool or as a list of flag objects; a non-empty
/// list means flagged.
fn parse_flagged(value: Option<&Value>) -> bool {
  match value {
    Some(Value::Bool(b)) => *b,
    Some(Value::Array(items)) => !items.is_empty(),
    _ => false,
  }
}

/// First positive numeric value among the candidate fields, in order;
/// 0 when none is present or all are non-positive.
pub fn extract_story_points(issue: &Value, candidates: &[String]) -> i64 {
  let Some(fields) = issue.get("fields") else {
    return 0;
  };

  for candidate in candidates {
    if let Some(points) = fields.get(candidate).and_then(Value::as_f64) {
      if points > 0.0 {
        return points as i64;
      }
    }
  }

  0
}

fn str_field(obj: Option<&Value>, key: &str) -> String {
  obj
    .and_then(|o| o.get(key))
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn discovers_story_points_and_epic_name() {
    let fields = [
      json!({"id": "cf_1", "name": "Story Points"}),
      json!({"id": "cf_2", "name": "Epic Name"}),
    ];
    let schema = schema_from_fields(&fields);
    assert_eq!(schema.story_point_fields, vec!["cf_1"]);
    assert_eq!(schema.epic_name_field, "cf_2");
  }

  #[test]
  fn label_matching_is_case_insensitive() {
    let fields = [
      json!({"id": "cf_9", "name": "story point ESTIMATE"}),
      json!({"id": "cf_8", "name": "EPIC NAME"}),
    ];
    let schema = schema_from_fields(&fields);
    assert_eq!(schema.story_point_fields, vec!["cf_9"]);
    assert_eq!(schema.epic_name_field, "cf_8");
  }

  #[test]
  fn keeps_all_story_point_candidates_in_order() {
    let fields = [
      json!({"id": "cf_1", "name": "Story Points"}),
      json!({"id": "cf_2", "name": "Story point estimate"}),
    ];
    let schema = schema_from_fields(&fields);
    assert_eq!(schema.story_point_fields, vec!["cf_1", "cf_2"]);
  }

  #[test]
  fn empty_metadata_falls_back_to_defaults() {
    let schema = schema_from_fields(&[]);
    assert_eq!(schema, FieldSchema::default());
    assert_eq!(schema.story_point_fields, vec![DEFAULT_STORY_POINT_FIELD]);
    assert_eq!(schema.epic_name_field, DEFAULT_EPIC_NAME_FIELD);
  }

  #[test]
  fn parses_issue_with_nested_status_and_epic() {
    let issue = json!({
      "key": "PROJ-1",
      "fields": {
        "summary": "Fix login flow",
        "status": {"name": "In Progress"},
        "flagged": [{"id": 1}],
        "customfield_10014": "Auth Revamp"
      }
    });
    let ticket = parse_issue(&issue, "customfield_10014");
    assert_eq!(ticket.key, "PROJ-1");
    assert_eq!(ticket.summary, "Fix login flow");
    assert_eq!(ticket.status, "In Progress");
    assert!(ticket.flagged);
    assert_eq!(ticket.epic_name.as_deref(), Some("Auth Revamp"));
  }

  #[test]
  fn flagged_coercion_rules() {
    for (value, expected) in [
      (json!(true), true),
      (json!(false), false),
      (json!([]), false),
      (json!([{"id": 1}]), true),
      (json!("yes"), false),
      (json!(null), false),
    ] {
      let issue = json!({"key": "X-1", "fields": {"flagged": value}});
      assert_eq!(parse_issue(&issue, "cf").flagged, expected);
    }
  }

  #[test]
  fn malformed_fields_degrade_to_empty() {
    let ticket = parse_issue(&json!({"key": "X-2"}), "cf");
    assert_eq!(ticket.key, "X-2");
    assert_eq!(ticket.summary, "");
    assert_eq!(ticket.status, "");
    assert!(!ticket.flagged);
    assert!(ticket.epic_name.is_none());
  }

  #[test]
  fn story_points_take_first_positive_candidate() {
    let issue = json!({"fields": {"cf_a": 0, "cf_b": 3.0, "cf_c": 5}});
    let candidates = ["cf_a", "cf_b", "cf_c"].map(String::from);
    assert_eq!(extract_story_points(&issue, &candidates), 3);
  }

  #[test]
  fn story_points_default_to_zero() {
    let issue = json!({"fields": {"cf_a": null, "cf_b": -2}});
    let candidates = ["cf_a", "cf_b"].map(String::from);
    assert_eq!(extract_story_points(&issue, &candidates), 0);
    assert_eq!(extract_story_points(&json!({}), &candidates), 0);
  }
}
