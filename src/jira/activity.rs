//! Aggregation of raw Jira issues into classified activity buckets and
//! sprint statistics.

use serde_json::Value;
use tracing::warn;

use super::client::JiraClient;
use super::fields::{extract_story_points, parse_issue};
use super::types::{FieldSchema, JiraContext, SprintStats};

/// Terminal status; compared case-insensitively.
const DONE_STATUS: &str = "Done";

/// Fetch and classify a member's current activity.
///
/// Runs the assigned-in-open-sprints query and the completed-since query;
/// a failed query is logged and treated as an empty result set, so one
/// failure never aborts the whole aggregation.
pub async fn fetch_activity(
  client: &JiraClient,
  account_id: &str,
  since: &str,
  schema: &FieldSchema,
) -> JiraContext {
  let fields = projection(schema);

  let assigned_jql = format!(
    r#"assignee = "{}" AND sprint in openSprints() ORDER BY status ASC, rank ASC"#,
    account_id
  );
  let assigned = match client.search(&assigned_jql, &fields).await {
    Ok(issues) => issues,
    Err(e) => {
      warn!(error = %e, "failed to fetch assigned issues");
      Vec::new()
    }
  };

  let completed_jql = format!(
    r#"assignee = "{}" AND status = Done AND resolved >= "{}" ORDER BY resolved DESC"#,
    account_id, since
  );
  let completed = match client.search(&completed_jql, &fields).await {
    Ok(issues) => issues,
    Err(e) => {
      warn!(error = %e, "failed to fetch completed issues");
      Vec::new()
    }
  };

  classify(&assigned, &completed, schema)
}

/// The field projection for both activity queries: fixed issue fields
/// plus the tenant's epic and story-point field ids.
fn projection(schema: &FieldSchema) -> Vec<String> {
  let mut fields: Vec<String> = ["summary", "status", "priority", "flagged"]
    .map(String::from)
    .to_vec();
  fields.push(schema.epic_name_field.clone());
  fields.extend(schema.story_point_fields.iter().cloned());
  fields
}

/// Classify raw issues into buckets and compute sprint stats.
///
/// Done tickets from the assigned query contribute points to both
/// committed and completed totals but never enter the assigned bucket;
/// points are accumulated only from the assigned query, so completed-
/// since results cannot double count. Stats are omitted entirely when
/// both queries came back empty.
pub fn classify(assigned: &[Value], completed: &[Value], schema: &FieldSchema) -> JiraContext {
  let mut ctx = JiraContext::default();
  let mut points_committed = 0;
  let mut points_completed = 0;

  for issue in assigned {
    let ticket = parse_issue(issue, &schema.epic_name_field);
    let points = extract_story_points(issue, &schema.story_point_fields);

    if ticket.status.eq_ignore_ascii_case(DONE_STATUS) {
      points_committed += points;
      points_completed += points;
      continue;
    }

    points_committed += points;

    if ticket.flagged {
      ctx.blocked.push(ticket.clone());
    }
    ctx.assigned.push(ticket);
  }

  for issue in completed {
    ctx
      .completed
      .push(parse_issue(issue, &schema.epic_name_field));
  }

  if !assigned.is_empty() || !completed.is_empty() {
    ctx.sprint_stats = Some(SprintStats::new(points_committed, points_completed));
  }

  ctx
}
