use reqwest::Method;
use serde_json::Value;
use tracing::warn;

use crate::config::{JiraConfig, MatchMode};
use crate::error::{Error, Result};
use crate::jira::fields::schema_from_fields;
use crate::jira::types::FieldSchema;

/// Result set cap for JQL searches.
const MAX_SEARCH_RESULTS: u32 = 50;

/// Jira REST client: basic auth, no retries. Transport failures surface
/// to the caller, which decides whether to proceed without tracker data.
#[derive(Clone)]
pub struct JiraClient {
  http: reqwest::Client,
  base_url: String,
  email: String,
  token: String,
  match_mode: MatchMode,
}

impl JiraClient {
  pub fn new(config: &JiraConfig, token: String, http: reqwest::Client) -> Self {
    Self {
      http,
      base_url: config.url.trim_end_matches('/').to_string(),
      email: config.email.clone(),
      token,
      match_mode: config.match_mode,
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<String> {
    let url = format!("{}{}", self.base_url, path);

    let mut req = self
      .http
      .request(method, &url)
      .basic_auth(&self.email, Some(&self.token))
      .header(reqwest::header::ACCEPT, "application/json");
    if let Some(body) = body {
      req = req.json(&body);
    }

    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
      return Err(Error::Request {
        status: status.as_u16(),
        body: text,
      });
    }

    Ok(text)
  }

  /// Discover the tenant's field schema from field metadata.
  ///
  /// Discovery is best-effort: a failed fetch or parse falls back to the
  /// conventional default ids rather than failing the caller.
  pub async fn discover_field_schema(&self) -> FieldSchema {
    match self.fetch_field_metadata().await {
      Ok(fields) => schema_from_fields(&fields),
      Err(e) => {
        warn!(error = %e, "field discovery failed, using default schema");
        FieldSchema::default()
      }
    }
  }

  async fn fetch_field_metadata(&self) -> Result<Vec<Value>> {
    let body = self.request(Method::GET, "/rest/api/3/field", None).await?;
    let fields: Vec<Value> = serde_json::from_str(&body)
      .map_err(|e| Error::Parse(format!("failed to parse field metadata: {}", e)))?;
    Ok(fields)
  }

  /// Resolve a member's display name to a Jira account id.
  pub async fn resolve_user(&self, display_name: &str) -> Result<String> {
    let query: String = url::form_urlencoded::byte_serialize(display_name.as_bytes()).collect();
    let path = format!("/rest/api/3/user/search?query={}", query);

    let body = self.request(Method::GET, &path, None).await?;
    let users: Vec<Value> = serde_json::from_str(&body)
      .map_err(|e| Error::Parse(format!("failed to parse user search response: {}", e)))?;

    let matched = select_user(&users, display_name, self.match_mode)?;

    matched
      .get("accountId")
      .and_then(Value::as_str)
      .map(String::from)
      .ok_or_else(|| Error::Parse("user record has no accountId".to_string()))
  }

  /// Execute a JQL search with an explicit field projection, capped at
  /// [`MAX_SEARCH_RESULTS`] records.
  pub async fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>> {
    let body = serde_json::json!({
      "jql": jql,
      "fields": fields,
      "maxResults": MAX_SEARCH_RESULTS,
    });

    let text = self
      .request(Method::POST, "/rest/api/3/search/jql", Some(body))
      .await?;

    let mut result: Value = serde_json::from_str(&text)
      .map_err(|e| Error::Parse(format!("failed to parse search response: {}", e)))?;

    match result.get_mut("issues").map(Value::take) {
      Some(Value::Array(issues)) => Ok(issues),
      _ => Ok(Vec::new()),
    }
  }
}

/// Pick a user record for a display name.
///
/// Only active users are considered. An exact case-folded name match is
/// preferred; without one, lenient mode takes the first active user in
/// response order and strict mode fails with NotFound.
fn select_user<'a>(users: &'a [Value], display_name: &str, mode: MatchMode) -> Result<&'a Value> {
  let active: Vec<&Value> = users
    .iter()
    .filter(|u| u.get("active").and_then(Value::as_bool) == Some(true))
    .collect();

  if active.is_empty() {
    return Err(Error::NotFound(format!(
      "active Jira user matching {:?}",
      display_name
    )));
  }

  let wanted = display_name.to_lowercase();
  let exact = active
    .iter()
    .find(|u| {
      u.get("displayName")
        .and_then(Value::as_str)
        .is_some_and(|name| name.to_lowercase() == wanted)
    })
    .copied();

  match (exact, mode) {
    (Some(user), _) => Ok(user),
    (None, MatchMode::Lenient) => Ok(active[0]),
    (None, MatchMode::Strict) => Err(Error::NotFound(format!(
      "exact Jira user match for {:?}",
      display_name
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn user(name: &str, account_id: &str, active: bool) -> Value {
    json!({"displayName": name, "accountId": account_id, "active": active})
  }

  #[test]
  fn exact_match_beats_response_order() {
    let users = [
      user("jane doe (contractor)", "a1", true),
      user("Jane Doe", "a2", true),
    ];
    let picked = select_user(&users, "jane doe", MatchMode::Lenient).unwrap();
    assert_eq!(picked["accountId"], "a2");
  }

  #[test]
  fn name_match_uses_unicode_case_folding() {
    let users = [user("josé garcía", "a1", true)];
    let picked = select_user(&users, "JOSÉ GARCÍA", MatchMode::Strict).unwrap();
    assert_eq!(picked["accountId"], "a1");
  }

  #[test]
  fn inactive_users_are_never_considered() {
    let users = [user("Jane Doe", "a1", false), user("Jan Doe", "a2", true)];
    let picked = select_user(&users, "Jane Doe", MatchMode::Lenient).unwrap();
    assert_eq!(picked["accountId"], "a2");

    let only_inactive = [user("Jane Doe", "a1", false)];
    assert!(matches!(
      select_user(&only_inactive, "Jane Doe", MatchMode::Lenient),
      Err(Error::NotFound(_))
    ));
  }

  #[test]
  fn lenient_falls_back_to_first_active_user() {
    let users = [
      user("jane doe (contractor)", "a1", true),
      user("jane d", "a2", true),
    ];
    let picked = select_user(&users, "Jane Doe", MatchMode::Lenient).unwrap();
    assert_eq!(picked["accountId"], "a1");
  }

  #[test]
  fn strict_requires_an_exact_match() {
    let users = [user("jane doe (contractor)", "a1", true)];
    assert!(matches!(
      select_user(&users, "Jane Doe", MatchMode::Strict),
      Err(Error::NotFound(_))
    ));
  }
}
