use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Jira integration. Absent means briefings skip tracker data.
  pub jira: Option<JiraConfig>,
  /// Journal database path (defaults to the platform data directory).
  pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
  pub url: String,
  pub email: String,
  /// How to resolve a member name with no exact Jira match:
  /// lenient = first active user, strict = fail with NotFound.
  #[serde(default, rename = "match")]
  pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
  #[default]
  Lenient,
  Strict,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cadence.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cadence/config.yaml
  ///
  /// A missing config file is not an error: the journal works without
  /// Jira, and secrets come from the environment anyway.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::ConfigurationMissing(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Config::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cadence.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cadence").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Parse(format!("failed to read config file {}: {}", path.display(), e)))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| Error::Parse(format!("failed to parse config file {}: {}", path.display(), e)))?;

    Ok(config)
  }

  /// Get the Jira API token from environment variables.
  ///
  /// Checks CADENCE_JIRA_TOKEN first, then JIRA_API_TOKEN as fallback.
  pub fn jira_token() -> Result<String> {
    non_empty_env("CADENCE_JIRA_TOKEN")
      .or_else(|| non_empty_env("JIRA_API_TOKEN"))
      .ok_or_else(|| {
        Error::ConfigurationMissing(
          "Jira API token not found. Set CADENCE_JIRA_TOKEN or JIRA_API_TOKEN.".to_string(),
        )
      })
  }
}

/// Read an environment variable, treating empty and placeholder values as
/// unset.
pub fn non_empty_env(key: &str) -> Option<String> {
  match std::env::var(key) {
    Ok(v) if !v.is_empty() && v != "your-key-here" => Some(v),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_full_config() {
    let yaml = r#"
jira:
  url: https://example.atlassian.net
  email: manager@example.com
  match: strict
database: /tmp/journal.db
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let jira = config.jira.unwrap();
    assert_eq!(jira.url, "https://example.atlassian.net");
    assert_eq!(jira.match_mode, MatchMode::Strict);
    assert_eq!(config.database.unwrap(), PathBuf::from("/tmp/journal.db"));
  }

  #[test]
  fn match_mode_defaults_to_lenient() {
    let yaml = "jira:\n  url: https://example.atlassian.net\n  email: m@example.com\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.jira.unwrap().match_mode, MatchMode::Lenient);
  }

  #[test]
  fn empty_config_is_valid() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert!(config.jira.is_none());
    assert!(config.database.is_none());
  }

  #[test]
  fn loads_explicit_path_and_rejects_missing_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "database: /tmp/journal.db\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.database.unwrap(), PathBuf::from("/tmp/journal.db"));

    assert!(matches!(
      Config::load(Some(&dir.path().join("missing.yaml"))),
      Err(Error::ConfigurationMissing(_))
    ));
  }
}
