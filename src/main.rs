mod ai;
mod cache;
mod config;
mod db;
mod error;
mod extract;
mod jira;
mod prep;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai::Provider;
use cache::{fingerprint, Cache};
use config::Config;
use db::store::{Entry, TeamMember};
use db::Database;
use jira::client::JiraClient;
use prep::Prep;

#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "A 1:1 journal for engineering managers, with Jira-aware prep briefings")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cadence/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Path to the journal database (overrides config)
  #[arg(long)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Manage team members
  Member {
    #[command(subcommand)]
    action: MemberAction,
  },
  /// Manage journal entries
  Entry {
    #[command(subcommand)]
    action: EntryAction,
  },
  /// Extract structured fields from a 1:1 transcript
  Extract {
    /// The report's display name
    #[arg(long)]
    name: String,
    /// Path to the transcript text file
    #[arg(long)]
    transcript: PathBuf,
  },
  /// Build a prep briefing for an upcoming 1:1
  Prep {
    /// Team member id
    #[arg(long)]
    member: String,
    /// Recompute even if a cached briefing exists
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand, Debug)]
enum MemberAction {
  /// Add a team member
  Add {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "Engineer")]
    role: String,
    #[arg(long, default_value = "#81B29A")]
    color: String,
  },
  /// List team members
  List,
  /// Update a member's name, role, color, or Jira account id
  Update {
    #[arg(long)]
    member: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    color: Option<String>,
    /// Override the resolved Jira account id
    #[arg(long)]
    jira_account_id: Option<String>,
    /// Clear the stored Jira account id so the next briefing re-resolves
    /// it
    #[arg(long, conflicts_with = "jira_account_id")]
    clear_jira_account: bool,
  },
  /// Set free-form prep notes for a member
  Notes {
    #[arg(long)]
    member: String,
    /// Omit to clear the notes
    notes: Option<String>,
  },
  /// Remove a member and their entries
  Remove {
    #[arg(long)]
    member: String,
  },
}

#[derive(Subcommand, Debug)]
enum EntryAction {
  /// Import an entry from a JSON file (id and timestamps filled in when
  /// absent)
  Import {
    #[arg(long)]
    member: String,
    file: PathBuf,
  },
  /// List recent entries for a member
  List {
    #[arg(long)]
    member: String,
    #[arg(long, default_value_t = 5)]
    limit: u32,
  },
  /// Remove an entry
  Remove {
    #[arg(long)]
    entry: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let db_path = args.database.or_else(|| config.database.clone());
  let db = Arc::new(Database::open(db_path.as_deref())?);

  match args.command {
    Command::Member { action } => run_member(&db, action),
    Command::Entry { action } => run_entry(&db, action),
    Command::Extract { name, transcript } => {
      let transcript = std::fs::read_to_string(&transcript)
        .map_err(|e| eyre!("failed to read transcript {}: {}", transcript.display(), e))?;
      let cache = Cache::new(db.clone());
      let provider = Provider::from_env();
      let extracted =
        extract::extract(&cache, provider.as_ref(), &http_client()?, &name, &transcript).await?;
      println!("{}", serde_json::to_string_pretty(&extracted)?);
      Ok(())
    }
    Command::Prep { member, force } => {
      let http = http_client()?;
      let jira = jira_client(&config, http.clone());
      let provider = Provider::from_env();
      if provider.is_none() {
        info!("no generation provider configured, briefings will be structured-only");
      }

      let prep = Prep::new(db.clone(), Cache::new(db), jira, provider, http);
      let response = prep.build_briefing(&member, force).await?;
      println!("{}", serde_json::to_string_pretty(&response)?);
      Ok(())
    }
  }
}

/// Shared HTTP client. The upstream APIs define no timeouts of their
/// own, so every request gets a 30 second cap here.
fn http_client() -> Result<reqwest::Client> {
  Ok(
    reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?,
  )
}

/// Jira client when base URL, email, and token are all configured.
fn jira_client(config: &Config, http: reqwest::Client) -> Option<JiraClient> {
  let jira_config = config.jira.as_ref()?;
  match Config::jira_token() {
    Ok(token) => {
      info!(url = %jira_config.url, "Jira integration enabled");
      Some(JiraClient::new(jira_config, token, http))
    }
    Err(_) => {
      info!("Jira integration disabled: no API token set");
      None
    }
  }
}

fn run_member(db: &Database, action: MemberAction) -> Result<()> {
  match action {
    MemberAction::Add { name, role, color } => {
      let now = chrono::Utc::now().to_rfc3339();
      let member = TeamMember {
        id: format!("member-{}", &fingerprint(&[name.as_str(), now.as_str()])[..8]),
        name,
        role,
        color,
        jira_account_id: None,
        prep_notes: None,
      };
      db.insert_member(&member)?;
      println!("{}", serde_json::to_string_pretty(&member)?);
    }
    MemberAction::List => {
      let members = db.list_members()?;
      println!("{}", serde_json::to_string_pretty(&members)?);
    }
    MemberAction::Update {
      member,
      name,
      role,
      color,
      jira_account_id,
      clear_jira_account,
    } => {
      let mut record = db.get_member(&member)?;
      if let Some(name) = name {
        record.name = name;
      }
      if let Some(role) = role {
        record.role = role;
      }
      if let Some(color) = color {
        record.color = color;
      }
      if clear_jira_account {
        record.jira_account_id = None;
      } else if jira_account_id.is_some() {
        record.jira_account_id = jira_account_id;
      }
      db.update_member(&record)?;
      println!("{}", serde_json::to_string_pretty(&record)?);
    }
    MemberAction::Notes { member, notes } => {
      db.set_prep_notes(&member, notes.as_deref())?;
    }
    MemberAction::Remove { member } => {
      db.delete_member(&member)?;
    }
  }
  Ok(())
}

fn run_entry(db: &Database, action: EntryAction) -> Result<()> {
  match action {
    EntryAction::Import { member, file } => {
      let contents = std::fs::read_to_string(&file)
        .map_err(|e| eyre!("failed to read entry file {}: {}", file.display(), e))?;
      let mut entry: Entry = serde_json::from_str(&contents)
        .map_err(|e| eyre!("failed to parse entry file {}: {}", file.display(), e))?;

      // The member must exist before an entry can reference it
      db.get_member(&member)?;
      entry.member_id = member;

      let now = chrono::Utc::now().to_rfc3339();
      if entry.id.is_empty() {
        entry.id = format!(
          "entry-{}",
          &fingerprint(&[entry.member_id.as_str(), entry.date.as_str(), now.as_str()])[..8]
        );
      }
      if entry.created_at.is_none() {
        entry.created_at = Some(now.clone());
      }
      entry.updated_at = Some(now);

      db.insert_entry(&entry)?;
      println!("{}", serde_json::to_string_pretty(&entry)?);
    }
    EntryAction::List { member, limit } => {
      let entries = db.list_recent_entries(&member, limit)?;
      println!("{}", serde_json::to_string_pretty(&entries)?);
    }
    EntryAction::Remove { entry } => {
      db.delete_entry(&entry)?;
    }
  }
  Ok(())
}
