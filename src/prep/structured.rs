//! Locally computed briefing facts and the prep prompt.
//!
//! Everything here is a pure function over the loaded entries (and the
//! already-fetched Jira context), so briefing output stays deterministic
//! for a given set of inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

use crate::db::store::Entry;
use crate::jira::types::JiraContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepActionItem {
  pub text: String,
  pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
  pub tag: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
  pub date: String,
  pub score: i64,
}

/// The non-AI facts derived purely from journal entries.
#[derive(Debug, Clone, Default)]
pub struct StructuredPrep {
  pub open_items_mine: Vec<PrepActionItem>,
  pub open_items_theirs: Vec<PrepActionItem>,
  pub recent_tags: Vec<TagCount>,
  pub unresolved_blockers: Vec<String>,
  pub morale_scores: Vec<ScorePoint>,
  pub growth_scores: Vec<ScorePoint>,
}

/// Compute structured facts over the loaded entries (in their given
/// order). Tags rank by descending count; ties keep first-seen order.
pub fn compute_structured(entries: &[Entry]) -> StructuredPrep {
  let mut prep = StructuredPrep::default();
  let mut tag_index: HashMap<&str, usize> = HashMap::new();

  for entry in entries {
    for item in &entry.action_items_mine {
      if !item.completed {
        prep.open_items_mine.push(PrepActionItem {
          text: item.text.clone(),
          date: entry.date.clone(),
        });
      }
    }
    for item in &entry.action_items_theirs {
      if !item.completed {
        prep.open_items_theirs.push(PrepActionItem {
          text: item.text.clone(),
          date: entry.date.clone(),
        });
      }
    }

    for tag in &entry.tags {
      match tag_index.get(tag.as_str()) {
        Some(&i) => prep.recent_tags[i].count += 1,
        None => {
          tag_index.insert(tag, prep.recent_tags.len());
          prep.recent_tags.push(TagCount {
            tag: tag.clone(),
            count: 1,
          });
        }
      }
    }

    prep.unresolved_blockers.extend(entry.blockers.iter().cloned());

    if let Some(score) = entry.morale_score {
      prep.morale_scores.push(ScorePoint {
        date: entry.date.clone(),
        score,
      });
    }
    if let Some(score) = entry.growth_score {
      prep.growth_scores.push(ScorePoint {
        date: entry.date.clone(),
        score,
      });
    }
  }

  // Stable sort keeps first-seen order within equal counts
  prep.recent_tags.sort_by(|a, b| b.count.cmp(&a.count));

  prep
}

/// Build the briefing prompt: instruction header, entry digests (newest
/// first), and the Jira activity section when tickets are present.
pub fn build_prep_prompt(member_name: &str, entries: &[Entry], jira: Option<&JiraContext>) -> String {
  let jira = jira.filter(|ctx| ctx.has_tickets());
  let mut prompt = String::new();

  if jira.is_some() {
    let _ = write!(
      prompt,
      "You are helping an engineering manager prepare for a 1:1 meeting with {name}. \
       Below are the last {count} meeting entries (newest first). \
       Generate a concise bullet-point briefing with these three sections:\n\n\
       **Follow up on**\n**Watch for**\n**Bring up**\n\n\
       Follow up on = open action items and unresolved topics to revisit.\n\
       Watch for = morale/growth concerns or patterns worth probing.\n\
       Bring up = topics grounded in their current JIRA activity worth discussing.\n\n\
       When an action item from a previous 1:1 clearly maps to a JIRA ticket, reference the ticket status instead of treating it as a separate open item.\n\n\
       Keep bullets short and scannable. No narrative prose.\n\
       Use this exact format — section headers as **bold text** on their own line, bullets as - dashes:\n\n\
       **Follow up on**\n- bullet one\n- bullet two\n\n**Watch for**\n- bullet one\n\n**Bring up**\n- bullet one\n\n",
      name = member_name,
      count = entries.len(),
    );
  } else {
    let _ = write!(
      prompt,
      "You are helping an engineering manager prepare for a 1:1 meeting with {name}. \
       Below are the last {count} meeting entries (newest first). \
       Generate a concise bullet-point briefing with these two sections:\n\n\
       **Follow up on**\n**Watch for**\n\n\
       Follow up on = open action items and unresolved topics to revisit.\n\
       Watch for = morale/growth concerns or patterns worth probing.\n\n\
       Keep bullets short and scannable. No narrative prose.\n\
       Use this exact format — section headers as **bold text** on their own line, bullets as - dashes:\n\n\
       **Follow up on**\n- bullet one\n- bullet two\n\n**Watch for**\n- bullet one\n\n",
      name = member_name,
      count = entries.len(),
    );
  }

  for (i, entry) in entries.iter().enumerate() {
    let _ = writeln!(prompt, "--- Entry {} ({}) ---", i + 1, entry.date);
    if let Some(summary) = &entry.summary {
      let _ = writeln!(prompt, "Summary: {}", summary);
    }
    if let Some(score) = entry.morale_score {
      let _ = write!(prompt, "Morale: {}/5", score);
      if let Some(rationale) = &entry.morale_rationale {
        let _ = write!(prompt, " ({})", rationale);
      }
      prompt.push('\n');
    }
    if let Some(score) = entry.growth_score {
      let _ = write!(prompt, "Growth: {}/5", score);
      if let Some(rationale) = &entry.growth_rationale {
        let _ = write!(prompt, " ({})", rationale);
      }
      prompt.push('\n');
    }
    if !entry.tags.is_empty() {
      let _ = writeln!(prompt, "Tags: {}", entry.tags.join(", "));
    }
    if !entry.action_items_mine.is_empty() {
      prompt.push_str("My action items:\n");
      for item in &entry.action_items_mine {
        let status = if item.completed { "[x]" } else { "[ ]" };
        let _ = writeln!(prompt, "  {} {}", status, item.text);
      }
    }
    if !entry.action_items_theirs.is_empty() {
      let _ = writeln!(prompt, "{}'s action items:", member_name);
      for item in &entry.action_items_theirs {
        let status = if item.completed { "[x]" } else { "[ ]" };
        let _ = writeln!(prompt, "  {} {}", status, item.text);
      }
    }
    if !entry.blockers.is_empty() {
      let _ = writeln!(prompt, "Blockers: {}", entry.blockers.join("; "));
    }
    if !entry.wins.is_empty() {
      let _ = writeln!(prompt, "Wins: {}", entry.wins.join("; "));
    }
    if !entry.notable_quotes.is_empty() {
      let _ = writeln!(prompt, "Notable quotes: {}", entry.notable_quotes.join("; "));
    }
    prompt.push('\n');
  }

  if let Some(ctx) = jira {
    prompt.push_str("--- Current JIRA Activity ---\n");

    if !ctx.assigned.is_empty() {
      prompt.push_str("Assigned tickets (current sprint):\n");
      for ticket in &ctx.assigned {
        let _ = write!(prompt, "  - {}: {} [{}", ticket.key, ticket.summary, ticket.status);
        if ticket.flagged {
          prompt.push_str(", flagged");
        }
        prompt.push(']');
        if let Some(epic) = &ticket.epic_name {
          let _ = write!(prompt, " (Epic: {})", epic);
        }
        prompt.push('\n');
      }
    }

    if !ctx.completed.is_empty() {
      prompt.push_str("Recently completed:\n");
      for ticket in &ctx.completed {
        let _ = write!(prompt, "  - {}: {}", ticket.key, ticket.summary);
        if let Some(epic) = &ticket.epic_name {
          let _ = write!(prompt, " (Epic: {})", epic);
        }
        prompt.push('\n');
      }
    }

    if !ctx.blocked.is_empty() {
      prompt.push_str("Blocked/flagged:\n");
      for ticket in &ctx.blocked {
        let _ = writeln!(prompt, "  - {}: {}", ticket.key, ticket.summary);
      }
    }

    if let Some(stats) = &ctx.sprint_stats {
      let _ = writeln!(
        prompt,
        "Sprint stats: {}/{} points completed",
        stats.points_completed, stats.points_committed
      );
    }

    prompt.push('\n');
  }

  prompt
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::store::ActionItem;
  use crate::jira::types::{JiraTicket, SprintStats};

  fn entry_with_tags(date: &str, tags: &[&str]) -> Entry {
    Entry {
      id: format!("e-{}", date),
      member_id: "m1".to_string(),
      date: date.to_string(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      ..Default::default()
    }
  }

  #[test]
  fn tag_ranking_is_deterministic() {
    // Chronological tag stream a, b, a, c, b, a
    let entries = [
      entry_with_tags("2026-08-01", &["a", "b"]),
      entry_with_tags("2026-08-08", &["a", "c"]),
      entry_with_tags("2026-08-15", &["b", "a"]),
    ];
    let prep = compute_structured(&entries);
    assert_eq!(
      prep.recent_tags,
      vec![
        TagCount { tag: "a".to_string(), count: 3 },
        TagCount { tag: "b".to_string(), count: 2 },
        TagCount { tag: "c".to_string(), count: 1 },
      ]
    );
  }

  #[test]
  fn tag_ties_keep_first_seen_order() {
    let entries = [entry_with_tags("2026-08-01", &["x", "y", "z"])];
    let prep = compute_structured(&entries);
    let tags: Vec<&str> = prep.recent_tags.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(tags, vec!["x", "y", "z"]);
  }

  #[test]
  fn completed_items_are_omitted_from_open_lists() {
    let mut entry = entry_with_tags("2026-08-15", &[]);
    entry.action_items_mine = vec![
      ActionItem { text: "done already".to_string(), completed: true },
      ActionItem { text: "still open".to_string(), completed: false },
    ];
    entry.action_items_theirs = vec![ActionItem {
      text: "their open item".to_string(),
      completed: false,
    }];

    let prep = compute_structured(&[entry]);
    assert_eq!(prep.open_items_mine.len(), 1);
    assert_eq!(prep.open_items_mine[0].text, "still open");
    assert_eq!(prep.open_items_mine[0].date, "2026-08-15");
    assert_eq!(prep.open_items_theirs.len(), 1);
  }

  #[test]
  fn blockers_concatenate_in_entry_order() {
    let mut first = entry_with_tags("2026-08-15", &[]);
    first.blockers = vec!["infra access".to_string()];
    let mut second = entry_with_tags("2026-08-08", &[]);
    second.blockers = vec!["review backlog".to_string()];

    let prep = compute_structured(&[first, second]);
    assert_eq!(prep.unresolved_blockers, vec!["infra access", "review backlog"]);
  }

  #[test]
  fn score_series_include_only_present_scores() {
    let mut scored = entry_with_tags("2026-08-15", &[]);
    scored.morale_score = Some(4);
    let unscored = entry_with_tags("2026-08-08", &[]);

    let prep = compute_structured(&[scored, unscored]);
    assert_eq!(
      prep.morale_scores,
      vec![ScorePoint { date: "2026-08-15".to_string(), score: 4 }]
    );
    assert!(prep.growth_scores.is_empty());
  }

  #[test]
  fn prompt_sections_follow_jira_presence() {
    let entries = [entry_with_tags("2026-08-15", &["morale"])];

    let without = build_prep_prompt("Jane Doe", &entries, None);
    assert!(without.contains("**Watch for**"));
    assert!(!without.contains("**Bring up**"));

    let ctx = JiraContext {
      assigned: vec![JiraTicket {
        key: "PROJ-1".to_string(),
        summary: "Fix login".to_string(),
        status: "In Progress".to_string(),
        flagged: true,
        epic_name: Some("Auth".to_string()),
      }],
      sprint_stats: Some(SprintStats::new(5, 3)),
      ..Default::default()
    };
    let with = build_prep_prompt("Jane Doe", &entries, Some(&ctx));
    assert!(with.contains("**Bring up**"));
    assert!(with.contains("PROJ-1: Fix login [In Progress, flagged] (Epic: Auth)"));
    assert!(with.contains("Sprint stats: 3/5 points completed"));
  }

  #[test]
  fn empty_jira_context_renders_two_section_prompt() {
    let entries = [entry_with_tags("2026-08-15", &[])];
    let prompt = build_prep_prompt("Jane Doe", &entries, Some(&JiraContext::default()));
    assert!(!prompt.contains("**Bring up**"));
    assert!(!prompt.contains("JIRA Activity"));
  }
}
