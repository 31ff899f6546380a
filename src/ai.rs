//! Text-generation capability: a single `complete(prompt) -> text` call
//! against Anthropic or OpenAI, selected from the environment.

use serde::Deserialize;

use crate::config::non_empty_env;
use crate::error::{Error, Result};

const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const OPENAI_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 1000;

/// A configured generation provider. Anthropic wins when both keys are
/// set.
#[derive(Clone)]
pub enum Provider {
  Anthropic { key: String },
  OpenAi { key: String },
}

#[derive(Deserialize)]
struct AnthropicResponse {
  #[serde(default)]
  content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
  #[serde(default)]
  text: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
  #[serde(default)]
  choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
  message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
  #[serde(default)]
  content: String,
}

impl Provider {
  /// Pick a provider from ANTHROPIC_API_KEY / OPENAI_API_KEY. None when
  /// neither is set; callers degrade to structured-only output.
  pub fn from_env() -> Option<Self> {
    if let Some(key) = non_empty_env("ANTHROPIC_API_KEY") {
      return Some(Provider::Anthropic { key });
    }
    if let Some(key) = non_empty_env("OPENAI_API_KEY") {
      return Some(Provider::OpenAi { key });
    }
    None
  }

  pub fn name(&self) -> &'static str {
    match self {
      Provider::Anthropic { .. } => "anthropic",
      Provider::OpenAi { .. } => "openai",
    }
  }

  /// Run a single completion. No retries, no streaming.
  pub async fn complete(&self, http: &reqwest::Client, prompt: &str) -> Result<String> {
    match self {
      Provider::Anthropic { key } => {
        let body = serde_json::json!({
          "model": ANTHROPIC_MODEL,
          "max_tokens": MAX_TOKENS,
          "messages": [{"role": "user", "content": prompt}],
        });

        let resp = http
          .post("https://api.anthropic.com/v1/messages")
          .header("x-api-key", key)
          .header("anthropic-version", "2023-06-01")
          .json(&body)
          .send()
          .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
          return Err(Error::Request {
            status: status.as_u16(),
            body: text,
          });
        }

        let parsed: AnthropicResponse = serde_json::from_str(&text)
          .map_err(|e| Error::Parse(format!("failed to parse anthropic response: {}", e)))?;

        Ok(
          parsed
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .concat(),
        )
      }
      Provider::OpenAi { key } => {
        let body = serde_json::json!({
          "model": OPENAI_MODEL,
          "max_tokens": MAX_TOKENS,
          "messages": [{"role": "user", "content": prompt}],
        });

        let resp = http
          .post("https://api.openai.com/v1/chat/completions")
          .bearer_auth(key)
          .json(&body)
          .send()
          .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
          return Err(Error::Request {
            status: status.as_u16(),
            body: text,
          });
        }

        let parsed: OpenAiResponse = serde_json::from_str(&text)
          .map_err(|e| Error::Parse(format!("failed to parse openai response: {}", e)))?;

        parsed
          .choices
          .into_iter()
          .next()
          .map(|c| c.message.content)
          .ok_or_else(|| Error::Parse("openai returned no choices".to_string()))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anthropic_content_blocks_concatenate() {
    let parsed: AnthropicResponse =
      serde_json::from_str(r#"{"content": [{"text": "Hello "}, {"text": "world"}]}"#).unwrap();
    let joined: String = parsed.content.into_iter().map(|c| c.text).collect();
    assert_eq!(joined, "Hello world");
  }

  #[test]
  fn openai_empty_choices_is_parse_error_shape() {
    let parsed: OpenAiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
    assert!(parsed.choices.is_empty());
  }
}
