//! Chat-completion client - one blocking request per turn.
//!
//! No retry, no extra timeout beyond reqwest's defaults. A failure is
//! surfaced as an `Err(String)` that callers print in place of generated
//! content; the process itself keeps going.

use super::types::ChatRequest;
use async_trait::async_trait;

pub const MODEL: &str = "gpt-4o-mini";
const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Seam between the conversation loop and the hosted API, so tests can
/// script replies without a network.
#[async_trait]
pub trait ChatTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<String, String>;
}

pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Load `OPENAI_API_KEY` from the environment (populated from `.env` at
    /// startup). Absence is fatal at startup - the caller prints the error
    /// to stdout so the host shows it, then exits.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(
                "ERROR: OPENAI_API_KEY not found. Please ensure it is set in the config .env"
                    .to_string(),
            ),
        }
    }
}

#[async_trait]
impl ChatTransport for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, String> {
        let start = std::time::Instant::now();
        log::info!(
            "[LLM] Model: {}, messages: {}",
            request.model,
            request.messages.len()
        );

        let resp = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| format!("OpenAI API Error: {}", e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("OpenAI API Error: failed to read response: {}", e))?;

        if !status.is_success() {
            let snippet = truncate_chars(&body, 200);
            log::error!("[LLM] API returned {}: {}", status, snippet);
            return Err(format!("OpenAI API Error: {} — {}", status, snippet));
        }

        log::info!("[LLM] Response in {}ms", start.elapsed().as_millis());
        extract_completion_text(&body)
            .ok_or_else(|| "OpenAI API Error: could not extract completion text".to_string())
    }
}

/// First `max` characters of `text`. Error bodies echo request content,
/// which may be non-ASCII, so truncation must land on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pull `choices[0].message.content` out of a completions response.
fn extract_completion_text(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Remove one pair of wrapping double quotes, if present. Upstream models
/// sometimes quote the whole rewritten text.
pub fn strip_surrounding_quotes(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_completion_text() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hi there"}}]}"#;
        assert_eq!(extract_completion_text(body).unwrap(), "hi there");
    }

    #[test]
    fn extract_fails_on_empty_choices() {
        assert!(extract_completion_text(r#"{"choices": []}"#).is_none());
        assert!(extract_completion_text("not json").is_none());
    }

    #[test]
    fn error_snippet_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert_eq!(truncate_chars(&body, 200), body);
        let long = "é".repeat(300);
        assert_eq!(truncate_chars(&long, 200), "é".repeat(200));
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn strips_one_pair_of_quotes() {
        assert_eq!(strip_surrounding_quotes("\"quoted reply\""), "quoted reply");
        assert_eq!(strip_surrounding_quotes("plain reply"), "plain reply");
        // Inner quotes survive.
        assert_eq!(strip_surrounding_quotes("\"a \"b\" c\""), "a \"b\" c");
        // A single quote character is not a pair.
        assert_eq!(strip_surrounding_quotes("\""), "\"");
    }
}
