//! Remote metadata extraction
//!
//! The extractor is the one external collaborator: given a filename it
//! returns a guessed {title, author, subject} record or a failure. All
//! underlying causes (network, auth, malformed response) collapse into a
//! single `Extraction::Failure` so the pipeline can treat them uniformly.
//! The call is never retried; a failure marks the file Failed and the run
//! moves on.

use crate::config::Config;
use crate::plan::sanitize_component;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metadata guessed from a filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: String,
    pub author: String,
    /// Subject hint used for category inference, when the model provides one
    #[serde(default)]
    pub subject: Option<String>,
}

/// Outcome of one extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Success(ExtractedMetadata),
    Failure { reason: String },
}

impl Extraction {
    fn failure(reason: impl Into<String>) -> Self {
        Extraction::Failure {
            reason: reason.into(),
        }
    }
}

/// Pluggable extraction seam; production uses [`OpenRouterExtractor`],
/// tests use scripted mocks.
pub trait MetadataExtractor {
    fn extract(&self, filename: &str) -> Extraction;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Shape the model is asked to return
#[derive(Debug, Deserialize)]
struct ModelAnswer {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subject: Option<String>,
}

/// Extractor backed by an OpenRouter-compatible chat-completions endpoint
pub struct OpenRouterExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterExtractor {
    /// Create a new extractor from the run configuration
    pub fn new(config: &Config, api_key: String) -> Result<Self, String> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn build_prompt(filename: &str) -> String {
        format!(
            "I will give you the filename of an academic work. Use the data in \
             the filename to determine the full title of the work, its author's \
             surname, and a one-word subject area (for example \"quantum\", \
             \"algebra\", \"history\"). Return ONLY a JSON object with keys \
             \"title\", \"author\" and \"subject\". No code blocks, no other \
             text. Use empty strings if you cannot determine a value clearly. \
             Filename: {}",
            sanitize_component(filename)
        )
    }

    fn send_request(&self, prompt: String) -> Result<String, String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(format!("API error ({}): {}", status, text));
        }

        let body: ChatResponse = resp
            .json()
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        if let Some(err) = body.error {
            return Err(format!("API error: {}", err.message));
        }

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| "Response contains no choices".to_string())
    }
}

impl MetadataExtractor for OpenRouterExtractor {
    fn extract(&self, filename: &str) -> Extraction {
        debug!(filename, model = %self.model, "Querying extraction API");

        let content = match self.send_request(Self::build_prompt(filename)) {
            Ok(content) => content,
            Err(reason) => {
                warn!(filename, %reason, "Extraction request failed");
                return Extraction::failure(reason);
            }
        };

        let Some(json) = extract_json_object(&content) else {
            warn!(filename, "Model output contains no JSON object");
            return Extraction::failure("Model output contains no JSON object");
        };

        let answer: ModelAnswer = match serde_json::from_str(&json) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(filename, error = %e, "Failed to parse model output");
                return Extraction::failure(format!("Failed to parse model output: {}", e));
            }
        };

        if answer.title.trim().is_empty() || answer.author.trim().is_empty() {
            return Extraction::failure("Model could not determine title and author");
        }

        info!(
            filename,
            title = %answer.title,
            author = %answer.author,
            "Extracted metadata"
        );

        Extraction::Success(ExtractedMetadata {
            title: answer.title,
            author: answer.author,
            subject: answer.subject.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Extract the longest valid JSON object embedded in model output.
///
/// Models wrap answers in code fences or prose despite instructions, so the
/// text is brace-scanned and every balanced candidate is validated; the
/// longest valid one is usually the complete answer.
pub fn extract_json_object(text: &str) -> Option<String> {
    let text = text
        .replace("<|python_tag|>", "")
        .replace("<|start_header_id|>assistant<|end_header_id|>", "");
    let mut text = text.trim();

    // Strip markdown code fences
    if let Some(stripped) = text.strip_prefix("```") {
        let after_lang = stripped.find('\n').map(|i| &stripped[i + 1..]).unwrap_or(stripped);
        text = after_lang.strip_suffix("```").unwrap_or(after_lang).trim();
    }

    let bytes = text.as_bytes();
    let mut best: Option<&str> = None;
    let mut start = 0;

    while let Some(open) = text[start..].find('{').map(|i| start + i) {
        let mut depth = 1usize;
        let mut pos = open + 1;

        while depth > 0 && pos < bytes.len() {
            match bytes[pos] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }

        if depth == 0 {
            let candidate = &text[open..pos];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok()
                && best.is_none_or(|b| candidate.len() > b.len())
            {
                best = Some(candidate);
            }
        }

        start = pos.max(open + 1);
    }

    best.map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let out = extract_json_object(r#"{"title": "A", "author": "B"}"#).unwrap();
        assert_eq!(out, r#"{"title": "A", "author": "B"}"#);
    }

    #[test]
    fn test_extract_json_from_code_fence() {
        let text = "```json\n{\"title\": \"A\", \"author\": \"B\"}\n```";
        let out = extract_json_object(text).unwrap();
        assert!(out.contains("\"title\""));
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let text = "Sure! Here is the answer: {\"title\": \"A\", \"author\": \"B\"} Hope it helps.";
        let out = extract_json_object(text).unwrap();
        assert_eq!(out, "{\"title\": \"A\", \"author\": \"B\"}");
    }

    #[test]
    fn test_extract_json_picks_longest_valid() {
        let text = "{\"a\": 1} and then {\"title\": \"Long\", \"author\": \"Name\", \"subject\": \"x\"}";
        let out = extract_json_object(text).unwrap();
        assert!(out.contains("\"subject\""));
    }

    #[test]
    fn test_extract_json_none_when_absent() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{broken").is_none());
    }

    #[test]
    fn test_model_answer_tolerates_missing_fields() {
        let answer: ModelAnswer = serde_json::from_str("{\"title\": \"T\"}").unwrap();
        assert_eq!(answer.title, "T");
        assert_eq!(answer.author, "");
        assert!(answer.subject.is_none());
    }
}
