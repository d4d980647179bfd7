//! Hosted vision-model client implementing the recognition seam.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use defter_core::{ExtractionMode, MediaKind, RecognitionPayload, RecognitionService, ServiceError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const RECEIPT_PROMPT: &str = "You are an expert accounting assistant. Analyze this receipt image.\n\
Extract the following as pure JSON, with no commentary:\n\
{\"merchant_name\": string, \"receipt_number\": string or null,\n \
\"date\": \"DD.MM.YYYY\", \"category\": one of food|transport_fuel|stationery|technology|lodging|other,\n \
\"total_amount\": \"number only, e.g. 150.50\", \"tax_amount\": \"number only, 0 if no tax shown\"}\n\
Find the grand total, not a sub-total. Tax may appear as TOPKDV or as a sum of percentage groups.";

const STATEMENT_PROMPT: &str = "You are an expert accounting assistant. Analyze this bank or card statement page.\n\
Return a pure JSON array, one object per transaction line, each shaped as:\n\
{\"merchant_name\": string, \"receipt_number\": null, \"date\": \"DD.MM.YYYY\",\n \
\"category\": one of food|transport_fuel|stationery|technology|lodging|other,\n \
\"total_amount\": \"number only\", \"tax_amount\": \"0\"}\n\
No commentary, no markdown.";

/// Recognition client for a Gemini-style generateContent endpoint.
pub struct GeminiRecognizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiRecognizer {
    /// Build a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable is not set"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        })
    }

    fn prompt_for(mode: ExtractionMode) -> &'static str {
        match mode {
            ExtractionMode::Receipt => RECEIPT_PROMPT,
            ExtractionMode::Statement => STATEMENT_PROMPT,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl RecognitionService for GeminiRecognizer {
    async fn recognize(
        &self,
        bytes: &[u8],
        media: MediaKind,
        mode: ExtractionMode,
    ) -> Result<RecognitionPayload, ServiceError> {
        let url = format!("{API_BASE}/{}:generateContent?key={}", self.model, self.api_key);

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": Self::prompt_for(mode) },
                    { "inline_data": {
                        "mime_type": media.as_mime(),
                        "data": BASE64_STANDARD.encode(bytes),
                    }},
                ],
            }],
            "generationConfig": { "temperature": 0.0 },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            return Err(ServiceError::Failed(format!("HTTP {status}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Failed(format!("malformed response envelope: {e}")))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        debug!(model = %self.model, bytes = text.len(), "recognition response");

        // The model answers with a structured guess; fence stripping and
        // schema cleanup happen in the delegated extractor
        Ok(RecognitionPayload::Structured(text))
    }
}
