//! Seam to the external recognition service.
//!
//! The service is a black box: it receives document bytes and returns
//! either raw recognized text or a best-effort structured guess. All
//! transport concerns (HTTP, credentials, model choice) live behind this
//! trait; the pipeline only sees the payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::models::record::MediaKind;

/// What kind of document the service should read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// A single standalone receipt; one record expected.
    #[default]
    Receipt,
    /// A multi-line bank/card statement; an array of records expected.
    Statement,
}

/// Payload returned by one recognition call.
#[derive(Debug, Clone)]
pub enum RecognitionPayload {
    /// Raw recognized text, line-oriented. Scanned heuristically.
    Text(String),
    /// Best-effort structured guess, possibly fenced JSON. Cleaned up by
    /// the delegated extractor.
    Structured(String),
}

/// External recognition collaborator.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Read one document payload.
    async fn recognize(
        &self,
        bytes: &[u8],
        media: MediaKind,
        mode: ExtractionMode,
    ) -> Result<RecognitionPayload, ServiceError>;
}
