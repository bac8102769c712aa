//! Ingestion contract: sending a statement to an analyzer and classifying the reply.

use crate::core::model::{AnalysisRecord, AnalysisResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, info};

/// File types the analyzer understands. Advisory only: other files are still sent.
pub const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("csv", "text/csv"),
];

const OCTET_STREAM: &str = "application/octet-stream";

/// Message used when a failed analysis carries no message of its own.
pub const ANALYSIS_FAILED: &str = "Failed to analyze statement";

/// An opaque statement blob with the name and MIME type it is uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a statement from disk, deriving its MIME type from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read statement file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Statement path has no file name: {}", path.display()))?;
        let mime_type = mime_for_name(&name).unwrap_or(OCTET_STREAM);
        debug!(%name, %mime_type, size = bytes.len(), "Loaded statement file");

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn is_accepted_type(&self) -> bool {
        mime_for_name(&self.name).is_some()
    }
}

fn mime_for_name(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Why an upload did not produce an analysis.
///
/// `Display` is the user-facing message, meant to be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The analyzer answered with a success status but could not analyze the file.
    #[error("{message}")]
    Logical { message: String },
    /// The analyzer answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The analyzer was never reached.
    #[error("{message}")]
    Network { message: String },
    /// The analyzer did not answer within the configured timeout.
    #[error("{message}")]
    Timeout { message: String },
    /// The caller abandoned the upload before it finished.
    #[error("Upload cancelled")]
    Cancelled,
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Logical { .. } => "logical",
            IngestError::Http { .. } => "http",
            IngestError::Network { .. } => "network",
            IngestError::Timeout { .. } => "timeout",
            IngestError::Cancelled => "cancelled",
        }
    }
}

pub type IngestionOutcome = std::result::Result<AnalysisRecord, IngestError>;

/// Resolves when the caller wants the in-flight upload abandoned.
pub type CancelSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

#[async_trait]
pub trait StatementAnalyzer: Send + Sync {
    /// Uploads `file` once and classifies the reply. Never retries.
    async fn submit(&self, file: &StatementFile) -> IngestionOutcome;

    /// Like [`submit`](Self::submit), but gives up with
    /// [`IngestError::Cancelled`] as soon as `cancel` resolves.
    async fn submit_with_cancel(
        &self,
        file: &StatementFile,
        cancel: CancelSignal,
    ) -> IngestionOutcome {
        tokio::select! {
            biased;
            _ = cancel => {
                info!(file = %file.name, "Upload cancelled");
                Err(IngestError::Cancelled)
            }
            outcome = self.submit(file) => outcome,
        }
    }
}

/// JavaScript-style truthiness, which is what the analyzer's clients have
/// always used to decide whether a field is "set".
pub(crate) fn is_set(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}

/// Renders a set value as a message; structured values are serialized.
pub(crate) fn readable(value: &Value) -> Option<String> {
    if !is_set(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Classifies a decoded success-status envelope.
///
/// A `result` is only accepted when `success` is 1. Otherwise the message is
/// taken from `result.error`, then `message`, then a fixed fallback.
pub fn classify_envelope(envelope: AnalysisResponse) -> IngestionOutcome {
    if envelope.is_success() {
        if let Some(result) = envelope.result.as_ref().filter(|r| is_set(r)) {
            return Ok(AnalysisRecord::from_value(result.clone()));
        }
    }

    let message = envelope
        .result
        .as_ref()
        .and_then(|result| result.get("error"))
        .and_then(readable)
        .or_else(|| envelope.message.filter(|m| !m.is_empty()))
        .unwrap_or_else(|| ANALYSIS_FAILED.to_string());
    debug!(success = envelope.success, %message, "Analyzer reported a logical failure");

    Err(IngestError::Logical { message })
}
