use crate::core::analyzer::{
    IngestError, IngestionOutcome, StatementAnalyzer, StatementFile, classify_envelope, readable,
};
use crate::core::model::AnalysisResponse;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Multipart field the analyzer reads the statement from.
const FILE_FIELD: &str = "file";

/// Where an error message may live in a failed response, most specific first.
const ERROR_MESSAGE_PATHS: &[&[&str]] = &[&["result", "error"], &["message"], &["detail"]];

/// Ingestion gateway that posts statements to the analyzer over HTTP.
pub struct HttpAnalyzer {
    endpoint: String,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpAnalyzer {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("finanalyze/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpAnalyzer {
            endpoint: endpoint.to_string(),
            client,
            timeout: None,
        })
    }

    /// Bounds the whole exchange, upload and response body included.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn network_failure(&self) -> IngestError {
        IngestError::Network {
            message: format!(
                "Network Error: Unable to connect to the analyzer. Please ensure the API is running at {}.",
                self.endpoint
            ),
        }
    }

    fn timeout_failure(&self, timeout: Duration) -> IngestError {
        IngestError::Timeout {
            message: format!(
                "The analyzer at {} did not respond within {timeout:?}.",
                self.endpoint
            ),
        }
    }

    async fn exchange(&self, file: &StatementFile) -> IngestionOutcome {
        let form = Form::new().part(FILE_FIELD, file_part(file));
        debug!("Posting {} ({} bytes) to {}", file.name, file.bytes.len(), self.endpoint);

        let response = match self.client.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Network request failed");
                return Err(self.network_failure());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, %status, "Failed to read analyzer response body");
                return Err(self.network_failure());
            }
        };
        debug!(%status, size = body.len(), "Received analyzer response");

        if !status.is_success() {
            return Err(http_failure(status, &body));
        }

        match serde_json::from_slice::<AnalysisResponse>(&body) {
            Ok(envelope) => classify_envelope(envelope),
            Err(e) => {
                warn!(error = %e, "Analyzer response is not a valid envelope");
                Err(IngestError::Logical {
                    message: format!("Failed to read analyzer response: {e}"),
                })
            }
        }
    }
}

#[async_trait]
impl StatementAnalyzer for HttpAnalyzer {
    #[instrument(skip_all, fields(file = %file.name))]
    async fn submit(&self, file: &StatementFile) -> IngestionOutcome {
        let Some(timeout) = self.timeout else {
            return self.exchange(file).await;
        };

        match tokio::time::timeout(timeout, self.exchange(file)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(?timeout, "Analyzer request timed out");
                Err(self.timeout_failure(timeout))
            }
        }
    }
}

fn file_part(file: &StatementFile) -> Part {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    part().mime_str(&file.mime_type).unwrap_or_else(|e| {
        debug!(mime = %file.mime_type, error = %e, "Ignoring unusable MIME type");
        part()
    })
}

/// Builds the error for a non-success status from whatever the body offers.
fn http_failure(status: StatusCode, body: &[u8]) -> IngestError {
    let code = status.as_u16();
    let message = match serde_json::from_slice::<Value>(body) {
        Ok(payload) => ERROR_MESSAGE_PATHS
            .iter()
            .find_map(|path| {
                path.iter()
                    .try_fold(&payload, |node, key| node.get(key))
                    .and_then(readable)
            })
            .unwrap_or_else(|| format!("Upload failed with status {code}")),
        Err(_) => match status.canonical_reason() {
            Some(reason) => format!("Server Error: {code} {reason}"),
            None => format!("Upload failed with status {code}"),
        },
    };
    debug!(code, %message, "Analyzer returned an error status");

    IngestError::Http {
        status: code,
        message,
    }
}
