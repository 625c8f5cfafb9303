//! HTTP client for the upstream document-AI service.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docextract_core::{
    DocExtractConfig, Error, Extraction, ExtractionRequest, Extractor, Result,
};
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::normalize;
use crate::probe::PROBE_SEQUENCE;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Final upstream answer after walking the probe sequence.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: String,
    /// Number of upstream calls issued, 1..=5.
    pub attempts: usize,
}

/// Forwards one file at a time to the upstream service and normalizes the reply.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    endpoint: String,
}

impl Gateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn from_config(config: &DocExtractConfig) -> Result<Self> {
        Self::new(config.upstream_url.clone(), config.upstream_timeout)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one extraction: validate, probe, map status, normalize.
    pub async fn extract(&self, request: ExtractionRequest) -> Result<Extraction> {
        validate(&request)?;

        let encoded = STANDARD.encode(&request.file_bytes);
        let reply = self.probe(&request, &encoded).await?;

        info!(
            "Upstream answered {} for {} after {} attempt(s)",
            reply.status, request.file_name, reply.attempts
        );

        let data = map_reply(reply)?;
        let (extracted_text, entities) = normalize::normalize(&data);

        Ok(Extraction {
            data,
            extracted_text,
            entities,
            file_size: request.file_size(),
            processed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Walk the probe table, stopping at the first response that is not a 401.
    pub async fn probe(&self, request: &ExtractionRequest, encoded: &str) -> Result<UpstreamReply> {
        let mut attempts = 0;
        let mut last_status = StatusCode::UNAUTHORIZED;
        let mut last_body = String::new();

        for step in PROBE_SEQUENCE.iter() {
            attempts += 1;
            let builder = step.apply(
                self.client.post(&self.endpoint),
                &request.credential,
                encoded,
                &request.file_name,
                &request.file_type,
            );

            let response = builder
                .send()
                .await
                .map_err(|e| transport_error(step.name, e))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| transport_error(step.name, e))?;

            debug!("Probe {} ({}) -> {}", attempts, step.name, status);

            last_status = status;
            last_body = body;
            if status != StatusCode::UNAUTHORIZED {
                break;
            }
        }

        Ok(UpstreamReply {
            status: last_status,
            body: last_body,
            attempts,
        })
    }
}

impl Extractor for Gateway {
    fn extract(
        &self,
        request: ExtractionRequest,
    ) -> impl std::future::Future<Output = Result<Extraction>> + Send {
        Gateway::extract(self, request)
    }
}

fn validate(request: &ExtractionRequest) -> Result<()> {
    if request.file_bytes.is_empty() {
        return Err(Error::InvalidInput("No file provided".into()));
    }
    if request.credential.trim().is_empty() {
        return Err(Error::InvalidInput("API key is required".into()));
    }
    if HeaderValue::from_str(&request.credential).is_err() {
        return Err(Error::InvalidInput(
            "API key contains characters not allowed in an HTTP header".into(),
        ));
    }
    Ok(())
}

/// Strip the request URL before the error is formatted: probe steps that
/// carry the key as a query parameter would otherwise leak it.
fn transport_error(step: &str, e: reqwest::Error) -> Error {
    let e = e.without_url();
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else {
        "request"
    };
    warn!("Upstream request failed at probe {} ({})", step, kind);
    Error::Transport(e.to_string())
}

/// Map the final upstream status onto the error taxonomy, or parse the payload.
fn map_reply(reply: UpstreamReply) -> Result<serde_json::Value> {
    match reply.status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
        StatusCode::FORBIDDEN => Err(Error::Forbidden),
        status if !status.is_success() => Err(Error::Upstream {
            status: status.as_u16(),
            body: reply.body,
        }),
        _ => Ok(serde_json::from_str(&reply.body)
            .unwrap_or(serde_json::Value::String(reply.body))),
    }
}
