//! reqwest implementation of [`NavigationBackend`].

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::sse::SseDecoder;
use super::{decode_route_info, InstructionEvent, InstructionStream, NavigationBackend, PositionUpdate};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::Position;
use crate::route::RouteSummary;

/// HTTP client for the navigation backend.
///
/// One-shot requests carry a per-request timeout. The instruction stream
/// has none: it stays open for the whole trip.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid backend base_url '{base_url}': {e}"),
        })?;

        let client = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Create a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.backend.base_url.clone(), config.request_timeout())
    }

    /// Base URL requests are sent to, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl NavigationBackend for HttpBackend {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn route_info(&self, start: Position, end: &str) -> Result<RouteSummary> {
        let start = start.to_string();
        let response = self
            .client
            .get(self.url("route_info"))
            .query(&[("start", start.as_str()), ("end", end)])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Route info response");

        decode_route_info(status, &body)
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn open_stream(&self, start: Position, end: &str) -> Result<InstructionStream> {
        let start = start.to_string();
        let response = self
            .client
            .get(self.url("stream"))
            .query(&[("start", start.as_str()), ("end", end)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                "stream request failed".to_string()
            } else {
                body
            };
            return Err(Error::backend(status.as_u16(), message));
        }
        debug!("Instruction stream opened");

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .into_iter()
                    .filter_map(|data| parse_event(&data))
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(Error::stream(e.to_string()))],
            })
            .flat_map(futures::stream::iter);

        Ok(events.boxed())
    }

    async fn update_position(&self, position: Position) -> Result<()> {
        let body = PositionUpdate {
            lat: position.lat,
            lon: position.lon,
        };
        let response = self
            .client
            .post(self.url("update_position"))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::backend(status.as_u16(), "position update rejected"));
        }
        Ok(())
    }
}

/// Parse one event payload; malformed payloads are logged and skipped.
fn parse_event(data: &str) -> Option<Result<InstructionEvent>> {
    match serde_json::from_str::<InstructionEvent>(data) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            warn!(error = %e, data, "Skipping malformed instruction event");
            None
        }
    }
}
