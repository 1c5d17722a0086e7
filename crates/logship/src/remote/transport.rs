//! HTTP delivery of batched records to the collector endpoint.
//!
//! One POST per flush attempt: the batch is serialized as a JSON array,
//! optionally gzip-compressed, and sent with the configured static headers
//! and a bounded timeout. The outcome is deliberately coarse — any HTTP
//! response counts as delivered, whatever its status; only transport-level
//! failures (connect errors, resets, timeouts) count as failures and feed
//! the retry loop. Retry itself lives in the flush service, never here.

use std::io::{self, Write};
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::record::EventRecord;

/// Failure of a single delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("remote endpoint is not configured")]
    NotConfigured,
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(reqwest::Error),
    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// HTTP client plus the parsed target for one collector endpoint.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    target: Option<Url>,
    headers: HeaderMap,
    timeout: Duration,
    gzip: bool,
}

impl Transport {
    /// Builds a transport from the remote configuration.
    ///
    /// The URL is parsed once here. A malformed URL is a permanent local
    /// misconfiguration, not a transient fault: the transport comes up
    /// unconfigured and every flush is silently skipped, so a bad config
    /// value can never crash the host or spin the retry loop.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        let target = match Url::parse(&config.url) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(url = %config.url, error = %err, "invalid remote URL, remote delivery disabled");
                None
            }
        };

        Transport {
            client: reqwest::Client::new(),
            target,
            headers: build_headers(config),
            timeout: config.timeout(),
            gzip: config.gzip,
        }
    }

    /// Whether a valid target URL was configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }

    /// Issues exactly one POST carrying `batch` as a JSON array.
    pub async fn send(&self, batch: &[EventRecord]) -> Result<(), DeliveryError> {
        let Some(url) = &self.target else {
            return Err(DeliveryError::NotConfigured);
        };

        let payload = serde_json::to_vec(batch)?;
        let (body, encoding) = if self.gzip {
            match gzip_encode(&payload) {
                Ok(compressed) => (compressed, Some("gzip")),
                Err(err) => {
                    // Ship uncompressed rather than dropping the batch.
                    debug!(error = %err, "gzip compression failed, sending identity body");
                    (payload, None)
                }
            }
        } else {
            (payload, None)
        };

        let mut request = self
            .client
            .post(url.clone())
            .timeout(self.timeout)
            .headers(self.headers.clone())
            .header(CONTENT_LENGTH, body.len().to_string());
        if let Some(encoding) = encoding {
            request = request.header(CONTENT_ENCODING, encoding);
        }

        match request.body(body).send().await {
            // Status codes and bodies are not inspected: reaching the
            // collector is the delivery contract.
            Ok(_response) => Ok(()),
            Err(err) if err.is_timeout() => Err(DeliveryError::Timeout),
            Err(err) => Err(DeliveryError::Transport(err)),
        }
    }
}

fn build_headers(config: &RemoteConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "invalid static header skipped"),
        }
    }
    headers
}

fn gzip_encode(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::log_level::LogLevel;
    use std::io::Read;

    fn config_with_url(url: &str) -> RemoteConfig {
        RemoteConfig {
            url: url.to_string(),
            ..RemoteConfig::default()
        }
    }

    fn record(message: &str) -> EventRecord {
        EventRecord::new(LogLevel::Info, None, message.to_string(), None)
    }

    #[test]
    fn valid_url_configures_the_transport() {
        let transport = Transport::new(&config_with_url("https://collector.example.com/v1/logs"));
        assert!(transport.is_configured());
    }

    #[test]
    fn malformed_url_leaves_the_transport_unconfigured() {
        let transport = Transport::new(&config_with_url("::not a url"));
        assert!(!transport.is_configured());

        let transport = Transport::new(&config_with_url(""));
        assert!(!transport.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_send_fails_without_a_request() {
        let transport = Transport::new(&config_with_url("::not a url"));
        let outcome = transport.send(&[record("a")]).await;
        assert!(matches!(outcome, Err(DeliveryError::NotConfigured)));
    }

    #[test]
    fn static_headers_are_applied_and_bad_ones_skipped() {
        let mut config = config_with_url("https://collector.example.com/v1/logs");
        config
            .headers
            .insert("authorization".to_string(), "Bearer token".to_string());
        config
            .headers
            .insert("bad header name".to_string(), "x".to_string());

        let transport = Transport::new(&config);
        assert_eq!(
            transport.headers.get("authorization").unwrap(),
            "Bearer token"
        );
        assert_eq!(transport.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(transport.headers.len(), 2);
    }

    #[test]
    fn gzip_round_trips_the_json_array() {
        let batch = vec![record("a"), record("b")];
        let payload = serde_json::to_vec(&batch).unwrap();

        let compressed = gzip_encode(&payload).unwrap();
        assert_ne!(compressed, payload);

        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, payload);

        let parsed: Vec<EventRecord> = serde_json::from_slice(&decompressed).unwrap();
        assert_eq!(parsed, batch);
    }
}
