//! HTTP client for the liveness and roster endpoints.
//!
//! One GET per call, no retry. A failed call is an `Err(PollError)`; an empty array is
//! a valid `Ok(vec![])`. Records that fail to decode are skipped one by one so a single
//! bad row cannot blank the dashboard.

use crate::models::{LivenessEntry, RosterEntry};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("status source answered {0}")]
    Server(StatusCode),
    #[error("malformed snapshot body: {0}")]
    Decode(String),
}

/// Stateless status source. Clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct StatusSource {
    client: Client,
}

impl Default for StatusSource {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl StatusSource {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("uninet-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("http client builder failed ({e}), using defaults");
                Client::new()
            });
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Lightweight up/down probe.
    pub async fn poll_liveness(&self, endpoint: &str) -> Result<Vec<LivenessEntry>, PollError> {
        self.fetch(self.client.get(endpoint)).await
    }

    /// Full roster, optionally scoped to one carrera.
    pub async fn poll_roster(
        &self,
        endpoint: &str,
        carrera: Option<&str>,
    ) -> Result<Vec<RosterEntry>, PollError> {
        let mut request = self.client.get(endpoint);
        if let Some(carrera) = carrera {
            request = request.query(&[("carrera", carrera)]);
        }
        self.fetch(request).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, PollError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Server(status));
        }
        let body = response.bytes().await?;
        decode_records(&body)
    }
}

/// Decodes a JSON array, skipping records that do not fit `T`.
pub fn decode_records<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, PollError> {
    let rows: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| PollError::Decode(e.to_string()))?;

    let total = rows.len();
    let records: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(row = idx, "skipping malformed status record: {e}");
                None
            }
        })
        .collect();

    debug!(total, kept = records.len(), "status snapshot decoded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MachineStatus;
    use serde_json::json;
    use time::macros::datetime;
    use time::OffsetDateTime;
    use uninet_devkit::{LivenessBuilder, MockStatusServer, RosterBuilder};

    #[test]
    fn one_bad_record_does_not_discard_the_snapshot() {
        let body = json!([
            {"ip": "10.0.0.1", "alive": true},
            {"ip": "not-an-ip", "alive": true},
            {"alive": false},
            {"ip": "10.0.0.2", "alive": false, "lastSeen": "yesterday"},
            {"ip": "10.0.0.3", "alive": false}
        ]);
        let entries: Vec<LivenessEntry> = decode_records(body.to_string().as_bytes()).unwrap();
        let ips: Vec<_> = entries.iter().map(|e| e.ip.as_str()).collect();
        assert_eq!(ips, ["10.0.0.1", "10.0.0.3"]);
    }

    #[test]
    fn non_array_body_is_a_decode_error() {
        let err = decode_records::<LivenessEntry>(br#"{"error": "busy"}"#).unwrap_err();
        assert!(matches!(err, PollError::Decode(_)));
        let err = decode_records::<LivenessEntry>(b"<html>").unwrap_err();
        assert!(matches!(err, PollError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_snapshot_is_not_a_failure() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(json!([]));

        let entries = StatusSource::default()
            .poll_liveness(&server.liveness_url())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn liveness_poll_decodes_entries() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(
            LivenessBuilder::new()
                .alive("172.29.2.37")
                .down("172.29.157.94")
                .seen("172.29.177.20", true, "2025-03-01T08:30:00")
                .build(),
        );

        let entries = StatusSource::default()
            .poll_liveness(&server.liveness_url())
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].alive);
        assert!(!entries[1].alive);
        assert!(entries[2].last_seen.is_some());
        assert_eq!(server.hits("/status"), 1);
    }

    #[tokio::test]
    async fn server_errors_are_reported_as_unavailable() {
        let server = MockStatusServer::start().await.unwrap();
        server.fail_with(503);

        let err = StatusSource::default()
            .poll_liveness(&server.liveness_url())
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Server(StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[tokio::test]
    async fn unreachable_source_is_a_transport_error() {
        let server = MockStatusServer::start().await.unwrap();
        let url = server.liveness_url();
        server.shutdown().await;

        let err = StatusSource::new(Duration::from_millis(500))
            .poll_liveness(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Transport(_)));
    }

    #[tokio::test]
    async fn roster_poll_scopes_by_carrera() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_roster(
            RosterBuilder::new()
                .pc("pc-01", "PC-LAB-01", "10.0.0.1", "inUse")
                .user("alumno01")
                .carrera("5003")
                .pc("pc-02", "PC-LAB-02", "10.0.0.2", "online")
                .build(),
        );

        let entries = StatusSource::default()
            .poll_roster(&server.roster_url(), Some("5003"))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, MachineStatus::InUse);
        assert_eq!(entries[0].user.as_deref(), Some("alumno01"));
        assert_eq!(entries[0].carrera.as_deref(), Some("5003"));
        assert_eq!(server.last_query("/roster").as_deref(), Some("carrera=5003"));
    }

    #[tokio::test]
    async fn roster_poll_without_carrera_is_unscoped() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_roster(
            RosterBuilder::new()
                .pc("pc-01", "PC-LAB-01", "10.0.0.1", "examMode")
                .last_seen("2025-03-01T08:30:00Z")
                .build(),
        );

        let entries = StatusSource::default()
            .poll_roster(&server.roster_url(), None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, MachineStatus::ExamMode);
        assert_eq!(entries[0].last_seen, Some(datetime!(2025-03-01 08:30:00 UTC)));
        assert_eq!(server.hits("/roster"), 1);
        assert_eq!(server.last_query("/roster"), None);
    }

    #[tokio::test]
    async fn relative_last_seen_is_decoded_as_utc() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(
            LivenessBuilder::new()
                .seen_ago("10.0.0.1", false, Duration::from_secs(90))
                .build(),
        );

        let entries = StatusSource::default()
            .poll_liveness(&server.liveness_url())
            .await
            .unwrap();
        let seen = entries[0].last_seen.unwrap();
        let age = OffsetDateTime::now_utc() - seen;
        assert!(age >= time::Duration::seconds(89) && age < time::Duration::seconds(120));
    }
}
