use crate::config::HostConf;
use crate::state::Sighting;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// One row of `GET /api/status`.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub alive: bool,
    pub last_seen: Option<String>, // RFC3339, null si jamais vu
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrera: Option<String>,
}

impl HostStatus {
    pub fn new(host: &HostConf, sighting: Sighting) -> Self {
        Self {
            id: host.id.clone(),
            name: host.name.clone(),
            ip: host.ip.to_string(),
            alive: sighting.alive,
            last_seen: sighting.last_seen.and_then(rfc3339),
            carrera: host.carrera.clone(),
        }
    }
}

/// `GET /api/ping/{ip}`
#[derive(Debug, Serialize)]
pub struct PingReport {
    pub ip: String,
    pub alive: bool,
    pub timestamp: String,
}

pub fn rfc3339(at: OffsetDateTime) -> Option<String> {
    at.format(&Rfc3339).ok()
}

pub fn now_rfc3339() -> String {
    rfc3339(OffsetDateTime::now_utc()).unwrap_or_default()
}
