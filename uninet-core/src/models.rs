//! Fleet data model: machine records and the two snapshot payloads.
//!
//! Wire names follow the dashboard API (`lastSeen`, `inUse`, `examMode`). Timestamps are
//! emitted as RFC 3339 and accepted either as RFC 3339 or as offset-less ISO-8601, which
//! is what the Python status server used to send.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Carrera used when a roster entry does not carry one.
pub const DEFAULT_CARRERA: &str = "5010";

/// Operational state of a lab PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineStatus {
    /// Reachable, nobody logged in.
    Online,
    /// Down or unreachable.
    Offline,
    /// Reachable with an active user session.
    InUse,
    /// Locked down by the exam firewall profile.
    ExamMode,
}

impl MachineStatus {
    pub const ALL: [MachineStatus; 4] = [
        MachineStatus::Online,
        MachineStatus::Offline,
        MachineStatus::InUse,
        MachineStatus::ExamMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MachineStatus::Online => "online",
            MachineStatus::Offline => "offline",
            MachineStatus::InUse => "inUse",
            MachineStatus::ExamMode => "examMode",
        }
    }

    /// A session or exam profile is only kept while the machine answers.
    pub fn is_session(self) -> bool {
        matches!(self, MachineStatus::InUse | MachineStatus::ExamMode)
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One PC known to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "ipv4_literal")]
    pub ip: String,
    #[serde(default = "offline")]
    pub status: MachineStatus,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, with = "lenient_instant")]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(default = "default_lab")]
    pub lab: String,
}

impl Machine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
            status: MachineStatus::Offline,
            user: None,
            last_seen: None,
            lab: default_lab(),
        }
    }

    pub fn with_status(mut self, status: MachineStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_lab(mut self, carrera: &str) -> Self {
        self.lab = lab_key(carrera);
        self
    }

    /// Moves `last_seen` forward, never backwards.
    pub(crate) fn observe(&mut self, seen: Option<OffsetDateTime>) {
        if let Some(seen) = seen {
            self.last_seen = Some(self.last_seen.map_or(seen, |prev| prev.max(seen)));
        }
    }
}

/// Lightweight liveness datum from the 2s probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessEntry {
    #[serde(deserialize_with = "ipv4_literal")]
    pub ip: String,
    pub alive: bool,
    #[serde(default, with = "lenient_instant", skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<OffsetDateTime>,
    /// Only set when the source explicitly reports a state other than up/down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MachineStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrera: Option<String>,
}

impl LivenessEntry {
    pub fn new(ip: impl Into<String>, alive: bool) -> Self {
        Self {
            ip: ip.into(),
            alive,
            last_seen: None,
            status: None,
            carrera: None,
        }
    }

    pub fn seen_at(mut self, at: OffsetDateTime) -> Self {
        self.last_seen = Some(at);
        self
    }
}

/// Full record from the 10s roster fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "ipv4_literal")]
    pub ip: String,
    pub status: MachineStatus,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, with = "lenient_instant")]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrera: Option<String>,
}

impl RosterEntry {
    /// Record inserted into the registry for a previously unseen PC.
    pub fn to_machine(&self) -> Machine {
        Machine {
            id: self.id.clone(),
            name: self.name.clone(),
            ip: self.ip.clone(),
            status: self.status,
            user: self.user.clone(),
            last_seen: self.last_seen,
            lab: lab_key(self.carrera.as_deref().unwrap_or(DEFAULT_CARRERA)),
        }
    }
}

/// Sector/lab grouping key for a carrera code.
pub fn lab_key(carrera: &str) -> String {
    format!("lab-{carrera}")
}

fn default_lab() -> String {
    lab_key(DEFAULT_CARRERA)
}

fn offline() -> MachineStatus {
    MachineStatus::Offline
}

/// Parses RFC 3339 first, then offset-less ISO-8601 assumed to be UTC.
pub fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

fn ipv4_literal<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    raw.trim()
        .parse::<Ipv4Addr>()
        .map(|ip| ip.to_string())
        .map_err(|_| serde::de::Error::custom(format!("not an IPv4 address: {raw:?}")))
}

mod lenient_instant {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => {
                let text = at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                s.serialize_some(&text)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) => super::parse_instant(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn status_uses_dashboard_wire_names() {
        assert_eq!(serde_json::to_value(MachineStatus::InUse).unwrap(), json!("inUse"));
        assert_eq!(serde_json::to_value(MachineStatus::ExamMode).unwrap(), json!("examMode"));
        let parsed: MachineStatus = serde_json::from_value(json!("offline")).unwrap();
        assert_eq!(parsed, MachineStatus::Offline);
        assert!(serde_json::from_value::<MachineStatus>(json!("sleeping")).is_err());
    }

    #[test]
    fn liveness_entry_accepts_python_timestamps() {
        let entry: LivenessEntry = serde_json::from_value(json!({
            "ip": "172.29.2.37",
            "alive": true,
            "lastSeen": "2025-03-01T08:30:00"
        }))
        .unwrap();
        assert_eq!(entry.last_seen, Some(datetime!(2025-03-01 08:30:00 UTC)));

        let entry: LivenessEntry = serde_json::from_value(json!({
            "ip": "172.29.2.37",
            "alive": false,
            "lastSeen": null
        }))
        .unwrap();
        assert_eq!(entry.last_seen, None);
    }

    #[test]
    fn records_with_bad_addresses_are_rejected() {
        let bad = serde_json::from_value::<LivenessEntry>(json!({"ip": "pc-01.lab", "alive": true}));
        assert!(bad.is_err());
        let bad = serde_json::from_value::<RosterEntry>(json!({
            "id": "pc-01", "name": "PC-LAB-01", "ip": "300.1.1.1", "status": "online"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn roster_entry_defaults_lab_to_5010() {
        let entry: RosterEntry = serde_json::from_value(json!({
            "id": "pc-07", "name": "PC-LAB-07", "ip": "10.0.0.7",
            "status": "inUse", "user": "alumno01", "lastSeen": "2025-03-01T08:30:00Z"
        }))
        .unwrap();
        let machine = entry.to_machine();
        assert_eq!(machine.lab, "lab-5010");
        assert_eq!(machine.status, MachineStatus::InUse);
        assert_eq!(machine.user.as_deref(), Some("alumno01"));
    }

    #[test]
    fn machine_serializes_last_seen_as_rfc3339() {
        let mut machine = Machine::new("pc-01", "PC-LAB-01", "10.0.0.1");
        machine.last_seen = Some(datetime!(2025-03-01 08:30:00 UTC));
        let value = serde_json::to_value(&machine).unwrap();
        assert_eq!(value["lastSeen"], json!("2025-03-01T08:30:00Z"));
        assert_eq!(value["status"], json!("offline"));
    }

    #[test]
    fn observe_never_moves_backwards() {
        let mut machine = Machine::new("pc-01", "PC-LAB-01", "10.0.0.1");
        machine.observe(Some(datetime!(2025-03-01 08:30:00 UTC)));
        machine.observe(Some(datetime!(2025-03-01 08:00:00 UTC)));
        machine.observe(None);
        assert_eq!(machine.last_seen, Some(datetime!(2025-03-01 08:30:00 UTC)));
    }
}
