/*!
Builders de snapshots JSON (liveness et roster)

Produisent des `serde_json::Value` au format des endpoints de statut, pour
alimenter `MockStatusServer` sans dépendre des types du coeur.
*/

use serde_json::{json, Map, Value};
use std::time::Duration;

/// Snapshot liveness: `[{ip, alive, lastSeen?}]`
#[derive(Debug, Default, Clone)]
pub struct LivenessBuilder {
    entries: Vec<Value>,
}

impl LivenessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alive(mut self, ip: &str) -> Self {
        self.entries.push(json!({"ip": ip, "alive": true}));
        self
    }

    pub fn down(mut self, ip: &str) -> Self {
        self.entries.push(json!({"ip": ip, "alive": false}));
        self
    }

    /// Entrée avec un `lastSeen` explicite (RFC 3339 ou ISO sans offset).
    pub fn seen(mut self, ip: &str, alive: bool, last_seen: &str) -> Self {
        self.entries
            .push(json!({"ip": ip, "alive": alive, "lastSeen": last_seen}));
        self
    }

    /// Entrée vue il y a `ago`, horodatée en UTC.
    pub fn seen_ago(self, ip: &str, alive: bool, ago: Duration) -> Self {
        let ago = chrono::Duration::from_std(ago).unwrap_or_else(|_| chrono::Duration::zero());
        let at = (chrono::Utc::now() - ago).to_rfc3339();
        self.seen(ip, alive, &at)
    }

    pub fn build(self) -> Value {
        Value::Array(self.entries)
    }
}

/// Snapshot roster: `[{id, name, ip, status, user?, carrera?}]`
#[derive(Debug, Default, Clone)]
pub struct RosterBuilder {
    pcs: Vec<Map<String, Value>>,
}

impl RosterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pc(mut self, id: &str, name: &str, ip: &str, status: &str) -> Self {
        let mut pc = Map::new();
        pc.insert("id".into(), json!(id));
        pc.insert("name".into(), json!(name));
        pc.insert("ip".into(), json!(ip));
        pc.insert("status".into(), json!(status));
        self.pcs.push(pc);
        self
    }

    /// Session user of the last added PC.
    pub fn user(self, user: &str) -> Self {
        self.field("user", json!(user))
    }

    pub fn carrera(self, carrera: &str) -> Self {
        self.field("carrera", json!(carrera))
    }

    pub fn last_seen(self, at: &str) -> Self {
        self.field("lastSeen", json!(at))
    }

    fn field(mut self, key: &str, value: Value) -> Self {
        match self.pcs.last_mut() {
            Some(pc) => {
                pc.insert(key.into(), value);
            }
            None => log::warn!("RosterBuilder::{key} called before any pc(), ignored"),
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Array(self.pcs.into_iter().map(Value::Object).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_entries_keep_insertion_order() {
        let snapshot = LivenessBuilder::new()
            .alive("10.0.0.1")
            .down("10.0.0.2")
            .seen("10.0.0.3", true, "2025-03-01T08:30:00")
            .build();
        assert_eq!(
            snapshot,
            json!([
                {"ip": "10.0.0.1", "alive": true},
                {"ip": "10.0.0.2", "alive": false},
                {"ip": "10.0.0.3", "alive": true, "lastSeen": "2025-03-01T08:30:00"}
            ])
        );
    }

    #[test]
    fn seen_ago_is_in_the_past() {
        let snapshot = LivenessBuilder::new()
            .seen_ago("10.0.0.1", false, Duration::from_secs(60))
            .build();
        let raw = snapshot[0]["lastSeen"].as_str().unwrap();
        let at = chrono::DateTime::parse_from_rfc3339(raw).unwrap();
        assert!(at < chrono::Utc::now() - chrono::Duration::seconds(59));
    }

    #[test]
    fn modifiers_apply_to_the_last_pc() {
        let roster = RosterBuilder::new()
            .pc("pc-01", "PC-LAB-01", "10.0.0.1", "inUse")
            .user("alumno01")
            .pc("pc-02", "PC-LAB-02", "10.0.0.2", "online")
            .carrera("5003")
            .build();
        assert_eq!(roster[0]["user"], "alumno01");
        assert!(roster[0].get("carrera").is_none());
        assert_eq!(roster[1]["carrera"], "5003");
        assert!(roster[1].get("user").is_none());
    }

    #[test]
    fn modifier_without_pc_is_ignored() {
        assert_eq!(RosterBuilder::new().user("nobody").build(), json!([]));
    }
}
