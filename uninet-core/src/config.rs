use crate::filter::DEFAULT_SECTOR_SIZE;
use crate::models::Machine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::warn;

/// Dashboard sync configuration (`uninet.yaml`), overridable from the environment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Liveness endpoint, polled every `liveness_interval_ms`.
    pub status_url: String,
    /// Roster endpoint. `None` disables the roster poller.
    pub roster_url: Option<String>,
    /// Scopes roster requests to one carrera.
    pub carrera: Option<String>,
    pub liveness_interval_ms: u64,
    pub roster_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub sector_size: usize,
    pub close_delay_ms: u64,
    /// Machines known before the first poll.
    pub machines: Vec<Machine>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            status_url: "http://127.0.0.1:4000/api/status".into(),
            roster_url: None,
            carrera: None,
            liveness_interval_ms: 2_000,
            roster_interval_ms: 10_000,
            request_timeout_ms: 5_000,
            sector_size: DEFAULT_SECTOR_SIZE,
            close_delay_ms: 300,
            machines: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms.max(1))
    }

    pub fn roster_interval(&self) -> Duration {
        Duration::from_millis(self.roster_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    /// Applies `UNINET_STATUS_URL`, `UNINET_ROSTER_URL` and `UNINET_CARRERA`.
    /// An empty value clears the optional settings.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("UNINET_STATUS_URL").filter(|v| !v.trim().is_empty()) {
            self.status_url = url;
        }
        if let Some(url) = lookup("UNINET_ROSTER_URL") {
            self.roster_url = non_empty(url);
        }
        if let Some(carrera) = lookup("UNINET_CARRERA") {
            self.carrera = non_empty(carrera);
        }
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reads `path`; a missing, empty or invalid file yields the defaults.
pub async fn load_config_from(path: &Path) -> DashboardConfig {
    if !path.exists() {
        warn!("no {}, using default config", path.display());
        return DashboardConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_else(|e| {
        warn!("cannot read {}: {e}", path.display());
        String::new()
    });
    if txt.trim().is_empty() {
        return DashboardConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        warn!("invalid config {}: {e}", path.display());
        DashboardConfig::default()
    })
}

/// `UNINET_CONFIG` (default `uninet.yaml`) plus environment overrides.
pub async fn load_config() -> DashboardConfig {
    let path = std::env::var("UNINET_CONFIG").unwrap_or_else(|_| "uninet.yaml".into());
    load_config_from(Path::new(&path))
        .await
        .apply_env(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MachineStatus;
    use std::collections::HashMap;
    use std::io::Write;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("nope.yaml")).await;
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.liveness_interval(), Duration::from_secs(2));
        assert_eq!(cfg.roster_interval(), Duration::from_secs(10));
        assert_eq!(cfg.sector_size, 10);
        assert_eq!(cfg.roster_url, None);
    }

    #[tokio::test]
    async fn yaml_seeds_machines_and_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
status_url: http://10.0.0.1:4000/api/status
sector_size: 6
machines:
  - id: pc-01
    name: PC-LAB-01
    ip: 172.29.2.37
  - id: server-01
    name: SERVIDOR
    ip: 172.29.137.160
    status: online
    lab: lab-5003
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path()).await;
        assert_eq!(cfg.status_url, "http://10.0.0.1:4000/api/status");
        assert_eq!(cfg.sector_size, 6);
        assert_eq!(cfg.close_delay_ms, 300);
        assert_eq!(cfg.machines.len(), 2);
        assert_eq!(cfg.machines[0].status, MachineStatus::Offline);
        assert_eq!(cfg.machines[0].lab, "lab-5010");
        assert_eq!(cfg.machines[1].status, MachineStatus::Online);
        assert_eq!(cfg.machines[1].lab, "lab-5003");
    }

    #[tokio::test]
    async fn invalid_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "machines: [{{id: pc-01, ip: nowhere}}]").unwrap();
        assert_eq!(load_config_from(file.path()).await, DashboardConfig::default());
    }

    #[test]
    fn environment_overrides_urls_and_carrera() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("UNINET_STATUS_URL", "http://lab:4000/api/status"),
            ("UNINET_ROSTER_URL", "http://lab:8000/api/pcs"),
            ("UNINET_CARRERA", " 5010 "),
        ]);
        let cfg = DashboardConfig::default().apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.status_url, "http://lab:4000/api/status");
        assert_eq!(cfg.roster_url.as_deref(), Some("http://lab:8000/api/pcs"));
        assert_eq!(cfg.carrera.as_deref(), Some("5010"));
    }

    #[test]
    fn blank_roster_url_disables_the_roster_poller() {
        let cfg = DashboardConfig {
            roster_url: Some("http://lab:8000/api/pcs".into()),
            ..DashboardConfig::default()
        };
        let cfg = cfg.apply_env(|k| (k == "UNINET_ROSTER_URL").then(|| "  ".to_string()));
        assert_eq!(cfg.roster_url, None);
    }
}
