use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

pub const LOGS_CONF: &str = "/etc/uninet/logs.conf";
pub const DEFAULT_LOG_FILE: &str = "logs/carreras.log";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// `ping -W` value; the whole probe is abandoned one second later.
    pub ping_timeout_secs: u64,
    pub hosts: Vec<HostConf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HostConf {
    pub id: String,
    pub name: String,
    pub ip: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrera: Option<String>,
}

impl HostConf {
    pub fn new(id: &str, name: &str, ip: [u8; 4]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: Ipv4Addr::from(ip),
            carrera: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4000)),
            ping_timeout_secs: 2,
            // 4 clients + le serveur du labo
            hosts: vec![
                HostConf::new("pc-01", "PC-LAB-01", [172, 29, 2, 37]),
                HostConf::new("pc-02", "PC-LAB-02", [172, 29, 157, 94]),
                HostConf::new("pc-03", "PC-LAB-03", [172, 29, 177, 20]),
                HostConf::new("pc-04", "PC-LAB-04", [172, 29, 104, 181]),
                HostConf::new("server-01", "SERVIDOR", [172, 29, 137, 160]),
            ],
            log_file: None,
        }
    }
}

pub async fn load_config_from(path: &Path) -> ServerConfig {
    if !path.exists() {
        warn!("no {}, using default config", path.display());
        return ServerConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return ServerConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        warn!("invalid config {}: {e}", path.display());
        ServerConfig::default()
    })
}

pub async fn load_config() -> ServerConfig {
    let path = std::env::var("UNINET_SERVER_CONFIG").unwrap_or_else(|_| "status-server.yaml".into());
    load_config_from(Path::new(&path)).await
}

/// `LOG_FILE=` from a `KEY=VALUE` file; blank lines and `#` comments are skipped.
pub fn log_file_from_conf(txt: &str) -> Option<PathBuf> {
    txt.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .find(|(k, _)| k.trim() == "LOG_FILE")
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `UNINET_LOG_FILE` -> config `log_file` -> `LOG_FILE` in `logs_conf` -> `logs/carreras.log`.
pub fn resolve_log_file(env: Option<String>, cfg: &ServerConfig, logs_conf: &Path) -> PathBuf {
    if let Some(path) = env.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(path.trim());
    }
    if let Some(path) = &cfg.log_file {
        return path.clone();
    }
    std::fs::read_to_string(logs_conf)
        .ok()
        .and_then(|txt| log_file_from_conf(&txt))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}
