use crate::state::{ProbeBook, Shared};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerHealth {
    pub uptime_seconds: u64,
    pub hosts_configured: u32,
    pub hosts_tracked: u32,
    pub probes_run: u64,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    probes_run: Arc<AtomicU64>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            probes_run: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn count_probes(&self, n: usize) {
        self.probes_run.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn get_health(&self, hosts_configured: usize, book: &Shared<ProbeBook>) -> ServerHealth {
        ServerHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            hosts_configured: hosts_configured as u32,
            hosts_tracked: book.lock().len() as u32,
            probes_run: self.probes_run.load(Ordering::Relaxed),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|l| l.starts_with("VmRSS:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb as f32 / 1024.0; // KB -> MB
            }
        }
    }

    0.0 // inconnu
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state;
    use std::net::Ipv4Addr;
    use time::OffsetDateTime;

    #[test]
    fn counts_probes_and_tracked_hosts() {
        let tracker = HealthTracker::new();
        let book = new_state(ProbeBook::default());
        book.lock().record(Ipv4Addr::new(10, 0, 0, 1), true, OffsetDateTime::now_utc());

        tracker.count_probes(5);
        tracker.count_probes(1);
        let health = tracker.get_health(5, &book);
        assert_eq!(health.probes_run, 6);
        assert_eq!(health.hosts_configured, 5);
        assert_eq!(health.hosts_tracked, 1);
        assert!(health.memory_usage_mb >= 0.0);
    }
}
