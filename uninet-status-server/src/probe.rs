/**
 * PROBE - Test de joignabilité d'une machine du labo
 *
 * ROLE : Answers "does this IPv4 address reply right now?".
 * PingProbe shells out to `ping -c 1 -W <secs>`; any spawn failure, non-zero exit
 * or overrun counts as down.
 */

use futures::future::{BoxFuture, FutureExt};
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub trait Probe: Send + Sync {
    fn probe(&self, ip: Ipv4Addr) -> BoxFuture<'_, bool>;
}

#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout_secs: u64,
}

impl PingProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs: timeout_secs.max(1),
        }
    }

    async fn ping(&self, ip: Ipv4Addr) -> bool {
        let wait = self.timeout_secs.to_string();
        let ip_arg = ip.to_string();
        let child = Command::new("ping")
            .args(["-c", "1", "-W", wait.as_str(), ip_arg.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        // -W borne la réponse, pas la résolution/spawn: marge d'une seconde
        let deadline = Duration::from_secs(self.timeout_secs + 1);
        match tokio::time::timeout(deadline, child).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(%ip, "ping spawn failed: {e}");
                false
            }
            Err(_) => {
                debug!(%ip, "ping overran {deadline:?}");
                false
            }
        }
    }
}

impl Probe for PingProbe {
    fn probe(&self, ip: Ipv4Addr) -> BoxFuture<'_, bool> {
        self.ping(ip).boxed()
    }
}


#[cfg(test)]
mod tests {
    use super::fake::StaticProbe;
    use super::*;

    #[tokio::test]
    async fn static_probe_answers_from_its_set() {
        let probe = StaticProbe::up(&[Ipv4Addr::new(10, 0, 0, 1)]);
        assert!(probe.probe(Ipv4Addr::new(10, 0, 0, 1)).await);
        assert!(!probe.probe(Ipv4Addr::new(10, 0, 0, 2)).await);
    }

    #[test]
    fn ping_timeout_is_at_least_one_second() {
        assert_eq!(PingProbe::new(0).timeout_secs, 1);
        assert_eq!(PingProbe::new(3).timeout_secs, 3);
    }
}
