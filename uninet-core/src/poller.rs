/**
 * POLLERS - Tâches périodiques liveness (2s) et roster (10s)
 *
 * ROLE :
 * Each poller owns one tokio task that ticks on a fixed interval, asks the status
 * source for a snapshot, and merges it into the registry store.
 *
 * LIFECYCLE :
 * - spawn_* returns a PollerHandle; stop() or dropping the handle cancels the task
 * - the task only holds a weak registry handle: once the store is gone, a late
 *   response is discarded and the task ends on its own
 * - a failed poll is logged and leaves the registry untouched
 *
 * The two pollers are not coordinated; a liveness and a roster merge may interleave.
 */

use crate::models::{LivenessEntry, RosterEntry};
use crate::registry::{MergeReport, RegistryStore, WeakRegistryStore};
use crate::source::{PollError, StatusSource};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(2);
pub const ROSTER_INTERVAL: Duration = Duration::from_secs(10);

/// Stop handle of a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True once the task has ended (stopped, or its registry was dropped).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels future ticks. A request already in flight is dropped with the task.
    pub fn stop(self) {
        info!(poller = self.name, "poller stopped");
        // Drop aborts the task.
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn spawn_liveness_poller(
    source: StatusSource,
    endpoint: String,
    store: &RegistryStore,
    every: Duration,
) -> PollerHandle {
    spawn_poller(
        "liveness",
        every,
        store.downgrade(),
        move || {
            let source = source.clone();
            let endpoint = endpoint.clone();
            async move { source.poll_liveness(&endpoint).await }
        },
        |store: &RegistryStore, entries: &[LivenessEntry]| store.apply_liveness(entries),
    )
}

pub fn spawn_roster_poller(
    source: StatusSource,
    endpoint: String,
    carrera: Option<String>,
    store: &RegistryStore,
    every: Duration,
) -> PollerHandle {
    spawn_poller(
        "roster",
        every,
        store.downgrade(),
        move || {
            let source = source.clone();
            let endpoint = endpoint.clone();
            let carrera = carrera.clone();
            async move { source.poll_roster(&endpoint, carrera.as_deref()).await }
        },
        |store: &RegistryStore, entries: &[RosterEntry]| store.apply_roster(entries),
    )
}

fn spawn_poller<T, F, Fut, A>(
    name: &'static str,
    every: Duration,
    registry: WeakRegistryStore,
    mut fetch: F,
    apply: A,
) -> PollerHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, PollError>> + Send + 'static,
    A: Fn(&RegistryStore, &[T]) -> MergeReport + Send + 'static,
{
    info!(poller = name, every_ms = every.as_millis() as u64, "poller started");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let outcome = fetch().await;

            let Some(store) = registry.upgrade() else {
                debug!(poller = name, "registry dropped, discarding response");
                break;
            };

            match outcome {
                Ok(entries) => {
                    let report = apply(&store, &entries);
                    debug!(
                        poller = name,
                        received = entries.len(),
                        updated = report.updated,
                        inserted = report.inserted,
                        ignored = report.ignored,
                        "snapshot merged"
                    );
                }
                Err(e) => warn!(poller = name, "poll failed, keeping previous state: {e}"),
            }
        }
    });

    PollerHandle { name, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, MachineStatus};
    use crate::registry::Registry;
    use serde_json::json;
    use uninet_devkit::{wait_until, LivenessBuilder, MockStatusServer, RosterBuilder};

    const TICK: Duration = Duration::from_millis(20);
    const PATIENCE: Duration = Duration::from_secs(3);

    fn seeded() -> RegistryStore {
        RegistryStore::new(Registry::from_machines([
            Machine::new("pc-01", "PC-LAB-01", "172.29.2.37"),
            Machine::new("pc-02", "PC-LAB-02", "172.29.157.94").with_status(MachineStatus::Online),
        ]))
    }

    #[tokio::test]
    async fn liveness_poller_refreshes_the_store() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(LivenessBuilder::new().alive("172.29.2.37").down("172.29.157.94").build());
        let store = seeded();

        let handle = spawn_liveness_poller(StatusSource::default(), server.liveness_url(), &store, TICK);
        let synced = wait_until(PATIENCE, || {
            store.get("pc-01").map(|m| m.status) == Some(MachineStatus::Online)
                && store.get("pc-02").map(|m| m.status) == Some(MachineStatus::Offline)
        })
        .await;
        assert!(synced);
        assert_eq!(store.len(), 2);
        handle.stop();
    }

    #[tokio::test]
    async fn failed_polls_keep_previous_state() {
        let server = MockStatusServer::start().await.unwrap();
        server.fail_with(500);
        let store = seeded();
        let before = store.snapshot();

        let _handle = spawn_liveness_poller(StatusSource::default(), server.liveness_url(), &store, TICK);
        assert!(wait_until(PATIENCE, || server.hits("/status") >= 3).await);
        assert_eq!(store.snapshot(), before);

        server.set_raw("/status", 200, "not json");
        let hits = server.hits("/status");
        assert!(wait_until(PATIENCE, || server.hits("/status") >= hits + 2).await);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn roster_poller_inserts_new_machines() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_roster(
            RosterBuilder::new()
                .pc("pc-01", "PC-LAB-01", "172.29.2.37", "inUse")
                .user("alumno01")
                .pc("pc-30", "PC-LAB-30", "172.29.9.30", "online")
                .carrera("5003")
                .build(),
        );
        let store = seeded();

        let _handle = spawn_roster_poller(
            StatusSource::default(),
            server.roster_url(),
            Some("5003".into()),
            &store,
            TICK,
        );
        assert!(wait_until(PATIENCE, || store.len() == 3).await);
        assert_eq!(store.get("pc-01").unwrap().status, MachineStatus::InUse);
        assert_eq!(store.get("pc-30").unwrap().lab, "lab-5003");
        assert_eq!(server.last_query("/roster").as_deref(), Some("carrera=5003"));
    }

    #[tokio::test]
    async fn stopping_a_poller_ends_its_schedule() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(json!([]));
        let store = seeded();

        let handle = spawn_liveness_poller(StatusSource::default(), server.liveness_url(), &store, TICK);
        assert!(wait_until(PATIENCE, || server.hits("/status") >= 2).await);
        handle.stop();

        tokio::time::sleep(TICK * 3).await;
        let settled = server.hits("/status");
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(server.hits("/status"), settled);
    }

    #[tokio::test]
    async fn poller_exits_once_the_registry_is_gone() {
        let server = MockStatusServer::start().await.unwrap();
        server.set_liveness(json!([]));
        let store = seeded();

        let handle = spawn_liveness_poller(StatusSource::default(), server.liveness_url(), &store, TICK);
        assert!(wait_until(PATIENCE, || server.hits("/status") >= 1).await);
        drop(store);

        assert!(wait_until(PATIENCE, || handle.is_finished()).await);
    }
}
