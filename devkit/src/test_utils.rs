/*!
Utilitaires de test

- Init du logging (une seule fois par process)
- Attente active bornée pour les tâches de fond (pollers, timers)
*/

use std::time::Duration;
use tokio::time::Instant;

const POLL_STEP: Duration = Duration::from_millis(10);

/// Init logging pour tests; les appels suivants sont sans effet.
pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Réévalue `check` toutes les 10ms jusqu'à ce qu'il soit vrai ou que `timeout` expire.
/// Retourne la dernière valeur observée.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            log::warn!("wait_until: condition still false after {timeout:?}");
            return false;
        }
        tokio::time::sleep(POLL_STEP).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_as_soon_as_the_condition_holds() {
        let calls = AtomicUsize::new(0);
        let ok = wait_until(Duration::from_secs(1), || calls.fetch_add(1, Ordering::SeqCst) >= 2).await;
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_timeout() {
        let start = Instant::now();
        assert!(!wait_until(Duration::from_millis(50), || false).await);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn sees_changes_made_by_background_tasks() {
        let flag = Arc::new(AtomicUsize::new(0));
        let writer = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.store(1, Ordering::SeqCst);
        });
        assert!(wait_until(Duration::from_secs(1), || flag.load(Ordering::SeqCst) == 1).await);
    }
}
