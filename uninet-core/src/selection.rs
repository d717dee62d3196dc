//! Detail panel selection with a deferred clear.
//!
//! Closing flips `is_open()` at once so a view can start its close transition, while
//! `current()` keeps returning the machine until the close delay has elapsed. The deferred
//! clear is a timer task on the current tokio runtime; outside of one, closing clears at once.

use crate::config::DashboardConfig;
use crate::models::Machine;
use crate::state::{new_state, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Length of the panel close transition.
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Default)]
struct Panel {
    current: Option<Machine>,
    open: bool,
    /// Bumped by every select/close so a stale timer never clears a newer selection.
    generation: u64,
    pending_clear: Option<JoinHandle<()>>,
}

impl Panel {
    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending_clear.take() {
            pending.abort();
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionState {
    panel: Shared<Panel>,
    close_delay: Duration,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSE_DELAY)
    }
}

impl SelectionState {
    pub fn new(close_delay: Duration) -> Self {
        Self {
            panel: new_state(Panel::default()),
            close_delay,
        }
    }

    /// Uses the configured `close_delay_ms`.
    pub fn from_config(cfg: &DashboardConfig) -> Self {
        Self::new(cfg.close_delay())
    }

    /// Focuses `machine` and opens the panel, cancelling any pending clear.
    pub fn select(&self, machine: Machine) {
        let mut panel = self.panel.lock();
        panel.cancel_pending();
        panel.generation += 1;
        debug!(machine = %machine.id, "detail panel opened");
        panel.current = Some(machine);
        panel.open = true;
    }

    /// Closes the panel now and clears the selection once the close delay has passed.
    pub fn request_close(&self) {
        let mut panel = self.panel.lock();
        if !panel.open {
            return;
        }
        panel.open = false;
        panel.cancel_pending();
        panel.generation += 1;

        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime for the deferred clear, clearing selection now");
            panel.current = None;
            return;
        };

        let generation = panel.generation;
        let delay = self.close_delay;
        let weak = Arc::downgrade(&self.panel);
        panel.pending_clear = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(panel) = weak.upgrade() else { return };
            let mut panel = panel.lock();
            if panel.generation == generation {
                panel.current = None;
                panel.pending_clear = None;
                debug!("detail panel cleared");
            }
        }));
    }

    pub fn is_open(&self) -> bool {
        self.panel.lock().open
    }

    /// True between `request_close` and the deferred clear.
    pub fn is_closing(&self) -> bool {
        let panel = self.panel.lock();
        !panel.open && panel.current.is_some()
    }

    pub fn current(&self) -> Option<Machine> {
        self.panel.lock().current.clone()
    }

    pub fn close_delay(&self) -> Duration {
        self.close_delay
    }
}
