//! UniNet fleet sync core.
//!
//! Keeps the dashboard's picture of the lab PCs up to date:
//! - `source`: HTTP client for the liveness and roster endpoints
//! - `registry`: in-memory PC records and the pure snapshot merges
//! - `filter`: sectorized, status-filtered grid and the chip counters
//! - `selection`: detail panel focus with a deferred clear
//! - `poller`: cancellable periodic tasks wiring a source into a registry store
//! - `config`: YAML + environment settings

pub mod config;
pub mod filter;
pub mod models;
pub mod poller;
pub mod registry;
pub mod selection;
pub mod source;
pub mod state;

pub use config::{load_config, DashboardConfig};
pub use filter::{select, FilterState, FleetStats, GridView, Sector};
pub use models::{LivenessEntry, Machine, MachineStatus, RosterEntry};
pub use poller::{spawn_liveness_poller, spawn_roster_poller, PollerHandle};
pub use registry::{merge_liveness, merge_roster, MergeReport, Registry, RegistryStore};
pub use selection::SelectionState;
pub use source::{PollError, StatusSource};
