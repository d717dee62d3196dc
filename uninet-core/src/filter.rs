//! Filter engine: turns the registry into the sectorized, status-filtered grid.
//!
//! Sectors are cut from registry order *before* filtering, so a sector keeps its label
//! whatever the active filter hides. Counters are computed over the unfiltered set.

use crate::models::{Machine, MachineStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of PCs per sector.
pub const DEFAULT_SECTOR_SIZE: usize = 10;

/// Status chip selected above the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterState {
    #[default]
    All,
    Only(MachineStatus),
}

impl FilterState {
    pub fn matches(self, machine: &Machine) -> bool {
        match self {
            FilterState::All => true,
            FilterState::Only(status) => machine.status == status,
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterState::All => f.write_str("all"),
            FilterState::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for FilterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(FilterState::All);
        }
        MachineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .map(FilterState::Only)
            .ok_or_else(|| format!("unknown filter {s:?}"))
    }
}

impl TryFrom<String> for FilterState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilterState> for String {
    fn from(value: FilterState) -> Self {
        value.to_string()
    }
}

/// One non-empty group of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Sector<'a> {
    /// Position of the sector in the unfiltered partition.
    pub index: usize,
    pub label: String,
    pub machines: Vec<&'a Machine>,
}

/// What the grid should show. The two empty cases get different messages.
#[derive(Debug, Clone, PartialEq)]
pub enum GridView<'a> {
    /// The registry holds no machine at all.
    NoMachines,
    /// Machines exist but none passes the filter.
    NoMatches(FilterState),
    Sectors(Vec<Sector<'a>>),
}

impl<'a> GridView<'a> {
    pub fn sectors(&self) -> &[Sector<'a>] {
        match self {
            GridView::Sectors(sectors) => sectors,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self, GridView::Sectors(_))
    }

    /// Number of machines shown across all sectors.
    pub fn shown(&self) -> usize {
        self.sectors().iter().map(|s| s.machines.len()).sum()
    }
}

/// Partitions, filters and drops empty sectors. A `sector_size` of 0 is treated as 1.
pub fn select<'a>(machines: &'a [Machine], filter: FilterState, sector_size: usize) -> GridView<'a> {
    if machines.is_empty() {
        return GridView::NoMachines;
    }

    let sectors: Vec<Sector<'a>> = machines
        .chunks(sector_size.max(1))
        .enumerate()
        .filter_map(|(index, chunk)| {
            let shown: Vec<&Machine> = chunk.iter().filter(|m| filter.matches(m)).collect();
            (!shown.is_empty()).then(|| Sector {
                index,
                label: sector_label(index),
                machines: shown,
            })
        })
        .collect();

    if sectors.is_empty() {
        GridView::NoMatches(filter)
    } else {
        GridView::Sectors(sectors)
    }
}

/// `Sector A` .. `Sector Z`, then `Sector AA`, `Sector AB`...
pub fn sector_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.reverse();
    format!("Sector {}", letters.into_iter().collect::<String>())
}

/// Counters shown on the filter chips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub in_use: usize,
    pub exam_mode: usize,
}

impl FleetStats {
    pub fn from_machines(machines: &[Machine]) -> Self {
        machines.iter().fold(Self::default(), |mut stats, machine| {
            stats.total += 1;
            match machine.status {
                MachineStatus::Online => stats.online += 1,
                MachineStatus::Offline => stats.offline += 1,
                MachineStatus::InUse => stats.in_use += 1,
                MachineStatus::ExamMode => stats.exam_mode += 1,
            }
            stats
        })
    }

    pub fn count(&self, filter: FilterState) -> usize {
        match filter {
            FilterState::All => self.total,
            FilterState::Only(MachineStatus::Online) => self.online,
            FilterState::Only(MachineStatus::Offline) => self.offline,
            FilterState::Only(MachineStatus::InUse) => self.in_use,
            FilterState::Only(MachineStatus::ExamMode) => self.exam_mode,
        }
    }
}
