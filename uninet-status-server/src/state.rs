use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use time::OffsetDateTime;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Last probe outcome per address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub alive: bool,
    /// Last time the host answered; kept across failed probes.
    pub last_seen: Option<OffsetDateTime>,
}

#[derive(Debug, Default)]
pub struct ProbeBook {
    seen: HashMap<Ipv4Addr, Sighting>,
}

impl ProbeBook {
    pub fn record(&mut self, ip: Ipv4Addr, alive: bool, at: OffsetDateTime) -> Sighting {
        let entry = self.seen.entry(ip).or_insert(Sighting {
            alive,
            last_seen: None,
        });
        entry.alive = alive;
        if alive {
            entry.last_seen = Some(at);
        }
        *entry
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<Sighting> {
        self.seen.get(&ip).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
