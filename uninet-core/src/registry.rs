/**
 * PC REGISTRY - Registre en mémoire du parc de PCs des laboratoires
 *
 * ROLE :
 * Holds the authoritative set of known machines and reconciles incoming status
 * snapshots with it. Records are updated in place or inserted, never removed: a PC
 * that stops appearing in snapshots simply goes stale (its last_seen stops moving).
 *
 * HOW :
 * - Registry = arena of records (Vec, keeps display order) + id -> index lookup
 * - merge_liveness / merge_roster = pure functions (current, snapshot) -> next
 * - RegistryStore = injectable shared handle used by pollers and views
 *
 * STATUS RULES (liveness) :
 * - an explicit status in the entry always wins
 * - down -> offline
 * - up -> online, except inUse / examMode which are kept while the PC answers
 */

use crate::models::{lab_key, LivenessEntry, Machine, MachineStatus, RosterEntry};
use crate::state::{new_state, Shared, WeakShared};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of one merge, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub updated: usize,
    pub inserted: usize,
    /// Entries whose address/id matched nothing and were not inserted.
    pub ignored: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    machines: Vec<Machine>,
    by_id: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a seed list. A repeated id updates the earlier record.
    pub fn from_machines<I: IntoIterator<Item = Machine>>(machines: I) -> Self {
        let mut registry = Self::new();
        for machine in machines {
            registry.upsert(machine);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Machines in registry (display) order.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn get(&self, id: &str) -> Option<&Machine> {
        self.by_id.get(id).map(|&idx| &self.machines[idx])
    }

    fn upsert(&mut self, machine: Machine) {
        match self.by_id.get(&machine.id) {
            Some(&idx) => self.machines[idx] = machine,
            None => {
                self.by_id.insert(machine.id.clone(), self.machines.len());
                self.machines.push(machine);
            }
        }
    }

    /// Applies a liveness snapshot in place. Unknown addresses are ignored.
    pub fn apply_liveness(&mut self, snapshot: &[LivenessEntry]) -> MergeReport {
        let mut report = MergeReport::default();
        for entry in snapshot {
            let mut matched = false;
            for machine in self.machines.iter_mut().filter(|m| m.ip == entry.ip) {
                machine.status = liveness_status(machine.status, entry);
                machine.observe(entry.last_seen);
                if let Some(carrera) = entry.carrera.as_deref() {
                    machine.lab = lab_key(carrera);
                }
                matched = true;
            }
            if matched {
                report.updated += 1;
            } else {
                report.ignored += 1;
            }
        }
        report
    }

    /// Applies a roster snapshot in place. Entries match by id, then by address;
    /// anything else becomes a new record. The address fallback only reaches records
    /// whose id no entry of the snapshot names, so a reassigned address never swallows
    /// a new PC.
    pub fn apply_roster(&mut self, snapshot: &[RosterEntry]) -> MergeReport {
        let named: HashSet<&str> = snapshot.iter().map(|e| e.id.as_str()).collect();
        let mut report = MergeReport::default();
        for entry in snapshot {
            let existing = self.by_id.get(&entry.id).copied().or_else(|| {
                self.machines
                    .iter()
                    .position(|m| m.ip == entry.ip && !named.contains(m.id.as_str()))
            });

            match existing {
                Some(idx) => {
                    let machine = &mut self.machines[idx];
                    machine.name.clone_from(&entry.name);
                    machine.ip.clone_from(&entry.ip);
                    machine.status = entry.status;
                    machine.user.clone_from(&entry.user);
                    machine.observe(entry.last_seen);
                    if let Some(carrera) = entry.carrera.as_deref() {
                        machine.lab = lab_key(carrera);
                    }
                    report.updated += 1;
                }
                None => {
                    self.upsert(entry.to_machine());
                    report.inserted += 1;
                }
            }
        }
        report
    }

    /// External control action (session start, exam profile...). Returns false for an
    /// unknown id.
    pub fn set_status(&mut self, id: &str, status: MachineStatus, user: Option<String>) -> bool {
        let Some(&idx) = self.by_id.get(id) else {
            return false;
        };
        let machine = &mut self.machines[idx];
        machine.status = status;
        machine.user = user;
        true
    }
}

fn liveness_status(current: MachineStatus, entry: &LivenessEntry) -> MachineStatus {
    if let Some(explicit) = entry.status {
        return explicit;
    }
    match (entry.alive, current) {
        (false, _) => MachineStatus::Offline,
        (true, kept) if kept.is_session() => kept,
        (true, _) => MachineStatus::Online,
    }
}

/// Pure liveness merge: `current` is left untouched.
pub fn merge_liveness(current: &Registry, snapshot: &[LivenessEntry]) -> Registry {
    let mut next = current.clone();
    next.apply_liveness(snapshot);
    next
}

/// Pure roster merge: may grow the registry.
pub fn merge_roster(current: &Registry, snapshot: &[RosterEntry]) -> Registry {
    let mut next = current.clone();
    next.apply_roster(snapshot);
    next
}

/// Injectable shared registry. Cheap to clone; all clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    inner: Shared<Registry>,
}

impl RegistryStore {
    pub fn new(registry: Registry) -> Self {
        Self { inner: new_state(registry) }
    }

    pub fn apply_liveness(&self, snapshot: &[LivenessEntry]) -> MergeReport {
        self.inner.lock().apply_liveness(snapshot)
    }

    pub fn apply_roster(&self, snapshot: &[RosterEntry]) -> MergeReport {
        self.inner.lock().apply_roster(snapshot)
    }

    pub fn set_status(&self, id: &str, status: MachineStatus, user: Option<String>) -> bool {
        self.inner.lock().set_status(id, status, user)
    }

    /// Point-in-time copy for deriving views without holding the lock.
    pub fn snapshot(&self) -> Registry {
        self.inner.lock().clone()
    }

    pub fn machines(&self) -> Vec<Machine> {
        self.inner.lock().machines().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<Machine> {
        self.inner.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn downgrade(&self) -> WeakRegistryStore {
        WeakRegistryStore { inner: Arc::downgrade(&self.inner) }
    }
}

/// Handle held by background pollers; does not keep the registry alive.
#[derive(Debug, Clone)]
pub struct WeakRegistryStore {
    inner: WeakShared<Registry>,
}

impl WeakRegistryStore {
    pub fn upgrade(&self) -> Option<RegistryStore> {
        self.inner.upgrade().map(|inner| RegistryStore { inner })
    }
}
