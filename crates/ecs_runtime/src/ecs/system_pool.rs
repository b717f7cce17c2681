//! System pools and deferred system ordering
//!
//! A [`SystemPool`] is an ordered cohort of systems sharing one update
//! cadence and one signal queue. Adding, removing, and reordering systems is
//! queued and applied when the pool commits, which the manager does between
//! signal delivery and running the systems. Relative moves rotate the order
//! list so every other system keeps its relative position.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::error::{EcsError, EcsResult};
use super::manager::EcsManager;
use super::signal::SignalEnvelope;
use super::system::System;

/// Identifier of a system pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemPoolId(u32);

impl SystemPoolId {
    /// Create a pool id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Where a moved system lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Immediately before the target
    Before,
    /// Immediately after the target
    After,
}

/// A registered system with its identity
pub(crate) struct SystemEntry {
    type_id: TypeId,
    name: &'static str,
    system: Box<dyn System>,
}

#[derive(Clone, Copy)]
struct SystemKey {
    type_id: TypeId,
    name: &'static str,
}

impl SystemKey {
    fn of<S: System>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }
}

enum PendingSystemOp {
    Add(SystemEntry),
    Remove(SystemKey),
    Move {
        system: SystemKey,
        target: SystemKey,
        placement: Placement,
    },
}

/// Ordered systems plus their pending structural changes and signal queue
pub struct SystemPool {
    id: SystemPoolId,
    systems: Vec<SystemEntry>,
    positions: HashMap<TypeId, usize>,
    pending: Vec<PendingSystemOp>,
    signals: Vec<SignalEnvelope>,
    running: bool,
}

impl SystemPool {
    /// Create an empty pool
    pub fn new(id: SystemPoolId) -> Self {
        Self {
            id,
            systems: Vec::new(),
            positions: HashMap::new(),
            pending: Vec::new(),
            signals: Vec::new(),
            running: false,
        }
    }

    /// Pool identifier
    pub fn id(&self) -> SystemPoolId {
        self.id
    }

    /// Queue `system` for addition at the end of the order list.
    ///
    /// Fails right away if the pool already has, or is about to have, a
    /// system of this type. The returned orderer queues relative moves for
    /// the new system.
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<SystemOrderer<'_>> {
        let key = SystemKey::of::<S>();
        if self.will_contain(key.type_id) {
            return Err(EcsError::DuplicateSystem {
                pool: self.id,
                system: key.name,
            });
        }
        self.pending.push(PendingSystemOp::Add(SystemEntry {
            type_id: key.type_id,
            name: key.name,
            system: Box::new(system),
        }));
        Ok(SystemOrderer { pool: self, key })
    }

    /// Queue removal of the system of type `S`
    pub fn remove_system<S: System>(&mut self) -> EcsResult<()> {
        let key = SystemKey::of::<S>();
        if !self.will_contain(key.type_id) {
            return Err(EcsError::SystemNotFound {
                pool: self.id,
                system: key.name,
            });
        }
        self.pending.push(PendingSystemOp::Remove(key));
        Ok(())
    }

    /// Orderer for an already registered (or queued) system `S`
    pub fn orderer<S: System>(&mut self) -> EcsResult<SystemOrderer<'_>> {
        let key = SystemKey::of::<S>();
        if !self.will_contain(key.type_id) {
            return Err(EcsError::SystemNotFound {
                pool: self.id,
                system: key.name,
            });
        }
        Ok(SystemOrderer { pool: self, key })
    }

    /// Move committed system `S` immediately before committed system `T`
    pub fn move_system_before<S: System, T: System>(&mut self) -> EcsResult<()> {
        self.ensure_idle()?;
        self.move_system(SystemKey::of::<S>(), SystemKey::of::<T>(), Placement::Before)
    }

    /// Move committed system `S` immediately after committed system `T`
    pub fn move_system_after<S: System, T: System>(&mut self) -> EcsResult<()> {
        self.ensure_idle()?;
        self.move_system(SystemKey::of::<S>(), SystemKey::of::<T>(), Placement::After)
    }

    /// Whether a system of type `S` is committed in this pool
    pub fn contains<S: System>(&self) -> bool {
        self.positions.contains_key(&TypeId::of::<S>())
    }

    /// Position of `S` in the committed order list
    pub fn position<S: System>(&self) -> Option<usize> {
        self.positions.get(&TypeId::of::<S>()).copied()
    }

    /// Number of committed systems
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no system is committed
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Committed system names in execution order
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|entry| entry.name).collect()
    }

    /// Whether system adds, removals, or moves are waiting for a commit
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of signals waiting for delivery
    pub fn pending_signals(&self) -> usize {
        self.signals.len()
    }

    /// Whether the pool is inside its own update
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Apply queued adds, removals, and moves in submission order.
    ///
    /// The whole queue is validated first; if any operation names a system
    /// that would not exist at that point, nothing is applied, the queue is
    /// discarded, and the error is returned.
    pub fn commit_system_updates(&mut self) -> EcsResult<usize> {
        self.ensure_idle()?;
        if self.pending.is_empty() {
            return Ok(0);
        }
        let ops = std::mem::take(&mut self.pending);
        self.validate(&ops)?;

        let count = ops.len();
        for op in ops {
            match op {
                PendingSystemOp::Add(entry) => {
                    log::debug!("{}: added system `{}`", self.id, entry.name);
                    self.positions.insert(entry.type_id, self.systems.len());
                    self.systems.push(entry);
                }
                PendingSystemOp::Remove(key) => {
                    if let Some(index) = self.positions.remove(&key.type_id) {
                        self.systems.remove(index);
                        self.reindex_from(index);
                        log::debug!("{}: removed system `{}`", self.id, key.name);
                    }
                }
                PendingSystemOp::Move {
                    system,
                    target,
                    placement,
                } => self.move_system(system, target, placement)?,
            }
        }
        Ok(count)
    }

    pub(crate) fn queue_signal(&mut self, signal: SignalEnvelope) {
        self.signals.push(signal);
    }

    pub(crate) fn take_signals(&mut self) -> Vec<SignalEnvelope> {
        std::mem::take(&mut self.signals)
    }

    /// Detach the order list for running. Positions stay valid meanwhile.
    pub(crate) fn take_systems(&mut self) -> Vec<SystemEntry> {
        self.running = true;
        std::mem::take(&mut self.systems)
    }

    pub(crate) fn restore_systems(&mut self, systems: Vec<SystemEntry>) {
        self.systems = systems;
        self.running = false;
    }

    pub(crate) fn clear(&mut self) {
        self.systems.clear();
        self.positions.clear();
        self.pending.clear();
        self.signals.clear();
    }

    /// The order list is detached while the pool runs
    fn ensure_idle(&self) -> EcsResult<()> {
        if self.running {
            return Err(EcsError::SystemPoolBusy(self.id));
        }
        Ok(())
    }

    fn will_contain(&self, type_id: TypeId) -> bool {
        let mut present = self.positions.contains_key(&type_id);
        for op in &self.pending {
            match op {
                PendingSystemOp::Add(entry) if entry.type_id == type_id => present = true,
                PendingSystemOp::Remove(key) if key.type_id == type_id => present = false,
                _ => {}
            }
        }
        present
    }

    fn validate(&self, ops: &[PendingSystemOp]) -> EcsResult<()> {
        let mut present: HashSet<TypeId> = self.positions.keys().copied().collect();
        let missing = |key: &SystemKey| EcsError::SystemNotFound {
            pool: self.id,
            system: key.name,
        };
        for op in ops {
            match op {
                PendingSystemOp::Add(entry) => {
                    if !present.insert(entry.type_id) {
                        return Err(EcsError::DuplicateSystem {
                            pool: self.id,
                            system: entry.name,
                        });
                    }
                }
                PendingSystemOp::Remove(key) => {
                    if !present.remove(&key.type_id) {
                        return Err(missing(key));
                    }
                }
                PendingSystemOp::Move { system, target, .. } => {
                    if !present.contains(&system.type_id) {
                        return Err(missing(system));
                    }
                    if !present.contains(&target.type_id) {
                        return Err(missing(target));
                    }
                }
            }
        }
        Ok(())
    }

    fn move_system(&mut self, system: SystemKey, target: SystemKey, placement: Placement) -> EcsResult<()> {
        let missing = |key: SystemKey| EcsError::SystemNotFound {
            pool: self.id,
            system: key.name,
        };
        let from = *self.positions.get(&system.type_id).ok_or_else(|| missing(system))?;
        let to = *self.positions.get(&target.type_id).ok_or_else(|| missing(target))?;
        if from == to {
            log::warn!("{}: `{}` cannot be ordered relative to itself", self.id, system.name);
            return Ok(());
        }

        match (placement, from < to) {
            // Lands at to - 1
            (Placement::Before, true) => self.systems[from..to].rotate_left(1),
            // Lands at to
            (Placement::Before, false) => self.systems[to..=from].rotate_right(1),
            // Lands at to
            (Placement::After, true) => self.systems[from..=to].rotate_left(1),
            // Lands at to + 1
            (Placement::After, false) => self.systems[to + 1..=from].rotate_right(1),
        }
        self.reindex_from(from.min(to));
        Ok(())
    }

    fn reindex_from(&mut self, start: usize) {
        for (index, entry) in self.systems.iter().enumerate().skip(start) {
            self.positions.insert(entry.type_id, index);
        }
    }
}

impl fmt::Debug for SystemPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPool")
            .field("id", &self.id)
            .field("systems", &self.system_names())
            .field("pending", &self.pending.len())
            .field("signals", &self.signals.len())
            .finish()
    }
}

/// Queues relative moves for one system, applied at the pool's next commit
///
/// Requests apply in call order; the last one applied wins. Cycles are not
/// detected.
pub struct SystemOrderer<'a> {
    pool: &'a mut SystemPool,
    key: SystemKey,
}

impl SystemOrderer<'_> {
    /// Place this system immediately before `T`
    pub fn before<T: System>(&mut self) -> &mut Self {
        self.queue(SystemKey::of::<T>(), Placement::Before)
    }

    /// Place this system immediately after `T`
    pub fn after<T: System>(&mut self) -> &mut Self {
        self.queue(SystemKey::of::<T>(), Placement::After)
    }

    fn queue(&mut self, target: SystemKey, placement: Placement) -> &mut Self {
        self.pool.pending.push(PendingSystemOp::Move {
            system: self.key,
            target,
            placement,
        });
        self
    }
}

/// Deliver every queued signal to the subscribed systems, in pool order.
/// Returns the number of handler invocations.
pub(crate) fn deliver_signals(
    systems: &mut [SystemEntry],
    signals: &[SignalEnvelope],
    manager: &mut EcsManager,
) -> EcsResult<usize> {
    let mut delivered = 0;
    for signal in signals {
        for entry in systems.iter_mut() {
            if entry.system.is_signal_subscribed(signal.id()) {
                entry.system.handle_signal(manager, signal)?;
                delivered += 1;
            }
        }
    }
    Ok(delivered)
}

/// Run every system once in order
pub(crate) fn run_systems(systems: &mut [SystemEntry], manager: &mut EcsManager) -> EcsResult<()> {
    for entry in systems.iter_mut() {
        log::trace!("Running system `{}`", entry.system.name());
        entry.system.run(manager)?;
    }
    Ok(())
}
