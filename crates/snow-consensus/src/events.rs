//! Dependency registry for deferred accepts and rejects.
//!
//! Consensus frequently reaches a verdict on an item whose effects must
//! wait for other items: a transaction cannot accept before its
//! dependencies, a vertex cannot accept before its parents. Rather than
//! callback chains, pending work is parked as a [`Blockable`] in a
//! [`Blocker`] keyed by the ids it waits on. As ids are decided the owner
//! signals the registry and executes the events handed back.

use indexmap::IndexMap;
use snow_ids::Id;
use snow_utils::Set;

/// A pending operation parked on a set of dependency ids.
///
/// Callbacks return the event the owning engine must apply, if any; a
/// blockable never touches the engine directly, which keeps the registry
/// free of back-references (the graph owns its nodes arena-style).
pub trait Blockable {
    /// Event type handed back to the owner when progress is possible.
    type Event;

    /// Ids this blockable is waiting on at registration time.
    fn dependencies(&self) -> &Set<Id>;

    /// Signals that `id` was fulfilled (accepted).
    fn fulfill(&mut self, id: &Id) -> Option<Self::Event>;

    /// Signals that `id` was abandoned (rejected).
    fn abandon(&mut self, id: &Id) -> Option<Self::Event>;

    /// Invoked once at registration when there is nothing to wait on.
    fn update(&mut self) -> Option<Self::Event>;
}

struct Slot<B> {
    blockable: B,
    /// Outstanding dependency registrations still pointing at this slot.
    remaining: usize,
}

/// Registry of blockables indexed by the dependency ids they wait on.
///
/// Each id is delivered to each blockable at most once; a blockable is
/// dropped once every id it registered under has been signalled.
pub struct Blocker<B: Blockable> {
    deps: IndexMap<Id, Vec<usize>>,
    slots: Vec<Option<Slot<B>>>,
    free: Vec<usize>,
}

impl<B: Blockable> Default for Blocker<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Blockable> Blocker<B> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deps: IndexMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Registers a blockable under each of its outstanding dependencies.
    ///
    /// A blockable with no dependencies is not stored; its `update` fires
    /// immediately and any resulting event is returned.
    pub fn register(&mut self, mut blockable: B) -> Vec<B::Event> {
        let dep_ids = blockable.dependencies().to_vec();
        if dep_ids.is_empty() {
            return blockable.update().into_iter().collect();
        }

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        for id in &dep_ids {
            self.deps.entry(*id).or_default().push(slot);
        }
        self.slots[slot] = Some(Slot {
            blockable,
            remaining: dep_ids.len(),
        });
        Vec::new()
    }

    /// Signals every blockable waiting on `id` that it was fulfilled.
    pub fn fulfill(&mut self, id: &Id) -> Vec<B::Event> {
        self.signal(id, true)
    }

    /// Signals every blockable waiting on `id` that it was abandoned.
    pub fn abandon(&mut self, id: &Id) -> Vec<B::Event> {
        self.signal(id, false)
    }

    fn signal(&mut self, id: &Id, fulfilled: bool) -> Vec<B::Event> {
        let Some(waiting) = self.deps.shift_remove(id) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for slot in waiting {
            let Some(entry) = self.slots[slot].as_mut() else {
                continue;
            };
            let event = if fulfilled {
                entry.blockable.fulfill(id)
            } else {
                entry.blockable.abandon(id)
            };
            events.extend(event);

            entry.remaining -= 1;
            if entry.remaining == 0 {
                self.slots[slot] = None;
                self.free.push(slot);
            }
        }
        events
    }

    /// Returns the number of parked blockables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
