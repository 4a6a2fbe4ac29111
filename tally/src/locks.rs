//! Keyed per-link locks with a generation counter.
//!
//! Every tracking link gets its own slot: an async mutex that serializes
//! recomputes of that link, and a generation counter bumped by each accepted
//! trigger. A recompute captures the generation when it is accepted and may
//! only commit while the counter still holds that value. Unrelated links never
//! contend.
//!
//! A slot lives only while some trigger holds or waits for it; the last guard
//! released removes it from the map, and the link's generation restarts at 0.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tally_core::TrackingLinkId;
use tokio::sync::OwnedMutexGuard;

type SlotMap = HashMap<TrackingLinkId, Arc<LinkSlot>>;

#[derive(Default)]
struct LinkSlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    generation: AtomicU64,
}

/// Exclusive right to recompute one link, tagged with the generation that was
/// current when the trigger was accepted.
pub struct LinkGuard {
    link: TrackingLinkId,
    slots: Arc<Mutex<SlotMap>>,
    slot: Arc<LinkSlot>,
    generation: u64,
    held: Option<OwnedMutexGuard<()>>,
}

impl LinkGuard {
    /// Generation captured for this recompute.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a newer trigger for the same link has been accepted.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.slot.generation.load(Ordering::SeqCst) == self.generation
    }
}

impl Drop for LinkGuard {
    fn drop(&mut self) {
        drop(self.held.take());
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        // Map entry plus this guard: nobody else holds or waits for the slot.
        let idle = Arc::strong_count(&self.slot) == 2 && self.slot.lock.try_lock().is_ok();
        if idle && slots.get(&self.link).is_some_and(|s| Arc::ptr_eq(s, &self.slot)) {
            slots.remove(&self.link);
        }
    }
}

/// Map of per-link slots.
#[derive(Default)]
pub struct LinkLocks {
    slots: Arc<Mutex<SlotMap>>,
}

impl LinkLocks {
    /// Create an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, link: &TrackingLinkId) -> Arc<LinkSlot> {
        let mut guard = self.slots.lock().expect("mutex poisoned");
        Arc::clone(guard.entry(link.clone()).or_default())
    }

    /// Accept a manual trigger: supersede any in-flight recompute of `link`,
    /// then wait for the slot.
    pub async fn acquire(&self, link: &TrackingLinkId) -> LinkGuard {
        let slot = self.slot(link);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let held = Arc::clone(&slot.lock).lock_owned().await;
        self.guard(link, slot, generation, held)
    }

    /// Accept a periodic trigger only if no recompute of `link` is in flight.
    ///
    /// A busy slot yields `None` and leaves the generation untouched.
    pub fn try_acquire(&self, link: &TrackingLinkId) -> Option<LinkGuard> {
        let slot = self.slot(link);
        let held = Arc::clone(&slot.lock).try_lock_owned().ok()?;
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Some(self.guard(link, slot, generation, held))
    }

    fn guard(
        &self,
        link: &TrackingLinkId,
        slot: Arc<LinkSlot>,
        generation: u64,
        held: OwnedMutexGuard<()>,
    ) -> LinkGuard {
        LinkGuard {
            link: link.clone(),
            slots: Arc::clone(&self.slots),
            slot,
            generation,
            held: Some(held),
        }
    }

    /// Latest accepted generation for `link` (0 when no slot is live).
    #[must_use]
    pub fn generation(&self, link: &TrackingLinkId) -> u64 {
        let guard = self.slots.lock().expect("mutex poisoned");
        guard
            .get(link)
            .map_or(0, |s| s.generation.load(Ordering::SeqCst))
    }

    /// Whether a recompute of `link` currently holds the slot.
    #[must_use]
    pub fn is_busy(&self, link: &TrackingLinkId) -> bool {
        let guard = self.slots.lock().expect("mutex poisoned");
        guard.get(link).is_some_and(|s| s.lock.try_lock().is_err())
    }

    /// Number of links with a live slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().expect("mutex poisoned").len()
    }

    /// True when no link has a live slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
