//! Reservation stations.
//!
//! Two independent pools (ALU, Load/Store) of fixed size; each busy entry
//! holds either captured operand values or the producer tag it is still
//! waiting on. An entry is "wake-able" when both `qj` and `qk` are `None`.

use crate::isa::DecodedInstruction;
use crate::rob::RobTag;

/// One reservation-station slot.
#[derive(Clone, Debug)]
pub struct RsEntry {
    pub inst: DecodedInstruction,
    pub vj: i32,
    pub vk: i32,
    pub qj: Option<RobTag>,
    pub qk: Option<RobTag>,
    pub dest: RobTag,
    pub remaining: u32,
    pub total: u32,
    /// Effective address for LW/SW, computed on the first execute cycle
    /// once operands are ready.
    pub effective_address: Option<u64>,
    /// Latched once the result has been computed but before the ROB has
    /// observed the broadcast in the same scan, so the caller knows to
    /// free this slot.
    pub done: bool,
}

impl RsEntry {
    /// True once neither operand is still waiting on a producer.
    #[must_use]
    pub const fn is_wakeable(&self) -> bool {
        self.qj.is_none() && self.qk.is_none()
    }
}

/// A fixed-capacity pool of reservation stations.
pub struct ReservationStationPool {
    slots: Vec<Option<RsEntry>>,
}

impl ReservationStationPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Inserts `entry` into the first free slot. Returns `false` (and drops
    /// nothing — the caller already checked `has_free_slot`) if the pool is
    /// full.
    pub fn allocate(&mut self, entry: RsEntry) -> bool {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
            true
        } else {
            false
        }
    }

    /// Visits every occupied slot, allowing wake-up/execute mutation and
    /// freeing slots whose instruction has completed this cycle.
    pub fn for_each_busy_mut(&mut self, mut f: impl FnMut(&mut RsEntry)) {
        for slot in &mut self.slots {
            if let Some(entry) = slot {
                f(entry);
                if entry.done {
                    *slot = None;
                }
            }
        }
    }

    /// Discards every entry.
    pub fn flush(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::isa::Opcode;

    fn entry(dest: u64) -> RsEntry {
        RsEntry {
            inst: DecodedInstruction::nop(0),
            vj: 0,
            vk: 0,
            qj: None,
            qk: None,
            dest: RobTag(dest),
            remaining: 1,
            total: 1,
            effective_address: None,
            done: false,
        }
    }

    #[test]
    fn allocate_fills_free_slots_then_reports_full() {
        let mut pool = ReservationStationPool::new(2);
        assert!(pool.allocate(entry(1)));
        assert!(pool.allocate(entry(2)));
        assert!(pool.has_free_slot().then_some(()).is_none());
        assert!(!pool.allocate(entry(3)));
    }

    #[test]
    fn wakeable_requires_both_tags_clear() {
        let mut e = entry(1);
        e.qj = Some(RobTag(5));
        assert!(!e.is_wakeable());
        e.qj = None;
        assert!(e.is_wakeable());
    }

    #[test]
    fn done_entries_are_freed_after_the_scan() {
        let mut pool = ReservationStationPool::new(2);
        let _ = pool.allocate(entry(1));
        let _ = pool.allocate(entry(2));
        pool.for_each_busy_mut(|e| {
            if e.dest == RobTag(1) {
                e.done = true;
            }
        });
        assert_eq!(pool.occupied(), 1);
    }

    #[test]
    fn flush_frees_every_slot() {
        let mut pool = ReservationStationPool::new(2);
        let _ = pool.allocate(entry(1));
        pool.flush();
        assert_eq!(pool.occupied(), 0);
    }

    #[test]
    fn opcode_is_preserved_through_allocation() {
        let mut pool = ReservationStationPool::new(1);
        let mut e = entry(1);
        e.inst.opcode = Opcode::Add;
        let _ = pool.allocate(e);
        pool.for_each_busy_mut(|e| assert_eq!(e.inst.opcode, Opcode::Add));
    }
}
