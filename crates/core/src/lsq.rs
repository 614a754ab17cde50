//! Load/Store Queue.
//!
//! A plain FIFO in program order: entries are pushed at Issue (for every
//! LW/SW) and popped at Commit, once the ROB head is itself a memory op and
//! is also this queue's head. Does not provide store-to-load forwarding.

use std::collections::VecDeque;

use crate::rob::RobTag;

/// Load or store, mirroring the two memory-class opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LsqKind {
    Load,
    Store,
}

/// One in-flight memory operation.
#[derive(Clone, Debug)]
pub struct LsqEntry {
    pub tag: RobTag,
    pub kind: LsqKind,
    pub address: Option<u64>,
    /// Only meaningful for stores.
    pub store_data: Option<i32>,
    pub mem_ready: bool,
}

/// Program-order queue of in-flight loads and stores.
#[derive(Default)]
pub struct LoadStoreQueue {
    entries: VecDeque<LsqEntry>,
}

impl LoadStoreQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new entry at the tail with address/data unresolved.
    pub fn push(&mut self, tag: RobTag, kind: LsqKind) {
        self.entries.push_back(LsqEntry { tag, kind, address: None, store_data: None, mem_ready: false });
    }

    /// Resolves a load's effective address at Execute.
    pub fn resolve_load(&mut self, tag: RobTag, address: u64) {
        if let Some(entry) = self.find_mut(tag) {
            entry.address = Some(address);
            entry.mem_ready = true;
        }
    }

    /// Resolves a store's effective address and data at Execute.
    pub fn resolve_store(&mut self, tag: RobTag, address: u64, data: i32) {
        if let Some(entry) = self.find_mut(tag) {
            entry.address = Some(address);
            entry.store_data = Some(data);
            entry.mem_ready = true;
        }
    }

    #[must_use]
    pub fn front(&self) -> Option<&LsqEntry> {
        self.entries.front()
    }

    /// True iff the head of this queue is `tag` and it is ready to commit —
    /// the gate Commit checks before touching memory.
    #[must_use]
    pub fn head_ready_for(&self, tag: RobTag) -> bool {
        self.front().is_some_and(|e| e.tag == tag && e.mem_ready)
    }

    pub fn pop_front(&mut self) -> Option<LsqEntry> {
        self.entries.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards every entry.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    fn find_mut(&mut self, tag: RobTag) -> Option<&mut LsqEntry> {
        self.entries.iter_mut().find(|e| e.tag == tag)
    }
}
