//! A serializable bundle of the simulator's observable outputs, built on
//! demand by `Simulator::snapshot`. A front-end (out of scope for this
//! crate) can render or diff this without reaching into private simulator
//! fields.

use serde::Serialize;

use crate::cache::CacheCounters;

/// One architectural register's rename state, flattened for serialization:
/// `None` means architectural, `Some(tag)` means renamed to that ROB tag.
pub type RatSnapshot = Option<u64>;

#[derive(Clone, Debug, Serialize)]
pub struct OccupancySnapshot {
    pub capacity: usize,
    pub len: usize,
    pub mean: f64,
    pub max: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub pc: u64,
    pub committed: u64,
    pub ipc: f64,
    pub branch_accuracy: f64,
    pub registers: [i32; 32],
    pub rat: Vec<RatSnapshot>,
    pub rob: OccupancySnapshot,
    pub alu_rs: OccupancySnapshot,
    pub ls_rs: OccupancySnapshot,
    pub lsq: OccupancySnapshot,
    pub l1i: CacheCounters,
    pub l1d: CacheCounters,
}
