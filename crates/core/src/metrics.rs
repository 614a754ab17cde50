//! Performance counters and occupancy metrics.

/// Running mean/max tracker for a structure's per-cycle occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OccupancyTracker {
    sum: u64,
    samples: u64,
    max: usize,
}

impl OccupancyTracker {
    pub fn record(&mut self, value: usize) {
        self.sum += value as u64;
        self.samples += 1;
        self.max = self.max.max(value);
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.sum as f64 / self.samples as f64 }
    }

    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }
}

/// Cycle-level counters and occupancy, aggregated once per `step()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Metrics {
    pub cycles: u64,
    pub committed: u64,
    pub branch_predictions: u64,
    pub branch_mispredictions: u64,
    pub rob_occupancy: OccupancyTracker,
    pub alu_rs_occupancy: OccupancyTracker,
    pub ls_rs_occupancy: OccupancyTracker,
    pub lsq_occupancy: OccupancyTracker,
}

impl Metrics {
    /// Samples structural occupancy for the cycle just completed.
    pub fn record_cycle(&mut self, rob_len: usize, alu_rs_len: usize, ls_rs_len: usize, lsq_len: usize) {
        self.cycles += 1;
        self.rob_occupancy.record(rob_len);
        self.alu_rs_occupancy.record(alu_rs_len);
        self.ls_rs_occupancy.record(ls_rs_len);
        self.lsq_occupancy.record(lsq_len);
    }

    pub fn record_commit(&mut self) {
        self.committed += 1;
    }

    pub fn record_branch_resolution(&mut self, mispredicted: bool) {
        self.branch_predictions += 1;
        if mispredicted {
            self.branch_mispredictions += 1;
        }
    }

    #[must_use]
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 { 0.0 } else { self.committed as f64 / self.cycles as f64 }
    }

    /// Fraction of resolved branches whose prediction matched the outcome;
    /// `1.0` when no branch has resolved yet.
    #[must_use]
    pub fn branch_accuracy(&self) -> f64 {
        if self.branch_predictions == 0 {
            1.0
        } else {
            1.0 - (self.branch_mispredictions as f64 / self.branch_predictions as f64)
        }
    }
}
