//! The pipeline controller: orchestrates Commit, Execute & Broadcast, and
//! Issue/Fetch once per `step()`.
//!
//! Stages run in reverse program order within a cycle — Commit first, then
//! Execute, then Issue — which is the only ordering discipline that matters:
//! it makes a cycle-N broadcast invisible to cycle-N commit, and keeps a
//! cycle-N issue from firing in the same cycle it was allocated.

use crate::cache::Cache;
use crate::config::Config;
use crate::error::ConfigError;
use crate::gshare::GsharePredictor;
use crate::isa::Opcode;
use crate::lsq::{LoadStoreQueue, LsqKind};
use crate::memory::Memory;
use crate::metrics::Metrics;
use crate::program::ProgramStore;
use crate::registers::{RatEntry, RegisterAliasTable, RegisterFile};
use crate::reservation_station::{ReservationStationPool, RsEntry};
use crate::rob::{Rob, RobTag};
use crate::snapshot::{OccupancySnapshot, Snapshot};

/// Outcome of `run_to_completion`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program drained (no instruction at the current PC, and nothing
    /// left in flight) within the cycle budget.
    Completed { cycles: u64 },
    /// The cycle budget was exhausted first.
    HitCycleLimit { cycles: u64 },
}

pub struct Simulator {
    program: ProgramStore,
    pc: u64,

    registers: RegisterFile,
    rat: RegisterAliasTable,
    rob: Rob,
    alu_rs: ReservationStationPool,
    ls_rs: ReservationStationPool,
    lsq: LoadStoreQueue,

    l1i: Cache,
    l1d: Cache,
    predictor: GsharePredictor,
    memory: Memory,

    issue_width: usize,
    metrics: Metrics,

    trace: bool,
    log: Vec<String>,
}

impl Simulator {
    /// # Errors
    /// Returns `ConfigError` if `config` names a degenerate structure the
    /// pipeline controller cannot make progress with (e.g. a zero-capacity
    /// ROB).
    pub fn new(config: &Config, program: ProgramStore) -> Result<Self, ConfigError> {
        Self::validate(config)?;
        Ok(Self {
            program,
            pc: 0,
            registers: RegisterFile::default(),
            rat: RegisterAliasTable::default(),
            rob: Rob::new(config.rob_capacity),
            alu_rs: ReservationStationPool::new(config.alu_rs_count),
            ls_rs: ReservationStationPool::new(config.ls_rs_count),
            lsq: LoadStoreQueue::new(),
            l1i: Cache::new(config.l1i),
            l1d: Cache::new(config.l1d),
            predictor: GsharePredictor::new(config.ghr_bits),
            memory: Memory::new(config.memory_words),
            issue_width: config.issue_width,
            metrics: Metrics::default(),
            trace: false,
            log: Vec::new(),
        })
    }

    fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.rob_capacity == 0 {
            return Err(ConfigError::ZeroRobCapacity);
        }
        if config.issue_width == 0 {
            return Err(ConfigError::ZeroIssueWidth);
        }
        if config.alu_rs_count == 0 || config.ls_rs_count == 0 {
            return Err(ConfigError::ZeroReservationStations { alu: config.alu_rs_count, ls: config.ls_rs_count });
        }
        if config.l1i.sets == 0 || config.l1i.ways == 0 {
            return Err(ConfigError::DegenerateCache { name: "L1I", sets: config.l1i.sets, ways: config.l1i.ways });
        }
        if config.l1d.sets == 0 || config.l1d.ways == 0 {
            return Err(ConfigError::DegenerateCache { name: "L1D", sets: config.l1d.sets, ways: config.l1d.ways });
        }
        Ok(())
    }

    /// Enables the in-memory cycle-tagged log, appended to but never
    /// printed, so the library stays host-agnostic.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    #[must_use]
    pub fn pc(&self) -> u64 {
        self.pc
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Advances the simulated clock by exactly one cycle: Commit, then
    /// (unless Commit flushed) Execute & Broadcast, then Issue.
    pub fn step(&mut self) {
        let flushed = self.commit_stage();
        if !flushed {
            self.execute_and_broadcast();
            self.fetch_and_issue();
        }
        self.metrics.record_cycle(self.rob.len(), self.alu_rs.occupied(), self.ls_rs.occupied(), self.lsq.len());
    }

    /// True once there is nothing left to fetch and nothing left in flight.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.program.get(self.pc).is_none() && self.rob.is_empty()
    }

    /// Steps until `is_drained` or `max_cycles` is reached.
    pub fn run_to_completion(&mut self, max_cycles: u64) -> RunOutcome {
        let mut steps = 0;
        while steps < max_cycles {
            if self.is_drained() {
                return RunOutcome::Completed { cycles: self.metrics.cycles };
            }
            self.step();
            steps += 1;
        }
        if self.is_drained() {
            RunOutcome::Completed { cycles: self.metrics.cycles }
        } else {
            RunOutcome::HitCycleLimit { cycles: self.metrics.cycles }
        }
    }

    // ---- Commit -------------------------------------------------------

    /// Returns `true` iff this call triggered a flush — the caller must
    /// then skip Execute and Issue for the remainder of the cycle.
    fn commit_stage(&mut self) -> bool {
        let Some(head) = self.rob.peek_head() else { return false };
        if !head.ready {
            return false;
        }
        let tag = head.tag;
        let opcode = head.opcode;
        let rd = head.rd;
        let result = head.result;
        let predicted_taken = head.predicted_taken;
        let target_address = head.target_address;
        let pc = head.pc;

        if opcode.is_branch() {
            return self.commit_branch(tag, pc, result, predicted_taken, target_address);
        }

        if opcode.is_memory() && !self.lsq.head_ready_for(tag) {
            return false; // LSQ head not ready: commit stalls, ROB head stays.
        }

        if rd != 0 && opcode.writes_register() {
            self.registers.write(rd, result);
            self.rat.revert_if_matches(rd, tag);
        }

        if opcode.is_memory() {
            if let Some(entry) = self.lsq.pop_front() {
                if opcode == Opcode::Sw {
                    let addr = entry.address.unwrap_or(0);
                    let data = entry.store_data.unwrap_or(0);
                    let _ = self.l1d.access(addr, true);
                    self.memory.write_word(addr, data);
                }
            }
        }

        let _ = self.rob.commit_head();
        self.metrics.record_commit();
        false
    }

    fn commit_branch(&mut self, tag: RobTag, pc: u64, result: i32, predicted_taken: bool, target: u64) -> bool {
        let actual_taken = result == 1;
        let mispredicted = actual_taken != predicted_taken;
        self.predictor.update(pc, actual_taken);
        self.metrics.record_branch_resolution(mispredicted);

        let _ = self.rob.commit_head();
        self.metrics.record_commit();

        if self.trace {
            self.log.push(format!(
                "cycle {}: commit branch tag={} pc={pc:#x} taken={actual_taken} predicted={predicted_taken}",
                self.metrics.cycles + 1,
                tag.0
            ));
        }

        if mispredicted {
            if self.trace {
                self.log.push(format!(
                    "cycle {}: mispredict at pc={pc:#x}, flushing and redirecting to {target:#x}",
                    self.metrics.cycles + 1
                ));
            }
            self.flush(target);
            return true;
        }
        false
    }

    /// Discards every speculative structure and redirects fetch. The ARF is
    /// untouched: it already holds the architecturally committed state.
    fn flush(&mut self, target_pc: u64) {
        self.rob.flush();
        self.alu_rs.flush();
        self.ls_rs.flush();
        self.lsq.flush();
        self.rat.flush();
        self.pc = target_pc;
    }

    // ---- Execute & broadcast -------------------------------------------

    /// Runs the pool in two passes around a shared completions list, so a
    /// same-cycle CDB broadcast reaches every waiting entry regardless of
    /// which pool produced it or which pool scans first. Without this, a
    /// consumer whose producer retires (and is evicted from the ROB) on the
    /// very next cycle can miss the broadcast forever: `rob.status` only
    /// answers for tags still live in the ROB, and Commit runs before
    /// Execute next cycle.
    fn execute_and_broadcast(&mut self) {
        Self::snoop_rob(&mut self.alu_rs, &self.rob);
        Self::snoop_rob(&mut self.ls_rs, &self.rob);

        let mut completions: Vec<(RobTag, i32)> = Vec::new();
        {
            let rob = &mut self.rob;
            let lsq = &mut self.lsq;
            let l1d = &mut self.l1d;
            let memory = &mut self.memory;
            let out = &mut completions;
            self.alu_rs.for_each_busy_mut(|entry| Self::execute_entry(entry, rob, lsq, l1d, memory, out));
            self.ls_rs.for_each_busy_mut(|entry| Self::execute_entry(entry, rob, lsq, l1d, memory, out));
        }

        for (tag, result) in &completions {
            self.rob.broadcast(*tag, *result);
        }

        Self::snoop_completions(&mut self.alu_rs, &completions);
        Self::snoop_completions(&mut self.ls_rs, &completions);
    }

    /// Resolves `qj`/`qk` against producers that broadcast in an earlier
    /// cycle and are still live in the ROB.
    fn snoop_rob(pool: &mut ReservationStationPool, rob: &Rob) {
        pool.for_each_busy_mut(|entry| {
            if let Some(qj) = entry.qj {
                if let Some((true, value)) = rob.status(qj) {
                    entry.vj = value;
                    entry.qj = None;
                }
            }
            if let Some(qk) = entry.qk {
                if let Some((true, value)) = rob.status(qk) {
                    entry.vk = value;
                    entry.qk = None;
                }
            }
        });
    }

    /// Resolves `qj`/`qk` against producers that completed this very cycle,
    /// catching entries whose own pool was scanned before the producer's.
    fn snoop_completions(pool: &mut ReservationStationPool, completions: &[(RobTag, i32)]) {
        pool.for_each_busy_mut(|entry| {
            if let Some(qj) = entry.qj {
                if let Some((_, value)) = completions.iter().find(|(tag, _)| *tag == qj) {
                    entry.vj = *value;
                    entry.qj = None;
                }
            }
            if let Some(qk) = entry.qk {
                if let Some((_, value)) = completions.iter().find(|(tag, _)| *tag == qk) {
                    entry.vk = *value;
                    entry.qk = None;
                }
            }
        });
    }

    fn execute_entry(
        entry: &mut RsEntry,
        rob: &mut Rob,
        lsq: &mut LoadStoreQueue,
        l1d: &mut Cache,
        memory: &mut Memory,
        completions: &mut Vec<(RobTag, i32)>,
    ) {
        if !entry.is_wakeable() || entry.remaining == 0 {
            return;
        }

        if entry.inst.opcode.is_memory() && entry.effective_address.is_none() {
            entry.effective_address = Some(Self::effective_address(entry));
        }

        entry.remaining -= 1;
        if entry.remaining > 0 {
            return;
        }

        let result = Self::complete(entry, rob, lsq, l1d, memory);
        completions.push((entry.dest, result));
        entry.done = true;
    }

    fn effective_address(entry: &RsEntry) -> u64 {
        (i64::from(entry.vj) + i64::from(entry.inst.imm)) as u64
    }

    fn complete(entry: &RsEntry, rob: &mut Rob, lsq: &mut LoadStoreQueue, l1d: &mut Cache, memory: &mut Memory) -> i32 {
        match entry.inst.opcode {
            Opcode::Add => entry.vj.wrapping_add(entry.vk),
            Opcode::Sub => entry.vj.wrapping_sub(entry.vk),
            Opcode::And => entry.vj & entry.vk,
            Opcode::Or => entry.vj | entry.vk,
            Opcode::Xor => entry.vj ^ entry.vk,
            Opcode::Slt => i32::from(entry.vj < entry.vk),
            Opcode::Addi => entry.vj.wrapping_add(entry.inst.imm),
            Opcode::Lw => {
                let addr = Self::effective_address(entry);
                let _ = l1d.access(addr, false);
                let value = memory.read_word(addr);
                lsq.resolve_load(entry.dest, addr);
                value
            }
            Opcode::Sw => {
                let addr = Self::effective_address(entry);
                lsq.resolve_store(entry.dest, addr, entry.vk);
                entry.vk
            }
            Opcode::Beq | Opcode::Bne => {
                let taken = match entry.inst.opcode {
                    Opcode::Beq => entry.vj == entry.vk,
                    _ => entry.vj != entry.vk,
                };
                let target = if taken {
                    (i64::from(entry.inst.pc as i32) + i64::from(entry.inst.imm)) as u64
                } else {
                    entry.inst.pc + 4
                };
                rob.set_target_address(entry.dest, target);
                i32::from(taken)
            }
            Opcode::Jal | Opcode::Jalr | Opcode::Nop => 0,
        }
    }

    // ---- Fetch & Issue -------------------------------------------------

    fn fetch_and_issue(&mut self) {
        for _ in 0..self.issue_width {
            if self.rob.is_full() {
                break;
            }
            let Some(inst) = self.program.get(self.pc) else { break };
            let inst = inst.clone();

            let pool_is_ls = inst.opcode.is_memory();
            let has_slot = if pool_is_ls { self.ls_rs.has_free_slot() } else { self.alu_rs.has_free_slot() };
            if !has_slot {
                break;
            }

            let _ = self.l1i.access(self.pc, false);

            let predicted_taken = inst.opcode.is_branch() && self.predictor.predict(self.pc);

            let Some(tag) = self.rob.allocate(inst.opcode, inst.rd, inst.pc, predicted_taken) else { break };

            let (vj, qj) = self.rename_source(inst.rs1);
            let (vk, qk) = self.rename_source(inst.rs2);

            if pool_is_ls {
                let kind = if inst.opcode == Opcode::Lw { LsqKind::Load } else { LsqKind::Store };
                self.lsq.push(tag, kind);
            }

            let total = inst.opcode.latency();
            let entry = RsEntry {
                inst: inst.clone(),
                vj,
                vk,
                qj,
                qk,
                dest: tag,
                remaining: total,
                total,
                effective_address: None,
                done: false,
            };
            if pool_is_ls {
                let _ = self.ls_rs.allocate(entry);
            } else {
                let _ = self.alu_rs.allocate(entry);
            }

            if inst.opcode.writes_register() && inst.rd != 0 {
                self.rat.rename(inst.rd, tag);
            }

            self.pc = Self::next_pc(&inst, predicted_taken);
        }
    }

    fn rename_source(&self, reg: u8) -> (i32, Option<RobTag>) {
        match self.rat.get(reg) {
            RatEntry::Architectural => (self.registers.read(reg), None),
            RatEntry::Renamed(tag) => match self.rob.status(tag) {
                Some((true, value)) => (value, None),
                _ => (0, Some(tag)),
            },
        }
    }

    fn next_pc(inst: &crate::isa::DecodedInstruction, predicted_taken: bool) -> u64 {
        match inst.opcode {
            Opcode::Beq | Opcode::Bne => {
                if predicted_taken {
                    (i64::from(inst.pc as i32) + i64::from(inst.imm)) as u64
                } else {
                    inst.pc + 4
                }
            }
            Opcode::Jal => (i64::from(inst.pc as i32) + i64::from(inst.imm)) as u64,
            _ => inst.pc + 4,
        }
    }

    /// Bundles the run's observable outputs for a caller that doesn't want
    /// to poke at private fields.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.metrics.cycles,
            pc: self.pc,
            committed: self.metrics.committed,
            ipc: self.metrics.ipc(),
            branch_accuracy: self.metrics.branch_accuracy(),
            registers: std::array::from_fn(|i| self.registers.read(i as u8)),
            rat: self.rat.snapshot(),
            rob: OccupancySnapshot {
                capacity: self.rob.capacity(),
                len: self.rob.len(),
                mean: self.metrics.rob_occupancy.mean(),
                max: self.metrics.rob_occupancy.max(),
            },
            alu_rs: OccupancySnapshot {
                capacity: self.alu_rs.capacity(),
                len: self.alu_rs.occupied(),
                mean: self.metrics.alu_rs_occupancy.mean(),
                max: self.metrics.alu_rs_occupancy.max(),
            },
            ls_rs: OccupancySnapshot {
                capacity: self.ls_rs.capacity(),
                len: self.ls_rs.occupied(),
                mean: self.metrics.ls_rs_occupancy.mean(),
                max: self.metrics.ls_rs_occupancy.max(),
            },
            lsq: OccupancySnapshot {
                capacity: self.ls_rs.capacity(), // LSQ has no fixed capacity of its own; mirrors LS issue bandwidth
                len: self.lsq.len(),
                mean: self.metrics.lsq_occupancy.mean(),
                max: self.metrics.lsq_occupancy.max(),
            },
            l1i: self.l1i.counters(),
            l1d: self.l1d.counters(),
        }
    }
}
