//! Configuration for the simulator's micro-architectural parameters.
//!
//! A `defaults` module of named constants plus a struct whose fields fall
//! back to them.

use serde::{Deserialize, Serialize};

/// Default micro-architectural constants.
mod defaults {
    pub const ROB_CAPACITY: usize = 32;
    pub const ISSUE_WIDTH: usize = 2;
    pub const ALU_RS_COUNT: usize = 8;
    pub const LS_RS_COUNT: usize = 4;

    pub const CACHE_SETS: usize = 32;
    pub const CACHE_WAYS: usize = 2;
    pub const CACHE_LINE_BYTES: usize = 64;
    pub const L1I_HIT_LATENCY: u64 = 1;
    pub const L1D_HIT_LATENCY: u64 = 2;
    pub const CACHE_MISS_PENALTY: u64 = 10;

    pub const GHR_BITS: u32 = 10;

    pub const MEMORY_WORDS: usize = 65536;
}

/// Parameters for one set-associative cache instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub sets: usize,
    pub ways: usize,
    pub line_bytes: usize,
    pub hit_latency: u64,
    pub miss_penalty: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sets: defaults::CACHE_SETS,
            ways: defaults::CACHE_WAYS,
            line_bytes: defaults::CACHE_LINE_BYTES,
            hit_latency: defaults::L1D_HIT_LATENCY,
            miss_penalty: defaults::CACHE_MISS_PENALTY,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn l1i() -> Self {
        Self {
            hit_latency: defaults::L1I_HIT_LATENCY,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn l1d() -> Self {
        Self {
            hit_latency: defaults::L1D_HIT_LATENCY,
            ..Self::default()
        }
    }
}

/// Top-level simulator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rob_capacity: usize,
    pub issue_width: usize,
    pub alu_rs_count: usize,
    pub ls_rs_count: usize,
    pub l1i: CacheConfig,
    pub l1d: CacheConfig,
    pub ghr_bits: u32,
    pub memory_words: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rob_capacity: defaults::ROB_CAPACITY,
            issue_width: defaults::ISSUE_WIDTH,
            alu_rs_count: defaults::ALU_RS_COUNT,
            ls_rs_count: defaults::LS_RS_COUNT,
            l1i: CacheConfig::l1i(),
            l1d: CacheConfig::l1d(),
            ghr_bits: defaults::GHR_BITS,
            memory_words: defaults::MEMORY_WORDS,
        }
    }
}
