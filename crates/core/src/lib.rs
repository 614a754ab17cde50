//! Cycle-accurate out-of-order RISC-V pipeline engine: ROB, LSQ, reservation
//! stations, gshare branch prediction, and L1 instruction/data caches.
//!
//! `Simulator` is the single entry point: build a [`config::Config`] and a
//! [`program::ProgramStore`], construct one with [`simulator::Simulator::new`],
//! then drive it with [`simulator::Simulator::step`] or
//! [`simulator::Simulator::run_to_completion`].

pub mod cache;
pub mod config;
pub mod error;
pub mod gshare;
pub mod isa;
pub mod lsq;
pub mod memory;
pub mod metrics;
pub mod program;
pub mod registers;
pub mod reservation_station;
pub mod rob;
pub mod simulator;
pub mod snapshot;

pub use config::Config;
pub use error::ConfigError;
pub use isa::{DecodedInstruction, Opcode};
pub use program::ProgramStore;
pub use simulator::{RunOutcome, Simulator};
pub use snapshot::Snapshot;
