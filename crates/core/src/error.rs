//! Structural configuration errors.
//!
//! The pipeline itself surfaces no recoverable runtime error: stalls are
//! backpressure, mispredicts are handled by flush. The one boundary this
//! crate does own is rejecting a `Config` the pipeline controller cannot run
//! with — a plain enum with a manual `Display`/`Error` impl, not a derive
//! macro.
use std::fmt;

/// A `Config` value that violates a structural constraint the pipeline
/// controller relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The ROB must hold at least one in-flight instruction.
    ZeroRobCapacity,
    /// Issue width of zero would make no forward progress possible.
    ZeroIssueWidth,
    /// Both reservation-station pools must have at least one entry.
    ZeroReservationStations { alu: usize, ls: usize },
    /// A cache with zero sets or zero ways cannot address any line.
    DegenerateCache { name: &'static str, sets: usize, ways: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRobCapacity => write!(f, "ROB capacity must be at least 1"),
            Self::ZeroIssueWidth => write!(f, "issue width must be at least 1"),
            Self::ZeroReservationStations { alu, ls } => write!(
                f,
                "ALU and LS reservation-station pools must be non-empty (alu={alu}, ls={ls})"
            ),
            Self::DegenerateCache { name, sets, ways } => write!(
                f,
                "{name} cache needs at least one set and one way (sets={sets}, ways={ways})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
