//! Shared types for the intent relayer.
//!
//! Holds the on-chain intent model, the decoded event records produced by
//! discovery, the exchange result types consumed by the executor, and the
//! configuration schema validator used by every pluggable backend.

pub mod events;
pub mod exchange;
pub mod intent;
pub mod validation;

pub use events::*;
pub use exchange::*;
pub use intent::*;
pub use validation::*;
