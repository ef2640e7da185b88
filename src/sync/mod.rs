pub mod engine;
pub mod fetch;
pub mod locator;
pub mod merge;
pub mod pacing;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{
    PeriodOutcome, RecoveryTokenPolicy, SyncEngine, SyncError, SyncReport, SyncSettings,
};
pub use pacing::{Pacing, Shutdown};
