//! Turns the source's cumulative combatant counters into an incremental timeline.

mod reconciler;
mod snapshot;

#[cfg(test)]
mod reconciler_tests;

pub use reconciler::CombatantReconciler;
pub use snapshot::{CombatantSnapshot, CombatantStats};
