pub mod combat_log;
pub mod combatant;
pub mod context;
pub mod encounter;
pub mod game_data;
pub mod session;
pub mod signal_processor;
pub mod state;
pub mod storage;
pub mod wire;

// Re-exports for convenience
pub use combat_log::{LogEvent, LogFlags, LogParser, ParseError};
pub use combatant::{CombatantReconciler, CombatantSnapshot, CombatantStats};
pub use context::{ConfigError, ServerConfigExt};
pub use encounter::{Encounter, EncounterOutcome, TeamTracker};
pub use session::{BroadcastPublisher, ConfigKeyDirectory, ServerContext, SessionError};
pub use signal_processor::{EncounterProcessor, GameSignal, SignalHandler};
pub use state::{FinishedEncounter, SessionState};
pub use storage::{EncounterArchive, StorageError};
pub use wire::{CodecError, Packet};
