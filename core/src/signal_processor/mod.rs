pub mod handler;
pub mod processor;
pub mod signal;

mod combat_state;


pub use handler::SignalHandler;
pub use processor::EncounterProcessor;
pub use signal::GameSignal;
