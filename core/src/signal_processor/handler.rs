use super::signal::GameSignal;
use crate::encounter::Encounter;

/// Trait for systems that react to encounter lifecycle signals.
/// Implement this for reconcilers, archivers, publishers, etc.
pub trait SignalHandler {
    /// Handle a single signal with the current encounter as context.
    fn handle_signal(&mut self, signal: &GameSignal, encounter: &Encounter);

    /// Handle multiple signals (default implementation calls handle_signal for each)
    fn handle_signals(&mut self, signals: &[GameSignal], encounter: &Encounter) {
        for signal in signals {
            self.handle_signal(signal, encounter);
        }
    }
}
