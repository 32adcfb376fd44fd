//! Error types for the event bus.

/// Errors reported by [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// [`EventBus::arm_wake`](crate::EventBus::arm_wake) was called a second time.
    #[error("the wake channel has already been armed")]
    WakeAlreadyArmed,

    /// A listener tried to drain the bus while it was already being drained.
    #[error("the event queue is already being drained")]
    ReentrantDrain,
}
