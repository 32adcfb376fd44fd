//! Event bus
//!
//! This crate carries debugger events from a background thread to the single thread that
//! owns the user interface. Events are published from any thread into a FIFO queue, the UI
//! thread is woken through a bounded channel, and it then drains the whole queue, handing
//! each event to every listener that was registered before the event was published.
mod bus;
mod error;

pub use bus::{DrainReport, EventBus, Listeners, Publisher, wake_channel};
pub use error::BusError;
