//! Event bus for turn lifecycle events

pub mod bus;
pub mod types;

pub use bus::EventBus;
pub use types::TurnEvent;
