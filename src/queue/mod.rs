//! Cola de eventos de telemetría

pub mod event_queue;

pub use event_queue::{EventQueue, RetryPolicy};
