//! Port for structured round-event logging.
//!
//! Defines the [`RoundEventLogger`] trait for recording phase transitions,
//! proposals, agreements and terminal outcomes to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port keeps an audit trail in a
//! machine-readable format (JSONL).

use serde_json::Value;

/// A structured round event.
pub struct RoundEvent {
    /// Event type identifier (e.g., "phase", "agreed", "round_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RoundEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Logging is synchronous and infallible from the caller's side; adapters
/// swallow their own write errors.
pub trait RoundEventLogger: Send + Sync {
    fn log(&self, event: RoundEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoRoundEventLogger;

impl RoundEventLogger for NoRoundEventLogger {
    fn log(&self, _event: RoundEvent) {}
}
