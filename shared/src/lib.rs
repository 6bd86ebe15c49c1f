//! Shared types and logging for the media server stress tester
//!
//! Holds the alert wire format, the rules that decide whether an alert
//! means the target degraded, and the tracing setup used by every component.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
