//! IO modules - outbound observation channels
//!
//! - `event_log` - Unbounded channel and collector for room events

pub mod event_log;

pub use event_log::{create_event_channel, EventLog, EventSender};
