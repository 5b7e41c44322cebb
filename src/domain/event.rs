//! Observable room events
//!
//! Emitted by the admission controller while it holds its lock, so the
//! order in which they are received is the order the decisions were made.

use crate::domain::types::{AnimalId, Sign, Species};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEventKind {
    /// Admitted straight on arrival
    Admitted,
    /// Rejected by the current sign and appended to the wait queue
    Queued,
    /// Left the room after resting
    Departed,
    /// Popped from the wait queue once the room became empty
    Drained,
}

impl RoomEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomEventKind::Admitted => "admitted",
            RoomEventKind::Queued => "queued",
            RoomEventKind::Departed => "departed",
            RoomEventKind::Drained => "drained",
        }
    }
}

/// A single entry of the room's event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomEvent {
    /// Position in the linearized log
    pub seq: u64,
    /// Milliseconds since the controller was created
    pub at_ms: u64,
    pub kind: RoomEventKind,
    pub animal: AnimalId,
    pub species: Species,
    /// Sign after the event was applied
    pub sign: Sign,
    pub dogs: u32,
    pub cats: u32,
    /// Wait queue length after the event was applied
    pub queue_len: usize,
}
