//! Typed channel for room events
//!
//! The controller pushes events while it holds its lock, so the sender must
//! never block: the channel is unbounded. A collector on the other end keeps
//! the time-ordered log for the final report.

use crate::domain::event::RoomEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Non-blocking handle used by the controller to publish events
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<RoomEvent>,
}

impl EventSender {
    /// Publish an event. A closed log only loses observations, never decisions.
    pub fn send(&self, event: RoomEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(seq = %e.0.seq, "room_event_dropped");
        }
    }
}

/// Receiving end that accumulates the event log
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<RoomEvent>,
    events: Vec<RoomEvent>,
}

impl EventLog {
    /// Pull everything currently buffered without waiting
    pub fn drain_pending(&mut self) -> usize {
        let mut pulled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.events.push(event);
            pulled += 1;
        }
        pulled
    }

    /// Collect everything that is left and return the full log
    pub fn finish(mut self) -> Vec<RoomEvent> {
        self.drain_pending();
        self.events
    }

    pub fn events(&self) -> &[RoomEvent] {
        &self.events
    }
}

/// Create an event channel: the sender for the controller, the log for the driver
pub fn create_event_channel() -> (EventSender, EventLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventLog { rx, events: Vec::new() })
}
