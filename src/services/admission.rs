//! Admission controller for the shared room
//!
//! The single authority over the room's sign, counts and wait queue. Every
//! read and write happens under one `parking_lot::Mutex`, so `arrive`,
//! `depart` and the drain step are linearized. Nothing awaits while the lock
//! is held.
//!
//! Drained animals are not spawned from inside the critical section. The
//! drain step issues a `Ticket` and the ticket is handed to the drain
//! scheduler over a channel once the lock has been released.

use crate::domain::event::{RoomEvent, RoomEventKind};
use crate::domain::types::{Animal, AnimalId, Species};
use crate::infra::metrics::Metrics;
use crate::io::event_log::EventSender;
use crate::services::room::{RoomSnapshot, RoomState, WaitQueue};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Proof that an animal is currently counted in the room.
///
/// Only the controller can issue one, and `depart` consumes it, so an animal
/// cannot leave without having been admitted or leave twice.
#[must_use = "an admitted animal stays in the room until its ticket is passed to `depart`"]
#[derive(Debug)]
pub struct Ticket {
    animal: Animal,
}

impl Ticket {
    pub fn animal(&self) -> &Animal {
        &self.animal
    }
}

/// Outcome of an arrival
#[must_use = "an `Admitted` ticket must be passed to `depart`"]
#[derive(Debug)]
pub enum Admission {
    /// In the room; rest, then hand the ticket back to `depart`
    Admitted(Ticket),
    /// Recorded in the wait queue; the caller's part is over
    Queued,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

pub type DrainSender = mpsc::UnboundedSender<Ticket>;
pub type DrainReceiver = mpsc::UnboundedReceiver<Ticket>;

/// Channel carrying drained animals from the controller to the drain scheduler
pub fn drain_channel() -> (DrainSender, DrainReceiver) {
    mpsc::unbounded_channel()
}

/// Everything guarded by the controller lock
struct Inner {
    state: RoomState,
    queue: WaitQueue,
    /// Animals currently counted in `state`
    occupants: FxHashSet<AnimalId>,
    next_seq: u64,
}

pub struct AdmissionController {
    inner: Mutex<Inner>,
    drain_tx: DrainSender,
    events: EventSender,
    metrics: Arc<Metrics>,
    started_at: Instant,
}

impl AdmissionController {
    /// Create a controller for an EMPTY room
    pub fn new(drain_tx: DrainSender, events: EventSender, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RoomState::new(),
                queue: WaitQueue::new(),
                occupants: FxHashSet::default(),
                next_seq: 0,
            }),
            drain_tx,
            events,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// Try to enter the room.
    ///
    /// Admits when the room is EMPTY or already holds the same species,
    /// otherwise appends the animal to the wait queue. Never fails.
    pub fn arrive(&self, animal: Animal) -> Admission {
        let mut inner = self.inner.lock();
        assert!(
            !inner.occupants.contains(&animal.id) && !inner.queue.contains(&animal.id),
            "animal {} arrived while already in the room or the queue",
            animal.id
        );

        if inner.state.try_enter(animal.species) {
            inner.occupants.insert(animal.id.clone());
            self.metrics.record_admitted(inner.state.occupants());
            self.emit(&mut inner, RoomEventKind::Admitted, &animal.id, animal.species);
            info!(
                animal = %animal.id,
                species = %animal.species,
                sign = %inner.state.sign(),
                dogs = inner.state.dogs(),
                cats = inner.state.cats(),
                "animal_admitted"
            );
            return Admission::Admitted(Ticket { animal });
        }

        let id = animal.id.clone();
        let species = animal.species;
        inner.queue.push(animal, Instant::now());
        self.metrics.record_queued(inner.queue.len());
        self.emit(&mut inner, RoomEventKind::Queued, &id, species);
        info!(
            animal = %id,
            species = %species,
            sign = %inner.state.sign(),
            dogs = inner.state.dogs(),
            cats = inner.state.cats(),
            queue_len = inner.queue.len(),
            "animal_queued"
        );
        Admission::Queued
    }

    /// Leave the room.
    ///
    /// If this empties the room and animals are waiting, the head of the
    /// queue (and only the head) is admitted and sent to the drain scheduler.
    pub fn depart(&self, ticket: Ticket) {
        let Ticket { animal } = ticket;

        let drained = {
            let mut inner = self.inner.lock();
            assert!(
                inner.occupants.remove(&animal.id),
                "animal {} departed without being in the room",
                animal.id
            );
            let emptied = inner.state.leave(animal.species);
            self.metrics.record_departure(emptied);
            self.emit(&mut inner, RoomEventKind::Departed, &animal.id, animal.species);
            info!(
                animal = %animal.id,
                species = %animal.species,
                sign = %inner.state.sign(),
                dogs = inner.state.dogs(),
                cats = inner.state.cats(),
                "animal_departed"
            );

            if emptied {
                self.drain_one(&mut inner)
            } else {
                None
            }
        };

        // Handed off outside the lock
        if let Some(ticket) = drained {
            if let Err(e) = self.drain_tx.send(ticket) {
                warn!(animal = %e.0.animal.id, "drain_handoff_dropped");
            }
        }
    }

    /// Admit the head of the queue into the empty room
    fn drain_one(&self, inner: &mut Inner) -> Option<Ticket> {
        let head = inner.queue.pop()?;
        let animal = head.animal;
        let wait_ms = head.queued_at.elapsed().as_millis() as u64;

        inner.state.admit_drained(animal.species);
        inner.occupants.insert(animal.id.clone());
        self.metrics.record_drained(wait_ms);
        self.emit(inner, RoomEventKind::Drained, &animal.id, animal.species);
        info!(
            animal = %animal.id,
            species = %animal.species,
            sign = %inner.state.sign(),
            wait_ms,
            still_queued = inner.queue.len(),
            "queue_drained"
        );
        Some(Ticket { animal })
    }

    fn emit(&self, inner: &mut Inner, kind: RoomEventKind, animal: &AnimalId, species: Species) {
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let event = RoomEvent {
            seq,
            at_ms: self.started_at.elapsed().as_millis() as u64,
            kind,
            animal: animal.clone(),
            species,
            sign: inner.state.sign(),
            dogs: inner.state.dogs(),
            cats: inner.state.cats(),
            queue_len: inner.queue.len(),
        };
        debug!(seq, kind = %kind.as_str(), animal = %animal, "room_event");
        self.events.send(event);
    }

    /// Current sign, counts and queue order
    pub fn snapshot(&self) -> RoomSnapshot {
        let inner = self.inner.lock();
        RoomSnapshot::capture(&inner.state, &inner.queue)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Sign;
    use crate::io::event_log::{create_event_channel, EventLog};

    struct Harness {
        controller: AdmissionController,
        drain_rx: DrainReceiver,
        log: EventLog,
    }

    fn harness() -> Harness {
        let (drain_tx, drain_rx) = drain_channel();
        let (events, log) = create_event_channel();
        let controller = AdmissionController::new(drain_tx, events, Arc::new(Metrics::new()));
        Harness { controller, drain_rx, log }
    }

    fn dog(id: &str) -> Animal {
        Animal::new(id, Species::Dog, 0, 5)
    }

    fn cat(id: &str) -> Animal {
        Animal::new(id, Species::Cat, 0, 5)
    }

    fn admitted(admission: Admission) -> Ticket {
        match admission {
            Admission::Admitted(ticket) => ticket,
            Admission::Queued => panic!("expected admission"),
        }
    }

    #[test]
    fn test_first_arrival_sets_sign() {
        let h = harness();
        let ticket = admitted(h.controller.arrive(dog("D1")));
        assert_eq!(ticket.animal().id.as_str(), "D1");

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.sign, Sign::Dogs);
        assert_eq!(snapshot.dogs, 1);
    }

    #[test]
    fn test_opposite_species_is_queued() {
        let h = harness();
        let _d1 = admitted(h.controller.arrive(dog("D1")));
        assert!(!h.controller.arrive(cat("C1")).is_admitted());

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.sign, Sign::Dogs);
        assert_eq!(snapshot.cats, 0);
        assert_eq!(snapshot.queued, vec![AnimalId::new("C1")]);
    }

    #[test]
    fn test_partial_departure_keeps_sign() {
        let mut h = harness();
        let d1 = admitted(h.controller.arrive(dog("D1")));
        let _d2 = admitted(h.controller.arrive(dog("D2")));
        assert!(!h.controller.arrive(cat("C1")).is_admitted());

        h.controller.depart(d1);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.sign, Sign::Dogs);
        assert_eq!(snapshot.dogs, 1);
        assert!(h.drain_rx.try_recv().is_err());
    }

    #[test]
    fn test_drain_hands_ticket_to_scheduler() {
        let mut h = harness();
        let d1 = admitted(h.controller.arrive(dog("D1")));
        assert!(!h.controller.arrive(cat("C1")).is_admitted());

        h.controller.depart(d1);
        let drained = h.drain_rx.try_recv().unwrap();
        assert_eq!(drained.animal().id.as_str(), "C1");

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.sign, Sign::Cats);
        assert_eq!(snapshot.cats, 1);
        assert!(snapshot.queued.is_empty());

        h.controller.depart(drained);
        assert_eq!(h.controller.snapshot().sign, Sign::Empty);
    }

    #[test]
    fn test_empty_room_without_waiters_stays_empty() {
        let mut h = harness();
        let d1 = admitted(h.controller.arrive(dog("D1")));
        h.controller.depart(d1);
        assert_eq!(h.controller.snapshot().sign, Sign::Empty);
        assert!(h.drain_rx.try_recv().is_err());
    }

    #[test]
    fn test_events_are_sequenced() {
        let mut h = harness();
        let d1 = admitted(h.controller.arrive(dog("D1")));
        assert!(!h.controller.arrive(cat("C1")).is_admitted());
        h.controller.depart(d1);

        h.log.drain_pending();
        let kinds: Vec<RoomEventKind> = h.log.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RoomEventKind::Admitted,
                RoomEventKind::Queued,
                RoomEventKind::Departed,
                RoomEventKind::Drained
            ]
        );
        let seqs: Vec<u64> = h.log.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);

        let departed = &h.log.events()[2];
        assert_eq!(departed.sign, Sign::Empty);
        assert_eq!(departed.queue_len, 1);
    }

    #[test]
    fn test_metrics_follow_decisions() {
        let mut h = harness();
        let d1 = admitted(h.controller.arrive(dog("D1")));
        assert!(!h.controller.arrive(cat("C1")).is_admitted());
        h.controller.depart(d1);
        let c1 = h.drain_rx.try_recv().unwrap();
        h.controller.depart(c1);

        let summary = h.controller.metrics().report();
        assert_eq!(summary.arrivals_total, 2);
        assert_eq!(summary.queued_total, 1);
        assert_eq!(summary.drained_total, 1);
        assert_eq!(summary.departures_total, 2);
        assert_eq!(summary.sign_flips_total, 2);
    }

    #[test]
    #[should_panic(expected = "already in the room")]
    fn test_double_arrival_is_fatal() {
        let h = harness();
        let _d1 = admitted(h.controller.arrive(dog("D1")));
        let _ = h.controller.arrive(dog("D1"));
    }

    #[test]
    fn test_dropped_scheduler_does_not_poison_lock() {
        let h = harness();
        let Harness { controller, drain_rx, log: _log } = h;
        drop(drain_rx);

        let d1 = admitted(controller.arrive(dog("D1")));
        assert!(!controller.arrive(cat("C1")).is_admitted());
        controller.depart(d1);
        // C1 was admitted even though nobody will carry it to departure
        assert_eq!(controller.snapshot().sign, Sign::Cats);
    }
}
