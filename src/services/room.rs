//! Room occupancy state machine and wait queue
//!
//! Pure data, no locking. The admission controller owns one `RoomState` and
//! one `WaitQueue` and only touches them while holding its mutex.
//!
//! Key behaviors:
//! - An empty room takes the species of whoever enters first
//! - Same-species arrivals share the room without an upper bound
//! - The sign drops back to EMPTY when the last occupant of the species leaves
//! - Rejected arrivals wait in FIFO order of rejection

use crate::domain::types::{Animal, AnimalId, Sign, Species};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;

/// Sign plus per-species occupant counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomState {
    sign: Sign,
    dogs: u32,
    cats: u32,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn sign(&self) -> Sign {
        self.sign
    }

    #[inline]
    pub fn dogs(&self) -> u32 {
        self.dogs
    }

    #[inline]
    pub fn cats(&self) -> u32 {
        self.cats
    }

    fn count_mut(&mut self, species: Species) -> &mut u32 {
        match species {
            Species::Dog => &mut self.dogs,
            Species::Cat => &mut self.cats,
        }
    }

    pub fn occupants(&self) -> u32 {
        self.dogs + self.cats
    }

    /// Admit one animal if the sign allows it.
    ///
    /// Returns false (and leaves the state untouched) when the room is held
    /// by the other species.
    pub fn try_enter(&mut self, species: Species) -> bool {
        if !self.sign.admits(species) {
            return false;
        }
        self.sign = species.sign();
        *self.count_mut(species) += 1;
        self.check_invariants();
        true
    }

    /// Remove one occupant of `species`. Returns true if the room became empty.
    pub fn leave(&mut self, species: Species) -> bool {
        let count = self.count_mut(species);
        assert!(*count > 0, "departure of {species} with no {species} in the room");
        *count -= 1;
        if *count == 0 {
            self.sign = Sign::Empty;
        }
        self.check_invariants();
        self.sign == Sign::Empty
    }

    /// Hand an empty room to a drained animal
    pub fn admit_drained(&mut self, species: Species) {
        assert_eq!(self.sign, Sign::Empty, "drain into an occupied room");
        self.sign = species.sign();
        *self.count_mut(species) = 1;
        self.check_invariants();
    }

    /// Sign consistency and species exclusion. A breach is a protocol bug.
    pub fn check_invariants(&self) {
        match self.sign {
            Sign::Empty => assert!(
                self.dogs == 0 && self.cats == 0,
                "EMPTY sign with occupants (dogs={}, cats={})",
                self.dogs,
                self.cats
            ),
            Sign::Dogs => assert!(
                self.dogs > 0 && self.cats == 0,
                "DOGS sign with dogs={}, cats={}",
                self.dogs,
                self.cats
            ),
            Sign::Cats => assert!(
                self.cats > 0 && self.dogs == 0,
                "CATS sign with dogs={}, cats={}",
                self.dogs,
                self.cats
            ),
        }
    }
}

/// Queue entry: the rejected animal and when it was rejected
#[derive(Debug, Clone)]
pub struct QueuedAnimal {
    pub animal: Animal,
    pub queued_at: Instant,
}

/// FIFO backlog of animals rejected on arrival
#[derive(Debug, Default)]
pub struct WaitQueue {
    entries: VecDeque<QueuedAnimal>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, animal: Animal, queued_at: Instant) {
        self.entries.push_back(QueuedAnimal { animal, queued_at });
    }

    /// Oldest rejected animal
    pub fn pop(&mut self) -> Option<QueuedAnimal> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &AnimalId) -> bool {
        self.entries.iter().any(|entry| &entry.animal.id == id)
    }

    pub fn ids(&self) -> Vec<AnimalId> {
        self.entries.iter().map(|entry| entry.animal.id.clone()).collect()
    }
}

/// Point-in-time copy of the room, safe to hand out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    pub sign: Sign,
    pub dogs: u32,
    pub cats: u32,
    pub queued: Vec<AnimalId>,
}

impl RoomSnapshot {
    pub fn capture(state: &RoomState, queue: &WaitQueue) -> Self {
        Self { sign: state.sign(), dogs: state.dogs(), cats: state.cats(), queued: queue.ids() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_room_takes_first_species() {
        let mut room = RoomState::new();
        assert!(room.try_enter(Species::Cat));
        assert_eq!(room.sign(), Sign::Cats);
        assert_eq!(room.cats(), 1);
        assert_eq!(room.dogs(), 0);
    }

    #[test]
    fn test_same_species_shares_room() {
        let mut room = RoomState::new();
        for _ in 0..10 {
            assert!(room.try_enter(Species::Dog));
        }
        assert_eq!(room.dogs(), 10);
        assert_eq!(room.sign(), Sign::Dogs);
    }

    #[test]
    fn test_other_species_rejected_without_change() {
        let mut room = RoomState::new();
        room.try_enter(Species::Dog);
        let before = room;
        assert!(!room.try_enter(Species::Cat));
        assert_eq!(room, before);
    }

    #[test]
    fn test_last_departure_empties_room() {
        let mut room = RoomState::new();
        room.try_enter(Species::Dog);
        room.try_enter(Species::Dog);
        assert!(!room.leave(Species::Dog));
        assert_eq!(room.sign(), Sign::Dogs);
        assert!(room.leave(Species::Dog));
        assert_eq!(room.sign(), Sign::Empty);
        assert_eq!(room.occupants(), 0);
    }

    #[test]
    #[should_panic(expected = "departure of CAT")]
    fn test_leave_without_occupant_panics() {
        let mut room = RoomState::new();
        room.try_enter(Species::Dog);
        room.leave(Species::Cat);
    }

    #[test]
    fn test_admit_drained_sets_single_occupant() {
        let mut room = RoomState::new();
        room.admit_drained(Species::Cat);
        assert_eq!(room.sign(), Sign::Cats);
        assert_eq!(room.cats(), 1);
        assert_eq!(room.dogs(), 0);
    }

    #[test]
    #[should_panic(expected = "drain into an occupied room")]
    fn test_admit_drained_into_occupied_room_panics() {
        let mut room = RoomState::new();
        room.try_enter(Species::Dog);
        room.admit_drained(Species::Cat);
    }

    #[test]
    fn test_wait_queue_is_fifo() {
        let mut queue = WaitQueue::new();
        let now = Instant::now();
        queue.push(Animal::new("Q1", Species::Cat, 1, 1), now);
        queue.push(Animal::new("Q2", Species::Cat, 2, 1), now);
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(&AnimalId::new("Q2")));
        assert_eq!(queue.ids(), vec![AnimalId::new("Q1"), AnimalId::new("Q2")]);
        assert_eq!(queue.pop().unwrap().animal.id.as_str(), "Q1");
        assert_eq!(queue.pop().unwrap().animal.id.as_str(), "Q2");
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_snapshot_captures_queue_order() {
        let mut room = RoomState::new();
        let mut queue = WaitQueue::new();
        let now = Instant::now();
        room.try_enter(Species::Dog);
        queue.push(Animal::new("C01", Species::Cat, 3, 1), now);
        queue.push(Animal::new("C02", Species::Cat, 4, 1), now);

        let snapshot = RoomSnapshot::capture(&room, &queue);
        assert_eq!(snapshot.sign, Sign::Dogs);
        assert_eq!(snapshot.dogs, 1);
        assert_eq!(snapshot.queued, vec![AnimalId::new("C01"), AnimalId::new("C02")]);
    }
}
