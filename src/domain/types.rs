//! Shared types for the room protocol

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Newtype wrapper for animal IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub String);

impl AnimalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnimalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two occupant classes. Only one of them may be in the room at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    #[serde(rename = "DOG", alias = "A")]
    Dog,
    #[serde(rename = "CAT", alias = "B")]
    Cat,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "DOG",
            Species::Cat => "CAT",
        }
    }

    /// The sign shown while this species holds the room
    pub fn sign(&self) -> Sign {
        match self {
            Species::Dog => Sign::Dogs,
            Species::Cat => Sign::Cats,
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusivity label on the room door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sign {
    #[default]
    #[serde(rename = "EMPTY")]
    Empty,
    #[serde(rename = "DOGS", alias = "OCCUPIED_A")]
    Dogs,
    #[serde(rename = "CATS", alias = "OCCUPIED_B")]
    Cats,
}

impl Sign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sign::Empty => "EMPTY",
            Sign::Dogs => "DOGS",
            Sign::Cats => "CATS",
        }
    }

    /// Species currently holding the room, if any
    pub fn species(&self) -> Option<Species> {
        match self {
            Sign::Empty => None,
            Sign::Dogs => Some(Species::Dog),
            Sign::Cats => Some(Species::Cat),
        }
    }

    /// Whether an arrival of `species` may enter under this sign
    #[inline]
    pub fn admits(&self, species: Species) -> bool {
        match self.species() {
            None => true,
            Some(current) => current == species,
        }
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One arriving occupant. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub species: Species,
    /// Offset from simulation start, in ticks
    pub arrival_time: u64,
    /// Time spent in the room once admitted, in ticks
    pub rest_duration: u64,
}

impl Animal {
    pub fn new(id: impl Into<String>, species: Species, arrival_time: u64, rest_duration: u64) -> Self {
        Self { id: AnimalId::new(id), species, arrival_time, rest_duration }
    }

    /// Arrival offset scaled to wall-clock time
    pub fn arrival_after(&self, tick: Duration) -> Duration {
        tick.saturating_mul(u32::try_from(self.arrival_time).unwrap_or(u32::MAX))
    }

    /// Rest duration scaled to wall-clock time
    pub fn rest_for(&self, tick: Duration) -> Duration {
        tick.saturating_mul(u32::try_from(self.rest_duration).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_wire_names() {
        let dog: Species = serde_json::from_str("\"DOG\"").unwrap();
        let cat: Species = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(dog, Species::Dog);
        assert_eq!(cat, Species::Cat);
        assert_eq!(serde_json::to_string(&Species::Cat).unwrap(), "\"CAT\"");
        assert!(serde_json::from_str::<Species>("\"HAMSTER\"").is_err());
    }

    #[test]
    fn test_sign_admits() {
        assert!(Sign::Empty.admits(Species::Dog));
        assert!(Sign::Empty.admits(Species::Cat));
        assert!(Sign::Dogs.admits(Species::Dog));
        assert!(!Sign::Dogs.admits(Species::Cat));
        assert!(!Sign::Cats.admits(Species::Dog));
    }

    #[test]
    fn test_sign_aliases() {
        let sign: Sign = serde_json::from_str("\"OCCUPIED_A\"").unwrap();
        assert_eq!(sign, Sign::Dogs);
        assert_eq!(Species::Cat.sign(), Sign::Cats);
        assert_eq!(Sign::default(), Sign::Empty);
    }

    #[test]
    fn test_durations_scale_with_tick() {
        let animal = Animal::new("D01", Species::Dog, 2, 5);
        let tick = Duration::from_millis(10);
        assert_eq!(animal.arrival_after(tick), Duration::from_millis(20));
        assert_eq!(animal.rest_for(tick), Duration::from_millis(50));
    }
}
