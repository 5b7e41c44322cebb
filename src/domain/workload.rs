//! Workload file model and boundary validation
//!
//! The JSON layout mirrors the challenge input the protocol was built for.
//! Malformed input is rejected here so the controller never sees it.

use crate::domain::types::{Animal, Sign, Species};
use anyhow::{bail, ensure, Context};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tie-breaker fields accepted in metadata
const KNOWN_TIE_BREAKERS: [&str; 3] = ["arrival.time", "id", "species"];

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadMetadata {
    #[serde(default = "default_room_count")]
    pub room_count: u32,
    #[serde(default)]
    pub allowed_states: Vec<Sign>,
    #[serde(default = "default_queue_policy")]
    pub queue_policy: String,
    /// Declared but not applied: sign flips are immediate
    #[serde(rename = "sign.change.latency", default)]
    pub sign_change_latency: u64,
    /// Declared but not applied: the wait queue drains in rejection order
    #[serde(default)]
    pub tie_breaker: Vec<String>,
}

fn default_room_count() -> u32 {
    1
}

fn default_queue_policy() -> String {
    "FIFO".to_string()
}

impl Default for WorkloadMetadata {
    fn default() -> Self {
        Self {
            room_count: default_room_count(),
            allowed_states: vec![Sign::Empty, Sign::Dogs, Sign::Cats],
            queue_policy: default_queue_policy(),
            sign_change_latency: 0,
            tie_breaker: vec!["arrival.time".to_string(), "id".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomSection {
    #[serde(rename = "initial_sign_state", default)]
    pub initial_sign: Sign,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimalSection {
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
    pub animals: Vec<Animal>,
}

fn default_time_unit() -> String {
    "ticks".to_string()
}

/// A complete room workload: metadata, initial room state and arrivals
#[derive(Debug, Clone, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub metadata: WorkloadMetadata,
    #[serde(default)]
    pub room: RoomSection,
    #[serde(rename = "workload")]
    pub arrivals: AnimalSection,
}

impl Workload {
    /// Load and validate a workload from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workload file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid workload file {}", path.display()))
    }

    /// Parse and validate a workload from a JSON string
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let workload: Workload =
            serde_json::from_str(content).context("Failed to parse workload JSON")?;
        workload.validate()?;
        Ok(workload)
    }

    /// Check the boundary rules the controller relies on
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.metadata.queue_policy.eq_ignore_ascii_case("FIFO"),
            "unsupported queue_policy {:?} (only FIFO)",
            self.metadata.queue_policy
        );
        ensure!(
            self.metadata.room_count == 1,
            "room_count must be 1, got {}",
            self.metadata.room_count
        );
        for field in &self.metadata.tie_breaker {
            ensure!(
                KNOWN_TIE_BREAKERS.contains(&field.as_str()),
                "unknown tie_breaker field {:?}",
                field
            );
        }
        if self.room.initial_sign != Sign::Empty {
            bail!(
                "initial_sign_state must be EMPTY, got {} (a signed room needs occupants)",
                self.room.initial_sign
            );
        }

        let mut seen = FxHashSet::default();
        for animal in &self.arrivals.animals {
            ensure!(!animal.id.as_str().is_empty(), "animal with empty id");
            ensure!(seen.insert(animal.id.clone()), "duplicate animal id {}", animal.id);
        }
        Ok(())
    }

    pub fn animals(&self) -> &[Animal] {
        &self.arrivals.animals
    }

    pub fn initial_sign(&self) -> Sign {
        self.room.initial_sign
    }

    /// Built-in scenario: three dogs early, two cats later
    pub fn demo() -> Self {
        Self {
            spec_version: "1.0".to_string(),
            challenge_id: "vet.room.protocol.demo".to_string(),
            metadata: WorkloadMetadata::default(),
            room: RoomSection::default(),
            arrivals: AnimalSection {
                time_unit: default_time_unit(),
                animals: vec![
                    Animal::new("D01", Species::Dog, 0, 5),
                    Animal::new("D02", Species::Dog, 1, 4),
                    Animal::new("D03", Species::Dog, 2, 3),
                    Animal::new("C01", Species::Cat, 10, 4),
                    Animal::new("C02", Species::Cat, 11, 2),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "spec_version": "1.0",
        "challenge_id": "vet.room.protocol.demo",
        "metadata": {
            "room_count": 1,
            "allowed_states": ["EMPTY", "DOGS", "CATS"],
            "queue_policy": "FIFO",
            "sign.change.latency": 0,
            "tie_breaker": ["arrival.time", "id"]
        },
        "room": { "initial_sign_state": "EMPTY" },
        "workload": {
            "time_unit": "ticks",
            "animals": [
                { "id": "D01", "species": "DOG", "arrival_time": 0, "rest_duration": 5 },
                { "id": "C01", "species": "CAT", "arrival_time": 1, "rest_duration": 2 }
            ]
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let workload = Workload::from_json(SAMPLE).unwrap();
        assert_eq!(workload.challenge_id, "vet.room.protocol.demo");
        assert_eq!(workload.animals().len(), 2);
        assert_eq!(workload.animals()[1].species, Species::Cat);
        assert_eq!(workload.metadata.tie_breaker, vec!["arrival.time", "id"]);
        assert_eq!(workload.initial_sign(), Sign::Empty);
    }

    #[test]
    fn test_rejects_unknown_species() {
        let bad = SAMPLE.replace("\"CAT\"", "\"HAMSTER\"");
        assert!(Workload::from_json(&bad).is_err());
    }

    #[test]
    fn test_rejects_negative_duration() {
        let bad = SAMPLE.replace("\"rest_duration\": 2", "\"rest_duration\": -2");
        assert!(Workload::from_json(&bad).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let bad = SAMPLE.replace("\"C01\"", "\"D01\"");
        let err = Workload::from_json(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate animal id D01"));
    }

    #[test]
    fn test_rejects_non_fifo_policy() {
        let bad = SAMPLE.replace("\"FIFO\"", "\"LIFO\"");
        assert!(Workload::from_json(&bad).is_err());
    }

    #[test]
    fn test_rejects_signed_initial_room() {
        let bad = SAMPLE.replace("\"initial_sign_state\": \"EMPTY\"", "\"initial_sign_state\": \"DOGS\"");
        assert!(Workload::from_json(&bad).is_err());
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let minimal = r#"{ "workload": { "animals": [] } }"#;
        let workload = Workload::from_json(minimal).unwrap();
        assert_eq!(workload.metadata.queue_policy, "FIFO");
        assert_eq!(workload.arrivals.time_unit, "ticks");
        assert!(workload.animals().is_empty());
    }

    #[test]
    fn test_demo_is_valid() {
        let demo = Workload::demo();
        demo.validate().unwrap();
        assert_eq!(demo.animals().len(), 5);
    }
}
