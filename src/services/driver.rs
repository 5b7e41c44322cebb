//! Simulation driver
//!
//! Spawns one task per animal. Each task sleeps until its arrival offset,
//! calls `arrive`, and if admitted rests and calls `depart`. Queued animals
//! end their task right away.
//!
//! The driver also acts as the drain scheduler: tickets issued by drain
//! steps arrive over the drain channel and each one gets a fresh
//! run-to-departure task. The run is over once no task is left and no
//! hand-off is pending.

use crate::domain::event::RoomEvent;
use crate::domain::types::{Animal, AnimalId};
use crate::domain::workload::Workload;
use crate::infra::config::Config;
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::io::event_log::create_event_channel;
use crate::services::admission::{
    drain_channel, Admission, AdmissionController, DrainReceiver, Ticket,
};
use crate::services::room::RoomSnapshot;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// How a single animal task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimalOutcome {
    /// Rested and left the room
    Departed(AnimalId),
    /// Rejected on arrival; may still be drained later by another task
    Queued(AnimalId),
}

/// Everything observable about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: String,
    pub challenge_id: String,
    pub final_state: RoomSnapshot,
    pub events: Vec<RoomEvent>,
    pub metrics: MetricsSummary,
    /// Animals left in the wait queue because nothing emptied the room again
    pub stranded: Vec<AnimalId>,
}

pub struct Simulation {
    workload: Workload,
    tick: Duration,
}

impl Simulation {
    pub fn new(config: &Config, workload: Workload) -> Self {
        Self { workload, tick: Duration::from_millis(config.tick_ms()) }
    }

    /// Override the wall-clock length of one tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run every animal through the room and wait for all of them
    pub async fn run(self) -> anyhow::Result<SimulationReport> {
        let run_id = Uuid::now_v7().to_string();
        let metadata = &self.workload.metadata;
        info!(
            run_id = %run_id,
            challenge_id = %self.workload.challenge_id,
            animals = self.workload.animals().len(),
            tick_ms = self.tick.as_millis() as u64,
            initial_sign = %self.workload.initial_sign(),
            queue_policy = %metadata.queue_policy,
            sign_change_latency = metadata.sign_change_latency,
            tie_breaker = ?metadata.tie_breaker,
            "simulation_started"
        );
        if metadata.sign_change_latency > 0 {
            warn!(
                sign_change_latency = metadata.sign_change_latency,
                "sign_change_latency_not_applied"
            );
        }

        let (drain_tx, drain_rx) = drain_channel();
        let (events, event_log) = create_event_channel();
        let metrics = Arc::new(Metrics::new());
        let controller = Arc::new(AdmissionController::new(drain_tx, events, metrics.clone()));

        let mut tasks = JoinSet::new();
        for animal in self.workload.animals().iter().cloned() {
            tasks.spawn(arrive_and_rest(controller.clone(), animal, self.tick));
        }

        let outcomes = schedule_until_idle(&controller, tasks, drain_rx, self.tick).await?;
        let departed =
            outcomes.iter().filter(|o| matches!(o, AnimalOutcome::Departed(_))).count();

        let final_state = controller.snapshot();
        let summary = metrics.report();
        let stranded = final_state.queued.clone();
        drop(controller);
        let events = event_log.finish();

        info!(
            run_id = %run_id,
            sign = %final_state.sign,
            dogs = final_state.dogs,
            cats = final_state.cats,
            departed,
            stranded = stranded.len(),
            events = events.len(),
            "simulation_finished"
        );
        for id in &stranded {
            warn!(animal = %id, "animal_stranded_in_queue");
        }

        Ok(SimulationReport {
            run_id,
            challenge_id: self.workload.challenge_id.clone(),
            final_state,
            events,
            metrics: summary,
            stranded,
        })
    }
}

/// Drive the join set and the drain channel until both are exhausted.
///
/// A drained ticket is sent before the departing task finishes, so once the
/// set is empty any pending hand-off is already in the channel.
async fn schedule_until_idle(
    controller: &Arc<AdmissionController>,
    mut tasks: JoinSet<AnimalOutcome>,
    mut drain_rx: DrainReceiver,
    tick: Duration,
) -> anyhow::Result<Vec<AnimalOutcome>> {
    let mut outcomes = Vec::new();
    loop {
        while let Ok(ticket) = drain_rx.try_recv() {
            tasks.spawn(rest_and_depart(controller.clone(), ticket, tick));
        }

        tokio::select! {
            Some(ticket) = drain_rx.recv() => {
                tasks.spawn(rest_and_depart(controller.clone(), ticket, tick));
            }
            joined = tasks.join_next() => {
                match joined {
                    Some(result) => outcomes.push(result.context("animal task panicked")?),
                    None => match drain_rx.try_recv() {
                        Ok(ticket) => {
                            tasks.spawn(rest_and_depart(controller.clone(), ticket, tick));
                        }
                        Err(_) => break,
                    },
                }
            }
        }
    }
    Ok(outcomes)
}

/// Lifecycle of an arriving animal
async fn arrive_and_rest(
    controller: Arc<AdmissionController>,
    animal: Animal,
    tick: Duration,
) -> AnimalOutcome {
    tokio::time::sleep(animal.arrival_after(tick)).await;
    let id = animal.id.clone();
    match controller.arrive(animal) {
        Admission::Admitted(ticket) => rest_and_depart(controller, ticket, tick).await,
        Admission::Queued => AnimalOutcome::Queued(id),
    }
}

/// Run-to-departure for an admitted animal, direct or drained
async fn rest_and_depart(
    controller: Arc<AdmissionController>,
    ticket: Ticket,
    tick: Duration,
) -> AnimalOutcome {
    tokio::time::sleep(ticket.animal().rest_for(tick)).await;
    let id = ticket.animal().id.clone();
    controller.depart(ticket);
    AnimalOutcome::Departed(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::RoomEventKind;
    use crate::domain::types::{Sign, Species};

    fn simulation(animals: Vec<Animal>) -> Simulation {
        let mut workload = Workload::demo();
        workload.arrivals.animals = animals;
        Simulation::new(&Config::default(), workload).with_tick(Duration::from_millis(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_workload_finishes() {
        let report = simulation(Vec::new()).run().await.unwrap();
        assert_eq!(report.final_state.sign, Sign::Empty);
        assert!(report.events.is_empty());
        assert!(report.stranded.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_species_all_depart() {
        let animals = vec![
            Animal::new("D01", Species::Dog, 0, 2),
            Animal::new("D02", Species::Dog, 0, 2),
            Animal::new("D03", Species::Dog, 1, 1),
        ];
        let report = simulation(animals).run().await.unwrap();

        assert_eq!(report.final_state.sign, Sign::Empty);
        assert_eq!(report.metrics.queued_total, 0);
        assert_eq!(report.metrics.departures_total, 3);
        assert_eq!(report.events.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_animal_is_drained_and_departs() {
        let animals = vec![
            Animal::new("D01", Species::Dog, 0, 20),
            Animal::new("C01", Species::Cat, 4, 2),
        ];
        let report = simulation(animals).run().await.unwrap();

        assert_eq!(report.final_state.sign, Sign::Empty);
        assert!(report.stranded.is_empty());
        assert_eq!(report.metrics.drained_total, 1);
        assert_eq!(report.metrics.departures_total, 2);

        let kinds: Vec<(RoomEventKind, &str)> =
            report.events.iter().map(|e| (e.kind, e.animal.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (RoomEventKind::Admitted, "D01"),
                (RoomEventKind::Queued, "C01"),
                (RoomEventKind::Departed, "D01"),
                (RoomEventKind::Drained, "C01"),
                (RoomEventKind::Departed, "C01"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_never_mix_species() {
        let report = simulation(Workload::demo().arrivals.animals).run().await.unwrap();
        for event in &report.events {
            assert!(event.dogs == 0 || event.cats == 0, "mixed room at seq {}", event.seq);
            assert_eq!(event.sign == Sign::Empty, event.dogs == 0 && event.cats == 0);
        }
        assert_eq!(report.final_state.sign, Sign::Empty);
        assert_eq!(report.metrics.departures_total, 5);
    }
}
