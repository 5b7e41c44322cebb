//! Services - protocol logic and simulations
//!
//! - `room` - Room state machine and FIFO wait queue
//! - `admission` - Lock-guarded admission controller
//! - `driver` - Task-per-animal simulation and drain scheduler
//! - `scheduling` - FCFS / SJF / Round Robin comparators
//! - `lab` - Compiler and database permit simulation

pub mod admission;
pub mod driver;
pub mod lab;
pub mod room;
pub mod scheduling;

pub use admission::{drain_channel, Admission, AdmissionController, Ticket};
pub use driver::{Simulation, SimulationReport};
pub use room::{RoomSnapshot, RoomState, WaitQueue};
