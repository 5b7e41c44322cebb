//! Domain models - passive data shared by every service
//!
//! - `Animal` - one arriving occupant, with its `Species`
//! - `Sign` - the room's exclusivity label
//! - `RoomEvent` - observable admission/departure decisions
//! - `Workload` - validated workload file

pub mod event;
pub mod types;
pub mod workload;

pub use event::{RoomEvent, RoomEventKind};
pub use types::{Animal, AnimalId, Sign, Species};
pub use workload::Workload;
