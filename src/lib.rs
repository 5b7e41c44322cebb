//! Vet room library
//!
//! Shared-room admission protocol: one room, two species, one species at a
//! time. Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
