//! # Selva Encounter
//!
//! The simulation core of the Selva boss fight.
//!
//! This crate provides everything that runs inside a frame:
//! - Behavior profile, its JSON store and the predictive model
//! - Per-boss threat state machine
//! - Attack pattern catalog and generator, including the beam
//! - Projectile, beam and warning entities
//! - Player and boss state
//! - Per-tick collision resolution
//! - Multi-phase director with spirit revival
//! - Event bus for the presentation layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod boss;
pub mod config;
pub mod director;
pub mod entity;
pub mod events;
pub mod patterns;
pub mod player;
pub mod predictive;
pub mod profile;
pub mod resolver;
pub mod store;
pub mod threat;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::boss::*;
    pub use crate::config::*;
    pub use crate::director::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::patterns::*;
    pub use crate::player::*;
    pub use crate::predictive::*;
    pub use crate::profile::*;
    pub use crate::resolver::*;
    pub use crate::store::*;
    pub use crate::threat::*;
}

pub use prelude::*;
