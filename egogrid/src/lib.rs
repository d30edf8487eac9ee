//! Turns raw game-state snapshots into fixed-size, egocentric occupancy
//! grids.
//!
//! The flow for one step is: [`StepReply`] (wire) → [`GameStateSnapshot`]
//! (repaired bounds, validated entities, [`TerrainBits`]) →
//! [`OccupancyGrid`] (terrain plus one channel per entity type) →
//! [`EgocentricObservation`] (the window around the player).

pub use bounds::*;
pub use config::*;
pub use crop::*;
pub use entities::*;
pub use error::*;
pub use grid::*;
pub use pipeline::*;
pub use protocol_types::*;
pub use snapshot::*;
pub use terrain::*;
pub use visualization::*;

#[cfg(test)]
mod arbitrary;
mod bounds;
mod config;
mod crop;
mod entities;
mod error;
mod grid;
mod pipeline;
mod protocol_types;
mod snapshot;
mod terrain;
mod visualization;
