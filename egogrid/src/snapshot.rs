use tracing::trace;

use crate::{
    bare_type_name, EntityRecord, LevelBounds, MalformedPayload, PipelineConfig, StateRecord,
    TerrainBits,
};

/// Values reported by the game that are passed through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Scalars {
    pub climbing: Option<bool>,
    pub can_dash: Option<bool>,
    /// `[vx, vy]`
    pub speed: Option<[f64; 2]>,
}

impl Scalars {
    pub fn decode(record: &StateRecord) -> Result<Self, MalformedPayload> {
        let speed = match &record.speed {
            Some(speed) => Some(parse_speed(speed)?),
            None => None,
        };
        Ok(Self {
            climbing: record.climbing,
            can_dash: record.can_dash,
            speed,
        })
    }
}

fn parse_speed(speed: &str) -> Result<[f64; 2], MalformedPayload> {
    let invalid = || MalformedPayload::InvalidSpeed {
        value: String::from(speed),
    };
    let mut parts = speed.split(',').map(|part| part.trim().parse::<f64>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(vx)), Some(Ok(vy)), None) if vx.is_finite() && vy.is_finite() => Ok([vx, vy]),
        _ => Err(invalid()),
    }
}

/// The normalized state of one step.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStateSnapshot {
    pub bounds: LevelBounds,
    pub entities: Vec<EntityRecord>,
    pub terrain: TerrainBits,
    pub scalars: Scalars,
}

impl GameStateSnapshot {
    /// Repairs and validates a wire record.
    ///
    /// An entity of a type the pipeline doesn't draw is skipped when its
    /// coordinates are unusable; for any other entity that is an error.
    pub fn decode(record: &StateRecord, config: &PipelineConfig) -> Result<Self, MalformedPayload> {
        let bounds = LevelBounds::decode(&record.bounds)?;
        let terrain = TerrainBits::parse(&record.solids, &bounds, config)?;
        let mut entities = Vec::with_capacity(record.entities.len());
        for raw in &record.entities {
            match EntityRecord::from_raw(raw) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    let bare = bare_type_name(&raw.name, config.namespace_separator);
                    if config.entity_types.channel_of(bare).is_some() {
                        return Err(err);
                    }
                    trace!(%err, "Skipping unusable entity of unknown type");
                }
            }
        }
        Ok(Self {
            bounds,
            entities,
            terrain,
            scalars: Scalars::decode(record)?,
        })
    }
}
