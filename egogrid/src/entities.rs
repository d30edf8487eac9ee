use tracing::trace;

use crate::{EntityTypeTable, MalformedPayload, RawEntity, WireNumber};

/// An entity in world space with a validated bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    /// The type name as received, possibly namespace-qualified.
    pub type_name: String,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl EntityRecord {
    pub fn new(type_name: &str, left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            type_name: String::from(type_name),
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn from_raw(raw: &RawEntity) -> Result<Self, MalformedPayload> {
        let coordinate = |value: &Option<WireNumber>, coordinate: &'static str| {
            match value {
                Some(number) => number.parse().ok_or_else(|| MalformedPayload::InvalidNumber {
                    field: format!("{}.{}", raw.name, coordinate),
                    value: format!("{:?}", number),
                }),
                None => Err(MalformedPayload::MissingCoordinate {
                    type_name: raw.name.clone(),
                    coordinate,
                }),
            }
        };
        let entity = Self {
            type_name: raw.name.clone(),
            left: coordinate(&raw.left, "Left")?,
            right: coordinate(&raw.right, "Right")?,
            top: coordinate(&raw.top, "Top")?,
            bottom: coordinate(&raw.bottom, "Bottom")?,
        };
        if entity.left > entity.right || entity.top > entity.bottom {
            return Err(MalformedPayload::InvertedBox {
                type_name: entity.type_name,
                left: entity.left,
                right: entity.right,
                top: entity.top,
                bottom: entity.bottom,
            });
        }
        Ok(entity)
    }
}

/// A world-space axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl From<&EntityRecord> for Aabb {
    fn from(entity: &EntityRecord) -> Self {
        Self {
            left: entity.left,
            right: entity.right,
            top: entity.top,
            bottom: entity.bottom,
        }
    }
}

/// Strips everything up to and including the last `separator`.
pub fn bare_type_name(type_name: &str, separator: char) -> &str {
    match type_name.rfind(separator) {
        Some(idx) => &type_name[idx + separator.len_utf8()..],
        None => type_name,
    }
}

/// Converts raw entities into `(channel, box)` pairs, in input order.
///
/// Entities whose type is not in the table are dropped: most entities in a
/// level are irrelevant to the observation.
pub fn catalog(
    entities: &[EntityRecord],
    table: &EntityTypeTable,
    separator: char,
) -> Vec<(usize, Aabb)> {
    entities
        .iter()
        .filter_map(|entity| {
            let bare = bare_type_name(&entity.type_name, separator);
            match table.channel_of(bare) {
                Some(channel) => Some((channel, Aabb::from(entity))),
                None => {
                    trace!(type_name = %entity.type_name, "Dropping entity of unknown type");
                    None
                }
            }
        })
        .collect()
}
