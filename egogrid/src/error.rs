use thiserror::Error;

/// A payload from the game that cannot be turned into a snapshot.
///
/// This is fatal to the step that received it, but not to the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedPayload {
    #[error("bounds record is missing the key {key}")]
    MissingBoundsKey { key: &'static str },
    #[error("bounds record contains the key {key} more than once")]
    DuplicateBoundsKey { key: &'static str },
    #[error("bounds record contains the unexpected token '{token}'")]
    UnexpectedBoundsToken { token: String },
    #[error("could not parse '{value}' as a number for {field}")]
    InvalidNumber { field: String, value: String },
    #[error("level bounds must have a positive extent, got {width} x {height}")]
    NonPositiveExtent { width: f64, height: f64 },
    #[error("a level of {rows} x {cols} tiles needs more than {limit} grid cells")]
    LevelTooLarge {
        rows: usize,
        cols: usize,
        limit: usize,
    },
    #[error("solids payload has {found} rows, but the level bounds require {expected}")]
    RowCountMismatch { expected: usize, found: usize },
    #[error("solids row {row} has {length} columns, but the level is only {width} wide")]
    RowTooLong {
        row: usize,
        length: usize,
        width: usize,
    },
    #[error("entity {type_name} has no {coordinate} coordinate")]
    MissingCoordinate {
        type_name: String,
        coordinate: &'static str,
    },
    #[error(
        "entity {type_name} has an inverted bounding box ({left}, {top}) - ({right}, {bottom})"
    )]
    InvertedBox {
        type_name: String,
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    },
    #[error("speed '{value}' is not a pair of comma-separated numbers")]
    InvalidSpeed { value: String },
    #[error("reply is not a [state, reward, terminated] array: {reason}")]
    InvalidReply { reason: String },
}

/// The error type for turning one snapshot into an observation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObservationError {
    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayload),
    /// Only produced under [`StampPolicy::Reject`](crate::StampPolicy::Reject).
    #[error(
        "{type_name} covers rows {top}..{bottom} and columns {left}..{right}, \
         which is outside the {rows} x {cols} grid"
    )]
    OutOfRangeStamp {
        type_name: String,
        top: i64,
        bottom: i64,
        left: i64,
        right: i64,
        rows: usize,
        cols: usize,
    },
}

/// The error type for [`PipelineConfig::validate()`](crate::PipelineConfig::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tile_size must be positive")]
    ZeroTileSize,
    #[error("scale must be positive")]
    ZeroScale,
    #[error("vision_size must be at least 2, got {0}")]
    VisionTooSmall(u32),
    #[error("the entity type table is empty")]
    EmptyEntityTable,
    #[error("the entity type {0} appears twice in the table")]
    DuplicateEntityType(String),
    #[error("the player type {0} is not in the entity type table")]
    PlayerTypeNotInTable(String),
}
