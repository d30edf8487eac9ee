use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How the terrain channel is extended beyond the level when padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainPadding {
    /// Everything outside the level is solid ground.
    Solid,
    /// The outermost row/column of the level is repeated.
    Edge,
}

/// What to do with an entity whose rectangle leaves the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampPolicy {
    /// Stamp only the part that overlaps the grid.
    Clamp,
    /// Fail the step with
    /// [`ObservationError::OutOfRangeStamp`](crate::ObservationError::OutOfRangeStamp).
    Reject,
}

/// Ordered mapping from entity type name to channel index.
///
/// The type at position `i` is drawn on channel `i + 1`; channel 0 is
/// always the terrain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTypeTable {
    names: Vec<String>,
}

impl EntityTypeTable {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The channel for a bare (namespace-free) type name.
    pub fn channel_of(&self, type_name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|name| name == type_name)
            .map(|idx| idx + 1)
    }

    /// The type name drawn on `channel`, if it is an entity channel.
    pub fn type_name(&self, channel: usize) -> Option<&str> {
        channel
            .checked_sub(1)
            .and_then(|idx| self.names.get(idx))
            .map(String::as_str)
    }

    /// Number of entity types, i.e. the highest channel index.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entity types plus the terrain channel.
    pub fn num_channels(&self) -> usize {
        self.names.len() + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx + 1, name.as_str()))
    }
}

impl Default for EntityTypeTable {
    fn default() -> Self {
        Self::new([
            "CrumblePlatform",
            "DashBlock",
            "FallingBlock",
            "JumpthruPlatform",
            "Player",
            "Refill",
            "Spikes",
            "Spring",
            "ZipMover",
        ])
    }
}

/// Everything the pipeline needs besides the snapshot itself.
///
/// Every field has a default, so a config file only needs to list what
/// it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Side length of one terrain tile, in world units.
    pub tile_size: u32,
    /// Grid cells per tile along each axis.
    pub scale: u32,
    /// Side length of the observation window, in tiles.
    pub vision_size: u32,
    pub terrain_padding: TerrainPadding,
    pub stamp_policy: StampPolicy,
    pub entity_types: EntityTypeTable,
    /// Type names are qualified up to the last occurrence of this character.
    pub namespace_separator: char,
    /// The entity type the observation is centered on.
    pub player_type: String,
    /// Upper bound on the cells of the padded grid, all channels together.
    /// Larger levels fail to decode.
    pub max_cells: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_size: 8,
            scale: 4,
            vision_size: 24,
            terrain_padding: TerrainPadding::Edge,
            stamp_policy: StampPolicy::Clamp,
            entity_types: EntityTypeTable::default(),
            namespace_separator: '.',
            player_type: String::from("Player"),
            max_cells: 1 << 26,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Could not parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.scale == 0 {
            return Err(ConfigError::ZeroScale);
        }
        if self.vision_size < 2 {
            return Err(ConfigError::VisionTooSmall(self.vision_size));
        }
        if self.entity_types.is_empty() {
            return Err(ConfigError::EmptyEntityTable);
        }
        let mut seen = BTreeSet::new();
        for (_, name) in self.entity_types.iter() {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateEntityType(String::from(name)));
            }
        }
        if self.player_channel().is_none() {
            return Err(ConfigError::PlayerTypeNotInTable(self.player_type.clone()));
        }
        Ok(())
    }

    pub fn player_channel(&self) -> Option<usize> {
        self.entity_types.channel_of(&self.player_type)
    }

    /// Half the side length of the observation window, in grid cells.
    pub fn half_window(&self) -> usize {
        (self.vision_size / 2) as usize * self.scale as usize
    }

    /// Side length of the observation window, in grid cells.
    pub fn window_size(&self) -> usize {
        2 * self.half_window()
    }

    /// How many cells the grid is padded by on every side before cropping.
    ///
    /// Always larger than [`Self::half_window()`], so any window around a
    /// cell of the unpadded grid lies fully inside the padded grid.
    pub fn padding(&self) -> usize {
        (self.vision_size / 2 + 1) as usize * self.scale as usize
    }

    /// Cells of the padded grid for a level of `rows` x `cols` tiles, or
    /// `None` on overflow.
    pub fn padded_grid_cells(&self, rows: usize, cols: usize) -> Option<usize> {
        let scale = self.scale as usize;
        let border = self.padding().checked_mul(2)?;
        let padded_rows = rows.checked_mul(scale)?.checked_add(border)?;
        let padded_cols = cols.checked_mul(scale)?.checked_add(border)?;
        padded_rows
            .checked_mul(padded_cols)?
            .checked_mul(self.entity_types.num_channels())
    }
}
