use crate::{
    catalog, Anchor, ConfigError, EgocentricCropper, GameStateSnapshot, GridCompositor,
    ObservationError, OccupancyGrid, PipelineConfig, Scalars, StateRecord,
};

/// The fixed-size view handed to the learner for one step.
#[derive(Clone, Debug, PartialEq)]
pub struct EgocentricObservation {
    /// `channels x window x window`
    pub grid: OccupancyGrid,
    pub anchor: Anchor,
    pub scalars: Scalars,
}

/// Turns snapshots into observations with a fixed configuration.
///
/// A pipeline holds no per-step state; one instance may serve any number
/// of steps, and independent sessions should each own one.
#[derive(Clone, Debug)]
pub struct ObservationPipeline {
    config: PipelineConfig,
    player_channel: usize,
}

impl ObservationPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let player_channel = config
            .player_channel()
            .ok_or_else(|| ConfigError::PlayerTypeNotInTable(config.player_type.clone()))?;
        Ok(Self {
            config,
            player_channel,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Terrain plus entity stamps, at `scale` cells per tile.
    pub fn build_grid(
        &self,
        snapshot: &GameStateSnapshot,
    ) -> Result<OccupancyGrid, ObservationError> {
        let config = &self.config;
        let terrain = snapshot.terrain.rasterize(config.scale);
        let mut grid = OccupancyGrid::with_terrain(&terrain, config.entity_types.num_channels());
        let entities = catalog(
            &snapshot.entities,
            &config.entity_types,
            config.namespace_separator,
        );
        let compositor = GridCompositor {
            bounds: &snapshot.bounds,
            tile_size: config.tile_size,
            scale: config.scale,
            policy: config.stamp_policy,
            entity_types: &config.entity_types,
        };
        compositor.stamp_all(&mut grid, &entities)?;
        Ok(grid)
    }

    pub fn cropper(&self) -> EgocentricCropper {
        EgocentricCropper {
            pad: self.config.padding(),
            half_window: self.config.half_window(),
            player_channel: self.player_channel,
            terrain_padding: self.config.terrain_padding,
        }
    }

    pub fn crop(&self, grid: &OccupancyGrid, scalars: Scalars) -> EgocentricObservation {
        let (window, anchor) = self.cropper().crop(grid);
        EgocentricObservation {
            grid: window,
            anchor,
            scalars,
        }
    }

    pub fn observe(
        &self,
        snapshot: &GameStateSnapshot,
    ) -> Result<EgocentricObservation, ObservationError> {
        let grid = self.build_grid(snapshot)?;
        Ok(self.crop(&grid, snapshot.scalars))
    }

    /// Decodes a wire record and observes it.
    pub fn observe_record(
        &self,
        record: &StateRecord,
    ) -> Result<EgocentricObservation, ObservationError> {
        let snapshot = GameStateSnapshot::decode(record, &self.config)?;
        self.observe(&snapshot)
    }
}
