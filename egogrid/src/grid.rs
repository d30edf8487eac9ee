use tracing::debug;

use crate::{Aabb, BoolGrid, EntityTypeTable, LevelBounds, ObservationError, StampPolicy};

/// A stack of boolean layers indexed by `[channel][row][col]`.
///
/// Channel 0 is the terrain, channels `1..channels` hold one entity type
/// each.
#[derive(Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    channels: usize,
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(channels: usize, rows: usize, cols: usize) -> Self {
        Self {
            channels,
            rows,
            cols,
            cells: vec![false; channels * rows * cols],
        }
    }

    /// A grid with `terrain` on channel 0 and all entity channels empty.
    pub fn with_terrain(terrain: &BoolGrid, channels: usize) -> Self {
        assert!(channels >= 1);
        let (rows, cols) = terrain.shape();
        let mut cells = Vec::with_capacity(channels * rows * cols);
        cells.extend_from_slice(terrain.as_slice());
        cells.resize(channels * rows * cols, false);
        Self {
            channels,
            rows,
            cols,
            cells,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(channels, rows, cols)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.rows, self.cols)
    }

    pub fn get(&self, channel: usize, row: usize, col: usize) -> bool {
        self.cells[self.idx(channel, row, col)]
    }

    pub fn set(&mut self, channel: usize, row: usize, col: usize, value: bool) {
        let idx = self.idx(channel, row, col);
        self.cells[idx] = value;
    }

    /// One channel as a row-major slice.
    pub fn channel(&self, channel: usize) -> &[bool] {
        let len = self.rows * self.cols;
        &self.cells[channel * len..(channel + 1) * len]
    }

    /// All cells in channel-major, then row-major order.
    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    /// The cells as `0.0`/`1.0`, in the same order as [`Self::as_slice()`].
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.cells.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect()
    }

    pub fn count_ones(&self, channel: usize) -> usize {
        self.channel(channel).iter().filter(|&&c| c).count()
    }

    /// Sets every cell of `channel` in `[top, bottom) x [left, right)`.
    ///
    /// Panics if the rectangle does not lie inside the grid.
    pub(crate) fn fill_rect(
        &mut self,
        channel: usize,
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
    ) {
        assert!(
            channel < self.channels && bottom <= self.rows && right <= self.cols,
            "rectangle [{}, {}) x [{}, {}) on channel {} is outside the grid",
            top,
            bottom,
            left,
            right,
            channel
        );
        if left >= right {
            return;
        }
        for row in top..bottom {
            let start = self.idx(channel, row, left);
            let end = start + right.saturating_sub(left);
            self.cells[start..end].fill(true);
        }
    }

    /// The first set cell of `channel` in row-major order.
    pub fn first_set(&self, channel: usize) -> Option<(usize, usize)> {
        self.channel(channel)
            .iter()
            .position(|&c| c)
            .map(|idx| (idx / self.cols, idx % self.cols))
    }

    // Without this check a column past the end would alias the next row, and
    // a row past the end the next channel
    fn idx(&self, channel: usize, row: usize, col: usize) -> usize {
        assert!(
            channel < self.channels && row < self.rows && col < self.cols,
            "cell ({}, {}, {}) is outside the {} x {} x {} grid",
            channel,
            row,
            col,
            self.channels,
            self.rows,
            self.cols
        );
        (channel * self.rows + row) * self.cols + col
    }
}

impl std::fmt::Debug for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OccupancyGrid({} x {} x {}, ones per channel: {:?})",
            self.channels,
            self.rows,
            self.cols,
            (0..self.channels).map(|c| self.count_ones(c)).collect::<Vec<_>>()
        )
    }
}

/// A rectangle in grid cells, as computed from a world-space box.
///
/// May extend past the grid in any direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRect {
    pub top: i64,
    pub bottom: i64,
    pub left: i64,
    pub right: i64,
}

impl GridRect {
    /// Maps a world-space box to grid cells: `floor` for the near edges and
    /// `ceil` for the far edges, so every partially covered cell counts.
    pub fn from_world(aabb: &Aabb, bounds: &LevelBounds, tile_size: u32, scale: u32) -> Self {
        let cells_per_unit = f64::from(scale) / f64::from(tile_size);
        Self {
            top: ((aabb.top - bounds.y) * cells_per_unit).floor() as i64,
            bottom: ((aabb.bottom - bounds.y) * cells_per_unit).ceil() as i64,
            left: ((aabb.left - bounds.x) * cells_per_unit).floor() as i64,
            right: ((aabb.right - bounds.x) * cells_per_unit).ceil() as i64,
        }
    }

    pub fn is_inside(&self, rows: usize, cols: usize) -> bool {
        self.top >= 0 && self.left >= 0 && self.bottom <= rows as i64 && self.right <= cols as i64
    }

    /// The part of the rectangle that overlaps a `rows` x `cols` grid, as
    /// `(top, bottom, left, right)`; `None` if there is no overlap.
    pub fn clamp(&self, rows: usize, cols: usize) -> Option<(usize, usize, usize, usize)> {
        let top = self.top.clamp(0, rows as i64) as usize;
        let bottom = self.bottom.clamp(0, rows as i64) as usize;
        let left = self.left.clamp(0, cols as i64) as usize;
        let right = self.right.clamp(0, cols as i64) as usize;
        (top < bottom && left < right).then_some((top, bottom, left, right))
    }
}

/// Stamps entity boxes onto their channels.
pub struct GridCompositor<'a> {
    pub bounds: &'a LevelBounds,
    pub tile_size: u32,
    pub scale: u32,
    pub policy: StampPolicy,
    /// Only used for error messages and logging.
    pub entity_types: &'a EntityTypeTable,
}

impl GridCompositor<'_> {
    /// Sets the cells covered by every `(channel, box)` pair.
    ///
    /// Stamps accumulate: the result only depends on the set of pairs, not
    /// on their order or multiplicity.
    pub fn stamp_all(
        &self,
        grid: &mut OccupancyGrid,
        entities: &[(usize, Aabb)],
    ) -> Result<(), ObservationError> {
        for (channel, aabb) in entities {
            self.stamp(grid, *channel, aabb)?;
        }
        Ok(())
    }

    pub fn stamp(
        &self,
        grid: &mut OccupancyGrid,
        channel: usize,
        aabb: &Aabb,
    ) -> Result<(), ObservationError> {
        let rect = GridRect::from_world(aabb, self.bounds, self.tile_size, self.scale);
        let (rows, cols) = (grid.rows(), grid.cols());
        if !rect.is_inside(rows, cols) {
            let type_name = self.entity_types.type_name(channel).unwrap_or("?");
            match self.policy {
                StampPolicy::Reject => {
                    return Err(ObservationError::OutOfRangeStamp {
                        type_name: String::from(type_name),
                        top: rect.top,
                        bottom: rect.bottom,
                        left: rect.left,
                        right: rect.right,
                        rows,
                        cols,
                    });
                }
                StampPolicy::Clamp => {
                    debug!(type_name, ?rect, rows, cols, "Clamping entity to the grid");
                }
            }
        }
        if let Some((top, bottom, left, right)) = rect.clamp(rows, cols) {
            grid.fill_rect(channel, top, bottom, left, right);
        }
        Ok(())
    }
}
