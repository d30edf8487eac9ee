//! Extraction of the fixed-size window around the player.
//!
//! The grid is first padded on every side by more than half a window, so
//! that the window around any cell of the level, and around the fallback
//! anchor, lies inside the padded grid without further bounds checks.

use tracing::debug;

use crate::{OccupancyGrid, TerrainPadding};

/// Where the window was centered, in padded-grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// The first player cell in row-major order.
    Player { row: usize, col: usize },
    /// No player cell exists, e.g. while the player is respawning.
    Fallback { row: usize, col: usize },
}

impl Anchor {
    pub fn position(&self) -> (usize, usize) {
        match *self {
            Anchor::Player { row, col } | Anchor::Fallback { row, col } => (row, col),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Anchor::Fallback { .. })
    }
}

impl OccupancyGrid {
    /// Returns a copy of the grid with `pad` extra cells on every side.
    ///
    /// Channel 0 is extended according to `terrain_padding`, all other
    /// channels with empty cells.
    pub fn padded(&self, pad: usize, terrain_padding: TerrainPadding) -> OccupancyGrid {
        let (channels, rows, cols) = self.shape();
        let mut out = OccupancyGrid::new(channels, rows + 2 * pad, cols + 2 * pad);
        for channel in 0..channels {
            for row in 0..rows {
                for col in 0..cols {
                    if self.get(channel, row, col) {
                        out.set(channel, row + pad, col + pad, true);
                    }
                }
            }
        }
        match terrain_padding {
            TerrainPadding::Solid => {
                for row in 0..out.rows() {
                    for col in 0..out.cols() {
                        let inside = (pad..pad + rows).contains(&row)
                            && (pad..pad + cols).contains(&col);
                        if !inside {
                            out.set(0, row, col, true);
                        }
                    }
                }
            }
            TerrainPadding::Edge if rows > 0 && cols > 0 => {
                for row in 0..out.rows() {
                    for col in 0..out.cols() {
                        let src_row = row.saturating_sub(pad).min(rows - 1);
                        let src_col = col.saturating_sub(pad).min(cols - 1);
                        out.set(0, row, col, self.get(0, src_row, src_col));
                    }
                }
            }
            TerrainPadding::Edge => {}
        }
        out
    }

    /// Copies the `size` x `size` window whose top-left corner is at
    /// `(top, left)`, across all channels.
    ///
    /// Panics if the window does not fit inside the grid.
    pub fn window(&self, top: usize, left: usize, size: usize) -> OccupancyGrid {
        assert!(top + size <= self.rows() && left + size <= self.cols());
        let mut out = OccupancyGrid::new(self.channels(), size, size);
        for channel in 0..self.channels() {
            for row in 0..size {
                for col in 0..size {
                    if self.get(channel, top + row, left + col) {
                        out.set(channel, row, col, true);
                    }
                }
            }
        }
        out
    }
}

/// Crops the egocentric window out of a completed grid.
#[derive(Clone, Copy, Debug)]
pub struct EgocentricCropper {
    /// Padding added on every side; must exceed `half_window`.
    pub pad: usize,
    /// Half the side length of the window.
    pub half_window: usize,
    pub player_channel: usize,
    pub terrain_padding: TerrainPadding,
}

impl EgocentricCropper {
    /// Finds the anchor for `grid` (unpadded), in padded coordinates.
    pub fn anchor(&self, grid: &OccupancyGrid) -> Anchor {
        match grid.first_set(self.player_channel) {
            Some((row, col)) => Anchor::Player {
                row: row + self.pad,
                col: col + self.pad,
            },
            None => {
                let row = grid.rows().saturating_sub(1) + self.half_window;
                let col = self.half_window;
                debug!(row, col, "No player on the grid, using the fallback anchor");
                Anchor::Fallback { row, col }
            }
        }
    }

    /// Returns the window and the anchor it is centered on.
    ///
    /// The window always has `2 * half_window` rows and columns.
    pub fn crop(&self, grid: &OccupancyGrid) -> (OccupancyGrid, Anchor) {
        debug_assert!(self.pad > self.half_window);
        let anchor = self.anchor(grid);
        let padded = grid.padded(self.pad, self.terrain_padding);
        let (row, col) = anchor.position();
        let window = padded.window(
            row - self.half_window,
            col - self.half_window,
            2 * self.half_window,
        );
        (window, anchor)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{quickcheck, TestResult};

    use super::*;
    use crate::BoolGrid;

    const PLAYER: usize = 1;

    fn cropper(half_window: usize, terrain_padding: TerrainPadding) -> EgocentricCropper {
        EgocentricCropper {
            pad: half_window + 2,
            half_window,
            player_channel: PLAYER,
            terrain_padding,
        }
    }

    quickcheck! {
        fn window_shape_is_fixed(
            rows: u8,
            cols: u8,
            player: Option<(u8, u8)>,
            half_window: u8
        ) -> TestResult {
            let (rows, cols) = (usize::from(rows % 40) + 1, usize::from(cols % 40) + 1);
            let half_window = usize::from(half_window % 20) + 1;
            let mut grid = OccupancyGrid::new(3, rows, cols);
            if let Some((row, col)) = player {
                grid.set(PLAYER, usize::from(row) % rows, usize::from(col) % cols, true);
            }
            for padding in [TerrainPadding::Solid, TerrainPadding::Edge] {
                let (window, _) = cropper(half_window, padding).crop(&grid);
                if window.shape() != (3, 2 * half_window, 2 * half_window) {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
    }

    #[test]
    fn anchor_is_first_in_row_major_order() {
        let mut grid = OccupancyGrid::new(2, 8, 8);
        grid.set(PLAYER, 5, 1, true);
        grid.set(PLAYER, 2, 3, true);
        let cropper = cropper(2, TerrainPadding::Solid);
        assert_eq!(
            cropper.anchor(&grid),
            Anchor::Player {
                row: 2 + cropper.pad,
                col: 3 + cropper.pad
            }
        );
    }

    #[test]
    fn window_is_centered_on_anchor() {
        let mut grid = OccupancyGrid::new(2, 10, 10);
        grid.set(PLAYER, 4, 6, true);
        grid.set(0, 3, 5, true);
        let (window, anchor) = cropper(3, TerrainPadding::Edge).crop(&grid);
        assert!(!anchor.is_fallback());
        assert_eq!(window.shape(), (2, 6, 6));
        // The anchor lands at (half_window, half_window)
        assert!(window.get(PLAYER, 3, 3));
        assert_eq!(window.count_ones(PLAYER), 1);
        assert!(window.get(0, 2, 2));
        assert_eq!(window.count_ones(0), 1);
    }

    #[test]
    fn solid_padding() {
        let grid = OccupancyGrid::new(2, 2, 2);
        let padded = grid.padded(1, TerrainPadding::Solid);
        assert_eq!(padded.shape(), (2, 4, 4));
        assert_eq!(padded.count_ones(0), 16 - 4);
        assert!(!padded.get(0, 1, 1));
        assert_eq!(padded.count_ones(1), 0);
    }

    #[test]
    fn edge_padding() {
        let terrain = BoolGrid::from_rows(&[vec![true, false], vec![false, false]]);
        let mut grid = OccupancyGrid::with_terrain(&terrain, 2);
        grid.set(PLAYER, 0, 0, true);
        let padded = grid.padded(2, TerrainPadding::Edge);
        assert_eq!(padded.shape(), (2, 6, 6));
        // The top-left corner replicates the solid cell
        for row in 0..3 {
            for col in 0..3 {
                assert!(padded.get(0, row, col), "({}, {})", row, col);
            }
        }
        assert!(!padded.get(0, 0, 3));
        assert!(!padded.get(0, 5, 5));
        assert_eq!(padded.count_ones(0), 9);
        // Entity channels are never replicated
        assert_eq!(padded.count_ones(PLAYER), 1);
        assert!(padded.get(PLAYER, 2, 2));
    }

    #[test]
    fn fallback_anchor_without_player() {
        let terrain = BoolGrid::from_rows(&vec![vec![true; 6]; 6]);
        let grid = OccupancyGrid::with_terrain(&terrain, 2);
        let cropper = cropper(2, TerrainPadding::Solid);
        let (window, anchor) = cropper.crop(&grid);
        assert_eq!(anchor, Anchor::Fallback { row: 5 + 2, col: 2 });
        assert_eq!(window.shape(), (2, 4, 4));
        // Padded rows 5..9 and cols 0..4, which lie in the solid padding left
        // of the level
        assert_eq!(window.count_ones(0), 16);
        assert_eq!(window.count_ones(PLAYER), 0);
    }
}
