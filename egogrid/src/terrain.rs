use std::fmt::{self, Debug};

use crate::{LevelBounds, MalformedPayload, PipelineConfig};

/// A dense row-major 2D grid of booleans.
#[derive(Clone, PartialEq, Eq)]
pub struct BoolGrid {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl BoolGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    /// Builds a grid from equally long rows.
    ///
    /// Panics if the rows have different lengths.
    pub fn from_rows(rows: &[Vec<bool>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|row| row.len() == cols));
        Self {
            rows: rows.len(),
            cols,
            cells: rows.concat(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn count_ones(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    /// Resamples the grid to `rows` x `cols` with area averaging.
    ///
    /// Every output cell covers a rectangle of the input; its value is the
    /// overlap-weighted mean of the input cells under that rectangle,
    /// thresholded at one half. Upscaling by an integer factor therefore
    /// replicates every input cell into a block.
    pub fn resample_area(&self, rows: usize, cols: usize) -> BoolGrid {
        let mut out = BoolGrid::new(rows, cols);
        if self.rows == 0 || self.cols == 0 {
            return out;
        }
        let row_spans = area_spans(self.rows, rows);
        let col_spans = area_spans(self.cols, cols);
        for (out_row, row_span) in row_spans.iter().enumerate() {
            for (out_col, col_span) in col_spans.iter().enumerate() {
                let mut sum = 0.0;
                let mut area = 0.0;
                for &(in_row, row_weight) in row_span {
                    for &(in_col, col_weight) in col_span {
                        let weight = row_weight * col_weight;
                        area += weight;
                        if self.get(in_row, in_col) {
                            sum += weight;
                        }
                    }
                }
                out.set(out_row, out_col, area > 0.0 && sum / area >= 0.5);
            }
        }
        out
    }
}

/// For every output index, the input indices it overlaps and by how much.
pub(crate) fn area_spans(input_len: usize, output_len: usize) -> Vec<Vec<(usize, f64)>> {
    let position = |out_idx: usize| (out_idx * input_len) as f64 / output_len as f64;
    (0..output_len)
        .map(|out_idx| {
            let start = position(out_idx);
            let end = position(out_idx + 1);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(input_len);
            (first..last)
                .filter_map(|in_idx| {
                    let overlap = end.min((in_idx + 1) as f64) - start.max(in_idx as f64);
                    (overlap > 0.0).then_some((in_idx, overlap))
                })
                .collect()
        })
        .collect()
}

impl Debug for BoolGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = String::with_capacity(self.rows * (self.cols + 1));
        for row in 0..self.rows {
            for col in 0..self.cols {
                s.push(if self.get(row, col) { '#' } else { '.' });
            }
            s.push('\n');
        }
        write!(f, "{}", s)
    }
}

/// The solid tiles of a level, one cell per tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainBits(BoolGrid);

impl TerrainBits {
    /// Parses the solids payload against the tile dimensions of `bounds`.
    ///
    /// Rows shorter than the level are padded with empty tiles; a row that
    /// is longer, or a row count that differs from the level's height in
    /// tiles, is an error. So is a level whose padded grid would exceed
    /// `config.max_cells`; nothing is allocated before that check.
    pub fn parse(
        solids: &str,
        bounds: &LevelBounds,
        config: &PipelineConfig,
    ) -> Result<Self, MalformedPayload> {
        let expected_rows = bounds.rows_in_tiles(config.tile_size);
        let width = bounds.cols_in_tiles(config.tile_size);
        match config.padded_grid_cells(expected_rows, width) {
            Some(cells) if cells <= config.max_cells => {}
            _ => {
                return Err(MalformedPayload::LevelTooLarge {
                    rows: expected_rows,
                    cols: width,
                    limit: config.max_cells,
                })
            }
        }

        let mut lines: Vec<&str> = solids
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        // A single trailing newline terminates the last row
        if lines.len() == expected_rows + 1 && lines.last() == Some(&"") {
            lines.pop();
        }
        if lines.len() != expected_rows {
            return Err(MalformedPayload::RowCountMismatch {
                expected: expected_rows,
                found: lines.len(),
            });
        }

        let mut grid = BoolGrid::new(expected_rows, width);
        for (row, line) in lines.iter().enumerate() {
            let length = line.chars().count();
            if length > width {
                return Err(MalformedPayload::RowTooLong { row, length, width });
            }
            for (col, c) in line.chars().enumerate() {
                grid.set(row, col, c != '0');
            }
        }
        Ok(TerrainBits(grid))
    }

    pub fn grid(&self) -> &BoolGrid {
        &self.0
    }

    /// The terrain at `scale` cells per tile.
    pub fn rasterize(&self, scale: u32) -> BoolGrid {
        let scale = scale as usize;
        self.0
            .resample_area(self.0.rows() * scale, self.0.cols() * scale)
    }
}

impl From<BoolGrid> for TerrainBits {
    fn from(grid: BoolGrid) -> Self {
        TerrainBits(grid)
    }
}
