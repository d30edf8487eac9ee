use crate::terrain::area_spans;
use crate::{EntityTypeTable, OccupancyGrid};

/// Collapses the channels into one debugging image, row-major.
///
/// Each cell is its terrain bit plus the argmax over its channels, ties
/// going to the lower channel. A cell with terrain and no entity is
/// therefore 1, and so is a cell with only the channel 1 entity. Values
/// saturate at 255, which only matters for tables of more than 254 types.
pub fn composite(grid: &OccupancyGrid) -> Vec<u8> {
    let (channels, rows, cols) = grid.shape();
    let mut out = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let terrain = u8::from(grid.get(0, row, col));
            // With boolean channels, argmax is the first set channel (or 0)
            let argmax = (0..channels)
                .find(|&channel| grid.get(channel, row, col))
                .unwrap_or(0);
            let value = u8::try_from(argmax).unwrap_or(u8::MAX).saturating_add(terrain);
            out.push(value);
        }
    }
    out
}

/// [`composite()`] resampled to `size` x `size` by area averaging, the
/// fixed-size debugging image handed to image-based learners.
pub fn composite_resized(grid: &OccupancyGrid, size: usize) -> Vec<f32> {
    let (_, rows, cols) = grid.shape();
    let image = composite(grid);
    let mut out = vec![0.0; size * size];
    if rows == 0 || cols == 0 {
        return out;
    }
    let row_spans = area_spans(rows, size);
    let col_spans = area_spans(cols, size);
    for (out_row, row_span) in row_spans.iter().enumerate() {
        for (out_col, col_span) in col_spans.iter().enumerate() {
            let mut sum = 0.0;
            let mut area = 0.0;
            for &(row, row_weight) in row_span {
                for &(col, col_weight) in col_span {
                    let weight = row_weight * col_weight;
                    area += weight;
                    sum += weight * f64::from(image[row * cols + col]);
                }
            }
            if area > 0.0 {
                out[out_row * size + out_col] = (sum / area) as f32;
            }
        }
    }
    out
}

/// Draws the grid as text, one line per row.
///
/// `.` is empty, `#` is terrain and entity cells show their channel number
/// (letters after 9). Where entities overlap, the lowest channel is shown.
pub fn render_ascii(grid: &OccupancyGrid, entity_types: &EntityTypeTable) -> String {
    let (channels, rows, cols) = grid.shape();
    debug_assert!(channels <= entity_types.num_channels());
    let mut result = String::with_capacity(rows * (cols + 1));
    for row in 0..rows {
        for col in 0..cols {
            let entity = (1..channels).find(|&channel| grid.get(channel, row, col));
            let c = match entity {
                Some(channel) => char::from_digit(channel as u32, 36).unwrap_or('?'),
                None if grid.get(0, row, col) => '#',
                None => '.',
            };
            result.push(c);
        }
        result.push('\n');
    }
    result
}

/// A legend for [`render_ascii()`].
pub fn legend(entity_types: &EntityTypeTable) -> String {
    let mut result = String::from("# terrain");
    for (channel, name) in entity_types.iter() {
        let c = char::from_digit(channel as u32, 36).unwrap_or('?');
        result += &format!(", {} {}", c, name);
    }
    result
}
