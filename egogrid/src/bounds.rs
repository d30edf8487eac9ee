//! Decoding of the level bounds record.
//!
//! The game writes its level rectangle with a non-JSON serializer, e.g.
//! `{X:-8 Y:0 Width:320 Height:184}`: keys are unquoted and fields are
//! separated by spaces. The grammar accepted here is
//!
//! ```text
//! record := "{"? field (sep field)* "}"?
//! field  := key (":" | whitespace) number
//! sep    := whitespace | ","
//! key    := "X" | "Y" | "Width" | "Height"
//! ```
//!
//! Each value is parsed once, straight from its token, so decoding is
//! exact for every finite number the game can print.

use serde::{Deserialize, Serialize};

use crate::MalformedPayload;

const KEYS: [&str; 4] = ["X", "Y", "Width", "Height"];

/// World-space origin and extent of the current level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelBounds {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Height")]
    pub height: f64,
}

impl LevelBounds {
    pub fn decode(raw: &str) -> Result<Self, MalformedPayload> {
        let [x, y, width, height] = parse_fields(raw)?;
        // `!(x > 0)` instead of `x <= 0` so that NaN is rejected too
        if !(width > 0.0) || !(height > 0.0) {
            return Err(MalformedPayload::NonPositiveExtent { width, height });
        }
        Ok(LevelBounds {
            x,
            y,
            width,
            height,
        })
    }

    /// Number of tile rows covered by the level.
    ///
    /// Saturates at `usize::MAX` for absurdly tall levels.
    pub fn rows_in_tiles(&self, tile_size: u32) -> usize {
        (self.height / f64::from(tile_size)).ceil() as usize
    }

    /// Number of tile columns covered by the level.
    ///
    /// Saturates at `usize::MAX` for absurdly wide levels.
    pub fn cols_in_tiles(&self, tile_size: u32) -> usize {
        (self.width / f64::from(tile_size)).ceil() as usize
    }
}

/// Rewrites the foreign bounds record into a JSON object with the four
/// known keys quoted and the fields comma-delimited.
pub fn repair_bounds(raw: &str) -> Result<String, MalformedPayload> {
    let values = parse_fields(raw)?;
    let fields: Vec<String> = KEYS
        .into_iter()
        .zip(values)
        // `{:?}` prints the shortest exact form, using an exponent where
        // that is shorter, which JSON accepts
        .map(|(key, value)| format!("\"{}\":{:?}", key, value))
        .collect();
    Ok(format!("{{{}}}", fields.join(",")))
}

/// The values of `X`, `Y`, `Width` and `Height`, in that order.
fn parse_fields(raw: &str) -> Result<[f64; 4], MalformedPayload> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('{').unwrap_or(trimmed);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut values: [Option<f64>; 4] = [None; 4];
    let mut tokens = inner
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .filter(|token| !token.is_empty());

    while let Some(key) = tokens.next() {
        let key_idx = KEYS.iter().position(|&k| k == key).ok_or_else(|| {
            MalformedPayload::UnexpectedBoundsToken {
                token: String::from(key),
            }
        })?;
        let value = tokens.next().ok_or(MalformedPayload::MissingBoundsKey {
            key: KEYS[key_idx],
        })?;
        let number = value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MalformedPayload::InvalidNumber {
                field: String::from(KEYS[key_idx]),
                value: String::from(value),
            })?;
        if values[key_idx].replace(number).is_some() {
            return Err(MalformedPayload::DuplicateBoundsKey { key: KEYS[key_idx] });
        }
    }

    let mut result = [0.0; 4];
    for ((key, value), slot) in KEYS.into_iter().zip(values).zip(result.iter_mut()) {
        *slot = value.ok_or(MalformedPayload::MissingBoundsKey { key })?;
    }
    Ok(result)
}
