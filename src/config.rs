//! Engine tuning knobs, loaded from environment variables.
//!
//! Every knob has a compiled-in default, so a missing or malformed variable
//! never fails startup; it just falls back.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{DEFAULT_HIT_ALPHA_THRESHOLD, DEFAULT_HIT_DOWNSCALE, DEFAULT_LOD, MAX_PIECE_UNITS};

/// Runtime configuration shared by a [`crate::table::TableContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Masks are rendered at 1/N resolution before alpha sampling.
    pub hit_downscale: u32,
    /// Minimum alpha (0-255) that counts as an opaque pixel.
    pub hit_alpha_threshold: u8,
    /// Snap level applied by moves, clones and piles.
    pub default_lod: u8,
    /// Upper clamp for piece `w` / `h`, in grid units.
    pub max_piece_units: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_downscale: DEFAULT_HIT_DOWNSCALE,
            hit_alpha_threshold: DEFAULT_HIT_ALPHA_THRESHOLD,
            default_lod: DEFAULT_LOD,
            max_piece_units: MAX_PIECE_UNITS,
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment.
    ///
    /// - `TABLETOP_HIT_DOWNSCALE`: mask sampling divisor (default 4, min 1)
    /// - `TABLETOP_HIT_ALPHA_THRESHOLD`: opaque alpha cutoff (default 16)
    /// - `TABLETOP_DEFAULT_LOD`: snap level for moves (default 3, 1..=4)
    /// - `TABLETOP_MAX_PIECE_UNITS`: size clamp (default 32, min 1)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            hit_downscale: env_parse("TABLETOP_HIT_DOWNSCALE", DEFAULT_HIT_DOWNSCALE).max(1),
            hit_alpha_threshold: env_parse("TABLETOP_HIT_ALPHA_THRESHOLD", DEFAULT_HIT_ALPHA_THRESHOLD),
            default_lod: env_parse("TABLETOP_DEFAULT_LOD", DEFAULT_LOD).clamp(1, 4),
            max_piece_units: env_parse("TABLETOP_MAX_PIECE_UNITS", MAX_PIECE_UNITS).max(1),
        }
    }
}

/// Read and parse `key`, falling back to `default` when it is unset or malformed.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    parse_or_default(key, &raw, default)
}

/// Malformed values are logged at warn level with the key and raw text.
fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, raw, "unparsable config value; using default");
            default
        }
    }
}
