//! Patch sanitizer.
//!
//! Patches only ever come from this crate or the cooperating host, so a bad
//! field means a producer bug, not an attack. The sanitizer therefore repairs
//! instead of rejecting: known fields are clamped or wrapped into their
//! domain, unknown or mistyped fields are dropped with a debug log.

#[cfg(test)]
#[path = "sanitize_test.rs"]
mod sanitize_test;

use serde_json::Value;
use uuid::Uuid;

use crate::consts::NUMBER_MODULUS;
use crate::piece::{AssetId, Flags, Layer, Patch, Piece};
use crate::populate::normalize_rotation;
use crate::table::TableContext;

const ALLOWED_FIELDS: [&str; 13] = ["id", "x", "y", "z", "w", "h", "r", "s", "n", "c", "f", "t", "b"];

/// Turn an arbitrary JSON patch into a clean [`Patch`].
///
/// `existing` is the piece the patch targets; when `None` it is looked up on
/// the table by id. Returns `None` only when there is no usable `id`.
#[must_use]
pub fn sanitize(table: &TableContext, raw: &Value, existing: Option<&Piece>) -> Option<Patch> {
    let Some(map) = raw.as_object() else {
        tracing::debug!("dropping non-object patch");
        return None;
    };
    let id = map
        .get("id")
        .and_then(Value::as_str)
        .and_then(parse_id)?;

    for key in map.keys().filter(|k| !ALLOWED_FIELDS.contains(&k.as_str())) {
        tracing::debug!(%id, field = %key, "dropping unrecognized patch field");
    }

    let existing = existing.or_else(|| table.get(&id));
    let patch = Patch {
        id,
        x: map.get("x").and_then(as_number),
        y: map.get("y").and_then(as_number),
        z: map.get("z").and_then(as_number).map(round_to_i64),
        w: map.get("w").and_then(as_number).map(|v| size_units(v, table)),
        h: map.get("h").and_then(as_number).map(|v| size_units(v, table)),
        r: map.get("r").and_then(as_number),
        s: map.get("s").and_then(as_number).map(|v| side_index(round_to_i64(v), existing)),
        n: map.get("n").and_then(as_number).map(|v| wrap_number(round_to_i64(v))),
        c: map.get("c").and_then(|v| colors(v, existing, table)),
        f: map.get("f").and_then(as_number).map(|v| Flags::from_bits_truncate(round_to_i64(v))),
        t: map.get("t").and_then(label),
        b: map.get("b").and_then(badges),
    };
    Some(sanitize_patch(table, patch, existing))
}

/// Clamp and wrap every present field of a typed patch.
#[must_use]
pub fn sanitize_patch(table: &TableContext, mut patch: Patch, existing: Option<&Piece>) -> Patch {
    let existing = existing.or_else(|| table.get(&patch.id));
    let max_units = table.config().max_piece_units;

    if let Some(x) = patch.x {
        patch.x = Some(x.round().clamp(0.0, (table.width() - 1.0).max(0.0)));
    }
    if let Some(y) = patch.y {
        patch.y = Some(y.round().clamp(0.0, (table.height() - 1.0).max(0.0)));
    }
    patch.w = patch.w.map(|w| w.clamp(1, max_units));
    patch.h = patch.h.map(|h| h.clamp(1, max_units));
    patch.r = patch.r.map(|r| normalize_rotation(r.round()));
    patch.n = patch.n.map(|n| wrap_number(i64::from(n)));
    if let Some(s) = patch.s {
        // Without a target piece the side count is unknown; keep the index as given.
        patch.s = Some(existing.map_or(s, |p| s % p.meta.total_sides()));
    }
    if let Some([color, border]) = patch.c {
        let layer = existing.map_or(Layer::Tile, |p| p.layer);
        patch.c = Some([color % table.color_count(layer), border % table.border_count()]);
    }
    patch
}

fn as_number(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_i64(v: f64) -> i64 {
    // Saturating float-to-int cast.
    v.round() as i64
}

fn size_units(v: f64, table: &TableContext) -> u32 {
    let max = i64::from(table.config().max_piece_units);
    u32::try_from(round_to_i64(v).clamp(1, max)).unwrap_or(1)
}

/// Negative sides count back from the last side when the piece is known.
fn side_index(n: i64, existing: Option<&Piece>) -> usize {
    match existing {
        Some(piece) => {
            let total = i64::try_from(piece.meta.total_sides()).unwrap_or(1);
            usize::try_from(n.rem_euclid(total)).unwrap_or(0)
        }
        None => usize::try_from(n.max(0)).unwrap_or(0),
    }
}

fn wrap_number(n: i64) -> u32 {
    u32::try_from(n.rem_euclid(NUMBER_MODULUS)).unwrap_or(0)
}

/// Palette indices wrap in both directions; a missing border index keeps the piece's.
fn colors(v: &Value, existing: Option<&Piece>, table: &TableContext) -> Option<[usize; 2]> {
    let items = v.as_array()?;
    let current = existing.map_or([0, 0], |p| p.c);
    let layer = existing.map_or(Layer::Tile, |p| p.layer);
    let index = |i: usize| items.get(i).and_then(as_number).map(round_to_i64);
    let wrap = |n: i64, count: usize| {
        let count = i64::try_from(count).unwrap_or(1);
        usize::try_from(n.rem_euclid(count)).unwrap_or(0)
    };

    let color = wrap(index(0)?, table.color_count(layer));
    let border = match index(1) {
        Some(n) => wrap(n, table.border_count()),
        None => current[1],
    };
    Some([color, border])
}

/// A string, or the first string of an array. An empty array clears the label.
fn label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(items.iter().find_map(Value::as_str).unwrap_or_default().to_owned()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn badges(v: &Value) -> Option<Vec<AssetId>> {
    let items = v.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(parse_id)
            .collect(),
    )
}

fn parse_id(raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!(error = %e, raw, "dropping malformed id");
            None
        }
    }
}
