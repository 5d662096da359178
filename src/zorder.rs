//! Layer z-index allocator.
//!
//! Z values are only meaningful within a layer, so every query answers per
//! layer. A layer with no qualifying piece has no entry in the result; callers
//! treat a missing entry as 0.
//!
//! When a target center is given, the footprint of the included pieces is
//! relocated there and the table is re-queried for whatever occupies it. This
//! is how a drop or clone learns what it will land on before it is committed.
//! Callers pass the moving pieces as `excluded` so a drop back onto the same
//! spot does not stack on top of itself and inflate z on every repeat.

#[cfg(test)]
#[path = "zorder_test.rs"]
mod zorder_test;

use std::collections::{BTreeMap, HashSet};

use crate::geometry::Point;
use crate::piece::{Layer, Patch, Piece, PieceId, selection_bounds};
use crate::table::TableContext;

/// Per-layer z extreme.
pub type LayerZ = BTreeMap<Layer, i64>;

/// Maximum `z` per layer over `included` minus `excluded`, or over the pieces at the relocated footprint.
#[must_use]
pub fn max_z_per_layer(
    table: &TableContext,
    included: &[&Piece],
    excluded: &[&Piece],
    target: Option<Point>,
) -> LayerZ {
    extreme_z(table, included, excluded, target, i64::max)
}

/// Minimum `z` per layer; the mirror of [`max_z_per_layer`].
#[must_use]
pub fn min_z_per_layer(
    table: &TableContext,
    included: &[&Piece],
    excluded: &[&Piece],
    target: Option<Point>,
) -> LayerZ {
    extreme_z(table, included, excluded, target, i64::min)
}

fn extreme_z(
    table: &TableContext,
    included: &[&Piece],
    excluded: &[&Piece],
    target: Option<Point>,
    pick: fn(i64, i64) -> i64,
) -> LayerZ {
    let skip: HashSet<PieceId> = excluded.iter().map(|p| p.id).collect();

    let relocated;
    let pool: &[&Piece] = match target {
        Some(center) => {
            let Some(area) = selection_bounds(included) else {
                return LayerZ::new();
            };
            relocated = table.pieces_in(&area.recentered(center));
            &relocated
        }
        None => included,
    };

    let mut result = LayerZ::new();
    for piece in pool.iter().filter(|p| !skip.contains(&p.id)) {
        result
            .entry(piece.layer)
            .and_modify(|z| *z = pick(*z, piece.z))
            .or_insert(piece.z);
    }
    result
}

/// Raise the movable pieces above everything else in their footprint, per layer.
///
/// Relative order inside each layer is preserved. Only changed z values are returned.
#[must_use]
pub fn to_top(table: &TableContext, pieces: &[&Piece]) -> Vec<Patch> {
    restack(table, pieces, Direction::Top)
}

/// Lower the movable pieces below everything else in their footprint, per layer.
#[must_use]
pub fn to_bottom(table: &TableContext, pieces: &[&Piece]) -> Vec<Patch> {
    restack(table, pieces, Direction::Bottom)
}

#[derive(Clone, Copy)]
enum Direction {
    Top,
    Bottom,
}

fn restack(table: &TableContext, pieces: &[&Piece], direction: Direction) -> Vec<Patch> {
    let movers: Vec<&Piece> = pieces.iter().copied().filter(|p| p.is_movable()).collect();
    let Some(area) = selection_bounds(&movers) else {
        return Vec::new();
    };
    let anchor = area.center();
    let bounds = match direction {
        Direction::Top => max_z_per_layer(table, &movers, &movers, Some(anchor)),
        Direction::Bottom => min_z_per_layer(table, &movers, &movers, Some(anchor)),
    };

    let mut patches = Vec::new();
    for layer in Layer::ALL {
        let mut group: Vec<&Piece> = movers.iter().copied().filter(|p| p.layer == layer).collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
        let edge = bounds.get(&layer).copied().unwrap_or(0);
        let count = i64::try_from(group.len()).unwrap_or(i64::MAX);
        let first = match direction {
            Direction::Top => edge + 1,
            Direction::Bottom => edge - count,
        };
        for (z, piece) in (first..).zip(group) {
            if piece.z != z {
                patches.push(Patch { z: Some(z), ..Patch::new(piece.id) });
            }
        }
    }
    tracing::debug!(count = patches.len(), top = matches!(direction, Direction::Top), "restacked pieces");
    patches
}

/// Assign z values so `movers` land above whatever occupies `target`, per layer.
///
/// Used by moves, piles and clones. Pieces are visited layer by layer in their
/// current z order, so each layer's entries are contiguous in the result.
pub(crate) fn stack_above_target<'a>(
    table: &TableContext,
    movers: &[&'a Piece],
    excluded: &[&Piece],
    target: Point,
) -> Vec<(&'a Piece, i64)> {
    let max = max_z_per_layer(table, movers, excluded, Some(target));
    let mut assigned = Vec::with_capacity(movers.len());
    for layer in Layer::ALL {
        let mut group: Vec<&'a Piece> = movers.iter().copied().filter(|p| p.layer == layer).collect();
        group.sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
        let base = max.get(&layer).copied().unwrap_or(0);
        assigned.extend((base + 1..).zip(group).map(|(z, p)| (p, z)));
    }
    assigned
}
