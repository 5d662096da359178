//! Selection actions: the edits a user applies to a group of pieces.
//!
//! A [`Selection`] borrows the table and the resolved pieces. Every action
//! reads that snapshot and returns sanitized patches (or new piece records);
//! committing them to the store is the caller's job.

#[cfg(test)]
#[path = "actions_test.rs"]
mod actions_test;

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::consts::NUMBER_MODULUS;
use crate::features::{Features, features_of};
use crate::geometry::{Point, Rect};
use crate::piece::{AssetId, Feature, Layer, Patch, Piece, PieceId, selection_bounds};
use crate::populate::{compute_meta, normalize_rotation};
use crate::randomize::{flip_piece_random, randomize_on_dicemat, randomize_on_discard};
use crate::sanitize::sanitize_patch;
use crate::table::{TableContext, TableError};
use crate::zorder::{self, max_z_per_layer, stack_above_target};

// =============================================================================
// SELECTION
// =============================================================================

/// A set of pieces on one table, resolved from ids.
pub struct Selection<'a> {
    table: &'a TableContext,
    pieces: Vec<&'a Piece>,
}

impl<'a> Selection<'a> {
    /// Resolve `ids` against the table. Unknown ids are skipped.
    #[must_use]
    pub fn new(table: &'a TableContext, ids: &[PieceId]) -> Self {
        Self { table, pieces: table.select(ids) }
    }

    #[must_use]
    pub fn pieces(&self) -> &[&'a Piece] {
        &self.pieces
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    #[must_use]
    pub fn features(&self) -> Features {
        features_of(&self.pieces)
    }

    fn movable(&self) -> Vec<&'a Piece> {
        self.pieces.iter().copied().filter(|p| p.is_movable()).collect()
    }

    fn each(&self, keep: impl Fn(&Piece) -> bool, edit: impl Fn(&Piece, &mut Patch)) -> Vec<Patch> {
        self.pieces
            .iter()
            .copied()
            .filter(|p| keep(*p))
            .map(|piece| {
                let mut patch = Patch::new(piece.id);
                edit(piece, &mut patch);
                sanitize_patch(self.table, patch, Some(piece))
            })
            .collect()
    }

    // --- Placement ---

    /// Shift the movable pieces by `(dx, dy)` pixels, snapping the group's center.
    #[must_use]
    pub fn move_by(&self, dx: f64, dy: f64) -> Vec<Patch> {
        let movers = self.movable();
        let Some(area) = selection_bounds(&movers) else {
            return Vec::new();
        };
        let center = area.center();
        self.relocate(&movers, &area, Point::new(center.x + dx, center.y + dy))
    }

    /// Move the movable pieces so the group's center lands on `(x, y)`, snapped.
    #[must_use]
    pub fn move_to(&self, x: f64, y: f64) -> Vec<Patch> {
        let movers = self.movable();
        let Some(area) = selection_bounds(&movers) else {
            return Vec::new();
        };
        self.relocate(&movers, &area, Point::new(x, y))
    }

    fn relocate(&self, movers: &[&'a Piece], area: &Rect, wanted: Point) -> Vec<Patch> {
        let Some((shift, target)) = self.landing(area, wanted) else {
            return Vec::new();
        };
        let patches: Vec<Patch> = stack_above_target(self.table, movers, movers, target)
            .into_iter()
            .map(|(piece, z)| {
                let patch = Patch {
                    x: Some(piece.x + shift.x),
                    y: Some(piece.y + shift.y),
                    z: Some(z),
                    ..Patch::new(piece.id)
                };
                sanitize_patch(self.table, patch, Some(piece))
            })
            .collect();
        tracing::debug!(count = patches.len(), x = target.x, y = target.y, "moved selection");
        patches
    }

    /// Snap the wanted center and check the shifted box still fits the room.
    ///
    /// Returns the applied shift and the snapped center.
    fn landing(&self, area: &Rect, wanted: Point) -> Option<(Point, Point)> {
        let table = self.table;
        let target = table.snap(wanted.x, wanted.y, table.config().default_lod);
        let center = area.center();
        let shift = Point::new(target.x - center.x, target.y - center.y);
        if !area.translated(shift.x, shift.y).within(table.width(), table.height()) {
            tracing::warn!(x = target.x, y = target.y, "rejected placement outside the room");
            return None;
        }
        Some((shift, target))
    }

    /// Copies of the clonable pieces offset by `(dx, dy)`, with fresh ids.
    ///
    /// The copies stack above whatever sits at the destination, including the
    /// originals when the copies overlap them.
    #[must_use]
    pub fn duplicate(&self, dx: f64, dy: f64) -> Vec<Piece> {
        let sources: Vec<&Piece> = self.pieces.iter().copied().filter(|p| p.is_clonable()).collect();
        let Some(area) = selection_bounds(&sources) else {
            return Vec::new();
        };
        let center = area.center();
        let Some((shift, target)) = self.landing(&area, Point::new(center.x + dx, center.y + dy)) else {
            return Vec::new();
        };
        let copies: Vec<Piece> = stack_above_target(self.table, &sources, &[], target)
            .into_iter()
            .map(|(source, z)| {
                let mut copy = source.clone();
                copy.id = Uuid::new_v4();
                copy.z = z;
                let landed = self.table.clamp_to_room(Point::new(source.x + shift.x, source.y + shift.y));
                copy.x = landed.x;
                copy.y = landed.y;
                copy
            })
            .collect();
        tracing::debug!(count = copies.len(), "cloned selection");
        copies
    }

    /// Stack the movable pieces on the selection's center with consecutive z.
    ///
    /// Needs at least two movable pieces.
    #[must_use]
    pub fn pile(&self) -> Vec<Patch> {
        self.pile_with(|_| {})
    }

    /// Like [`Selection::pile`] but with the stacking order shuffled per layer.
    pub fn pile_shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Patch> {
        self.pile_with(|zs| zs.shuffle(rng))
    }

    fn pile_with(&self, mut reorder: impl FnMut(&mut [i64])) -> Vec<Patch> {
        let movers = self.movable();
        if movers.len() < 2 {
            return Vec::new();
        }
        let Some(area) = selection_bounds(&movers) else {
            return Vec::new();
        };
        let center = area.center();
        let target = self.table.snap(center.x, center.y, self.table.config().default_lod);

        let mut stacked = stack_above_target(self.table, &movers, &movers, target);
        for group in stacked.chunk_by_mut(|a, b| a.0.layer == b.0.layer) {
            let mut zs: Vec<i64> = group.iter().map(|(_, z)| *z).collect();
            reorder(&mut zs);
            for (entry, z) in group.iter_mut().zip(zs) {
                entry.1 = z;
            }
        }

        let patches: Vec<Patch> = stacked
            .into_iter()
            .map(|(piece, z)| {
                let patch = Patch { x: Some(target.x), y: Some(target.y), z: Some(z), ..Patch::new(piece.id) };
                sanitize_patch(self.table, patch, Some(piece))
            })
            .collect();
        tracing::debug!(count = patches.len(), "piled selection");
        patches
    }

    // --- Per-piece edits ---

    /// Turn the movable pieces by `increment` degrees.
    #[must_use]
    pub fn rotate(&self, clockwise: bool, increment: f64) -> Vec<Patch> {
        let step = if clockwise { increment } else { -increment };
        self.each(Piece::is_movable, |piece, patch| {
            patch.r = Some(normalize_rotation(piece.r + step));
        })
    }

    /// Show the next (or previous) side of every flippable piece.
    #[must_use]
    pub fn flip(&self, forward: bool) -> Vec<Patch> {
        self.each(Piece::is_flippable, |piece, patch| {
            let total = piece.meta.total_sides();
            let side = if forward { piece.s + 1 } else { piece.s + total - 1 };
            patch.s = Some(side % total);
        })
    }

    /// Step the number badge of every token by `delta`.
    #[must_use]
    pub fn number(&self, delta: i64) -> Vec<Patch> {
        self.each(
            |p| p.layer == Layer::Token,
            |piece, patch| {
                let n = (i64::from(piece.n) + delta).rem_euclid(NUMBER_MODULUS);
                patch.n = Some(u32::try_from(n).unwrap_or(0));
            },
        )
    }

    /// Step the color index of every colorable piece by `delta`.
    #[must_use]
    pub fn color(&self, delta: i64) -> Vec<Patch> {
        self.each(
            |p| p.meta.has_color,
            |piece, patch| {
                let color = cycle(piece.c[0], delta, self.table.color_count(piece.layer));
                patch.c = Some([color, piece.c[1]]);
            },
        )
    }

    /// Step the border index of every bordered piece by `delta`.
    #[must_use]
    pub fn border(&self, delta: i64) -> Vec<Patch> {
        self.each(
            |p| p.meta.has_border,
            |piece, patch| {
                let border = cycle(piece.c[1], delta, self.table.border_count());
                patch.c = Some([piece.c[0], border]);
            },
        )
    }

    // --- Stacking ---

    #[must_use]
    pub fn to_top(&self) -> Vec<Patch> {
        zorder::to_top(self.table, &self.pieces)
    }

    #[must_use]
    pub fn to_bottom(&self) -> Vec<Patch> {
        zorder::to_bottom(self.table, &self.pieces)
    }

    // --- Removal and chance ---

    /// Ids to delete; `no-delete` pieces are left out.
    #[must_use]
    pub fn remove(&self) -> Vec<PieceId> {
        self.pieces
            .iter()
            .filter(|p| p.is_deletable())
            .map(|p| p.id)
            .collect()
    }

    /// Roll every piece in the selection.
    ///
    /// Dice mats and discard piles randomize the pieces lying on them; other
    /// flippable pieces are thrown individually. A piece reached twice (on a
    /// mat and also selected) keeps its first result.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Patch> {
        let mut patches = Vec::new();
        for piece in &self.pieces {
            match piece.meta.feature {
                Feature::Dicemat => {
                    let on_top = self.table.pieces_in(&piece.bounds());
                    patches.extend(randomize_on_dicemat(self.table, piece, &on_top, rng));
                }
                Feature::Discard => {
                    let on_top = self.table.pieces_in(&piece.bounds());
                    patches.extend(randomize_on_discard(self.table, piece, &on_top, rng));
                }
                Feature::None | Feature::Dice if piece.is_flippable() => {
                    patches.push(flip_piece_random(self.table, piece, rng));
                }
                Feature::None | Feature::Dice => {}
            }
        }
        let mut seen = HashSet::new();
        patches.retain(|p| seen.insert(p.id));
        patches
    }
}

fn cycle(index: usize, delta: i64, count: usize) -> usize {
    let count = i64::try_from(count).unwrap_or(1).max(1);
    let index = i64::try_from(index).unwrap_or(0);
    usize::try_from((index + delta).rem_euclid(count)).unwrap_or(0)
}

// =============================================================================
// CREATION
// =============================================================================

/// A new piece of `asset_id` centered near `(x, y)`, on top of its layer.
///
/// # Errors
///
/// Returns `UnknownAsset` if the asset is not loaded.
pub fn create_from_asset(table: &TableContext, asset_id: AssetId, x: f64, y: f64) -> Result<Piece, TableError> {
    let asset = table.asset(&asset_id).ok_or(TableError::UnknownAsset(asset_id))?;
    let snapped = table.snap(x, y, table.config().default_lod);
    let at = table.clamp_to_room(snapped);

    let mut piece = Piece::new(Uuid::new_v4(), asset.layer, Some(asset.id));
    piece.w = asset.w.clamp(1, table.config().max_piece_units);
    piece.h = asset.h.clamp(1, table.config().max_piece_units);
    piece.x = at.x;
    piece.y = at.y;

    let all: Vec<&Piece> = table.pieces().collect();
    let top = max_z_per_layer(table, &all, &[], None);
    piece.z = top.get(&piece.layer).copied().unwrap_or(0) + 1;
    piece.meta = compute_meta(&piece, Some(asset), table.grid_size());

    tracing::debug!(id = %piece.id, asset = %asset_id, z = piece.z, "created piece from asset");
    Ok(piece)
}
