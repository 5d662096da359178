//! Randomizer and pile layouts.
//!
//! Every function takes the random source as a parameter so tests can seed it.
//! Results are sanitized patches; the table is never touched.

#[cfg(test)]
#[path = "randomize_test.rs"]
mod randomize_test;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::consts::{DICEMAT_MAX_CELLS, FLIP_ROTATION_JITTER_DEG};
use crate::geometry::Point;
use crate::piece::{Patch, Piece};
use crate::populate::normalize_rotation;
use crate::sanitize::sanitize_patch;
use crate::table::TableContext;

/// Grid-unit nudges for a random flip. `(0, 0)` is excluded so a flip always moves.
const NUDGES: [(i8, i8); 8] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

/// Throw a single piece: random side, a one-cell nudge and a little rotation.
///
/// Pieces flagged `no-move` only get the new side.
pub fn flip_piece_random<R: Rng + ?Sized>(table: &TableContext, piece: &Piece, rng: &mut R) -> Patch {
    let mut patch = Patch { s: Some(random_side(piece, rng)), ..Patch::new(piece.id) };
    if piece.is_movable() {
        let g = table.grid_size();
        let (dx, dy) = NUDGES[rng.random_range(0..NUDGES.len())];
        let landed = table.clamp_to_room(Point::new(piece.x + f64::from(dx) * g, piece.y + f64::from(dy) * g));
        let jitter = rng.random_range(-FLIP_ROTATION_JITTER_DEG..=FLIP_ROTATION_JITTER_DEG);
        patch.x = Some(landed.x);
        patch.y = Some(landed.y);
        patch.r = Some(normalize_rotation(piece.r + f64::from(jitter)));
    }
    sanitize_patch(table, patch, Some(piece))
}

/// Scatter the pieces lying on a dice mat over its cells.
///
/// The mat offers `min(w, 4) × min(h, 4)` cells one grid unit apart, centered
/// on the mat. Pieces drawn above the mat (a higher layer, or the same layer
/// with a higher z) take distinct cells in draw order; once the cells run out
/// the rest only roll a new side.
pub fn randomize_on_dicemat<R: Rng + ?Sized>(
    table: &TableContext,
    mat: &Piece,
    pieces: &[&Piece],
    rng: &mut R,
) -> Vec<Patch> {
    let contents = above(mat, pieces);
    let mut cells = dicemat_cells(table, mat);
    cells.shuffle(rng);

    let mut patches = Vec::with_capacity(contents.len());
    for (i, piece) in contents.iter().copied().enumerate() {
        let mut patch = Patch { s: Some(random_side(piece, rng)), ..Patch::new(piece.id) };
        if let Some(cell) = cells.get(i) {
            patch.x = Some(cell.x);
            patch.y = Some(cell.y);
        }
        patches.push(sanitize_patch(table, patch, Some(piece)));
    }
    tracing::debug!(mat = %mat.id, pieces = contents.len(), cells = cells.len(), "randomized dice mat");
    patches
}

/// Shuffle a discard pile and turn it over.
///
/// The pieces above the pile marker swap z values at random and are
/// recentered on the marker. If the lowest of them shows side 0 the whole pile
/// turns to its last side, otherwise back to side 0.
pub fn randomize_on_discard<R: Rng + ?Sized>(
    table: &TableContext,
    pile: &Piece,
    pieces: &[&Piece],
    rng: &mut R,
) -> Vec<Patch> {
    let contents = above(pile, pieces);
    let Some(lowest) = contents.first() else {
        return Vec::new();
    };
    let face_down = lowest.s == 0;

    let mut zs: Vec<i64> = contents.iter().map(|p| p.z).collect();
    zs.shuffle(rng);

    let patches: Vec<Patch> = contents
        .iter()
        .copied()
        .zip(zs)
        .map(|(piece, z)| {
            let side = if face_down { piece.meta.total_sides() - 1 } else { 0 };
            let patch = Patch {
                x: Some(pile.x),
                y: Some(pile.y),
                z: Some(z),
                s: Some(side),
                ..Patch::new(piece.id)
            };
            sanitize_patch(table, patch, Some(piece))
        })
        .collect();
    tracing::debug!(pile = %pile.id, pieces = patches.len(), face_down, "randomized discard pile");
    patches
}

fn random_side<R: Rng + ?Sized>(piece: &Piece, rng: &mut R) -> usize {
    rng.random_range(0..piece.meta.total_sides())
}

/// Draw-order rank: layer first, z only breaks ties within a layer.
fn stacking_rank(piece: &Piece) -> (usize, i64) {
    (piece.layer.index(), piece.z)
}

/// Pieces drawn above `container`, lowest first.
fn above<'a>(container: &Piece, pieces: &[&'a Piece]) -> Vec<&'a Piece> {
    let floor = stacking_rank(container);
    let mut contents: Vec<&Piece> = pieces
        .iter()
        .copied()
        .filter(|p| p.id != container.id && stacking_rank(p) > floor)
        .collect();
    contents.sort_by(|a, b| stacking_rank(a).cmp(&stacking_rank(b)).then_with(|| a.id.cmp(&b.id)));
    contents
}

fn dicemat_cells(table: &TableContext, mat: &Piece) -> Vec<Point> {
    let g = table.grid_size();
    let cols = mat.w.clamp(1, DICEMAT_MAX_CELLS);
    let rows = mat.h.clamp(1, DICEMAT_MAX_CELLS);
    let left = mat.x - f64::from(cols - 1) * g / 2.0;
    let top = mat.y - f64::from(rows - 1) * g / 2.0;
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| Point::new(left + f64::from(col) * g, top + f64::from(row) * g)))
        .collect()
}
