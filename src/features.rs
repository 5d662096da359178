//! Selection feature aggregator.
//!
//! Reduces any set of pieces to the operations the UI may offer and the
//! rotated bounding box of the whole set. Permissive operations are enabled
//! when any member qualifies (the operation then applies to the qualifying
//! members only). Restrictive operations need every member to qualify.

#[cfg(test)]
#[path = "features_test.rs"]
mod features_test;

use serde::Serialize;

use crate::geometry::{Point, Rect};
use crate::piece::{Layer, Piece, selection_bounds};

/// Operations enabled for a selection.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub edit: bool,
    pub rotate: bool,
    pub flip: bool,
    pub random: bool,
    pub top: bool,
    pub bottom: bool,
    pub color: bool,
    pub border: bool,
    pub number: bool,
    pub r#move: bool,
    pub pile: bool,
    pub clone: bool,
    pub delete: bool,
}

/// Aggregate bounding box of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub w: f64,
    pub h: f64,
    pub center: Point,
}

impl Bounds {
    /// The 1×1 box at the origin reported for an empty selection.
    #[must_use]
    pub fn degenerate() -> Self {
        Self::from_rect(&Rect::new(0.0, 0.0, 1.0, 1.0))
    }

    #[must_use]
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            top: rect.top,
            left: rect.left,
            right: rect.right,
            bottom: rect.bottom,
            w: rect.width(),
            h: rect.height(),
            center: rect.center(),
        }
    }
}

/// Capabilities plus bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Features {
    #[serde(flatten)]
    pub caps: Capabilities,
    pub bounds: Bounds,
}

/// Compute the feature set for `pieces`.
#[must_use]
pub fn features_of(pieces: &[&Piece]) -> Features {
    let Some(rect) = selection_bounds(pieces) else {
        return Features { caps: Capabilities::default(), bounds: Bounds::degenerate() };
    };

    let any = |f: fn(&Piece) -> bool| pieces.iter().any(|p| f(p));
    let all = |f: fn(&Piece) -> bool| pieces.iter().all(|p| f(p));
    let movable = pieces.iter().filter(|p| p.is_movable()).count();

    let caps = Capabilities {
        edit: true,
        rotate: movable > 0,
        flip: any(Piece::is_flippable),
        random: any(Piece::is_flippable),
        top: movable > 0,
        bottom: movable > 0,
        color: all(|p| p.meta.has_color),
        border: all(|p| p.meta.has_border),
        number: all(|p| p.layer == Layer::Token),
        r#move: movable > 0,
        pile: movable > 1,
        clone: any(Piece::is_clonable),
        delete: any(Piece::is_deletable),
    };
    Features { caps, bounds: Bounds::from_rect(&rect) }
}
