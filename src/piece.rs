//! Piece model: pieces, asset templates, flags, derived meta and patches.
//!
//! Pieces and assets arrive from the external store as JSON using the short
//! wire names (`l`, `a`, `x`, `y`, `z`, ...). `Meta` is never persisted; it
//! is recomputed by [`crate::populate`] whenever size, rotation or asset change.
//! `Patch` is the only thing this crate hands back to the store.

#[cfg(test)]
#[path = "piece_test.rs"]
mod piece_test;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::geometry::{Dims, Point, Rect};

/// Unique identifier for a piece.
pub type PieceId = Uuid;

/// Unique identifier for an asset template.
pub type AssetId = Uuid;

/// Stacking layer. Each layer has its own z-stack; listed bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Tile,
    Sticker,
    Note,
    Token,
    Other,
}

impl Layer {
    /// All layers, bottom to top.
    pub const ALL: [Layer; 5] = [Layer::Tile, Layer::Sticker, Layer::Note, Layer::Token, Layer::Other];

    /// Position in the bottom-to-top order.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Tile => 0,
            Self::Sticker => 1,
            Self::Note => 2,
            Self::Token => 3,
            Self::Other => 4,
        }
    }
}

// =============================================================================
// FLAGS
// =============================================================================

/// Eight-bit piece flag set.
///
/// Storage is a `u8`, so every value is masked to eight bits on the way in;
/// wider integers from the wire are truncated by [`Flags::from_bits_truncate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const NO_DELETE: Flags = Flags(1);
    pub const NO_CLONE: Flags = Flags(2);
    pub const NO_MOVE: Flags = Flags(4);
    pub const TILE_GRID_MINOR: Flags = Flags(8);
    pub const TILE_GRID_MAJOR: Flags = Flags(16);
    pub const NOTE_TOP_LEFT: Flags = Flags(32);
    pub const NOTE_CENTER: Flags = Flags(64);
    pub const RESERVED: Flags = Flags(128);

    /// Keep the low eight bits of `bits`, including for negative input.
    #[must_use]
    pub fn from_bits_truncate(bits: i64) -> Self {
        Self(bits.to_le_bytes()[0])
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn union(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }

    #[must_use]
    pub fn difference(self, other: Flags) -> Flags {
        Flags(self.0 & !other.0)
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }
}

impl Serialize for Flags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Flags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = i64::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

// =============================================================================
// ASSET
// =============================================================================

/// Immutable template a piece is instantiated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Asset name; a few reserved names select special behavior.
    #[serde(default)]
    pub name: String,
    /// Layer new pieces of this asset are placed on.
    #[serde(rename = "type", default)]
    pub layer: Layer,
    /// Default width in grid units.
    #[serde(default = "one")]
    pub w: u32,
    /// Default height in grid units.
    #[serde(default = "one")]
    pub h: u32,
    /// Shadow depth.
    #[serde(default)]
    pub d: u32,
    /// One entry per visual side, front first.
    #[serde(default)]
    pub media: Vec<String>,
    /// Base image drawn below the side media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Explicit alpha mask for hit-testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    /// Default background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

fn one() -> u32 {
    1
}

// =============================================================================
// META
// =============================================================================

/// Special behavior derived from reserved asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    #[default]
    None,
    Dicemat,
    Discard,
    Dice,
}

impl Feature {
    /// Containers whose contents, not themselves, are randomized.
    #[must_use]
    pub fn is_semi(self) -> bool {
        matches!(self, Self::Dicemat | Self::Discard)
    }
}

/// Derived per-piece data. A pure function of the piece and its asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    /// Pixel size before rotation.
    pub origin: Dims,
    /// Pixel size of the rotated bounding box.
    pub rotated: Dims,
    /// Rotation-induced offset between `origin` and `rotated`.
    pub offset: Point,
    /// Number of media sides.
    pub sides: usize,
    /// Synthetic sides beyond the media (the back of a single-sided token).
    pub sides_extra: usize,
    pub feature: Feature,
    pub has_color: bool,
    pub has_border: bool,
    /// Image to sample for click-through hit-testing.
    pub mask: Option<String>,
    /// Pointer and line-of-sight markers; never selectable.
    pub synthetic: bool,
    /// The asset reference did not resolve.
    pub invalid: bool,
}

impl Meta {
    /// Valid side indices are `0..total_sides()`.
    #[must_use]
    pub fn total_sides(&self) -> usize {
        (self.sides + self.sides_extra).max(1)
    }
}

// =============================================================================
// PIECE
// =============================================================================

/// A piece on the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    #[serde(rename = "l", default)]
    pub layer: Layer,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetId>,
    /// Center x in table pixels.
    #[serde(default)]
    pub x: f64,
    /// Center y in table pixels.
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: i64,
    /// Width in grid units; 0 means "take the asset default".
    #[serde(default)]
    pub w: u32,
    /// Height in grid units; 0 means "take the asset default".
    #[serde(default)]
    pub h: u32,
    /// Rotation in degrees, `[0, 360)`.
    #[serde(default)]
    pub r: f64,
    /// Visible side.
    #[serde(default)]
    pub s: usize,
    /// Number badge, `[0, 36)`.
    #[serde(default)]
    pub n: u32,
    /// Color and border palette indices.
    #[serde(default)]
    pub c: [usize; 2],
    #[serde(default)]
    pub f: Flags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Badge asset references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub b: Vec<AssetId>,
    /// Expiry deadline in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(skip)]
    pub meta: Meta,
}

impl Piece {
    /// A 1×1 tile at the origin with default fields.
    #[must_use]
    pub fn new(id: PieceId, layer: Layer, asset: Option<AssetId>) -> Self {
        Self {
            id,
            layer,
            asset,
            x: 0.0,
            y: 0.0,
            z: 0,
            w: 1,
            h: 1,
            r: 0.0,
            s: 0,
            n: 0,
            c: [0, 0],
            f: Flags::NONE,
            t: None,
            b: Vec::new(),
            expires: None,
            meta: Meta::default(),
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Axis-aligned bounds of the rotated piece.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center(), self.meta.rotated)
    }

    #[must_use]
    pub fn is_movable(&self) -> bool {
        !self.f.contains(Flags::NO_MOVE)
    }

    #[must_use]
    pub fn is_clonable(&self) -> bool {
        !self.f.contains(Flags::NO_CLONE)
    }

    #[must_use]
    pub fn is_deletable(&self) -> bool {
        !self.f.contains(Flags::NO_DELETE)
    }

    /// Has more than one side and is not a dice mat or discard pile.
    #[must_use]
    pub fn is_flippable(&self) -> bool {
        self.meta.total_sides() > 1 && !self.meta.feature.is_semi()
    }
}

/// Union of the rotated bounds of `pieces`, or `None` when empty.
#[must_use]
pub fn selection_bounds(pieces: &[&Piece]) -> Option<Rect> {
    pieces
        .iter()
        .map(|p| p.bounds())
        .reduce(|acc, b| acc.union(&b))
}

// =============================================================================
// PATCH
// =============================================================================

/// Sparse update for a piece. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub id: PieceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<[usize; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f: Option<Flags>,
    /// New label; an empty string clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<Vec<AssetId>>,
}

impl Patch {
    /// An empty patch for `id`.
    #[must_use]
    pub fn new(id: PieceId) -> Self {
        Self { id, ..Default::default() }
    }

    /// True when no field besides `id` is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::new(self.id)
    }

    /// Copy every present field onto `piece`. Meta is left stale.
    pub fn apply_to(&self, piece: &mut Piece) {
        if let Some(x) = self.x {
            piece.x = x;
        }
        if let Some(y) = self.y {
            piece.y = y;
        }
        if let Some(z) = self.z {
            piece.z = z;
        }
        if let Some(w) = self.w {
            piece.w = w;
        }
        if let Some(h) = self.h {
            piece.h = h;
        }
        if let Some(r) = self.r {
            piece.r = r;
        }
        if let Some(s) = self.s {
            piece.s = s;
        }
        if let Some(n) = self.n {
            piece.n = n;
        }
        if let Some(c) = self.c {
            piece.c = c;
        }
        if let Some(f) = self.f {
            piece.f = f;
        }
        if let Some(ref t) = self.t {
            piece.t = if t.is_empty() { None } else { Some(t.clone()) };
        }
        if let Some(ref b) = self.b {
            piece.b.clone_from(b);
        }
    }
}
