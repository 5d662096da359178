//! Geometry kernel: grid snapping, rotated bounding boxes, draw origins.
//!
//! All positions are table pixels. Snapped results are rounded to whole
//! pixels, matching how pieces are stored.
//!
//! Square cells, flat-top hexes (column-offset) and pointy-top hexes
//! (row-offset) each have their own snap function with their own offset math.
//! [`snap`] is the only place that dispatches between them.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::consts::TOKEN_JITTER_PX;
use crate::piece::{Layer, Piece, PieceId};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// A point in table pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    fn rounded(self) -> Self {
        Self { x: px(self.x), y: px(self.y) }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dims {
    pub width: f64,
    pub height: f64,
}

impl Dims {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in table pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle of `dims` centered on `center`.
    #[must_use]
    pub fn from_center(center: Point, dims: Dims) -> Self {
        let left = center.x - dims.width / 2.0;
        let top = center.y - dims.height / 2.0;
        Self { left, top, right: left + dims.width, bottom: top + dims.height }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// True when the two rectangles share a region of positive area.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right && other.left < self.right && self.top < other.bottom && other.top < self.bottom
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Same size, moved so its center is `center`.
    #[must_use]
    pub fn recentered(&self, center: Point) -> Rect {
        Rect::from_center(center, Dims::new(self.width(), self.height()))
    }

    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect { left: self.left + dx, top: self.top + dy, right: self.right + dx, bottom: self.bottom + dy }
    }

    /// True when the rectangle lies fully inside `[0, width] × [0, height]`.
    #[must_use]
    pub fn within(&self, width: f64, height: f64) -> bool {
        self.left >= 0.0 && self.top >= 0.0 && self.right <= width && self.bottom <= height
    }
}

/// Grid topology of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// Square cells.
    #[default]
    Square,
    /// Flat-top hexes in offset columns.
    Hex,
    /// Pointy-top hexes in offset rows.
    Hex2,
}

/// Round to a whole pixel; adding zero folds `-0.0` into `0.0`.
pub(crate) fn px(v: f64) -> f64 {
    v.round() + 0.0
}

fn closest(p: Point, candidates: impl IntoIterator<Item = Point>) -> Option<Point> {
    candidates
        .into_iter()
        .min_by(|a, b| p.distance_sq(*a).total_cmp(&p.distance_sq(*b)))
}

// =============================================================================
// SNAPPING
// =============================================================================

/// Snap `(x, y)` to the nearest grid position of `kind` at the given level of detail.
///
/// `lod` 1 keeps cell centers only, 2 adds corners, 3 adds edge midpoints and
/// 4 (or higher) disables snapping and only rounds. `lod` 0 is treated as 1.
#[must_use]
pub fn snap(kind: GridKind, grid_size: f64, x: f64, y: f64, lod: u8) -> Point {
    match kind {
        GridKind::Square => snap_square(x, y, grid_size, lod),
        GridKind::Hex => snap_hex(x, y, grid_size, lod),
        GridKind::Hex2 => snap_hex2(x, y, grid_size, lod),
    }
}

/// Square grid. Centers sit at `(i + ½)·g`, corners at `i·g`.
#[must_use]
pub fn snap_square(x: f64, y: f64, grid_size: f64, lod: u8) -> Point {
    let g = grid_size;
    let center = Point::new(((x / g).floor() + 0.5) * g, ((y / g).floor() + 0.5) * g);
    let snapped = match lod {
        0 | 1 => center,
        2 => {
            let corner = Point::new((x / g).round() * g, (y / g).round() * g);
            closest(Point::new(x, y), [center, corner]).unwrap_or(center)
        }
        3 => {
            // Centers, corners and edge midpoints together form the half-cell lattice.
            let half = g / 2.0;
            Point::new((x / half).round() * half, (y / half).round() * half)
        }
        _ => Point::new(x, y),
    };
    snapped.rounded()
}

// Hex snapping runs on an integer lattice. Along the hex's flat axis the unit
// is `g/8`; along the other axis it is a quarter of the row (or column)
// pitch. Centers, vertices and edge midpoints all land on lattice nodes, so a
// vertex shared by three hexes has one address and one float position no
// matter which hex produced it.

/// A lattice node, in lattice units.
type Node = (i64, i64);

/// Flat-top offsets from a center: vertices along 0°, 60°, ...
const FLAT_VERTICES: [Node; 6] = [(4, 0), (2, 2), (-2, 2), (-4, 0), (-2, -2), (2, -2)];
/// Flat-top offsets from a center: edge midpoints along 30°, 90°, ...
const FLAT_MIDPOINTS: [Node; 6] = [(3, 1), (0, 2), (-3, 1), (-3, -1), (0, -2), (3, -1)];
/// Pointy-top offsets from a center: vertices along 30°, 90°, ...
const POINTY_VERTICES: [Node; 6] = [(2, 2), (0, 4), (-2, 2), (-2, -2), (0, -4), (2, -2)];
/// Pointy-top offsets from a center: edge midpoints along 0°, 60°, ...
const POINTY_MIDPOINTS: [Node; 6] = [(2, 0), (1, 3), (-1, 3), (-2, 0), (-1, -3), (1, -3)];

#[allow(clippy::cast_precision_loss)]
fn node_point((i, j): Node, unit: Dims) -> Point {
    Point::new(i as f64 * unit.width, j as f64 * unit.height)
}

/// The candidate center nearest to `p`.
fn nearest_center(p: Point, unit: Dims, centers: impl IntoIterator<Item = Node>) -> Option<Node> {
    centers
        .into_iter()
        .min_by(|a, b| p.distance_sq(node_point(*a, unit)).total_cmp(&p.distance_sq(node_point(*b, unit))))
}

/// Nearest of a hex's snap targets at `lod`, rounded to whole pixels.
fn snap_to_hex_nodes(p: Point, center: Node, unit: Dims, lod: u8, vertices: &[Node; 6], midpoints: &[Node; 6]) -> Point {
    let shift = |(di, dj): &Node| (center.0 + di, center.1 + dj);
    let mut nodes = vec![center];
    if lod >= 2 {
        nodes.extend(vertices.iter().map(shift));
    }
    if lod >= 3 {
        nodes.extend(midpoints.iter().map(shift));
    }
    let center_point = node_point(center, unit);
    closest(p, nodes.into_iter().map(|n| node_point(n, unit)))
        .unwrap_or(center_point)
        .rounded()
}

/// Flat-top hex grid with offset columns.
///
/// Hex radius is `g/2`, so a hex is exactly `g` wide. Columns are `¾·g`
/// apart; rows are `(√3/2)·g` apart and odd columns sit half a row lower.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn snap_hex(x: f64, y: f64, grid_size: f64, lod: u8) -> Point {
    if lod >= 4 {
        return Point::new(x, y).rounded();
    }
    let row_pitch = grid_size * SQRT_3 / 2.0;
    let unit = Dims::new(grid_size / 8.0, row_pitch / 4.0);
    let p = Point::new(x, y);

    // Column `c`, row `r` has its center at lattice (4 + 6c, 2 + 4r), two
    // quarters lower on odd columns.
    let center_of = |col: i64| {
        let odd = col.rem_euclid(2);
        let row = ((y / unit.height - 2.0 - 2.0 * odd as f64) / 4.0).round() as i64;
        (4 + 6 * col, 2 + 4 * row + 2 * odd)
    };
    // A hex spans ±g/2 horizontally, so the owning column is within one of the estimate.
    let col_guess = ((x / unit.width - 4.0) / 6.0).round() as i64;
    let center = nearest_center(p, unit, (col_guess - 1..=col_guess + 1).map(center_of))
        .unwrap_or_else(|| center_of(col_guess));

    snap_to_hex_nodes(p, center, unit, lod, &FLAT_VERTICES, &FLAT_MIDPOINTS)
}

/// Pointy-top hex grid with offset rows.
///
/// Hex radius is `g/2`, so a hex is exactly `g` tall. Rows are `¾·g` apart;
/// columns are `(√3/2)·g` apart and odd rows sit half a column to the right.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn snap_hex2(x: f64, y: f64, grid_size: f64, lod: u8) -> Point {
    if lod >= 4 {
        return Point::new(x, y).rounded();
    }
    let col_pitch = grid_size * SQRT_3 / 2.0;
    let unit = Dims::new(col_pitch / 4.0, grid_size / 8.0);
    let p = Point::new(x, y);

    let center_of = |row: i64| {
        let odd = row.rem_euclid(2);
        let col = ((x / unit.width - 2.0 - 2.0 * odd as f64) / 4.0).round() as i64;
        (2 + 4 * col + 2 * odd, 4 + 6 * row)
    };
    let row_guess = ((y / unit.height - 4.0) / 6.0).round() as i64;
    let center = nearest_center(p, unit, (row_guess - 1..=row_guess + 1).map(center_of))
        .unwrap_or_else(|| center_of(row_guess));

    snap_to_hex_nodes(p, center, unit, lod, &POINTY_VERTICES, &POINTY_MIDPOINTS)
}

// =============================================================================
// ROTATION
// =============================================================================

/// Axis-aligned size of a `width × height` rectangle rotated by `degrees` about its center.
///
/// Rounded to whole pixels.
#[must_use]
pub fn rotated_bounding_box(width: f64, height: f64, degrees: f64) -> Dims {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Dims {
        width: px(width * cos.abs() + height * sin.abs()),
        height: px(width * sin.abs() + height * cos.abs()),
    }
}

/// Offset between the un-rotated rectangle and its rotated bounding box.
///
/// Positive when the rotated box is smaller along that axis.
#[must_use]
pub fn rotation_offset(origin: Dims, rotated: Dims) -> Point {
    Point::new(px((origin.width - rotated.width) / 2.0), px((origin.height - rotated.height) / 2.0))
}

/// Rotate `p` around `pivot` by `degrees` clockwise (y axis pointing down).
#[must_use]
pub fn rotate_around(p: Point, pivot: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = p.x - pivot.x;
    let dy = p.y - pivot.y;
    Point::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
}

/// Draw origin (top-left of the un-rotated element) for `piece` centered at `(x, y)`.
///
/// The renderer rotates around the un-rotated center, so the rotation offset
/// stored in the piece meta is added back onto the rotated box's corner.
/// Tokens additionally get a small per-id jitter.
#[must_use]
pub fn top_left_for(piece: &Piece, x: f64, y: f64) -> Point {
    let meta = &piece.meta;
    let mut origin = Point::new(
        x - meta.rotated.width / 2.0 - meta.offset.x,
        y - meta.rotated.height / 2.0 - meta.offset.y,
    );
    if piece.layer == Layer::Token {
        let jitter = token_jitter(&piece.id);
        origin.x += jitter.x;
        origin.y += jitter.y;
    }
    origin.rounded()
}

/// Stable cosmetic offset in `[-2, 2]` pixels per axis, read from the id's bytes.
#[must_use]
pub fn token_jitter(id: &PieceId) -> Point {
    let bytes = id.as_bytes();
    let span = TOKEN_JITTER_PX * 2 + 1;
    let axis = |byte: u8| f64::from(byte % span) - f64::from(TOKEN_JITTER_PX);
    Point::new(axis(bytes[0]), axis(bytes[1]))
}
