//! Piece geometry and ordering engine for a shared virtual tabletop.
//!
//! Everything here is pure computation over an explicit [`table::TableContext`]:
//! snapping positions to square or hex grids, deriving rotated bounds, keeping
//! per-layer z order consistent, deciding what a selection may do, repairing
//! incoming patches and resolving which piece a click actually lands on. The
//! host owns persistence and rendering; this crate only hands back
//! [`piece::Patch`] records.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Grid snapping, rotated bounding boxes, draw origins |
//! | [`piece`] | Pieces, assets, flags, derived meta and patches |
//! | [`populate`] | Canonical defaults, meta computation and lazy expiry |
//! | [`table`] | The table context every operation reads from |
//! | [`zorder`] | Per-layer z extremes, to-top and to-bottom |
//! | [`features`] | Capability flags and bounds for a selection |
//! | [`sanitize`] | Clamping and wrapping of raw patches |
//! | [`hit`] | Click-through hit-testing against image masks |
//! | [`randomize`] | Random flips, dice mats and discard piles |
//! | [`actions`] | Move, clone, pile, rotate and other selection edits |
//! | [`config`] | Environment-driven engine configuration |
//! | [`consts`] | Shared constants (grid defaults, reserved asset names, etc.) |

pub mod actions;
pub mod config;
pub mod consts;
pub mod features;
pub mod geometry;
pub mod hit;
pub mod piece;
pub mod populate;
pub mod randomize;
pub mod sanitize;
pub mod table;
pub mod zorder;

#[cfg(test)]
#[path = "helpers_test.rs"]
mod test_helpers;
