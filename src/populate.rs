//! Piece model populator: canonical defaults, derived meta, lazy expiry.
//!
//! Population is the only place `Meta` is written. It runs when a snapshot is
//! loaded, when a piece is inserted, and after every applied patch, so meta
//! never drifts from the piece's `w`, `h`, `r` and asset.
//!
//! Expiry is enforced lazily: [`populate_many`] drops pieces whose deadline
//! has passed. Nothing sweeps the collection on a timer.

#[cfg(test)]
#[path = "populate_test.rs"]
mod populate_test;

use std::collections::HashMap;

use crate::consts::{
    BACK_MEDIA, DICE_ASSET_PREFIX, DICEMAT_ASSET_NAME, DISCARD_ASSET_NAME, FULL_TURN_DEG, LOS_ASSET_NAME,
    NUMBER_MODULUS, POINTER_ASSET_NAME, TRANSPARENT_EXTENSIONS,
};
use crate::geometry::{Dims, rotated_bounding_box, rotation_offset};
use crate::piece::{Asset, AssetId, Feature, Layer, Meta, Piece};

/// Client wall clock plus the server clock it should be reconciled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    /// Client time, epoch seconds.
    pub now: i64,
    /// Server time from the last response header, epoch seconds.
    pub server_now: Option<i64>,
}

impl Clock {
    /// Clock reading the system time.
    #[must_use]
    pub fn system(server_now: Option<i64>) -> Self {
        Self { now: now_secs(), server_now }
    }

    /// Convert a server-side deadline into the client's time base.
    ///
    /// Without a server reading the deadline is taken as-is.
    #[must_use]
    pub fn deadline(&self, expires: i64) -> i64 {
        match self.server_now {
            Some(server_now) => self.now + expires - server_now,
            None => expires,
        }
    }
}

fn now_secs() -> i64 {
    let Ok(duration) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_secs()).unwrap_or(0)
}

/// Fill defaults and compute meta for one piece.
///
/// `asset` is `None` when the reference does not resolve; the piece then
/// becomes an invalid placeholder with a single side and no mask.
#[must_use]
pub fn populate_defaults(mut piece: Piece, asset: Option<&Asset>, grid_size: f64, clock: Clock) -> Piece {
    if piece.w == 0 {
        piece.w = asset.map_or(1, |a| a.w.max(1));
    }
    if piece.h == 0 {
        piece.h = asset.map_or(1, |a| a.h.max(1));
    }
    piece.r = normalize_rotation(piece.r);
    piece.n = u32::try_from(i64::from(piece.n).rem_euclid(NUMBER_MODULUS)).unwrap_or(0);
    if piece.t.as_deref() == Some("") {
        piece.t = None;
    }
    piece.expires = piece.expires.map(|expires| clock.deadline(expires));

    piece.meta = compute_meta(&piece, asset, grid_size);
    piece.s %= piece.meta.total_sides();
    piece
}

/// Populate a batch, dropping pieces whose deadline has already passed.
#[must_use]
pub fn populate_many(
    pieces: Vec<Piece>,
    assets: &HashMap<AssetId, Asset>,
    grid_size: f64,
    clock: Clock,
) -> Vec<Piece> {
    let before = pieces.len();
    let populated: Vec<Piece> = pieces
        .into_iter()
        .map(|piece| {
            let asset = piece.asset.and_then(|id| assets.get(&id));
            populate_defaults(piece, asset, grid_size, clock)
        })
        .filter(|piece| piece.expires.is_none_or(|deadline| deadline >= clock.now))
        .collect();
    let expired = before - populated.len();
    if expired > 0 {
        tracing::debug!(expired, kept = populated.len(), "dropped expired pieces");
    }
    populated
}

/// Derive meta from the piece's current fields and its asset.
#[must_use]
pub fn compute_meta(piece: &Piece, asset: Option<&Asset>, grid_size: f64) -> Meta {
    let origin = Dims::new(f64::from(piece.w) * grid_size, f64::from(piece.h) * grid_size);
    let rotated = rotated_bounding_box(origin.width, origin.height, piece.r);
    let offset = rotation_offset(origin, rotated);

    let Some(asset) = asset else {
        return Meta {
            origin,
            rotated,
            offset,
            sides: 1,
            sides_extra: 0,
            invalid: true,
            ..Meta::default()
        };
    };

    let sides = asset.media.len().max(1);
    let sides_extra = usize::from(piece.layer == Layer::Token && asset.media.len() == 1);

    Meta {
        origin,
        rotated,
        offset,
        sides,
        sides_extra,
        feature: feature_for(&asset.name),
        has_color: piece.layer == Layer::Note || asset.media.iter().any(|m| m == BACK_MEDIA),
        has_border: piece.layer == Layer::Token,
        mask: mask_for(asset, piece.s),
        synthetic: asset.name == POINTER_ASSET_NAME || asset.name == LOS_ASSET_NAME,
        invalid: false,
    }
}

/// Wrap a rotation into `[0, 360)`.
#[must_use]
pub fn normalize_rotation(r: f64) -> f64 {
    if !r.is_finite() {
        return 0.0;
    }
    let wrapped = r.rem_euclid(FULL_TURN_DEG);
    // rem_euclid may round up to the modulus itself for tiny negatives.
    if wrapped >= FULL_TURN_DEG { 0.0 } else { wrapped }
}

fn feature_for(name: &str) -> Feature {
    if name == DICEMAT_ASSET_NAME {
        Feature::Dicemat
    } else if name == DISCARD_ASSET_NAME {
        Feature::Discard
    } else if name.starts_with(DICE_ASSET_PREFIX) {
        Feature::Dice
    } else {
        Feature::None
    }
}

/// The explicit mask, else a transparent base, else the visible side if its format has alpha.
fn mask_for(asset: &Asset, side: usize) -> Option<String> {
    if let Some(ref mask) = asset.mask {
        return Some(mask.clone());
    }
    if let Some(ref base) = asset.base {
        if implies_transparency(base) {
            return Some(base.clone());
        }
    }
    // The extra back side of a single-sided token shares the front's outline.
    asset
        .media
        .get(side)
        .or(asset.media.first())
        .filter(|media| implies_transparency(media))
        .cloned()
}

/// Whether the file at `path` may contain transparent pixels, judged by extension.
#[must_use]
pub fn implies_transparency(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    TRANSPARENT_EXTENSIONS.contains(&ext.as_str())
}
