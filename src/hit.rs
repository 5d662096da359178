//! Click-through hit-testing.
//!
//! A click lands on the topmost piece whose pixel under the pointer is
//! actually opaque, not merely the topmost piece whose box contains it.
//! Candidates are built synchronously in z-priority order and then tested
//! one at a time through a lazy stream: candidate k+1 is never probed before
//! candidate k has answered, so async image decoding cannot reorder results.
//!
//! The opacity test sits behind [`SolidityProbe`]. [`ImageMaskProbe`] is the
//! production probe; tests inject mocks.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::HashMap;
use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use image::RgbaImage;
use image::imageops::FilterType;

use crate::config::EngineConfig;
use crate::geometry::{Dims, Point, rotate_around};
use crate::piece::{Layer, Piece, PieceId};
use crate::table::TableContext;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("mask load failed for {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("mask decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Answers whether a mask is opaque at a local pixel.
#[async_trait::async_trait]
pub trait SolidityProbe: Send + Sync {
    /// `local` is in the piece's un-rotated pixel space, `size` its un-rotated pixel size.
    async fn is_solid(&self, mask: &str, local: Point, size: Dims) -> Result<bool, ProbeError>;
}

/// Fetches raw image bytes for a mask path.
#[async_trait::async_trait]
pub trait MaskLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<Vec<u8>, ProbeError>;
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Ordered candidates for a click at `at`.
///
/// The clicked piece comes first, then, for each active layer from the
/// clicked layer down to the bottom, every piece whose bounds contain the
/// point by descending z. Synthetic pieces are never candidates.
#[must_use]
pub fn click_candidates(table: &TableContext, clicked: Option<PieceId>, at: Point) -> Vec<&Piece> {
    let clicked = clicked
        .and_then(|id| table.get(&id))
        .filter(|p| !p.meta.synthetic);
    let start = clicked.map_or(Layer::Other.index(), |p| p.layer.index());

    let mut candidates: Vec<&Piece> = clicked.into_iter().collect();
    let under = table.pieces_at(at);
    for layer in Layer::ALL.iter().rev().filter(|l| l.index() <= start) {
        if !table.is_layer_active(*layer) {
            continue;
        }
        let mut group: Vec<&Piece> = under
            .iter()
            .copied()
            .filter(|p| p.layer == *layer && !p.meta.synthetic)
            .filter(|p| clicked.is_none_or(|c| c.id != p.id))
            .collect();
        group.sort_by(|a, b| b.z.cmp(&a.z).then_with(|| b.id.cmp(&a.id)));
        candidates.extend(group);
    }
    candidates
}

/// Map a table point into `piece`'s un-rotated local pixel space (origin top-left).
#[must_use]
pub fn local_point(piece: &Piece, at: Point) -> Point {
    let unrotated = rotate_around(at, piece.center(), -piece.r);
    Point::new(
        unrotated.x - piece.x + piece.meta.origin.width / 2.0,
        unrotated.y - piece.y + piece.meta.origin.height / 2.0,
    )
}

/// Whether `piece` is opaque at `at`.
///
/// Points outside the rotated rectangle are never solid. Invalid assets and
/// pieces without a mask are solid over their whole rectangle. Probe
/// failures count as solid so a piece never becomes silently unselectable.
pub async fn is_solid_at(piece: &Piece, at: Point, probe: &dyn SolidityProbe) -> bool {
    let local = local_point(piece, at);
    let size = piece.meta.origin;
    if local.x < 0.0 || local.y < 0.0 || local.x >= size.width || local.y >= size.height {
        return false;
    }
    if piece.meta.invalid {
        return true;
    }
    let Some(ref mask) = piece.meta.mask else {
        return true;
    };
    match probe.is_solid(mask, local, size).await {
        Ok(solid) => solid,
        Err(e) => {
            tracing::warn!(id = %piece.id, error = %e, "mask probe failed; treating piece as solid");
            true
        }
    }
}

/// Resolve the piece that a click at `at` selects, or `None` for empty table.
pub async fn resolve_click_target(
    table: &TableContext,
    clicked: Option<PieceId>,
    at: Point,
    probe: &dyn SolidityProbe,
) -> Option<PieceId> {
    let candidates = click_candidates(table, clicked, at);
    let count = candidates.len();
    let mut solid = pin!(futures::stream::iter(candidates).filter(|piece| {
        let piece: &Piece = *piece;
        async move { is_solid_at(piece, at, probe).await }
    }));
    let target = solid.next().await.map(|p| p.id);
    tracing::debug!(candidates = count, target = ?target, "resolved click target");
    target
}

// =============================================================================
// IMAGE PROBE
// =============================================================================

/// Probe that decodes mask images and samples their alpha channel.
///
/// Each mask is decoded once, shrunk to 1/`downscale` of its native size and
/// cached by path. Piece size only affects where a local point lands on the
/// cached image, so one entry serves every piece sharing the mask.
pub struct ImageMaskProbe<L> {
    loader: L,
    downscale: u32,
    alpha_threshold: u8,
    cache: Mutex<HashMap<String, Arc<RgbaImage>>>,
}

impl<L: MaskLoader> ImageMaskProbe<L> {
    #[must_use]
    pub fn new(loader: L, config: &EngineConfig) -> Self {
        Self {
            loader,
            downscale: config.hit_downscale.max(1),
            alpha_threshold: config.hit_alpha_threshold,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of decoded masks held in the cache.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn mask_image(&self, path: &str) -> Result<Arc<RgbaImage>, ProbeError> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let bytes = self.loader.load(path).await?;
        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        let (w, h) = decoded.dimensions();
        let shrunk = if self.downscale > 1 {
            let w = w.div_ceil(self.downscale).max(1);
            let h = h.div_ceil(self.downscale).max(1);
            image::imageops::resize(&decoded, w, h, FilterType::Triangle)
        } else {
            decoded
        };
        let shrunk = Arc::new(shrunk);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_owned(), Arc::clone(&shrunk));
        Ok(shrunk)
    }
}

#[async_trait::async_trait]
impl<L: MaskLoader> SolidityProbe for ImageMaskProbe<L> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn is_solid(&self, mask: &str, local: Point, size: Dims) -> Result<bool, ProbeError> {
        let image = self.mask_image(mask).await?;
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(true);
        }
        let sx = ((local.x / size.width) * f64::from(w)).floor().clamp(0.0, f64::from(w - 1)) as u32;
        let sy = ((local.y / size.height) * f64::from(h)).floor().clamp(0.0, f64::from(h - 1)) as u32;
        Ok(image.get_pixel(sx, sy)[3] >= self.alpha_threshold)
    }
}
