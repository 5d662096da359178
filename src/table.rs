//! Table context: the explicit repository every operation reads from.
//!
//! A `TableContext` bundles the room setup, room size, asset templates, the
//! populated piece collection and the set of active layers. Operations take
//! `&TableContext` and return patches; nothing in this crate writes to the
//! context except the host applying patches for optimistic prediction.

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::consts::{DEFAULT_GRID_SIZE, DEFAULT_ROOM_SIZE, NOTE_COLORS};
use crate::geometry::{GridKind, Point, Rect, snap};
use crate::piece::{Asset, AssetId, Layer, Patch, Piece, PieceId};
use crate::populate::{Clock, compute_meta, populate_defaults, populate_many};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("piece not found: {0}")]
    UnknownPiece(PieceId),
    #[error("asset not found: {0}")]
    UnknownAsset(AssetId),
}

/// Room setup: grid topology, grid size and palettes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    #[serde(rename = "type", default)]
    pub kind: GridKind,
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub borders: Vec<String>,
}

fn default_grid_size() -> f64 {
    DEFAULT_GRID_SIZE
}

impl Default for Setup {
    fn default() -> Self {
        Self { kind: GridKind::Square, grid_size: DEFAULT_GRID_SIZE, colors: Vec::new(), borders: Vec::new() }
    }
}

/// Room snapshot as delivered by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(default = "default_room_size")]
    pub width: f64,
    #[serde(default = "default_room_size")]
    pub height: f64,
    #[serde(default)]
    pub pieces: Vec<Piece>,
}

fn default_room_size() -> f64 {
    DEFAULT_ROOM_SIZE
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything an operation needs to know about the current table.
#[derive(Debug, Clone)]
pub struct TableContext {
    setup: Setup,
    width: f64,
    height: f64,
    config: EngineConfig,
    assets: HashMap<AssetId, Asset>,
    pieces: HashMap<PieceId, Piece>,
    inactive_layers: BTreeSet<Layer>,
}

impl TableContext {
    /// An empty table of `width × height` pixels.
    #[must_use]
    pub fn new(setup: Setup, width: f64, height: f64) -> Self {
        Self {
            setup,
            width,
            height,
            config: EngineConfig::default(),
            assets: HashMap::new(),
            pieces: HashMap::new(),
            inactive_layers: BTreeSet::new(),
        }
    }

    /// Build a populated table from a room snapshot.
    #[must_use]
    pub fn from_room(room: Room, setup: Setup, assets: Vec<Asset>, clock: Clock) -> Self {
        let mut table = Self::new(setup, room.width, room.height);
        for asset in assets {
            table.insert_asset(asset);
        }
        table.load_snapshot(room.pieces, clock);
        table
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // --- Data inputs ---

    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.id, asset);
    }

    /// Replace all pieces with a populated snapshot. Expired pieces are dropped.
    pub fn load_snapshot(&mut self, pieces: Vec<Piece>, clock: Clock) {
        let populated = populate_many(pieces, &self.assets, self.setup.grid_size, clock);
        self.pieces = populated.into_iter().map(|p| (p.id, p)).collect();
        tracing::debug!(count = self.pieces.len(), "loaded table snapshot");
    }

    /// Populate and insert (or replace) one piece.
    pub fn insert(&mut self, piece: Piece, clock: Clock) {
        let asset = piece.asset.and_then(|id| self.assets.get(&id));
        let piece = populate_defaults(piece, asset, self.setup.grid_size, clock);
        self.pieces.insert(piece.id, piece);
    }

    pub fn remove(&mut self, id: &PieceId) -> Option<Piece> {
        self.pieces.remove(id)
    }

    /// Apply a patch to the local copy and refresh its meta.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPiece` if no piece has the patch's id.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<(), TableError> {
        let piece = self
            .pieces
            .get_mut(&patch.id)
            .ok_or(TableError::UnknownPiece(patch.id))?;
        patch.apply_to(piece);
        let asset = piece.asset.and_then(|id| self.assets.get(&id));
        piece.meta = compute_meta(piece, asset, self.setup.grid_size);
        Ok(())
    }

    pub fn set_layer_active(&mut self, layer: Layer, active: bool) {
        if active {
            self.inactive_layers.remove(&layer);
        } else {
            self.inactive_layers.insert(layer);
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn grid_size(&self) -> f64 {
        self.setup.grid_size
    }

    #[must_use]
    pub fn is_layer_active(&self, layer: Layer) -> bool {
        !self.inactive_layers.contains(&layer)
    }

    #[must_use]
    pub fn get(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.get(id)
    }

    /// Look up a piece, failing with `UnknownPiece`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPiece` if the id is not on the table.
    pub fn piece(&self, id: &PieceId) -> Result<&Piece, TableError> {
        self.pieces.get(id).ok_or(TableError::UnknownPiece(*id))
    }

    #[must_use]
    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// The pieces for `ids` that exist, in the order given. Duplicates are kept once.
    #[must_use]
    pub fn select(&self, ids: &[PieceId]) -> Vec<&Piece> {
        let mut seen = BTreeSet::new();
        ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.pieces.get(id))
            .collect()
    }

    /// All pieces sorted by `(layer, z, id)`: draw order.
    #[must_use]
    pub fn sorted_pieces(&self) -> Vec<&Piece> {
        let mut pieces: Vec<&Piece> = self.pieces.values().collect();
        pieces.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then_with(|| a.z.cmp(&b.z))
                .then_with(|| a.id.cmp(&b.id))
        });
        pieces
    }

    /// Pieces whose rotated bounds overlap `area`.
    #[must_use]
    pub fn pieces_in(&self, area: &Rect) -> Vec<&Piece> {
        self.pieces
            .values()
            .filter(|p| p.bounds().intersects(area))
            .collect()
    }

    /// Pieces whose rotated bounds contain `at`.
    #[must_use]
    pub fn pieces_at(&self, at: Point) -> Vec<&Piece> {
        self.pieces
            .values()
            .filter(|p| p.bounds().contains(at))
            .collect()
    }

    /// Snap using the room's grid.
    #[must_use]
    pub fn snap(&self, x: f64, y: f64, lod: u8) -> Point {
        snap(self.setup.kind, self.setup.grid_size, x, y, lod)
    }

    /// Palette size for `c[0]` on `layer`. Never zero.
    #[must_use]
    pub fn color_count(&self, layer: Layer) -> usize {
        if layer == Layer::Note {
            NOTE_COLORS.len()
        } else {
            self.setup.colors.len().max(1)
        }
    }

    /// Palette size for `c[1]`. Never zero.
    #[must_use]
    pub fn border_count(&self) -> usize {
        self.setup.borders.len().max(1)
    }

    /// Clamp a position into `[0, width) × [0, height)` on whole pixels.
    #[must_use]
    pub fn clamp_to_room(&self, p: Point) -> Point {
        Point::new(
            p.x.round().clamp(0.0, (self.width - 1.0).max(0.0)),
            p.y.round().clamp(0.0, (self.height - 1.0).max(0.0)),
        )
    }
}
