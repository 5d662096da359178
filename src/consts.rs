//! Shared constants for the tabletop core.

// ── Grid ────────────────────────────────────────────────────────

/// Grid cell size in pixels when a setup omits `gridSize`.
pub const DEFAULT_GRID_SIZE: f64 = 64.0;

/// Snap level used when callers do not pick one: centers, corners and edges.
pub const DEFAULT_LOD: u8 = 3;

/// Room size in pixels when a snapshot omits it.
pub const DEFAULT_ROOM_SIZE: f64 = 3200.0;

// ── Piece domains ───────────────────────────────────────────────

/// Degrees in a full turn; `r` wraps modulo this.
pub const FULL_TURN_DEG: f64 = 360.0;

/// Badge numbers wrap modulo this.
pub const NUMBER_MODULUS: i64 = 36;

/// Largest piece edge in grid units.
pub const MAX_PIECE_UNITS: u32 = 32;

/// Fixed palette for the note layer. Notes ignore the room's color list.
pub const NOTE_COLORS: [&str; 6] = ["#ffeb3b", "#ff9f43", "#ff6b81", "#a29bfe", "#74b9ff", "#55efc4"];

// ── Assets ──────────────────────────────────────────────────────

/// Media entry that renders as a plain side in the piece's color.
pub const BACK_MEDIA: &str = "##BACK##";

/// Reserved asset name for dice mats.
pub const DICEMAT_ASSET_NAME: &str = "_.dicemat";

/// Reserved asset name for discard piles.
pub const DISCARD_ASSET_NAME: &str = "_.discard";

/// Asset name prefix marking dice.
pub const DICE_ASSET_PREFIX: &str = "dice.";

/// Reserved asset name for the ephemeral pointer marker.
pub const POINTER_ASSET_NAME: &str = "_.pointer";

/// Reserved asset name for the ephemeral line-of-sight marker.
pub const LOS_ASSET_NAME: &str = "_.los";

/// File extensions whose images may carry an alpha channel.
pub const TRANSPARENT_EXTENSIONS: [&str; 4] = ["png", "svg", "webp", "gif"];

// ── Randomizer ──────────────────────────────────────────────────

/// Maximum cells per axis laid out on a dice mat.
pub const DICEMAT_MAX_CELLS: u32 = 4;

/// Rotation jitter applied by a random flip, in degrees either way.
pub const FLIP_ROTATION_JITTER_DEG: i32 = 10;

// ── Rendering ───────────────────────────────────────────────────

/// Maximum cosmetic offset for tokens, in pixels either way.
pub const TOKEN_JITTER_PX: u8 = 2;

// ── Hit-testing ─────────────────────────────────────────────────

/// Decoded masks are cached at 1/N of their native size.
pub const DEFAULT_HIT_DOWNSCALE: u32 = 4;

/// Alpha at or above this counts as solid.
pub const DEFAULT_HIT_ALPHA_THRESHOLD: u8 = 16;
