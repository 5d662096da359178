use super::*;
use crate::test_helpers::asset;
use uuid::Uuid;

fn piece_of(asset: &Asset) -> Piece {
    let mut piece = Piece::new(Uuid::new_v4(), asset.layer, Some(asset.id));
    piece.w = 0;
    piece.h = 0;
    piece
}

const NO_SERVER: Clock = Clock { now: 1_000, server_now: None };

// =============================================================
// Defaults
// =============================================================

#[test]
fn size_defaults_come_from_asset() {
    let mut tpl = asset("map", Layer::Tile, &["map.jpg"]);
    tpl.w = 3;
    tpl.h = 2;
    let piece = populate_defaults(piece_of(&tpl), Some(&tpl), 64.0, NO_SERVER);
    assert_eq!((piece.w, piece.h), (3, 2));
    assert_eq!(piece.meta.origin, Dims::new(192.0, 128.0));
}

#[test]
fn explicit_size_wins_over_asset() {
    let tpl = asset("map", Layer::Tile, &["map.jpg"]);
    let mut piece = piece_of(&tpl);
    piece.w = 4;
    piece.h = 1;
    let piece = populate_defaults(piece, Some(&tpl), 64.0, NO_SERVER);
    assert_eq!((piece.w, piece.h), (4, 1));
}

#[test]
fn fields_are_wrapped_into_their_domains() {
    let tpl = asset("card", Layer::Tile, &["front.jpg", "back.jpg"]);
    let mut piece = piece_of(&tpl);
    piece.r = -30.0;
    piece.n = 40;
    piece.s = 5;
    piece.t = Some(String::new());
    let piece = populate_defaults(piece, Some(&tpl), 64.0, NO_SERVER);
    assert!((piece.r - 330.0).abs() < 1e-9);
    assert_eq!(piece.n, 4);
    assert_eq!(piece.s, 1);
    assert!(piece.t.is_none());
}

#[test]
fn missing_asset_yields_invalid_placeholder() {
    let mut piece = Piece::new(Uuid::new_v4(), Layer::Token, Some(Uuid::new_v4()));
    piece.w = 0;
    piece.s = 3;
    let piece = populate_defaults(piece, None, 64.0, NO_SERVER);
    assert!(piece.meta.invalid);
    assert_eq!(piece.meta.total_sides(), 1);
    assert_eq!(piece.s, 0);
    assert_eq!(piece.w, 1);
    assert!(piece.meta.mask.is_none());
}

// =============================================================
// Expiry
// =============================================================

#[test]
fn deadline_is_shifted_into_client_time() {
    let clock = Clock { now: 1_000, server_now: Some(900) };
    assert_eq!(clock.deadline(950), 1_050);
    assert_eq!(NO_SERVER.deadline(950), 950);
}

#[test]
fn populate_many_drops_expired_pieces() {
    let tpl = asset("marker", Layer::Other, &["m.png"]);
    let assets: HashMap<AssetId, Asset> = [(tpl.id, tpl.clone())].into_iter().collect();
    let clock = Clock { now: 1_000, server_now: Some(900) };

    let mut fresh = piece_of(&tpl);
    fresh.expires = Some(950);
    let mut stale = piece_of(&tpl);
    stale.expires = Some(850);
    let forever = piece_of(&tpl);

    let kept = populate_many(vec![fresh.clone(), stale, forever.clone()], &assets, 64.0, clock);
    let ids: Vec<_> = kept.iter().map(|p| p.id).collect();
    assert_eq!(kept.len(), 2);
    assert!(ids.contains(&fresh.id) && ids.contains(&forever.id));
    let converted = kept.iter().find(|p| p.id == fresh.id).and_then(|p| p.expires);
    assert_eq!(converted, Some(1_050));
}

// =============================================================
// Meta
// =============================================================

#[test]
fn single_sided_token_gets_a_back() {
    let tpl = asset("goblin", Layer::Token, &["goblin.png"]);
    let meta = compute_meta(&piece_of(&tpl), Some(&tpl), 64.0);
    assert_eq!(meta.sides, 1);
    assert_eq!(meta.sides_extra, 1);
    assert_eq!(meta.total_sides(), 2);
    assert!(meta.has_border);
}

#[test]
fn color_comes_from_note_layer_or_back_media() {
    let note = asset("note", Layer::Note, &[]);
    assert!(compute_meta(&piece_of(&note), Some(&note), 64.0).has_color);

    let card = asset("card", Layer::Tile, &["front.jpg", BACK_MEDIA]);
    assert!(compute_meta(&piece_of(&card), Some(&card), 64.0).has_color);

    let plain = asset("floor", Layer::Tile, &["floor.jpg"]);
    let meta = compute_meta(&piece_of(&plain), Some(&plain), 64.0);
    assert!(!meta.has_color);
    assert!(!meta.has_border);
}

#[test]
fn mask_prefers_explicit_then_base_then_media() {
    let mut tpl = asset("t", Layer::Token, &["side.png"]);
    tpl.base = Some("base.png".into());
    tpl.mask = Some("mask.png".into());
    assert_eq!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).mask.as_deref(), Some("mask.png"));

    tpl.mask = None;
    assert_eq!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).mask.as_deref(), Some("base.png"));

    tpl.base = Some("base.jpg".into());
    assert_eq!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).mask.as_deref(), Some("side.png"));

    tpl.media = vec!["side.jpg".into()];
    assert!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).mask.is_none());
}

#[test]
fn reserved_names_select_features() {
    let cases = [
        (DICEMAT_ASSET_NAME, Feature::Dicemat),
        (DISCARD_ASSET_NAME, Feature::Discard),
        ("dice.d6", Feature::Dice),
        ("tree", Feature::None),
    ];
    for (name, feature) in cases {
        let tpl = asset(name, Layer::Tile, &["a.jpg"]);
        assert_eq!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).feature, feature, "{name}");
    }
}

#[test]
fn pointer_and_los_are_synthetic() {
    for name in [POINTER_ASSET_NAME, LOS_ASSET_NAME] {
        let tpl = asset(name, Layer::Other, &["p.svg"]);
        assert!(compute_meta(&piece_of(&tpl), Some(&tpl), 64.0).synthetic);
    }
}

#[test]
fn meta_tracks_rotation() {
    let tpl = asset("wall", Layer::Tile, &["wall.jpg"]);
    let mut piece = piece_of(&tpl);
    piece.w = 4;
    piece.h = 2;
    piece.r = 60.0;
    let meta = compute_meta(&piece, Some(&tpl), 64.0);
    assert_eq!(meta.rotated, Dims::new(239.0, 286.0));
}

// =============================================================
// Helpers
// =============================================================

#[test]
fn normalize_rotation_wraps_into_range() {
    assert!((normalize_rotation(370.0) - 10.0).abs() < 1e-9);
    assert!((normalize_rotation(-90.0) - 270.0).abs() < 1e-9);
    assert!(normalize_rotation(360.0).abs() < 1e-9);
    let tiny = normalize_rotation(-1e-20);
    assert!((0.0..360.0).contains(&tiny));
    assert!(normalize_rotation(f64::NAN).abs() < 1e-9);
}

#[test]
fn transparency_is_judged_by_extension() {
    assert!(implies_transparency("img/a.PNG?v=2"));
    assert!(implies_transparency("icons/x.svg#frag"));
    assert!(!implies_transparency("photo.jpg"));
    assert!(!implies_transparency("no_extension"));
}
