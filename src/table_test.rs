use super::*;
use crate::geometry::Dims;
use crate::test_helpers::{CLOCK, add_asset, get, place, square_table};
use serde_json::json;
use uuid::Uuid;

// =============================================================
// Setup / Room
// =============================================================

#[test]
fn setup_reads_camel_case_wire_format() {
    let setup: Setup = serde_json::from_value(json!({
        "type": "hex2",
        "gridSize": 50,
        "colors": ["#fff", "#000"]
    }))
    .unwrap();
    assert_eq!(setup.kind, GridKind::Hex2);
    assert!((setup.grid_size - 50.0).abs() < f64::EPSILON);
    assert_eq!(setup.colors.len(), 2);
    assert!(setup.borders.is_empty());
}

#[test]
fn empty_setup_uses_defaults() {
    let setup: Setup = serde_json::from_value(json!({})).unwrap();
    assert_eq!(setup, Setup::default());
}

#[test]
fn from_room_populates_pieces() {
    let tpl = crate::test_helpers::asset("coin", Layer::Token, &["heads.png", "tails.png"]);
    let piece_id = Uuid::new_v4();
    let room: Room = serde_json::from_value(json!({
        "width": 1000,
        "pieces": [{ "id": piece_id, "l": "token", "a": tpl.id, "x": 96, "y": 96, "s": 3 }]
    }))
    .unwrap();
    let table = TableContext::from_room(room, Setup::default(), vec![tpl], CLOCK);
    assert!((table.width() - 1000.0).abs() < f64::EPSILON);
    assert!((table.height() - DEFAULT_ROOM_SIZE).abs() < f64::EPSILON);
    let piece = get(&table, piece_id);
    assert_eq!(piece.s, 1);
    assert_eq!(piece.meta.total_sides(), 2);
}

// =============================================================
// Mutation
// =============================================================

#[test]
fn apply_patch_refreshes_meta() {
    let mut table = square_table();
    let tile = add_asset(&mut table, "floor", Layer::Tile, &["floor.jpg"]);
    let id = place(&mut table, tile, 96.0, 96.0, 1);

    let patch = Patch { w: Some(2), r: Some(90.0), ..Patch::new(id) };
    table.apply_patch(&patch).unwrap();
    let piece = get(&table, id);
    assert_eq!(piece.w, 2);
    assert_eq!(piece.meta.rotated, Dims::new(64.0, 128.0));
}

#[test]
fn apply_patch_to_unknown_piece_fails() {
    let mut table = square_table();
    let id = Uuid::new_v4();
    assert_eq!(table.apply_patch(&Patch::new(id)), Err(TableError::UnknownPiece(id)));
    assert_eq!(table.piece(&id).err(), Some(TableError::UnknownPiece(id)));
}

#[test]
fn remove_returns_the_piece() {
    let mut table = square_table();
    let tile = add_asset(&mut table, "floor", Layer::Tile, &["floor.jpg"]);
    let id = place(&mut table, tile, 96.0, 96.0, 1);
    assert_eq!(table.remove(&id).map(|p| p.id), Some(id));
    assert!(table.is_empty());
}

#[test]
fn layers_toggle_active() {
    let mut table = square_table();
    assert!(table.is_layer_active(Layer::Sticker));
    table.set_layer_active(Layer::Sticker, false);
    assert!(!table.is_layer_active(Layer::Sticker));
    table.set_layer_active(Layer::Sticker, true);
    assert!(table.is_layer_active(Layer::Sticker));
}

// =============================================================
// Queries
// =============================================================

#[test]
fn select_keeps_order_and_drops_unknown_and_duplicates() {
    let mut table = square_table();
    let tile = add_asset(&mut table, "floor", Layer::Tile, &["floor.jpg"]);
    let a = place(&mut table, tile, 32.0, 32.0, 1);
    let b = place(&mut table, tile, 96.0, 32.0, 2);
    let picked: Vec<PieceId> = table.select(&[b, Uuid::new_v4(), a, b]).iter().map(|p| p.id).collect();
    assert_eq!(picked, vec![b, a]);
}

#[test]
fn sorted_pieces_follow_layer_then_z() {
    let mut table = square_table();
    let tile = add_asset(&mut table, "floor", Layer::Tile, &["floor.jpg"]);
    let token = add_asset(&mut table, "hero", Layer::Token, &["hero.png"]);
    let t1 = place(&mut table, token, 32.0, 32.0, 1);
    let f2 = place(&mut table, tile, 32.0, 32.0, 9);
    let f1 = place(&mut table, tile, 32.0, 32.0, 3);
    let order: Vec<PieceId> = table.sorted_pieces().iter().map(|p| p.id).collect();
    assert_eq!(order, vec![f1, f2, t1]);
}

#[test]
fn spatial_queries_use_rotated_bounds() {
    let mut table = square_table();
    let tile = add_asset(&mut table, "floor", Layer::Tile, &["floor.jpg"]);
    let id = place(&mut table, tile, 96.0, 96.0, 1);
    assert_eq!(table.pieces_at(Point::new(64.0, 64.0)).len(), 1);
    assert!(table.pieces_at(Point::new(128.0, 96.0)).is_empty());
    assert_eq!(table.pieces_in(&Rect::new(120.0, 120.0, 200.0, 200.0)).len(), 1);
    assert!(table.pieces_in(&Rect::new(128.0, 0.0, 200.0, 200.0)).is_empty());
    assert_eq!(table.pieces_at(Point::new(100.0, 100.0))[0].id, id);
}

#[test]
fn palette_counts_are_never_zero() {
    let mut table = square_table();
    assert_eq!(table.color_count(Layer::Tile), 1);
    assert_eq!(table.color_count(Layer::Note), NOTE_COLORS.len());
    assert_eq!(table.border_count(), 1);

    let setup = Setup { colors: vec!["a".into(), "b".into(), "c".into()], ..Setup::default() };
    table = TableContext::new(setup, 100.0, 100.0);
    assert_eq!(table.color_count(Layer::Token), 3);
}

#[test]
fn clamp_to_room_rounds_and_bounds() {
    let table = TableContext::new(Setup::default(), 640.0, 480.0);
    assert_eq!(table.clamp_to_room(Point::new(-5.0, 10.4)), Point::new(0.0, 10.0));
    assert_eq!(table.clamp_to_room(Point::new(700.0, 480.0)), Point::new(639.0, 479.0));
}

#[test]
fn snap_uses_room_grid() {
    let setup = Setup { kind: GridKind::Square, grid_size: 50.0, ..Setup::default() };
    let table = TableContext::new(setup, 1000.0, 1000.0);
    assert_eq!(table.snap(10.0, 10.0, 1), Point::new(25.0, 25.0));
}
