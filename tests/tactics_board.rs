use proptest::prelude::*;

use agency_desk::tactics::{
    ARROW_ERASE_THRESHOLD, ArrowStyle, BoardItem, BoardPoint, Formation, HISTORY_LIMIT,
    ItemKind, PATH_ERASE_RADIUS, Snapshot, TacticsBoard, Tool, point_segment_distance,
};

fn p(x: f64, y: f64) -> BoardPoint {
    BoardPoint::new(x, y)
}

fn draw_stroke(board: &mut TacticsBoard, points: &[(f64, f64)]) {
    let mut iter = points.iter();
    let Some((x, y)) = iter.next() else {
        return;
    };
    board.begin_stroke(p(*x, *y));
    for (x, y) in iter {
        board.extend_stroke(p(*x, *y));
    }
    board.end_stroke();
}

fn draw_arrow(board: &mut TacticsBoard, from: (f64, f64), to: (f64, f64)) {
    board.begin_arrow(p(from.0, from.1));
    board.finish_arrow(p(to.0, to.1));
}

#[test]
fn erase_removes_touching_paths_and_only_the_nearest_arrow() {
    let mut board = TacticsBoard::new();
    draw_stroke(&mut board, &[(100.0, 100.0), (110.0, 100.0), (120.0, 100.0)]);
    draw_stroke(&mut board, &[(104.0, 106.0), (104.0, 130.0)]);
    draw_stroke(&mut board, &[(400.0, 400.0), (420.0, 400.0)]);
    draw_arrow(&mut board, (90.0, 104.0), (200.0, 104.0));
    draw_arrow(&mut board, (90.0, 107.0), (200.0, 107.0));

    let outcome = board.erase_at(p(105.0, 103.0));
    assert_eq!(outcome.paths_removed, 2);
    assert_eq!(
        outcome.arrow_removed.map(|a| a.start),
        Some(p(90.0, 104.0))
    );
    assert_eq!(board.paths().len(), 1);
    assert_eq!(board.arrows().len(), 1);
}

#[test]
fn erase_that_misses_leaves_history_alone() {
    let mut board = TacticsBoard::new();
    draw_arrow(&mut board, (0.0, 0.0), (100.0, 0.0));
    let history = board.history_len();
    let outcome = board.erase_at(p(50.0, ARROW_ERASE_THRESHOLD));
    assert!(outcome.is_empty());
    assert_eq!(board.history_len(), history);
    assert_eq!(board.arrows().len(), 1);
}

#[test]
fn undo_restores_exact_prior_state() {
    let mut board = TacticsBoard::new();
    board.apply_formation(Formation::FourThreeThree);
    draw_stroke(&mut board, &[(10.0, 10.0), (60.0, 60.0)]);
    let before_arrow: Snapshot = board.drawing().clone();

    board.arrow_style = ArrowStyle::Run;
    draw_arrow(&mut board, (10.0, 10.0), (300.0, 10.0));
    assert_eq!(board.arrows()[0].style, ArrowStyle::Run);

    assert!(board.undo());
    assert_eq!(board.drawing(), &before_arrow);
}

#[test]
fn history_is_capped() {
    let mut board = TacticsBoard::new();
    for i in 0..(HISTORY_LIMIT + 10) {
        board.add_item(ItemKind::Cone, p(10.0 * i as f64, 10.0));
    }
    assert_eq!(board.history_len(), HISTORY_LIMIT);
    let mut undone = 0;
    while board.undo() {
        undone += 1;
    }
    assert_eq!(undone, HISTORY_LIMIT);
    assert_eq!(board.items().len(), 10);
}

#[test]
fn dragging_moves_the_topmost_item_and_is_undoable() {
    let mut board = TacticsBoard::new();
    let first = board.add_item(ItemKind::HomePlayer { number: 7 }, p(200.0, 200.0));
    let second = board.add_item(ItemKind::AwayPlayer { number: 4 }, p(200.0, 200.0));
    board.tool = Tool::Move;

    assert_eq!(board.begin_drag(p(205.0, 200.0)), Some(second));
    board.drag_to(p(300.0, 250.0));
    assert!(board.end_drag());

    let moved = board.items().iter().find(|i| i.id == second).unwrap();
    assert_eq!(moved.pos, p(300.0, 250.0));
    let still = board.items().iter().find(|i| i.id == first).unwrap();
    assert_eq!(still.pos, p(200.0, 200.0));

    assert!(board.undo());
    let back = board.items().iter().find(|i| i.id == second).unwrap();
    assert_eq!(back.pos, p(200.0, 200.0));
}

#[test]
fn drag_prefers_the_item_on_top_over_a_closer_one_below() {
    let mut board = TacticsBoard::new();
    let cone = board.add_item(ItemKind::Cone, p(200.0, 200.0));
    let ball = board.add_item(ItemKind::Ball, p(210.0, 200.0));
    board.tool = Tool::Move;

    assert_eq!(board.item_at(p(201.0, 200.0)), Some(ball));
    assert_eq!(board.begin_drag(p(201.0, 200.0)), Some(ball));
    board.cancel_gesture();
    assert_eq!(board.item_at(p(185.0, 200.0)), Some(cone), "ball is out of reach");
}

#[test]
fn removing_an_item_under_the_cursor_is_undoable() {
    let mut board = TacticsBoard::new();
    let keeper = board.add_item(ItemKind::HomePlayer { number: 1 }, p(50.0, 340.0));
    let cone = board.add_item(ItemKind::Cone, p(500.0, 340.0));

    assert_eq!(board.remove_item_at(p(900.0, 100.0)), None);
    assert_eq!(board.remove_item_at(p(505.0, 342.0)), Some(cone));
    assert_eq!(board.items().len(), 1);
    assert_eq!(board.items()[0].id, keeper);

    assert!(board.undo());
    assert_eq!(board.items().len(), 2);
}

#[test]
fn saved_ids_at_the_top_of_the_range_are_renumbered() {
    let drawing = Snapshot {
        items: vec![
            BoardItem {
                id: 3,
                kind: ItemKind::Cone,
                pos: p(10.0, 10.0),
            },
            BoardItem {
                id: u32::MAX,
                kind: ItemKind::Ball,
                pos: p(20.0, 20.0),
            },
        ],
        ..Snapshot::default()
    };
    let mut board = TacticsBoard::from_snapshot(drawing);
    let added = board.add_item(ItemKind::Cone, p(30.0, 30.0));

    let mut ids: Vec<u32> = board.items().iter().map(|i| i.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "ids stay unique");
    assert_eq!(added, 2);

    assert!(board.undo());
    let again = board.add_item(ItemKind::Ball, p(40.0, 40.0));
    assert!(board.items().iter().filter(|i| i.id == again).count() == 1);
}

#[test]
fn board_snapshot_survives_json() {
    let mut board = TacticsBoard::new();
    board.apply_formation(Formation::ThreeFiveTwo);
    draw_arrow(&mut board, (10.0, 10.0), (300.0, 10.0));
    let json = serde_json::to_string(board.drawing()).unwrap();
    assert!(json.contains(r#""kind":"home_player""#));
    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, board.drawing());

    let restored = TacticsBoard::from_snapshot(back);
    assert_eq!(restored.history_len(), 0);
    assert_eq!(restored.items().len(), 12);
}

proptest! {
    #[test]
    fn segment_distance_is_never_more_than_endpoint_distance(
        px in -500.0f64..500.0, py in -500.0f64..500.0,
        ax in -500.0f64..500.0, ay in -500.0f64..500.0,
        bx in -500.0f64..500.0, by in -500.0f64..500.0,
    ) {
        let (pt, a, b) = (p(px, py), p(ax, ay), p(bx, by));
        let d = point_segment_distance(pt, a, b);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= pt.distance_to(a) + 1e-9);
        prop_assert!(d <= pt.distance_to(b) + 1e-9);
    }

    #[test]
    fn erase_never_touches_far_paths(
        offset in (PATH_ERASE_RADIUS + 0.01)..300.0,
        angle in 0.0f64..std::f64::consts::TAU,
    ) {
        let centre = (500.0, 340.0);
        let (dx, dy) = (angle.cos(), angle.sin());
        let near_end = (centre.0 + offset * dx, centre.1 + offset * dy);
        let far_end = (centre.0 + (offset + 20.0) * dx, centre.1 + (offset + 20.0) * dy);
        let mut board = TacticsBoard::new();
        draw_stroke(&mut board, &[near_end, far_end]);
        prop_assert_eq!(board.paths().len(), 1);

        let outcome = board.erase_within(p(centre.0, centre.1), PATH_ERASE_RADIUS, 0.0);
        prop_assert_eq!(outcome.paths_removed, 0);
    }
}
