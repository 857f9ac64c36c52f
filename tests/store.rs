use agency_desk::geo_calibration::{ClubMarker, GeoPoint, PixelPoint};
use agency_desk::presets;
use agency_desk::store;
use agency_desk::tactics::{Formation, TacticsBoard};

fn seeded() -> rusqlite::Connection {
    let conn = store::open_in_memory().expect("in-memory db");
    for marker in presets::seed_markers() {
        store::upsert_club(&conn, &marker).expect("seed club");
    }
    conn
}

#[test]
fn clubs_round_trip_and_list_by_name() {
    let conn = seeded();
    let clubs = store::list_clubs(&conn).unwrap();
    assert_eq!(clubs.len(), presets::PRESETS.len());
    let names: Vec<&str> = clubs.iter().map(|c| c.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_by_key(|n| n.to_lowercase());
    assert_eq!(names, sorted);

    let milan = clubs.iter().find(|c| c.name == "AC Milan").unwrap();
    let loaded = store::get_club(&conn, milan.id).unwrap().unwrap();
    assert_eq!(&loaded, milan);
    assert_eq!(loaded.position, Some(PixelPoint::new(434.0, 468.0)));
}

#[test]
fn upsert_overwrites_and_insert_assigns_ids() {
    let conn = store::open_in_memory().unwrap();
    let mut club = ClubMarker::new(0, "Fulham", "England");
    let id = store::insert_club(&conn, &club).unwrap();
    assert!(id > 0);

    club.id = id;
    club.city = Some("London".to_string());
    club.coords = Some(GeoPoint::new(51.4749, -0.2217));
    store::upsert_club(&conn, &club).unwrap();
    assert_eq!(store::get_club(&conn, id).unwrap(), Some(club));
    assert_eq!(store::list_clubs(&conn).unwrap().len(), 1);
}

#[test]
fn single_field_updates_report_missing_rows() {
    let conn = seeded();
    assert!(store::update_position(&conn, 1, Some(PixelPoint::new(1.0, 2.0))).unwrap());
    assert!(store::set_calibration_point(&conn, 1, false).unwrap());
    assert!(store::set_coords(&conn, 1, None).unwrap());
    let club = store::get_club(&conn, 1).unwrap().unwrap();
    assert_eq!(club.position, Some(PixelPoint::new(1.0, 2.0)));
    assert!(!club.is_calibration_point);
    assert_eq!(club.coords, None);

    assert!(!store::update_position(&conn, 999, None).unwrap());
    assert!(store::delete_club(&conn, 1).unwrap());
    assert!(!store::delete_club(&conn, 1).unwrap());
    assert_eq!(store::get_club(&conn, 1).unwrap(), None);
}

#[test]
fn save_positions_is_all_or_nothing() {
    let mut conn = seeded();
    let before = store::list_clubs(&conn).unwrap();

    let moves = vec![
        (1, PixelPoint::new(11.0, 11.0)),
        (2, PixelPoint::new(22.0, 22.0)),
        (9_999, PixelPoint::new(33.0, 33.0)),
    ];
    assert!(store::save_positions(&mut conn, &moves).is_err());
    assert_eq!(store::list_clubs(&conn).unwrap(), before);

    let saved = store::save_positions(&mut conn, &moves[..2]).unwrap();
    assert_eq!(saved, 2);
    let club = store::get_club(&conn, 2).unwrap().unwrap();
    assert_eq!(club.position, Some(PixelPoint::new(22.0, 22.0)));
}

#[test]
fn boards_are_saved_by_name() {
    let conn = store::open_in_memory().unwrap();
    assert_eq!(store::load_board(&conn, "default").unwrap(), None);

    let mut board = TacticsBoard::new();
    board.apply_formation(Formation::FourFourTwo);
    store::save_board(&conn, "default", board.drawing()).unwrap();
    board.clear();
    store::save_board(&conn, "blank", board.drawing()).unwrap();

    let loaded = store::load_board(&conn, "default").unwrap().unwrap();
    assert_eq!(loaded.items.len(), 12);
    let mut names = store::list_boards(&conn).unwrap();
    names.sort();
    assert_eq!(names, vec!["blank".to_string(), "default".to_string()]);
}
