use std::fs;
use std::path::PathBuf;

use agency_desk::geo_calibration::{GeoPoint, PixelPoint};
use agency_desk::remote::parse_clubs_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_remote_clubs_fixture() {
    let raw = read_fixture("remote_clubs.json");
    let rows = parse_clubs_json(&raw).expect("fixture should parse");
    assert_eq!(rows.clubs.len(), 4);
    assert_eq!(rows.skipped, 3);

    let arsenal = &rows.clubs[0];
    assert_eq!(arsenal.id, 1);
    assert_eq!(arsenal.city.as_deref(), Some("London"));
    assert_eq!(arsenal.position, Some(PixelPoint::new(262.0, 322.0)));
    assert_eq!(arsenal.coords, Some(GeoPoint::new(51.5549, -0.1084)));
    assert!(arsenal.is_calibration_point);
}

#[test]
fn numeric_strings_and_alternate_keys_are_accepted() {
    let rows = parse_clubs_json(&read_fixture("remote_clubs.json")).unwrap();
    let madrid = rows.clubs.iter().find(|c| c.id == 2).expect("id given as string");
    assert_eq!(madrid.position, Some(PixelPoint::new(175.5, 590.0)));
    assert_eq!(madrid.coords, Some(GeoPoint::new(40.4531, -3.6883)));
    assert!(madrid.is_calibration_point);
}

#[test]
fn nulls_and_invalid_values_become_missing() {
    let rows = parse_clubs_json(&read_fixture("remote_clubs.json")).unwrap();
    let gala = rows.clubs.iter().find(|c| c.id == 3).unwrap();
    assert_eq!(gala.city, None);
    assert_eq!(gala.position, None);
    assert_eq!(gala.coords, None);
    assert!(!gala.is_calibration_point);

    let broken = rows.clubs.iter().find(|c| c.id == 6).unwrap();
    assert_eq!(broken.coords, None, "latitude out of range");
    assert_eq!(broken.position, None, "x without y");
}

#[test]
fn data_envelope_is_unwrapped_and_garbage_rejected() {
    let rows = parse_clubs_json(&read_fixture("import_clubs.json")).unwrap();
    assert_eq!(rows.clubs.len(), 4);
    assert!(parse_clubs_json("42").is_err());
    assert!(parse_clubs_json("{\"rows\": []}").is_err());
    assert!(parse_clubs_json("[").is_err());
}

#[test]
fn non_blank_notes_are_collected_per_club() {
    let rows = parse_clubs_json(&read_fixture("import_clubs.json")).unwrap();
    assert_eq!(rows.notes.len(), 1);
    let (id, notes) = &rows.notes[0];
    assert_eq!(*id, 104);
    assert!(notes.starts_with("## Contacts"));
}
