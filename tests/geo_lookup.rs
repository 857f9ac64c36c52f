use agency_desk::geo_calibration::ClubMarker;
use agency_desk::geo_lookup::{self, MatchSource};

#[test]
fn explicit_city_beats_club_name() {
    let found = geo_lookup::resolve("Real Madrid", Some("Barcelona"), "Spain").unwrap();
    assert_eq!(found.source, MatchSource::City);
    assert_eq!(Some(found.coords), geo_lookup::lookup_city("Barcelona"));
}

#[test]
fn city_inside_club_name_is_found() {
    let found = geo_lookup::resolve("Borussia Dortmund", None, "Germany").unwrap();
    assert_eq!(found.source, MatchSource::ClubName);
    assert_eq!(Some(found.coords), geo_lookup::lookup_city("dortmund"));

    let accented = geo_lookup::resolve("FC Bayern München", Some("  "), "Germany").unwrap();
    assert_eq!(accented.source, MatchSource::ClubName);
    assert_eq!(Some(accented.coords), geo_lookup::lookup_city("Munich"));
}

#[test]
fn unknown_city_falls_back_to_capital() {
    let found = geo_lookup::resolve("Fictional Rovers", Some("Smalltown"), "Portugal").unwrap();
    assert_eq!(found.source, MatchSource::CountryCapital);
    assert_eq!(Some(found.coords), geo_lookup::lookup_city("Lisbon"));
    assert!(geo_lookup::resolve("Fictional Rovers", None, "Atlantis").is_none());
}

#[test]
fn bulk_resolution_keeps_order_and_existing_coords() {
    let mut clubs = vec![
        ClubMarker::new(1, "Ajax", "Netherlands"),
        ClubMarker::new(2, "Nobody FC", "Atlantis"),
        ClubMarker::new(3, "AS Roma", "Italy"),
    ];
    let resolved = geo_lookup::resolve_all(&clubs);
    assert_eq!(resolved.len(), 3);
    assert!(resolved[0].is_some());
    assert!(resolved[1].is_none());

    let pinned = geo_lookup::lookup_city("Milano").unwrap();
    clubs[2].coords = Some(pinned);
    let filled = geo_lookup::fill_missing_coords(&mut clubs);
    assert_eq!(filled, 1);
    assert_eq!(clubs[0].coords, geo_lookup::lookup_city("Amsterdam"));
    assert_eq!(clubs[1].coords, None);
    assert_eq!(clubs[2].coords, Some(pinned));
}
