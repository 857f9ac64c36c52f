use crate::geo_calibration::{ClubMarker, PixelPoint};
use crate::geo_lookup;

/// Hand-placed marker position on the stylized map.
#[derive(Debug, Clone, Copy)]
pub struct ClubPreset {
    pub name: &'static str,
    pub country: &'static str,
    pub city: &'static str,
    pub x: f64,
    pub y: f64,
    pub anchor: bool,
}

const fn preset(
    name: &'static str,
    country: &'static str,
    city: &'static str,
    x: f64,
    y: f64,
    anchor: bool,
) -> ClubPreset {
    ClubPreset {
        name,
        country,
        city,
        x,
        y,
        anchor,
    }
}

pub const PRESETS: &[ClubPreset] = &[
    preset("Arsenal", "England", "London", 247.0, 307.0, true),
    preset("Manchester United", "England", "Manchester", 205.0, 260.0, false),
    preset("Liverpool", "England", "Liverpool", 190.0, 261.0, false),
    preset("Celtic", "Scotland", "Glasgow", 165.0, 198.0, false),
    preset("Real Madrid", "Spain", "Madrid", 176.0, 599.0, true),
    preset("FC Barcelona", "Spain", "Barcelona", 293.0, 574.0, false),
    preset("Benfica", "Portugal", "Lisboa", 67.0, 643.0, true),
    preset("FC Porto", "Portugal", "Porto", 77.0, 580.0, false),
    preset("Paris Saint-Germain", "France", "Paris", 297.0, 380.0, false),
    preset("Olympique de Marseille", "France", "Marseille", 357.0, 524.0, false),
    preset("Bayern Munich", "Germany", "Munich", 482.0, 398.0, false),
    preset("Borussia Dortmund", "Germany", "Dortmund", 399.0, 311.0, false),
    preset("Hertha Berlin", "Germany", "Berlin", 518.0, 285.0, true),
    preset("AS Roma", "Italy", "Rome", 500.0, 561.0, true),
    preset("Juventus", "Italy", "Torino", 404.0, 478.0, false),
    preset("AC Milan", "Italy", "Milano", 434.0, 468.0, false),
    preset("SSC Napoli", "Italy", "Napoli", 535.0, 588.0, false),
    preset("Ajax", "Netherlands", "Amsterdam", 348.0, 288.0, false),
    preset("Galatasaray", "Turkey", "Istanbul", 830.0, 584.0, false),
    preset("Olympiacos", "Greece", "Piraeus", 723.0, 664.0, false),
];

pub fn preset_for(name: &str) -> Option<&'static ClubPreset> {
    let key = geo_lookup::normalize(name);
    PRESETS
        .iter()
        .find(|p| geo_lookup::normalize(p.name) == key)
}

/// Moves the marker back to its hand-placed position. Returns false when the club has
/// no preset, leaving the marker untouched.
pub fn reset_to_preset(marker: &mut ClubMarker) -> bool {
    let Some(found) = preset_for(&marker.name) else {
        return false;
    };
    marker.position = Some(PixelPoint::new(found.x, found.y));
    true
}

/// Demo registry: every preset club with looked-up coordinates, anchors flagged.
pub fn seed_markers() -> Vec<ClubMarker> {
    PRESETS
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let mut marker = ClubMarker::new(idx as i64 + 1, p.name, p.country);
            marker.city = Some(p.city.to_string());
            marker.position = Some(PixelPoint::new(p.x, p.y));
            marker.coords = geo_lookup::resolve(p.name, Some(p.city), p.country).map(|m| m.coords);
            marker.is_calibration_point = p.anchor;
            marker
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_city_is_known() {
        for p in PRESETS {
            assert!(
                geo_lookup::lookup_city(p.city).is_some(),
                "missing city {}",
                p.city
            );
        }
    }

    #[test]
    fn reset_ignores_unknown_clubs() {
        let mut marker = ClubMarker::new(1, "Sunday League XI", "England");
        assert!(!reset_to_preset(&mut marker));
        assert_eq!(marker.position, None);

        let mut marker = ClubMarker::new(2, "ac milan", "Italy");
        assert!(reset_to_preset(&mut marker));
        assert_eq!(marker.position, Some(PixelPoint::new(434.0, 468.0)));
    }
}
