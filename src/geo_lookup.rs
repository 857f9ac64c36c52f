use std::collections::HashMap;

use once_cell::sync::Lazy;
use rayon::prelude::*;

use crate::geo_calibration::{ClubMarker, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    City,
    ClubName,
    CountryCapital,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoMatch {
    pub coords: GeoPoint,
    pub source: MatchSource,
}

struct KnownCity {
    name: &'static str,
    country: &'static str,
    lat: f64,
    lng: f64,
    capital: bool,
}

const fn city(
    name: &'static str,
    country: &'static str,
    lat: f64,
    lng: f64,
    capital: bool,
) -> KnownCity {
    KnownCity {
        name,
        country,
        lat,
        lng,
        capital,
    }
}

const CITIES: &[KnownCity] = &[
    city("london", "england", 51.5074, -0.1278, true),
    city("manchester", "england", 53.4808, -2.2426, false),
    city("liverpool", "england", 53.4084, -2.9916, false),
    city("birmingham", "england", 52.4862, -1.8904, false),
    city("newcastle", "england", 54.9783, -1.6178, false),
    city("leeds", "england", 53.8008, -1.5491, false),
    city("glasgow", "scotland", 55.8642, -4.2518, false),
    city("edinburgh", "scotland", 55.9533, -3.1883, true),
    city("dublin", "ireland", 53.3498, -6.2603, true),
    city("madrid", "spain", 40.4168, -3.7038, true),
    city("barcelona", "spain", 41.3874, 2.1686, false),
    city("valencia", "spain", 39.4699, -0.3763, false),
    city("sevilla", "spain", 37.3891, -5.9845, false),
    city("bilbao", "spain", 43.2630, -2.9350, false),
    city("lisboa", "portugal", 38.7223, -9.1393, true),
    city("porto", "portugal", 41.1579, -8.6291, false),
    city("braga", "portugal", 41.5454, -8.4265, false),
    city("paris", "france", 48.8566, 2.3522, true),
    city("marseille", "france", 43.2965, 5.3698, false),
    city("lyon", "france", 45.7640, 4.8357, false),
    city("lille", "france", 50.6292, 3.0573, false),
    city("monaco", "monaco", 43.7384, 7.4246, true),
    city("berlin", "germany", 52.5200, 13.4050, true),
    city("munchen", "germany", 48.1351, 11.5820, false),
    city("dortmund", "germany", 51.5136, 7.4653, false),
    city("leipzig", "germany", 51.3397, 12.3731, false),
    city("leverkusen", "germany", 51.0459, 7.0192, false),
    city("hamburg", "germany", 53.5511, 9.9937, false),
    city("stuttgart", "germany", 48.7758, 9.1829, false),
    city("frankfurt", "germany", 50.1109, 8.6821, false),
    city("roma", "italy", 41.9028, 12.4964, true),
    city("milano", "italy", 45.4642, 9.1900, false),
    city("torino", "italy", 45.0703, 7.6869, false),
    city("napoli", "italy", 40.8518, 14.2681, false),
    city("bergamo", "italy", 45.6983, 9.6773, false),
    city("firenze", "italy", 43.7696, 11.2558, false),
    city("amsterdam", "netherlands", 52.3676, 4.9041, true),
    city("rotterdam", "netherlands", 51.9244, 4.4777, false),
    city("eindhoven", "netherlands", 51.4416, 5.4697, false),
    city("brussel", "belgium", 50.8503, 4.3517, true),
    city("brugge", "belgium", 51.2093, 3.2247, false),
    city("wien", "austria", 48.2082, 16.3738, true),
    city("salzburg", "austria", 47.8095, 13.0550, false),
    city("zurich", "switzerland", 47.3769, 8.5417, false),
    city("bern", "switzerland", 46.9480, 7.4474, true),
    city("basel", "switzerland", 47.5596, 7.5886, false),
    city("kobenhavn", "denmark", 55.6761, 12.5683, true),
    city("stockholm", "sweden", 59.3293, 18.0686, true),
    city("oslo", "norway", 59.9139, 10.7522, true),
    city("warszawa", "poland", 52.2297, 21.0122, true),
    city("praha", "czechia", 50.0755, 14.4378, true),
    city("zagreb", "croatia", 45.8150, 15.9819, true),
    city("beograd", "serbia", 44.7866, 20.4489, true),
    city("athina", "greece", 37.9838, 23.7275, true),
    city("piraeus", "greece", 37.9420, 23.6465, false),
    city("istanbul", "turkey", 41.0082, 28.9784, false),
    city("ankara", "turkey", 39.9334, 32.8597, true),
];

/// Alternate spellings mapped onto the table's canonical names.
const ALIASES: &[(&str, &str)] = &[
    ("munich", "munchen"),
    ("muenchen", "munchen"),
    ("milan", "milano"),
    ("turin", "torino"),
    ("naples", "napoli"),
    ("rome", "roma"),
    ("florence", "firenze"),
    ("lisbon", "lisboa"),
    ("seville", "sevilla"),
    ("vienna", "wien"),
    ("brussels", "brussel"),
    ("bruges", "brugge"),
    ("copenhagen", "kobenhavn"),
    ("warsaw", "warszawa"),
    ("prague", "praha"),
    ("belgrade", "beograd"),
    ("athens", "athina"),
    ("zuerich", "zurich"),
];

const CLUB_AFFIXES: &[&str] = &[
    "fc", "cf", "ac", "as", "sc", "afc", "sv", "ssc", "vfb", "vfl", "bv", "rc", "rcd", "cd", "ud",
    "club", "de", "futbol", "football", "calcio", "sporting",
];

static CITY_INDEX: Lazy<HashMap<&'static str, &'static KnownCity>> = Lazy::new(|| {
    let mut index: HashMap<&'static str, &'static KnownCity> =
        CITIES.iter().map(|c| (c.name, c)).collect();
    for (alias, canonical) in ALIASES {
        if let Some(found) = index.get(canonical).copied() {
            index.insert(*alias, found);
        }
    }
    index
});

static CAPITALS: Lazy<HashMap<&'static str, &'static KnownCity>> = Lazy::new(|| {
    CITIES
        .iter()
        .filter(|c| c.capital)
        .map(|c| (c.country, c))
        .collect()
});

/// Lowercases, folds common Latin diacritics and turns punctuation into spaces.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        match fold_char(ch) {
            Some(folded) => out.push_str(folded),
            None if ch.is_alphanumeric() => out.push(ch),
            None => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_char(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'ñ' => "n",
        'ç' => "c",
        'š' => "s",
        'ž' => "z",
        'č' | 'ć' => "c",
        'ł' => "l",
        'ß' => "ss",
        'æ' => "ae",
        _ => return None,
    };
    Some(folded)
}

/// Club name tokens with legal-form and sport affixes removed.
pub fn club_tokens(name: &str) -> Vec<String> {
    normalize(name)
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| !CLUB_AFFIXES.contains(t))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

pub fn lookup_city(name: &str) -> Option<GeoPoint> {
    let key = normalize(name);
    CITY_INDEX
        .get(key.as_str())
        .map(|c| GeoPoint::new(c.lat, c.lng))
}

pub fn country_capital(country: &str) -> Option<GeoPoint> {
    let key = normalize(country);
    CAPITALS
        .get(key.as_str())
        .map(|c| GeoPoint::new(c.lat, c.lng))
}

pub fn resolve(club_name: &str, city: Option<&str>, country: &str) -> Option<GeoMatch> {
    if let Some(coords) = city.filter(|c| !c.trim().is_empty()).and_then(lookup_city) {
        return Some(GeoMatch {
            coords,
            source: MatchSource::City,
        });
    }

    let tokens = club_tokens(club_name);
    for token in &tokens {
        if let Some(coords) = lookup_city(token) {
            return Some(GeoMatch {
                coords,
                source: MatchSource::ClubName,
            });
        }
    }
    // Two-word city names only match as a pair.
    for pair in tokens.windows(2) {
        if let Some(coords) = lookup_city(&pair.join(" ")) {
            return Some(GeoMatch {
                coords,
                source: MatchSource::ClubName,
            });
        }
    }

    country_capital(country).map(|coords| GeoMatch {
        coords,
        source: MatchSource::CountryCapital,
    })
}

pub fn resolve_marker(marker: &ClubMarker) -> Option<GeoMatch> {
    resolve(&marker.name, marker.city.as_deref(), &marker.country)
}

/// Resolves every marker in parallel, keeping the input order.
pub fn resolve_all(markers: &[ClubMarker]) -> Vec<Option<GeoMatch>> {
    markers.par_iter().map(resolve_marker).collect()
}

/// Resolves coordinates for every marker lacking them. Returns how many were filled.
pub fn fill_missing_coords(markers: &mut [ClubMarker]) -> usize {
    let resolved: Vec<Option<GeoMatch>> = markers
        .par_iter()
        .map(|m| if m.coords.is_some() { None } else { resolve_marker(m) })
        .collect();

    let mut filled = 0usize;
    for (marker, found) in markers.iter_mut().zip(resolved) {
        if let Some(found) = found {
            marker.coords = Some(found.coords);
            filled += 1;
        }
    }
    filled
}
