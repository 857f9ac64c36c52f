use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::geo_calibration::{ClubMarker, GeoPoint, PixelPoint};
use crate::http_client::http_client;

const CLUBS_TABLE: &str = "clubs";

/// Connection details for the hosted PostgREST-style club table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn from_app(config: &AppConfig) -> Option<Self> {
        Some(Self {
            base_url: config.remote_url.clone()?,
            api_key: config.remote_key.clone()?,
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClubRows {
    pub clubs: Vec<ClubMarker>,
    /// Staff notes carried by the rows, keyed by club id.
    pub notes: Vec<(i64, String)>,
    pub skipped: usize,
}

pub fn fetch_clubs(remote: &RemoteConfig) -> Result<ClubRows> {
    let client = http_client()?;
    let url = format!("{}?select=*", remote.table_url(CLUBS_TABLE));
    let resp = client
        .get(&url)
        .header("apikey", &remote.api_key)
        .bearer_auth(&remote.api_key)
        .header("Accept", "application/json")
        .send()
        .context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("read body failed")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}: {}", snippet(&body)));
    }
    let rows = parse_clubs_json(&body)?;
    debug!(clubs = rows.clubs.len(), skipped = rows.skipped, "remote clubs fetched");
    Ok(rows)
}

/// Parses a PostgREST row array. Rows without an id or a name are skipped; every
/// other field is optional and may arrive as a number or a numeric string.
pub fn parse_clubs_json(raw: &str) -> Result<ClubRows> {
    let value: Value = serde_json::from_str(raw).context("invalid clubs json")?;
    let rows = match &value {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(obj) => obj
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("clubs json object has no data array"))?,
        _ => return Err(anyhow!("clubs json is not an array")),
    };

    let mut out = ClubRows::default();
    for row in rows {
        let Some(obj) = row.as_object() else {
            out.skipped += 1;
            warn!(row = %snippet(&row.to_string()), "skipping malformed club row");
            continue;
        };
        match parse_club_row(obj) {
            Some(club) => {
                if let Some(notes) = obj.get("notes").and_then(Value::as_str)
                    && !notes.trim().is_empty()
                {
                    out.notes.push((club.id, notes.to_string()));
                }
                out.clubs.push(club);
            }
            None => {
                out.skipped += 1;
                warn!(row = %snippet(&row.to_string()), "skipping malformed club row");
            }
        }
    }
    Ok(out)
}

fn parse_club_row(row: &Map<String, Value>) -> Option<ClubMarker> {
    let id = first_number(row, &["id"]).filter(|v| v.fract() == 0.0)? as i64;
    let name = first_string(row, &["name", "club_name"])?;
    let country = first_string(row, &["country", "country_name"]).unwrap_or_default();

    let mut club = ClubMarker::new(id, name, country);
    club.city = first_string(row, &["city", "city_name"]);

    let x = first_number(row, &["x", "pos_x", "map_x"]);
    let y = first_number(row, &["y", "pos_y", "map_y"]);
    club.position = x.zip(y).map(|(x, y)| PixelPoint::new(x, y));

    let lat = first_number(row, &["lat", "latitude"]);
    let lng = first_number(row, &["lng", "lon", "long", "longitude"]);
    club.coords = lat
        .zip(lng)
        .map(|(lat, lng)| GeoPoint::new(lat, lng))
        .filter(GeoPoint::is_valid);

    club.is_calibration_point = row
        .get("is_calibration_point")
        .or_else(|| row.get("calibration"))
        .is_some_and(value_is_true);
    Some(club)
}

fn first_number(row: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find_map(value_to_f64)
        .filter(|v| v.is_finite())
}

fn first_string(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "t" | "1" | "yes"),
        _ => false,
    }
}

/// PATCHes one club's pixel position. `None` clears it.
pub fn push_position(remote: &RemoteConfig, id: i64, position: Option<PixelPoint>) -> Result<()> {
    let client = http_client()?;
    let url = format!("{}?id=eq.{id}", remote.table_url(CLUBS_TABLE));
    let resp = client
        .patch(&url)
        .header("apikey", &remote.api_key)
        .bearer_auth(&remote.api_key)
        .header("Prefer", "return=minimal")
        .json(&position_body(position))
        .send()
        .with_context(|| format!("patch club {id} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(anyhow!("http {status} patching club {id}: {}", snippet(&body)));
    }
    Ok(())
}

pub fn position_body(position: Option<PixelPoint>) -> Value {
    match position {
        Some(p) => json!({ "x": p.x, "y": p.y }),
        None => json!({ "x": null, "y": null }),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
