use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::config::app_data_dir;
use crate::geo_calibration::{ClubMarker, GeoPoint, PixelPoint};
use crate::tactics::Snapshot;

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("clubs.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    debug!(path = %path.display(), "club store opened");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS clubs (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            country TEXT NOT NULL,
            city TEXT NULL,
            pos_x REAL NULL,
            pos_y REAL NULL,
            lat REAL NULL,
            lng REAL NULL,
            is_calibration_point INTEGER NOT NULL DEFAULT 0,
            notes TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_clubs_name ON clubs(name);
        CREATE INDEX IF NOT EXISTS idx_clubs_calibration ON clubs(is_calibration_point);

        CREATE TABLE IF NOT EXISTS tactics_boards (
            name TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

const CLUB_COLUMNS: &str =
    "id, name, country, city, pos_x, pos_y, lat, lng, is_calibration_point";

fn row_to_marker(row: &Row<'_>) -> rusqlite::Result<ClubMarker> {
    let pos_x: Option<f64> = row.get(4)?;
    let pos_y: Option<f64> = row.get(5)?;
    let lat: Option<f64> = row.get(6)?;
    let lng: Option<f64> = row.get(7)?;
    Ok(ClubMarker {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        city: row.get(3)?,
        position: pos_x.zip(pos_y).map(|(x, y)| PixelPoint::new(x, y)),
        coords: lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
        is_calibration_point: row.get::<_, i64>(8)? != 0,
    })
}

pub fn list_clubs(conn: &Connection) -> Result<Vec<ClubMarker>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CLUB_COLUMNS} FROM clubs ORDER BY name COLLATE NOCASE ASC, id ASC"
        ))
        .context("prepare list clubs query")?;
    let rows = stmt
        .query_map([], row_to_marker)
        .context("query list clubs")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode club row")?);
    }
    Ok(out)
}

pub fn get_club(conn: &Connection, id: i64) -> Result<Option<ClubMarker>> {
    conn.query_row(
        &format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = ?1"),
        params![id],
        row_to_marker,
    )
    .optional()
    .with_context(|| format!("load club {id}"))
}

/// Inserts a new club. A non-positive id lets SQLite assign one.
pub fn insert_club(conn: &Connection, marker: &ClubMarker) -> Result<i64> {
    let id = (marker.id > 0).then_some(marker.id);
    conn.execute(
        r#"
        INSERT INTO clubs (
            id, name, country, city, pos_x, pos_y, lat, lng, is_calibration_point, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            id,
            marker.name,
            marker.country,
            marker.city,
            marker.position.map(|p| p.x),
            marker.position.map(|p| p.y),
            marker.coords.map(|c| c.lat),
            marker.coords.map(|c| c.lng),
            bool_to_i64(marker.is_calibration_point),
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("insert club {}", marker.name))?;
    Ok(conn.last_insert_rowid())
}

pub fn upsert_club(conn: &Connection, marker: &ClubMarker) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO clubs (
            id, name, country, city, pos_x, pos_y, lat, lng, is_calibration_point, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            country = excluded.country,
            city = excluded.city,
            pos_x = excluded.pos_x,
            pos_y = excluded.pos_y,
            lat = excluded.lat,
            lng = excluded.lng,
            is_calibration_point = excluded.is_calibration_point,
            updated_at = excluded.updated_at
        "#,
        params![
            marker.id,
            marker.name,
            marker.country,
            marker.city,
            marker.position.map(|p| p.x),
            marker.position.map(|p| p.y),
            marker.coords.map(|c| c.lat),
            marker.coords.map(|c| c.lng),
            bool_to_i64(marker.is_calibration_point),
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert club {}", marker.id))?;
    Ok(())
}

pub fn update_position(conn: &Connection, id: i64, position: Option<PixelPoint>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE clubs SET pos_x = ?1, pos_y = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                position.map(|p| p.x),
                position.map(|p| p.y),
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .with_context(|| format!("update position of club {id}"))?;
    Ok(changed > 0)
}

pub fn set_calibration_point(conn: &Connection, id: i64, flag: bool) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE clubs SET is_calibration_point = ?1, updated_at = ?2 WHERE id = ?3",
            params![bool_to_i64(flag), Utc::now().to_rfc3339(), id],
        )
        .with_context(|| format!("update calibration flag of club {id}"))?;
    Ok(changed > 0)
}

pub fn set_coords(conn: &Connection, id: i64, coords: Option<GeoPoint>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE clubs SET lat = ?1, lng = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                coords.map(|c| c.lat),
                coords.map(|c| c.lng),
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .with_context(|| format!("update coordinates of club {id}"))?;
    Ok(changed > 0)
}

pub fn delete_club(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM clubs WHERE id = ?1", params![id])
        .with_context(|| format!("delete club {id}"))?;
    Ok(changed > 0)
}

pub fn get_notes(conn: &Connection, id: i64) -> Result<Option<String>> {
    let notes = conn
        .query_row(
            "SELECT notes FROM clubs WHERE id = ?1",
            params![id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()
        .with_context(|| format!("load notes of club {id}"))?;
    Ok(notes.flatten())
}

pub fn set_notes(conn: &Connection, id: i64, notes: Option<&str>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE clubs SET notes = ?1, updated_at = ?2 WHERE id = ?3",
            params![notes, Utc::now().to_rfc3339(), id],
        )
        .with_context(|| format!("update notes of club {id}"))?;
    Ok(changed > 0)
}

/// Writes every position in one transaction. An unknown id aborts the whole batch.
pub fn save_positions(conn: &mut Connection, moves: &[(i64, PixelPoint)]) -> Result<usize> {
    let tx = conn.transaction().context("begin positions transaction")?;
    let now = Utc::now().to_rfc3339();
    for (id, pos) in moves {
        let changed = tx
            .execute(
                "UPDATE clubs SET pos_x = ?1, pos_y = ?2, updated_at = ?3 WHERE id = ?4",
                params![pos.x, pos.y, now, id],
            )
            .with_context(|| format!("update position of club {id}"))?;
        if changed == 0 {
            return Err(anyhow!("club {id} not found; no positions saved"));
        }
    }
    tx.commit().context("commit positions transaction")?;
    info!(count = moves.len(), "marker positions saved");
    Ok(moves.len())
}

pub fn save_board(conn: &Connection, name: &str, board: &Snapshot) -> Result<()> {
    let payload = serde_json::to_string(board).context("serialize tactics board")?;
    conn.execute(
        r#"
        INSERT INTO tactics_boards (name, payload, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(name) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at
        "#,
        params![name, payload, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("save tactics board {name}"))?;
    Ok(())
}

pub fn load_board(conn: &Connection, name: &str) -> Result<Option<Snapshot>> {
    let payload = conn
        .query_row(
            "SELECT payload FROM tactics_boards WHERE name = ?1",
            params![name],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("load tactics board {name}"))?;
    let Some(payload) = payload else {
        return Ok(None);
    };
    let board = serde_json::from_str(&payload)
        .with_context(|| format!("decode tactics board {name}"))?;
    Ok(Some(board))
}

pub fn list_boards(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM tactics_boards ORDER BY updated_at DESC, name ASC")
        .context("prepare list boards query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query list boards")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode board row")?);
    }
    Ok(out)
}

fn bool_to_i64(value: bool) -> i64 {
    if value { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_round_trip_and_missing_club_has_none() {
        let conn = open_in_memory().unwrap();
        let id = insert_club(&conn, &ClubMarker::new(0, "Ajax", "Netherlands")).unwrap();
        assert_eq!(get_notes(&conn, id).unwrap(), None);
        assert!(set_notes(&conn, id, Some("# Scouting\n- **fast**")).unwrap());
        assert_eq!(
            get_notes(&conn, id).unwrap().as_deref(),
            Some("# Scouting\n- **fast**")
        );
        assert_eq!(get_notes(&conn, id + 100).unwrap(), None);
    }
}
