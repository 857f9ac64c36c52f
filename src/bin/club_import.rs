use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use agency_desk::cli::{arg_value, positional_arg};
use agency_desk::config::AppConfig;
use agency_desk::geo_lookup;
use agency_desk::logging::{self, Verbosity};
use agency_desk::presets;
use agency_desk::remote;
use agency_desk::store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    logging::init_logging(Verbosity::from_args(&args), None);
    let config = AppConfig::from_env();

    let input = arg_value(&args, "--file")
        .or_else(|| positional_arg(&args, &["--db", "--file"]))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: club_import [--db <path>] <clubs.json>"))?;
    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("read {}", input.display()))?;
    let mut rows = remote::parse_clubs_json(&raw)?;
    let located = geo_lookup::fill_missing_coords(&mut rows.clubs);
    let mut placed = 0usize;
    for club in rows.clubs.iter_mut().filter(|c| c.position.is_none()) {
        if presets::reset_to_preset(club) {
            placed += 1;
        }
    }

    let conn = store::open_db(&db_path)?;
    for club in &rows.clubs {
        store::upsert_club(&conn, club)?;
    }
    for (id, notes) in &rows.notes {
        store::set_notes(&conn, *id, Some(notes))?;
    }

    println!("Club import complete");
    println!("DB: {}", db_path.display());
    println!("Clubs upserted: {}", rows.clubs.len());
    println!("Rows skipped: {}", rows.skipped);
    println!("Notes imported: {}", rows.notes.len());
    println!("Coordinates looked up: {located}");
    println!("Preset positions used: {placed}");
    let unlocated = rows.clubs.iter().filter(|c| c.coords.is_none()).count();
    if unlocated > 0 {
        println!("Still without coordinates: {unlocated}");
    }
    Ok(())
}
