use std::path::PathBuf;

use anyhow::{Context, Result};

use agency_desk::cli::arg_value;
use agency_desk::config::AppConfig;
use agency_desk::geo_lookup;
use agency_desk::logging::{self, Verbosity};
use agency_desk::remote::{self, RemoteConfig};
use agency_desk::store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    logging::init_logging(Verbosity::from_args(&args), None);
    let config = AppConfig::from_env();
    let remote = RemoteConfig::from_app(&config)
        .context("AGENCY_REMOTE_URL and AGENCY_REMOTE_KEY must both be set")?;

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = store::open_db(&db_path)?;

    if args.iter().any(|a| a == "--push") {
        return push_positions(&conn, &remote);
    }

    let mut rows = remote::fetch_clubs(&remote)?;
    let located = geo_lookup::fill_missing_coords(&mut rows.clubs);
    let mut kept_positions = 0usize;
    for club in rows.clubs.iter_mut() {
        // Local placement wins when the hosted row has none.
        if club.position.is_none()
            && let Some(local) = store::get_club(&conn, club.id)?
            && local.position.is_some()
        {
            club.position = local.position;
            kept_positions += 1;
        }
        store::upsert_club(&conn, club)?;
    }

    println!("Club sync complete");
    println!("Remote: {}", remote.base_url);
    println!("DB: {}", db_path.display());
    println!("Clubs pulled: {}", rows.clubs.len());
    println!("Rows skipped: {}", rows.skipped);
    println!("Coordinates looked up: {located}");
    println!("Local positions kept: {kept_positions}");
    Ok(())
}

fn push_positions(conn: &rusqlite::Connection, remote: &RemoteConfig) -> Result<()> {
    let clubs = store::list_clubs(conn)?;
    let mut pushed = 0usize;
    let mut errors = Vec::new();
    for club in clubs.iter().filter(|c| c.position.is_some()) {
        match remote::push_position(remote, club.id, club.position) {
            Ok(()) => pushed += 1,
            Err(err) => errors.push(format!("{}: {err:#}", club.name)),
        }
    }

    println!("Position push complete");
    println!("Remote: {}", remote.base_url);
    println!("Positions pushed: {pushed}");
    if !errors.is_empty() {
        println!("  errors: {}", errors.len());
        for err in errors.iter().take(6) {
            println!("   - {err}");
        }
    }
    Ok(())
}
