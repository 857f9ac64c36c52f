use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use agency_desk::cli::arg_value;
use agency_desk::config::AppConfig;
use agency_desk::export;
use agency_desk::geo_calibration;
use agency_desk::logging::{self, Verbosity};
use agency_desk::store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    logging::init_logging(Verbosity::from_args(&args), None);
    let config = AppConfig::from_env();

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let seed = arg_value(&args, "--seed")
        .map(|raw| raw.parse::<u64>().context("--seed expects an integer"))
        .transpose()?;
    let export_path = arg_value(&args, "--export").map(PathBuf::from);
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let mut conn = store::open_db(&db_path)?;
    let mut clubs = store::list_clubs(&conn)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let plan = geo_calibration::plan_calibration(&clubs, &config.calibration_options(), &mut rng)
        .context("calibration refused")?;

    println!("Calibration");
    println!("DB: {}", db_path.display());
    println!("Points used: {}", plan.points_used);
    println!(
        "x = {:.4} * lng + {:.2}",
        plan.transform.x.slope, plan.transform.x.intercept
    );
    println!(
        "y = {:.4} * lat + {:.2}",
        plan.transform.y.slope, plan.transform.y.intercept
    );
    println!("RMS error: {:.2}px", plan.rms_error);
    println!(
        "Bounds: ({:.0}, {:.0}) - ({:.0}, {:.0})",
        plan.bounds.min_x, plan.bounds.min_y, plan.bounds.max_x, plan.bounds.max_y
    );
    for residual in plan.residuals.iter().filter(|r| r.distance() > 5.0) {
        println!(
            "  anchor {} off by {:.1}px",
            residual.marker_id,
            residual.distance()
        );
    }
    println!("Markers to move: {}", plan.moves.len());

    if dry_run {
        println!("Dry run: nothing saved");
    } else {
        let moves = plan
            .moves
            .iter()
            .map(|m| (m.marker_id, m.to))
            .collect::<Vec<_>>();
        let saved = store::save_positions(&mut conn, &moves)?;
        geo_calibration::apply_plan(&mut clubs, &plan);
        println!("Positions saved: {saved}");
    }

    if let Some(path) = export_path {
        let report = export::export_clubs(&path, &clubs, Some(&plan))?;
        println!("Exported {} clubs to {}", report.clubs, path.display());
    }

    Ok(())
}
