use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::geo_calibration::{CalibrationPlan, ClubMarker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub clubs: usize,
    pub residuals: usize,
}

/// `clubs-YYYYMMDD-HHMMSS.xlsx` inside `dir`.
pub fn default_export_path(dir: &Path) -> PathBuf {
    dir.join(format!("clubs-{}.xlsx", Utc::now().format("%Y%m%d-%H%M%S")))
}

/// Writes a `Clubs` sheet and, when a calibration ran, a `Calibration` sheet.
pub fn export_clubs(
    path: &Path,
    clubs: &[ClubMarker],
    plan: Option<&CalibrationPlan>,
) -> Result<ExportReport> {
    let mut workbook = Workbook::new();

    let club_rows = club_rows(clubs);
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Clubs")?;
        write_rows(sheet, &club_rows)?;
    }

    let mut residuals = 0usize;
    if let Some(plan) = plan {
        let rows = calibration_rows(plan, clubs);
        residuals = plan.residuals.len();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Calibration")?;
        write_rows(sheet, &rows)?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export dir {}", parent.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        clubs: club_rows.len().saturating_sub(1),
        residuals,
    })
}

pub fn club_rows(clubs: &[ClubMarker]) -> Vec<Vec<String>> {
    let mut rows = vec![
        [
            "ID",
            "Club",
            "Country",
            "City",
            "Lat",
            "Lng",
            "X",
            "Y",
            "Calibration Point",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    ];
    for club in clubs {
        rows.push(vec![
            club.id.to_string(),
            club.name.clone(),
            club.country.clone(),
            club.city.clone().unwrap_or_default(),
            opt_to_string(club.coords.map(|c| c.lat), 5),
            opt_to_string(club.coords.map(|c| c.lng), 5),
            opt_to_string(club.position.map(|p| p.x), 1),
            opt_to_string(club.position.map(|p| p.y), 1),
            if club.is_calibration_point {
                "yes".to_string()
            } else {
                "no".to_string()
            },
        ]);
    }
    rows
}

pub fn calibration_rows(plan: &CalibrationPlan, clubs: &[ClubMarker]) -> Vec<Vec<String>> {
    let t = &plan.transform;
    let mut rows = vec![
        vec!["Parameter".to_string(), "Value".to_string()],
        vec!["x slope".to_string(), format!("{:.6}", t.x.slope)],
        vec!["x intercept".to_string(), format!("{:.6}", t.x.intercept)],
        vec!["y slope".to_string(), format!("{:.6}", t.y.slope)],
        vec!["y intercept".to_string(), format!("{:.6}", t.y.intercept)],
        vec!["points used".to_string(), plan.points_used.to_string()],
        vec!["rms error (px)".to_string(), format!("{:.3}", plan.rms_error)],
        vec!["markers moved".to_string(), plan.moves.len().to_string()],
        Vec::new(),
        vec![
            "ID".to_string(),
            "Club".to_string(),
            "dx".to_string(),
            "dy".to_string(),
            "Distance".to_string(),
        ],
    ];
    for residual in &plan.residuals {
        let name = clubs
            .iter()
            .find(|c| c.id == residual.marker_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        rows.push(vec![
            residual.marker_id.to_string(),
            name,
            format!("{:.3}", residual.dx),
            format!("{:.3}", residual.dy),
            format!("{:.3}", residual.distance()),
        ]);
    }
    rows
}

fn opt_to_string(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_calibration::{GeoPoint, PixelPoint};

    #[test]
    fn club_rows_have_header_and_blank_missing_values() {
        let mut located = ClubMarker::new(7, "Ajax", "Netherlands");
        located.coords = Some(GeoPoint::new(52.3676, 4.9041));
        located.position = Some(PixelPoint::new(512.31, 300.0));
        located.is_calibration_point = true;
        let bare = ClubMarker::new(8, "Nowhere FC", "Atlantis");

        let rows = club_rows(&[located, bare]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "ID");
        assert_eq!(rows[1][4], "52.36760");
        assert_eq!(rows[1][6], "512.3");
        assert_eq!(rows[1][8], "yes");
        assert_eq!(rows[2][4], "");
        assert_eq!(rows[2][8], "no");
    }
}
