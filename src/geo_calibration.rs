use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Stylized map image extent, in pixels.
pub const MAP_WIDTH: f64 = 1000.0;
pub const MAP_HEIGHT: f64 = 700.0;

pub const MIN_CALIBRATION_POINTS: usize = 3;
const DEGENERATE_VARIANCE: f64 = 1e-9;

pub const DEFAULT_PADDING: f64 = 40.0;
pub const DEFAULT_JITTER: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubMarker {
    pub id: i64,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub position: Option<PixelPoint>,
    #[serde(default)]
    pub coords: Option<GeoPoint>,
    #[serde(default)]
    pub is_calibration_point: bool,
}

impl ClubMarker {
    pub fn new(id: i64, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            country: country.into(),
            city: None,
            position: None,
            coords: None,
            is_calibration_point: false,
        }
    }

    /// Returns the marker as a calibration reference when it is flagged and fully located.
    pub fn calibration_point(&self) -> Option<CalibrationPoint> {
        if !self.is_calibration_point {
            return None;
        }
        let (Some(pixel), Some(geo)) = (self.position, self.coords) else {
            return None;
        };
        if !geo.is_valid() || !pixel.x.is_finite() || !pixel.y.is_finite() {
            return None;
        }
        Some(CalibrationPoint {
            marker_id: self.id,
            geo,
            pixel,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub marker_id: i64,
    pub geo: GeoPoint,
    pub pixel: PixelPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x (longitude)"),
            Axis::Y => f.write_str("y (latitude)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("need at least {required} calibration points, found {found}")]
    NotEnoughPoints { found: usize, required: usize },
    #[error("calibration points have no spread along {axis}")]
    DegenerateAxis { axis: Axis },
    #[error("fit along {axis} produced a non-finite value")]
    NonFinite { axis: Axis },
}

/// One-dimensional least-squares line: `pixel = slope * coordinate + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisFit {
    pub slope: f64,
    pub intercept: f64,
}

impl AxisFit {
    pub fn predict(&self, value: f64) -> f64 {
        self.slope * value + self.intercept
    }

    pub fn sse(&self, samples: &[(f64, f64)]) -> f64 {
        samples
            .iter()
            .map(|(input, target)| (self.predict(*input) - target).powi(2))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTransform {
    pub x: AxisFit,
    pub y: AxisFit,
}

impl LinearTransform {
    pub fn project(&self, geo: GeoPoint) -> PixelPoint {
        PixelPoint {
            x: self.x.predict(geo.lng),
            y: self.y.predict(geo.lat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn around(points: impl IntoIterator<Item = PixelPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    pub fn padded(self, padding: f64) -> Self {
        let pad = padding.max(0.0);
        Bounds {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    /// Shrinks the box to the image extent. An axis that would end up empty keeps its
    /// original range.
    pub fn within_extent(self, width: f64, height: f64) -> Self {
        let mut out = self;
        let (min_x, max_x) = (self.min_x.max(0.0), self.max_x.min(width));
        if min_x <= max_x {
            out.min_x = min_x;
            out.max_x = max_x;
        }
        let (min_y, max_y) = (self.min_y.max(0.0), self.max_y.min(height));
        if min_y <= max_y {
            out.min_y = min_y;
            out.max_y = max_y;
        }
        out
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn clamp(&self, p: PixelPoint) -> PixelPoint {
        PixelPoint {
            x: p.x.clamp(self.min_x, self.max_x),
            y: p.y.clamp(self.min_y, self.max_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOptions {
    pub padding: f64,
    pub jitter: f64,
    pub map_extent: Option<(f64, f64)>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            jitter: DEFAULT_JITTER,
            map_extent: Some((MAP_WIDTH, MAP_HEIGHT)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub marker_id: i64,
    pub dx: f64,
    pub dy: f64,
}

impl Residual {
    pub fn distance(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedMove {
    pub marker_id: i64,
    pub from: Option<PixelPoint>,
    pub to: PixelPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPlan {
    pub transform: LinearTransform,
    pub bounds: Bounds,
    pub points_used: usize,
    pub residuals: Vec<Residual>,
    pub rms_error: f64,
    pub moves: Vec<PlannedMove>,
}

pub fn calibration_points(markers: &[ClubMarker]) -> Vec<CalibrationPoint> {
    markers.iter().filter_map(ClubMarker::calibration_point).collect()
}

pub fn fit_axis(axis: Axis, samples: &[(f64, f64)]) -> Result<AxisFit, CalibrationError> {
    if samples.len() < 2 {
        return Err(CalibrationError::DegenerateAxis { axis });
    }
    let n = samples.len() as f64;
    let mean_in = samples.iter().map(|(v, _)| v).sum::<f64>() / n;
    let mean_out = samples.iter().map(|(_, t)| t).sum::<f64>() / n;

    let mut sxx = 0.0_f64;
    let mut sxy = 0.0_f64;
    for (v, t) in samples {
        let dv = v - mean_in;
        sxx += dv * dv;
        sxy += dv * (t - mean_out);
    }

    if sxx.is_nan() || sxx / n < DEGENERATE_VARIANCE {
        return Err(CalibrationError::DegenerateAxis { axis });
    }

    let slope = sxy / sxx;
    let intercept = mean_out - slope * mean_in;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CalibrationError::NonFinite { axis });
    }
    Ok(AxisFit { slope, intercept })
}

pub fn fit_transform(points: &[CalibrationPoint]) -> Result<LinearTransform, CalibrationError> {
    if points.len() < MIN_CALIBRATION_POINTS {
        return Err(CalibrationError::NotEnoughPoints {
            found: points.len(),
            required: MIN_CALIBRATION_POINTS,
        });
    }
    let x_samples: Vec<(f64, f64)> = points.iter().map(|p| (p.geo.lng, p.pixel.x)).collect();
    let y_samples: Vec<(f64, f64)> = points.iter().map(|p| (p.geo.lat, p.pixel.y)).collect();
    Ok(LinearTransform {
        x: fit_axis(Axis::X, &x_samples)?,
        y: fit_axis(Axis::Y, &y_samples)?,
    })
}

pub fn residuals(transform: &LinearTransform, points: &[CalibrationPoint]) -> Vec<Residual> {
    points
        .iter()
        .map(|p| {
            let predicted = transform.project(p.geo);
            Residual {
                marker_id: p.marker_id,
                dx: predicted.x - p.pixel.x,
                dy: predicted.y - p.pixel.y,
            }
        })
        .collect()
}

pub fn rms_error(residuals: &[Residual]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let sum: f64 = residuals.iter().map(|r| r.dx * r.dx + r.dy * r.dy).sum();
    (sum / residuals.len() as f64).sqrt()
}

/// Computes new positions for every located, non-reference marker without touching
/// the input.
pub fn plan_calibration<R: Rng + ?Sized>(
    markers: &[ClubMarker],
    options: &CalibrationOptions,
    rng: &mut R,
) -> Result<CalibrationPlan, CalibrationError> {
    let points = calibration_points(markers);
    let transform = fit_transform(&points)?;

    let mut bounds = Bounds::around(points.iter().map(|p| p.pixel))
        .ok_or(CalibrationError::NotEnoughPoints {
            found: 0,
            required: MIN_CALIBRATION_POINTS,
        })?
        .padded(options.padding);
    if let Some((width, height)) = options.map_extent {
        bounds = bounds.within_extent(width, height);
    }

    let residuals = residuals(&transform, &points);
    let rms = rms_error(&residuals);

    let jitter = if options.jitter.is_finite() {
        options.jitter.max(0.0)
    } else {
        0.0
    };
    let mut moves = Vec::new();
    for marker in markers {
        if marker.is_calibration_point {
            continue;
        }
        let Some(geo) = marker.coords.filter(GeoPoint::is_valid) else {
            continue;
        };
        let mut target = transform.project(geo);
        if jitter > 0.0 {
            target.x += rng.gen_range(-jitter..=jitter);
            target.y += rng.gen_range(-jitter..=jitter);
        }
        moves.push(PlannedMove {
            marker_id: marker.id,
            from: marker.position,
            to: bounds.clamp(target),
        });
    }

    debug!(
        points = points.len(),
        moves = moves.len(),
        rms,
        "calibration planned"
    );
    Ok(CalibrationPlan {
        transform,
        bounds,
        points_used: points.len(),
        residuals,
        rms_error: rms,
        moves,
    })
}

pub fn apply_plan(markers: &mut [ClubMarker], plan: &CalibrationPlan) -> usize {
    let targets: HashMap<i64, PixelPoint> =
        plan.moves.iter().map(|m| (m.marker_id, m.to)).collect();
    let mut updated = 0usize;
    for marker in markers.iter_mut() {
        if let Some(to) = targets.get(&marker.id) {
            marker.position = Some(*to);
            updated += 1;
        }
    }
    updated
}

pub fn calibrate<R: Rng + ?Sized>(
    markers: &mut [ClubMarker],
    options: &CalibrationOptions,
    rng: &mut R,
) -> Result<CalibrationPlan, CalibrationError> {
    let plan = plan_calibration(markers, options, rng)?;
    let updated = apply_plan(markers, &plan);
    info!(
        updated,
        points = plan.points_used,
        rms = plan.rms_error,
        "calibration applied"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn anchor(id: i64, lat: f64, lng: f64, x: f64, y: f64) -> ClubMarker {
        let mut m = ClubMarker::new(id, format!("club {id}"), "XX");
        m.coords = Some(GeoPoint::new(lat, lng));
        m.position = Some(PixelPoint::new(x, y));
        m.is_calibration_point = true;
        m
    }

    #[test]
    fn exact_line_is_recovered() {
        let fit = fit_axis(Axis::X, &[(0.0, 10.0), (1.0, 12.0), (2.0, 14.0)]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 10.0).abs() < 1e-12);
    }

    #[test]
    fn identical_inputs_fail_without_dividing() {
        let err = fit_axis(Axis::X, &[(5.0, 1.0), (5.0, 2.0), (5.0, 3.0)]).unwrap_err();
        assert_eq!(err, CalibrationError::DegenerateAxis { axis: Axis::X });
    }

    #[test]
    fn two_points_are_refused() {
        let mut markers = vec![
            anchor(1, 51.5, -0.1, 300.0, 250.0),
            anchor(2, 40.4, -3.7, 250.0, 500.0),
        ];
        let before = markers.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let err = calibrate(&mut markers, &CalibrationOptions::default(), &mut rng).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::NotEnoughPoints {
                found: 2,
                required: 3
            }
        );
        assert_eq!(markers, before);
    }

    #[test]
    fn unflagged_or_unlocated_markers_are_not_references() {
        let mut flagged_without_coords = anchor(1, 0.0, 0.0, 1.0, 1.0);
        flagged_without_coords.coords = None;
        let mut unflagged = anchor(2, 10.0, 10.0, 5.0, 5.0);
        unflagged.is_calibration_point = false;
        assert!(calibration_points(&[flagged_without_coords, unflagged]).is_empty());
    }

    #[test]
    fn padded_box_respects_map_extent() {
        let b = Bounds::around([PixelPoint::new(10.0, 20.0), PixelPoint::new(500.0, 690.0)])
            .unwrap()
            .padded(40.0)
            .within_extent(MAP_WIDTH, MAP_HEIGHT);
        assert_eq!(b.min_x, 0.0);
        assert_eq!(b.min_y, 0.0);
        assert_eq!(b.max_x, 540.0);
        assert_eq!(b.max_y, MAP_HEIGHT);
    }

    #[test]
    fn calibration_moves_only_located_non_reference_markers() {
        let mut target = ClubMarker::new(10, "Target", "YY");
        target.coords = Some(GeoPoint::new(45.0, 5.0));
        let unlocated = ClubMarker::new(11, "Nowhere", "YY");
        let mut markers = vec![
            anchor(1, 40.0, 0.0, 100.0, 600.0),
            anchor(2, 50.0, 10.0, 300.0, 400.0),
            anchor(3, 60.0, 20.0, 500.0, 200.0),
            target,
            unlocated,
        ];
        let options = CalibrationOptions {
            jitter: 0.0,
            ..CalibrationOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let plan = calibrate(&mut markers, &options, &mut rng).unwrap();
        assert_eq!(plan.moves.len(), 1);
        let moved = markers[3].position.unwrap();
        assert!((moved.x - 200.0).abs() < 1e-9);
        assert!((moved.y - 500.0).abs() < 1e-9);
        assert_eq!(markers[4].position, None);
        assert_eq!(markers[0].position, Some(PixelPoint::new(100.0, 600.0)));
        assert!(plan.rms_error < 1e-9);
    }
}
