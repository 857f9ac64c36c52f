use std::collections::VecDeque;

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geo_calibration::{
    self, CalibrationOptions, CalibrationPlan, ClubMarker, MAP_HEIGHT, MAP_WIDTH, PixelPoint,
};
use crate::matrix_rain::MatrixRain;
use crate::presets;
use crate::tactics::{Formation, TacticsBoard};

pub const MAX_LOGS: usize = 200;
pub const NUDGE_STEP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    Map,
    Tactics,
    Reveal,
}

impl Screen {
    pub fn label(self) -> &'static str {
        match self {
            Screen::Map => "MAP",
            Screen::Tactics => "TACTICS",
            Screen::Reveal => "REVEAL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub clubs: Vec<ClubMarker>,
    pub selected: usize,
    pub notes: Option<String>,
    pub board: TacticsBoard,
    pub formation: Formation,
    pub rain: MatrixRain,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub last_calibration: Option<CalibrationPlan>,
    pub options: CalibrationOptions,
}

impl AppState {
    pub fn new<R: Rng + ?Sized>(
        clubs: Vec<ClubMarker>,
        options: CalibrationOptions,
        rng: &mut R,
    ) -> Self {
        let mut state = Self {
            screen: Screen::Map,
            clubs,
            selected: 0,
            notes: None,
            board: TacticsBoard::new(),
            formation: Formation::FourFourTwo,
            rain: MatrixRain::new(0, 0, Vec::new(), rng),
            logs: VecDeque::new(),
            help_overlay: false,
            last_calibration: None,
            options,
        };
        state.refresh_banner();
        state
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        self.board.cancel_gesture();
        self.rain.clear_cursor();
        self.screen = screen;
        if screen == Screen::Reveal {
            self.refresh_banner();
        }
    }

    pub fn selected_club(&self) -> Option<&ClubMarker> {
        self.clubs.get(self.selected)
    }

    pub fn selected_club_id(&self) -> Option<i64> {
        self.selected_club().map(|c| c.id)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.clubs.len() {
            self.selected += 1;
            self.on_selection_changed();
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.on_selection_changed();
        }
    }

    pub fn select_club_id(&mut self, id: i64) -> bool {
        let Some(idx) = self.clubs.iter().position(|c| c.id == id) else {
            return false;
        };
        self.selected = idx;
        self.on_selection_changed();
        true
    }

    /// Replaces the club list, keeping the selection on the same club when it survives.
    pub fn replace_clubs(&mut self, clubs: Vec<ClubMarker>) {
        let keep = self.selected_club_id();
        self.clubs = clubs;
        self.selected = keep
            .and_then(|id| self.clubs.iter().position(|c| c.id == id))
            .unwrap_or(0);
        self.on_selection_changed();
    }

    fn on_selection_changed(&mut self) {
        self.notes = None;
        self.refresh_banner();
    }

    fn refresh_banner(&mut self) {
        let banner = match self.selected_club() {
            Some(club) => vec![club.name.to_uppercase(), club.country.to_uppercase()],
            None => vec!["AGENCY DESK".to_string()],
        };
        self.rain.set_banner(banner);
    }

    /// Moves the selected marker by whole steps, kept inside the map image.
    pub fn nudge_selected(&mut self, dx: f64, dy: f64) -> Option<(i64, PixelPoint)> {
        let club = self.clubs.get_mut(self.selected)?;
        let Some(pos) = club.position else {
            let msg = format!("[WARN] {} has no map position; press r for its preset", club.name);
            self.push_log(msg);
            return None;
        };
        let moved = PixelPoint::new(
            (pos.x + dx * NUDGE_STEP).clamp(0.0, MAP_WIDTH),
            (pos.y + dy * NUDGE_STEP).clamp(0.0, MAP_HEIGHT),
        );
        club.position = Some(moved);
        Some((club.id, moved))
    }

    pub fn toggle_calibration_point(&mut self) -> Option<(i64, bool)> {
        let club = self.clubs.get_mut(self.selected)?;
        club.is_calibration_point = !club.is_calibration_point;
        let (id, flag) = (club.id, club.is_calibration_point);
        let msg = format!(
            "[INFO] {} {} calibration points",
            club.name,
            if flag { "added to" } else { "removed from" }
        );
        if flag && club.coords.is_none() {
            let warn = format!("[WARN] {} has no coordinates and will be ignored", club.name);
            self.push_log(msg);
            self.push_log(warn);
        } else {
            self.push_log(msg);
        }
        Some((id, flag))
    }

    pub fn reset_selected_to_preset(&mut self) -> Option<(i64, PixelPoint)> {
        let club = self.clubs.get_mut(self.selected)?;
        if !presets::reset_to_preset(club) {
            let msg = format!("[WARN] No preset position for {}", club.name);
            self.push_log(msg);
            return None;
        }
        let id = club.id;
        let pos = club.position?;
        let msg = format!("[INFO] {} reset to preset ({:.0}, {:.0})", club.name, pos.x, pos.y);
        self.push_log(msg);
        Some((id, pos))
    }

    /// Plans a calibration, hands the new positions to `persist`, and only moves the
    /// markers in memory once `persist` succeeded. Returns whether markers moved.
    pub fn run_calibration<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        persist: impl FnOnce(&[(i64, PixelPoint)]) -> Result<()>,
    ) -> bool {
        let plan = match geo_calibration::plan_calibration(&self.clubs, &self.options, rng) {
            Ok(plan) => plan,
            Err(err) => {
                self.push_log(format!("[WARN] Calibration refused: {err}"));
                return false;
            }
        };

        let moves: Vec<(i64, PixelPoint)> =
            plan.moves.iter().map(|m| (m.marker_id, m.to)).collect();
        if let Err(err) = persist(&moves) {
            self.push_log(format!("[WARN] Calibration not saved: {err:#}"));
            return false;
        }

        let updated = geo_calibration::apply_plan(&mut self.clubs, &plan);
        self.push_log(format!(
            "[INFO] Calibrated from {} points: {} markers placed, rms {:.1}px",
            plan.points_used, updated, plan.rms_error
        ));
        self.last_calibration = Some(plan);
        true
    }

    pub fn cycle_tool(&mut self) {
        self.board.cancel_gesture();
        self.board.tool = self.board.tool.next();
        let msg = format!("[INFO] Tool: {}", self.board.tool.label());
        self.push_log(msg);
    }

    /// Lays out the current formation, then advances to the next one for the following
    /// press.
    pub fn apply_next_formation(&mut self) {
        let formation = self.formation;
        self.board.apply_formation(formation);
        self.formation = formation.next();
        self.push_log(format!("[INFO] Formation {}", formation.label()));
    }

    pub fn undo_board(&mut self) {
        if !self.board.undo() {
            self.push_log("[INFO] Nothing to undo");
        }
    }

    pub fn clear_board(&mut self) {
        if self.board.clear() {
            self.push_log("[INFO] Board cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn state_with(clubs: Vec<ClubMarker>) -> AppState {
        let mut rng = StdRng::seed_from_u64(1);
        AppState::new(clubs, CalibrationOptions::default(), &mut rng)
    }

    #[test]
    fn logs_are_bounded() {
        let mut state = state_with(Vec::new());
        for i in 0..(MAX_LOGS + 25) {
            state.push_log(format!("[INFO] {i}"));
        }
        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] 25"));
    }

    #[test]
    fn nudge_is_clamped_to_map() {
        let mut club = ClubMarker::new(1, "Ajax", "Netherlands");
        club.position = Some(PixelPoint::new(2.0, MAP_HEIGHT - 1.0));
        let mut state = state_with(vec![club]);
        let (_, pos) = state.nudge_selected(-1.0, 1.0).unwrap();
        assert_eq!(pos, PixelPoint::new(0.0, MAP_HEIGHT));
    }

    #[test]
    fn failed_persist_leaves_markers_in_place() {
        let mut state = state_with(presets::seed_markers());
        let before = state.clubs.clone();
        let mut rng = StdRng::seed_from_u64(2);
        let moved = state.run_calibration(&mut rng, |_| Err(anyhow!("disk full")));
        assert!(!moved);
        assert_eq!(state.clubs, before);
        assert!(state.last_calibration.is_none());
        assert!(state.logs.back().unwrap().starts_with("[WARN]"));
    }
}
