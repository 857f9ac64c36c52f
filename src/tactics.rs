use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Board space: 105m x 68m pitch at 10 px/m.
pub const BOARD_WIDTH: f64 = 1050.0;
pub const BOARD_HEIGHT: f64 = 680.0;

pub const HISTORY_LIMIT: usize = 20;
pub const PATH_ERASE_RADIUS: f64 = 10.0;
pub const ARROW_ERASE_THRESHOLD: f64 = 10.0;
pub const ITEM_HIT_RADIUS: f64 = 18.0;
pub const MIN_STROKE_SPACING: f64 = 2.0;
pub const MIN_ARROW_LENGTH: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardPoint {
    pub x: f64,
    pub y: f64,
}

impl BoardPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: BoardPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, BOARD_WIDTH),
            y: self.y.clamp(0.0, BOARD_HEIGHT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    HomePlayer { number: u8 },
    AwayPlayer { number: u8 },
    Ball,
    Cone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: u32,
    pub kind: ItemKind,
    pub pos: BoardPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowStyle {
    #[default]
    Pass,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub start: BoardPoint,
    pub end: BoardPoint,
    #[serde(default)]
    pub style: ArrowStyle,
}

impl Arrow {
    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    pub fn distance_to(&self, p: BoardPoint) -> f64 {
        point_segment_distance(p, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeColor {
    #[default]
    White,
    Yellow,
    Red,
    Blue,
}

impl StrokeColor {
    pub fn next(self) -> Self {
        match self {
            StrokeColor::White => StrokeColor::Yellow,
            StrokeColor::Yellow => StrokeColor::Red,
            StrokeColor::Red => StrokeColor::Blue,
            StrokeColor::Blue => StrokeColor::White,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandPath {
    pub points: Vec<BoardPoint>,
    #[serde(default)]
    pub color: StrokeColor,
}

impl FreehandPath {
    /// Distance from `p` to the closest recorded point.
    pub fn distance_to(&self, p: BoardPoint) -> f64 {
        self.points
            .iter()
            .map(|q| q.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }
}

/// The full drawing state; what undo restores and what gets saved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<BoardItem>,
    #[serde(default)]
    pub arrows: Vec<Arrow>,
    #[serde(default)]
    pub paths: Vec<FreehandPath>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.arrows.is_empty() && self.paths.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Move,
    Draw,
    Arrow,
    Erase,
}

impl Tool {
    pub fn next(self) -> Self {
        match self {
            Tool::Move => Tool::Draw,
            Tool::Draw => Tool::Arrow,
            Tool::Arrow => Tool::Erase,
            Tool::Erase => Tool::Move,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::Move => "MOVE",
            Tool::Draw => "DRAW",
            Tool::Arrow => "ARROW",
            Tool::Erase => "ERASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formation {
    FourFourTwo,
    FourThreeThree,
    ThreeFiveTwo,
}

impl Formation {
    pub fn next(self) -> Self {
        match self {
            Formation::FourFourTwo => Formation::FourThreeThree,
            Formation::FourThreeThree => Formation::ThreeFiveTwo,
            Formation::ThreeFiveTwo => Formation::FourFourTwo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Formation::FourFourTwo => "4-4-2",
            Formation::FourThreeThree => "4-3-3",
            Formation::ThreeFiveTwo => "3-5-2",
        }
    }

    /// Home side slots in metres, attacking left to right, keeper first.
    fn slots(self) -> &'static [(f64, f64)] {
        match self {
            Formation::FourFourTwo => &[
                (5.0, 34.0),
                (18.0, 10.0),
                (16.0, 26.0),
                (16.0, 42.0),
                (18.0, 58.0),
                (33.0, 10.0),
                (31.0, 26.0),
                (31.0, 42.0),
                (33.0, 58.0),
                (46.0, 26.0),
                (46.0, 42.0),
            ],
            Formation::FourThreeThree => &[
                (5.0, 34.0),
                (18.0, 10.0),
                (16.0, 26.0),
                (16.0, 42.0),
                (18.0, 58.0),
                (30.0, 20.0),
                (28.0, 34.0),
                (30.0, 48.0),
                (45.0, 12.0),
                (47.0, 34.0),
                (45.0, 56.0),
            ],
            Formation::ThreeFiveTwo => &[
                (5.0, 34.0),
                (16.0, 20.0),
                (15.0, 34.0),
                (16.0, 48.0),
                (32.0, 6.0),
                (29.0, 22.0),
                (27.0, 34.0),
                (29.0, 46.0),
                (32.0, 62.0),
                (46.0, 27.0),
                (46.0, 41.0),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseOutcome {
    pub paths_removed: usize,
    pub arrow_removed: Option<Arrow>,
}

impl EraseOutcome {
    pub fn is_empty(&self) -> bool {
        self.paths_removed == 0 && self.arrow_removed.is_none()
    }
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Stroke(FreehandPath),
    Arrow {
        start: BoardPoint,
    },
    Drag {
        item_id: u32,
        before: Snapshot,
        moved: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TacticsBoard {
    drawing: Snapshot,
    history: VecDeque<Snapshot>,
    gesture: Gesture,
    next_item_id: u32,
    pub tool: Tool,
    pub arrow_style: ArrowStyle,
    pub stroke_color: StrokeColor,
}

impl TacticsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a saved drawing. Item ids are renumbered when the saved ones leave no
    /// room for new items.
    pub fn from_snapshot(mut drawing: Snapshot) -> Self {
        let next_item_id = match next_free_id(&drawing.items) {
            Some(id) => id,
            None => {
                for (idx, item) in drawing.items.iter_mut().enumerate() {
                    item.id = idx as u32;
                }
                drawing.items.len() as u32
            }
        };
        Self {
            drawing,
            next_item_id,
            ..Self::default()
        }
    }

    pub fn drawing(&self) -> &Snapshot {
        &self.drawing
    }

    pub fn items(&self) -> &[BoardItem] {
        &self.drawing.items
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.drawing.arrows
    }

    pub fn paths(&self) -> &[FreehandPath] {
        &self.drawing.paths
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// The stroke currently being drawn, for live rendering.
    pub fn pending_stroke(&self) -> Option<&FreehandPath> {
        match &self.gesture {
            Gesture::Stroke(path) => Some(path),
            _ => None,
        }
    }

    pub fn pending_arrow_start(&self) -> Option<BoardPoint> {
        match self.gesture {
            Gesture::Arrow { start } => Some(start),
            _ => None,
        }
    }

    pub fn add_item(&mut self, kind: ItemKind, pos: BoardPoint) -> u32 {
        self.checkpoint();
        self.push_item(kind, pos)
    }

    pub fn remove_item(&mut self, id: u32) -> bool {
        if !self.drawing.items.iter().any(|i| i.id == id) {
            return false;
        }
        self.checkpoint();
        self.drawing.items.retain(|i| i.id != id);
        true
    }

    pub fn remove_item_at(&mut self, at: BoardPoint) -> Option<u32> {
        let id = self.item_at(at)?;
        self.remove_item(id).then_some(id)
    }

    pub fn apply_formation(&mut self, formation: Formation) {
        self.checkpoint();
        self.drawing
            .items
            .retain(|i| !matches!(i.kind, ItemKind::HomePlayer { .. } | ItemKind::Ball));
        for (idx, (mx, my)) in formation.slots().iter().enumerate() {
            let number = (idx + 1) as u8;
            self.push_item(
                ItemKind::HomePlayer { number },
                BoardPoint::new(mx * 10.0, my * 10.0),
            );
        }
        self.push_item(
            ItemKind::Ball,
            BoardPoint::new(BOARD_WIDTH / 2.0, BOARD_HEIGHT / 2.0),
        );
    }

    pub fn clear(&mut self) -> bool {
        if self.drawing.is_empty() {
            return false;
        }
        self.checkpoint();
        self.drawing = Snapshot::default();
        true
    }

    pub fn begin_stroke(&mut self, at: BoardPoint) {
        self.gesture = Gesture::Stroke(FreehandPath {
            points: vec![at.clamped()],
            color: self.stroke_color,
        });
    }

    pub fn extend_stroke(&mut self, at: BoardPoint) {
        let Gesture::Stroke(path) = &mut self.gesture else {
            return;
        };
        let at = at.clamped();
        let far_enough = path
            .points
            .last()
            .is_none_or(|last| last.distance_to(at) >= MIN_STROKE_SPACING);
        if far_enough {
            path.points.push(at);
        }
    }

    /// Commits the current stroke. Strokes with fewer than two points are dropped.
    pub fn end_stroke(&mut self) -> bool {
        let Gesture::Stroke(path) = std::mem::take(&mut self.gesture) else {
            return false;
        };
        if path.points.len() < 2 {
            return false;
        }
        self.checkpoint();
        self.drawing.paths.push(path);
        true
    }

    pub fn begin_arrow(&mut self, at: BoardPoint) {
        self.gesture = Gesture::Arrow { start: at.clamped() };
    }

    pub fn finish_arrow(&mut self, at: BoardPoint) -> bool {
        let Gesture::Arrow { start } = std::mem::take(&mut self.gesture) else {
            return false;
        };
        let arrow = Arrow {
            start,
            end: at.clamped(),
            style: self.arrow_style,
        };
        if arrow.length() < MIN_ARROW_LENGTH {
            return false;
        }
        self.checkpoint();
        self.drawing.arrows.push(arrow);
        true
    }

    /// The topmost item within `ITEM_HIT_RADIUS` of `at`. Later items draw on top.
    pub fn item_at(&self, at: BoardPoint) -> Option<u32> {
        self.drawing
            .items
            .iter()
            .rev()
            .find(|item| item.pos.distance_to(at) <= ITEM_HIT_RADIUS)
            .map(|item| item.id)
    }

    pub fn begin_drag(&mut self, at: BoardPoint) -> Option<u32> {
        let item_id = self.item_at(at)?;
        self.gesture = Gesture::Drag {
            item_id,
            before: self.drawing.clone(),
            moved: false,
        };
        Some(item_id)
    }

    pub fn drag_to(&mut self, at: BoardPoint) {
        let Gesture::Drag { item_id, moved, .. } = &mut self.gesture else {
            return;
        };
        let at = at.clamped();
        if let Some(item) = self.drawing.items.iter_mut().find(|i| i.id == *item_id) {
            if item.pos != at {
                item.pos = at;
                *moved = true;
            }
        }
    }

    pub fn end_drag(&mut self) -> bool {
        let Gesture::Drag { before, moved, .. } = std::mem::take(&mut self.gesture) else {
            return false;
        };
        if moved {
            self.push_history(before);
        }
        moved
    }

    pub fn cancel_gesture(&mut self) {
        if let Gesture::Drag { before, moved: true, .. } = std::mem::take(&mut self.gesture) {
            self.drawing = before;
        }
    }

    pub fn erase_at(&mut self, at: BoardPoint) -> EraseOutcome {
        self.erase_within(at, PATH_ERASE_RADIUS, ARROW_ERASE_THRESHOLD)
    }

    /// Removes every path with a point closer than `path_radius` and the single nearest
    /// arrow closer than `arrow_threshold`.
    pub fn erase_within(
        &mut self,
        at: BoardPoint,
        path_radius: f64,
        arrow_threshold: f64,
    ) -> EraseOutcome {
        let path_hit: Vec<bool> = self
            .drawing
            .paths
            .iter()
            .map(|p| p.distance_to(at) < path_radius)
            .collect();
        let paths_removed = path_hit.iter().filter(|hit| **hit).count();

        let mut nearest_arrow: Option<(usize, f64)> = None;
        for (idx, arrow) in self.drawing.arrows.iter().enumerate() {
            let d = arrow.distance_to(at);
            if d >= arrow_threshold {
                continue;
            }
            if nearest_arrow.is_none_or(|(_, best)| d < best) {
                nearest_arrow = Some((idx, d));
            }
        }

        if paths_removed == 0 && nearest_arrow.is_none() {
            return EraseOutcome::default();
        }

        self.checkpoint();
        let mut hits = path_hit.into_iter();
        self.drawing
            .paths
            .retain(|_| !hits.next().unwrap_or(false));
        let arrow_removed = nearest_arrow.map(|(idx, _)| self.drawing.arrows.remove(idx));

        debug!(paths_removed, arrow = arrow_removed.is_some(), "erased");
        EraseOutcome {
            paths_removed,
            arrow_removed,
        }
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        self.gesture = Gesture::Idle;
        self.drawing = previous;
        if let Some(id) = next_free_id(&self.drawing.items) {
            self.next_item_id = self.next_item_id.max(id);
        }
        true
    }

    fn push_item(&mut self, kind: ItemKind, pos: BoardPoint) -> u32 {
        let id = self.next_item_id;
        self.next_item_id = self.next_item_id.saturating_add(1);
        self.drawing.items.push(BoardItem {
            id,
            kind,
            pos: pos.clamped(),
        });
        id
    }

    fn checkpoint(&mut self) {
        let snapshot = self.drawing.clone();
        self.push_history(snapshot);
    }

    fn push_history(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

/// One past the highest item id, or `None` when that would overflow.
fn next_free_id(items: &[BoardItem]) -> Option<u32> {
    items
        .iter()
        .map(|i| i.id)
        .max()
        .map_or(Some(0), |max| max.checked_add(1))
}

/// Distance from `p` to segment `a`-`b`, projecting onto the segment and clamping to
/// its endpoints.
pub fn point_segment_distance(p: BoardPoint, a: BoardPoint, b: BoardPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance_to(BoardPoint::new(a.x + t * dx, a.y + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> BoardPoint {
        BoardPoint::new(x, y)
    }

    #[test]
    fn segment_distance_is_perpendicular_inside_and_endpoint_outside() {
        assert!((point_segment_distance(p(5.0, 3.0), p(0.0, 0.0), p(10.0, 0.0)) - 3.0).abs() < 1e-12);
        assert!((point_segment_distance(p(13.0, 4.0), p(0.0, 0.0), p(10.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((point_segment_distance(p(3.0, 4.0), p(0.0, 0.0), p(0.0, 0.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn short_strokes_and_arrows_are_discarded() {
        let mut board = TacticsBoard::new();
        board.begin_stroke(p(10.0, 10.0));
        board.extend_stroke(p(10.5, 10.0));
        assert!(!board.end_stroke());

        board.begin_arrow(p(10.0, 10.0));
        assert!(!board.finish_arrow(p(12.0, 10.0)));
        assert!(board.drawing().is_empty());
        assert_eq!(board.history_len(), 0);
    }

    #[test]
    fn drag_without_movement_leaves_no_history() {
        let mut board = TacticsBoard::new();
        let id = board.add_item(ItemKind::Cone, p(100.0, 100.0));
        let before = board.history_len();
        assert_eq!(board.begin_drag(p(105.0, 100.0)), Some(id));
        assert!(!board.end_drag());
        assert_eq!(board.history_len(), before);
    }

    #[test]
    fn formation_places_eleven_and_a_ball() {
        let mut board = TacticsBoard::new();
        board.apply_formation(Formation::FourThreeThree);
        board.apply_formation(Formation::FourFourTwo);
        let home = board
            .items()
            .iter()
            .filter(|i| matches!(i.kind, ItemKind::HomePlayer { .. }))
            .count();
        let balls = board
            .items()
            .iter()
            .filter(|i| i.kind == ItemKind::Ball)
            .count();
        assert_eq!(home, 11);
        assert_eq!(balls, 1);
    }
}
