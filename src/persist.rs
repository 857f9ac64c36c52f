use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::app_cache_dir;
use crate::state::{AppState, Screen};
use crate::tactics::{Snapshot, TacticsBoard, Tool};

const SESSION_FILE: &str = "session.json";
const SESSION_VERSION: u32 = 1;

/// What the TUI restores on the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCache {
    pub version: u32,
    #[serde(default)]
    pub screen: Screen,
    #[serde(default)]
    pub selected_club_id: Option<i64>,
    #[serde(default)]
    pub tool: Tool,
    #[serde(default)]
    pub board: Snapshot,
}

impl SessionCache {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            version: SESSION_VERSION,
            screen: state.screen,
            selected_club_id: state.selected_club_id(),
            tool: state.board.tool,
            board: state.board.drawing().clone(),
        }
    }

    /// Restores the screen, selection and board. A club that no longer exists keeps
    /// the current selection.
    pub fn apply_to(self, state: &mut AppState) {
        if let Some(id) = self.selected_club_id {
            state.select_club_id(id);
        }
        let mut board = TacticsBoard::from_snapshot(self.board);
        board.tool = self.tool;
        state.board = board;
        state.set_screen(self.screen);
    }
}

pub fn session_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(SESSION_FILE))
}

/// Missing, unreadable, or old-version files all read as `None`.
pub fn load_session(path: &Path) -> Option<SessionCache> {
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<SessionCache>(&raw).ok()?;
    if cache.version != SESSION_VERSION {
        debug!(found = cache.version, "ignoring stale session cache");
        return None;
    }
    Some(cache)
}

pub fn save_session(path: &Path, cache: &SessionCache) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let json = serde_json::to_string(cache).context("serialize session")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub fn load_into_state(state: &mut AppState) {
    let Some(path) = session_path() else {
        return;
    };
    if let Some(cache) = load_session(&path) {
        cache.apply_to(state);
    }
}

pub fn save_from_state(state: &AppState) -> Result<()> {
    let Some(path) = session_path() else {
        return Ok(());
    };
    save_session(&path, &SessionCache::from_state(state))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("agency_desk_{tag}_{}_{nanos}", std::process::id()))
    }

    #[test]
    fn stale_and_garbage_files_are_ignored() {
        let dir = scratch_dir("session");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SESSION_FILE);

        fs::write(&path, "{not json").unwrap();
        assert!(load_session(&path).is_none());

        fs::write(&path, r#"{"version": 0, "screen": "Tactics"}"#).unwrap();
        assert!(load_session(&path).is_none());

        fs::write(&path, r#"{"version": 1, "screen": "Tactics"}"#).unwrap();
        let cache = load_session(&path).unwrap();
        assert_eq!(cache.screen, Screen::Tactics);
        assert_eq!(cache.tool, Tool::Move);
        assert!(cache.board.is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_replaces_file_without_leaving_temp() {
        let dir = scratch_dir("save");
        let path = dir.join(SESSION_FILE);
        let cache = SessionCache {
            version: SESSION_VERSION,
            screen: Screen::Reveal,
            selected_club_id: Some(4),
            tool: Tool::Erase,
            board: Snapshot::default(),
        };
        save_session(&path, &cache).unwrap();
        assert_eq!(load_session(&path), Some(cache));
        assert!(!path.with_extension("json.tmp").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
