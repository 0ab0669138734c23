use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::cell::CellValue;
use crate::feedback::TIMESTAMP_FORMAT;
use crate::layout::{NOT_ENDED, NOT_ENDED_YET, NOT_STARTED, WINDOW_CELL, WINDOW_END_CELL};
use crate::store::{SheetStore, StoreError};

/// The collection window: whether submissions are open, and when it last
/// opened and closed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackWindow {
    pub active: bool,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl FeedbackWindow {
    pub fn start(&mut self, now: NaiveDateTime) {
        self.active = true;
        self.start_time = Some(now);
        self.end_time = None;
    }

    pub fn end(&mut self, now: NaiveDateTime) {
        self.active = false;
        self.end_time = Some(now);
    }

    pub fn start_label(&self) -> String {
        self.start_time
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| NOT_STARTED.to_string())
    }

    pub fn end_label(&self) -> String {
        match (self.end_time, self.active) {
            (Some(t), _) => t.format(TIMESTAMP_FORMAT).to_string(),
            (None, true) => NOT_ENDED_YET.to_string(),
            (None, false) => NOT_ENDED.to_string(),
        }
    }
}

/// Panel actions an admin can take on the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAction {
    Start,
    End,
}

impl WindowAction {
    /// Apply the action at the current local time
    pub fn apply(self, window: &mut FeedbackWindow) {
        let now = Local::now().naive_local();
        match self {
            WindowAction::Start => window.start(now),
            WindowAction::End => window.end(now),
        }
    }

    pub fn flash_message(self) -> &'static str {
        match self {
            WindowAction::Start => "Feedback Started",
            WindowAction::End => "Feedback Ended",
        }
    }
}

/// Keeps the window record on disk so a restart does not silently close or
/// reopen collection
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    path: Option<PathBuf>,
}

impl WindowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WindowStore {
            path: Some(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        WindowStore { path: None }
    }

    /// Read the saved window; a missing or unreadable file yields a closed window
    pub fn load(&self) -> FeedbackWindow {
        let Some(path) = &self.path else {
            return FeedbackWindow::default();
        };
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                info!("no window state at {}, starting closed", path.display());
                return FeedbackWindow::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("ignoring unreadable window state {}: {}", path.display(), e);
            FeedbackWindow::default()
        })
    }

    pub fn save(&self, window: &FeedbackWindow) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(window)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Copy the window times into the sheet's `A2:B2` cells
///
/// # Arguments
/// * `store` - The feedback sheet
/// * `window` - The window after `action` was applied
/// * `action` - Start writes both cells, end writes only `B2`
///
/// # Returns
/// * `Result<(), StoreError>` - Success or a sheet error
pub async fn mirror_window(
    store: &dyn SheetStore,
    window: &FeedbackWindow,
    action: WindowAction,
) -> Result<(), StoreError> {
    match action {
        WindowAction::Start => {
            store
                .update(
                    WINDOW_CELL,
                    vec![vec![
                        CellValue::from(window.start_label()),
                        CellValue::from(NOT_ENDED_YET),
                    ]],
                )
                .await
        }
        WindowAction::End => {
            store
                .update(WINDOW_END_CELL, vec![vec![CellValue::from(window.end_label())]])
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn start_then_end_records_both_times() {
        let mut window = FeedbackWindow::default();
        assert_eq!(window.start_label(), "Not Started");
        assert_eq!(window.end_label(), "Not Ended");

        window.start(at(8));
        assert!(window.active);
        assert_eq!(window.end_label(), "Not Ended Yet");

        window.end(at(10));
        assert!(!window.active);
        assert_eq!(window.start_label(), "2024-05-02 08:00:00");
        assert_eq!(window.end_label(), "2024-05-02 10:00:00");

        window.start(at(12));
        assert_eq!(window.end_time, None);
    }

    #[test]
    fn window_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path().join("state").join("window.json"));
        assert_eq!(store.load(), FeedbackWindow::default());

        let mut window = FeedbackWindow::default();
        window.start(at(7));
        store.save(&window).unwrap();
        assert_eq!(store.load(), window);
    }

    #[test]
    fn corrupt_state_starts_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(!WindowStore::new(path).load().active);
    }
}
