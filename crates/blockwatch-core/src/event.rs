use serde::{Deserialize, Serialize};

/// Kind of window event reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The foreground window changed owner
    WindowStateChanged,
    /// Anything else the platform reports (content changes, scrolls, ...)
    Other,
}

/// Foreground application change reported by the platform event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundEvent {
    pub app_id: String,
    pub timestamp_millis: i64,
    pub kind: EventKind,
}

impl ForegroundEvent {
    #[must_use]
    pub fn window_state_changed(app_id: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            app_id: app_id.into(),
            timestamp_millis,
            kind: EventKind::WindowStateChanged,
        }
    }

    /// Whether the engine should look at this event at all
    #[must_use]
    pub fn is_decision_relevant(&self) -> bool {
        self.kind == EventKind::WindowStateChanged && !self.app_id.is_empty()
    }

    /// Parse one line of a line-oriented event feed
    ///
    /// Accepts a JSON record or a bare app identifier; a bare identifier is
    /// stamped with `now_millis` and treated as a window change. Blank lines
    /// and malformed JSON yield `None`.
    #[must_use]
    pub fn parse_line(line: &str, now_millis: i64) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with('{') {
            return match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("Ignoring malformed event record: {e}");
                    None
                }
            };
        }

        Some(Self::window_state_changed(line, now_millis))
    }
}

/// Wall-clock milliseconds since the Unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
