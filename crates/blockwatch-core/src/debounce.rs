/// Default minimum gap between two evaluations of the same app
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u32 = 2000;

/// Last foreground signal that was let through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceState {
    pub last_app_id: String,
    pub last_timestamp_millis: i64,
}

/// Suppresses repeated processing of the same foreground app
///
/// Not synchronised: drive it from one sequential event stream.
#[derive(Debug)]
pub struct ForegroundDebouncer {
    window_millis: i64,
    /// `None` until the first event, so the first event always passes
    state: Option<DebounceState>,
}

impl ForegroundDebouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_DEBOUNCE_WINDOW_MS)
    }

    #[must_use]
    pub fn with_window(window_millis: u32) -> Self {
        Self {
            window_millis: i64::from(window_millis),
            state: None,
        }
    }

    /// Decide whether this signal should be evaluated
    ///
    /// Returns false iff the same app was let through less than the window
    /// ago. Any accepted signal becomes the new reference point, whether or
    /// not it ends up blocked.
    pub fn should_process(&mut self, app_id: &str, timestamp_millis: i64) -> bool {
        if let Some(state) = &self.state {
            if state.last_app_id == app_id
                && timestamp_millis.saturating_sub(state.last_timestamp_millis)
                    < self.window_millis
            {
                return false;
            }
        }

        self.state = Some(DebounceState {
            last_app_id: app_id.to_string(),
            last_timestamp_millis: timestamp_millis,
        });
        true
    }

    #[must_use]
    pub fn state(&self) -> Option<&DebounceState> {
        self.state.as_ref()
    }
}

impl Default for ForegroundDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
