/// Identifier fragments that mark home-screen and system surfaces
const EXEMPT_SUBSTRINGS: [&str; 2] = ["launcher", "systemui"];

/// Filter for foreground apps that must never be blocked
///
/// Matching is a case-sensitive substring test, so an unrelated app whose
/// identifier happens to contain "launcher" is exempt as well.
#[derive(Debug, Clone)]
pub struct ExemptionFilter {
    host_app_id: String,
}

impl ExemptionFilter {
    #[must_use]
    pub fn new(host_app_id: impl Into<String>) -> Self {
        Self {
            host_app_id: host_app_id.into(),
        }
    }

    /// Check if an application is exempt from blocking
    #[must_use]
    pub fn is_exempt(&self, app_id: &str) -> bool {
        app_id == self.host_app_id
            || EXEMPT_SUBSTRINGS
                .iter()
                .any(|fragment| app_id.contains(fragment))
    }

    #[must_use]
    pub fn host_app_id(&self) -> &str {
        &self.host_app_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ExemptionFilter {
        ExemptionFilter::new("com.example.blockwatch")
    }

    #[test]
    fn test_host_app_is_exempt() {
        assert!(filter().is_exempt("com.example.blockwatch"));
        assert!(!filter().is_exempt("com.example.blockwatch2"));
    }

    #[test]
    fn test_launcher_and_systemui_are_exempt() {
        let filter = filter();
        assert!(filter.is_exempt("com.foo.launcher"));
        assert!(filter.is_exempt("com.android.systemui"));
        assert!(filter.is_exempt("com.foo.launcherX"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let filter = filter();
        assert!(!filter.is_exempt("com.foo.Launcher"));
        assert!(!filter.is_exempt("com.android.SystemUI"));
    }

    #[test]
    fn test_regular_app_is_not_exempt() {
        assert!(!filter().is_exempt("com.other.app"));
    }
}
