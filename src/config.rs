use std::time::Duration;

/// Knobs for a [`crate::PageLoader`] run and its HTTP client.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Upper bound on asset fetches in flight.
    pub max_concurrent: usize,
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub follow_redirects: bool,
    /// Cancel outstanding asset fetches once this much time has passed
    /// since the download started.
    pub deadline: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            user_agent: "PageLoader/1.0".to_string(),
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            deadline: None,
        }
    }
}
