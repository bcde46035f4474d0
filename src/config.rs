use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Deadline for each info or player exchange.
    pub timeout: Duration,
    /// Query endpoints concurrently instead of one after another.
    pub concurrent: bool,
}

impl QueryConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
            concurrent: false,
        }
    }
}
