// Retry policy shared by the HTTP client and the command layer.
//
// A plain value: constructed once, cloned into whoever needs it, never
// mutated. The client reads the status-code sets and the backoff bounds;
// the command wrapper only uses the backoff bounds.

use std::time::Duration;

use reqwest::StatusCode;

/// Exponential backoff and status classification for remote calls.
///
/// `delay = base_delay * multiplier^attempt`, with `attempt` starting at 0
/// for the first wait.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first try. `3` means up to four calls.
    pub max_retries: u32,

    /// Delay before the first retry. Default: 1s.
    pub base_delay: Duration,

    /// Growth factor between consecutive waits. Default: 2.0.
    pub multiplier: f64,

    /// Statuses treated as a struggling server. Default: 500, 502, 503.
    pub retryable_statuses: Vec<u16>,

    /// Statuses treated as an expired session. Default: 401, 403.
    pub reauth_statuses: Vec<u16>,

    /// Fresh logins allowed per call when the session expires. Default: 1.
    pub max_reauth_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            retryable_statuses: vec![500, 502, 503],
            reauth_statuses: vec![401, 403],
            max_reauth_attempts: 1,
        }
    }
}

impl RetryPolicy {
    /// Policy used for user-initiated commands: three attempts in total.
    pub fn for_commands() -> Self {
        Self {
            max_retries: 2,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, base_delay: Duration, multiplier: f64) -> Self {
        self.base_delay = base_delay;
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_reauth_attempts(mut self, attempts: u32) -> Self {
        self.max_reauth_attempts = attempts;
        self
    }

    /// Wait before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    pub fn needs_reauth(&self, status: StatusCode) -> bool {
        self.reauth_statuses.contains(&status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_reauth_attempts, 1);
        assert!(policy.is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(policy.is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!policy.is_retryable(StatusCode::NOT_FOUND));
        assert!(policy.needs_reauth(StatusCode::UNAUTHORIZED));
        assert!(policy.needs_reauth(StatusCode::FORBIDDEN));
        assert!(!policy.needs_reauth(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn command_policy_allows_three_attempts() {
        assert_eq!(RetryPolicy::for_commands().max_retries, 2);
    }

    #[test]
    fn backoff_increases_exponentially() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_strictly_increasing() {
        let policy =
            RetryPolicy::default().with_backoff(Duration::from_millis(10), 1.5);
        let delays: Vec<_> = (0..6).map(|a| policy.delay_for(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] < w[1]), "{delays:?}");
    }

    #[test]
    fn multiplier_below_one_never_shrinks() {
        let policy = RetryPolicy::default().with_backoff(Duration::from_millis(100), 0.5);
        assert_eq!(policy.delay_for(3), Duration::from_millis(100));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), Duration::MAX);
    }
}
