use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF_EXPONENT: f64 = 2.0;

/// Configures how many times a call is retried and how long to wait between
/// attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied to the delay for each further retry.
    pub backoff_exponent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
            backoff_exponent: DEFAULT_BACKOFF_EXPONENT,
        }
    }
}

impl RetryPolicy {
    /// Total attempts a call may make, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `base_delay * backoff_exponent^(attempt - 1)`; zero for `attempt == 0`.
    /// Saturates at [`Duration::MAX`].
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = match attempt {
            0 => return Duration::ZERO,
            1 => return self.base_delay,
            2 => self.backoff_exponent,
            n => self
                .backoff_exponent
                .powi(i32::try_from(n - 1).unwrap_or(i32::MAX)),
        };
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Replaces zero-valued fields with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = DEFAULT_MAX_RETRIES;
        }
        if self.base_delay.is_zero() {
            self.base_delay = DEFAULT_RETRY_DELAY;
        }
        if self.backoff_exponent == 0.0 {
            self.backoff_exponent = DEFAULT_BACKOFF_EXPONENT;
        }
        self
    }
}
