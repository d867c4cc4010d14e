//! Retry policy and backoff strategies.

use std::time::Duration;

use crate::HttpClientError;

/// Retry policy consumed by retrying middlewares.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Time allowed for a single attempt before it counts as a timeout.
    pub fetch_timeout: Option<Duration>,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
    /// Status codes that trigger another attempt.
    pub retry_status_codes: Vec<u16>,
    /// Whether to retry on connection errors.
    pub retry_on_connection_error: bool,
    /// Whether to retry on timeout errors.
    pub retry_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            fetch_timeout: Some(Duration::from_secs(15)),
            backoff: BackoffStrategy::Exponential {
                initial: Duration::from_secs(1),
                max: Duration::from_secs(60),
                multiplier: 2.0,
            },
            retry_status_codes: vec![408, 429, 500, 502, 503, 504],
            retry_on_connection_error: true,
            retry_on_timeout: true,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff starting at `initial_delay`.
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Exponential {
                initial: initial_delay,
                max: Duration::from_secs(60),
                multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    /// Explicit delay schedule; one attempt more than there are delays.
    pub fn delays(delays: Vec<Duration>) -> Self {
        Self {
            max_attempts: delays.len() as u32 + 1,
            backoff: BackoffStrategy::Schedule(delays),
            ..Default::default()
        }
    }

    /// Retry immediately, without delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::None,
            ..Default::default()
        }
    }

    /// Replace the status codes that trigger a retry.
    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retry_status_codes = codes;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Disable the per-attempt timeout.
    pub fn without_fetch_timeout(mut self) -> Self {
        self.fetch_timeout = None;
        self
    }

    /// Disable retry on connection errors.
    pub fn no_retry_on_connection(mut self) -> Self {
        self.retry_on_connection_error = false;
        self
    }

    /// Disable retry on timeout errors.
    pub fn no_retry_on_timeout(mut self) -> Self {
        self.retry_on_timeout = false;
        self
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Check if a status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Check if attempt number `attempt` (0-indexed) may be followed by another.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Constant delay between retries.
    Constant(Duration),
    /// Delay grows by `multiplier` each attempt, capped at `max`.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
    },
    /// Explicit delays; the last one repeats once the list runs out.
    Schedule(Vec<Duration>),
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(d) => *d,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let factor = multiplier.powi(attempt as i32);
                let millis = (initial.as_millis() as f64 * factor) as u64;
                Duration::from_millis(millis).min(*max)
            }
            Self::Schedule(delays) => delays
                .get(attempt as usize)
                .or_else(|| delays.last())
                .copied()
                .unwrap_or(Duration::ZERO),
        }
    }
}

/// Decides whether a failed attempt should be repeated.
pub trait RetryStrategy: Send + Sync {
    /// Check if the request should be retried after `error` on `attempt`.
    fn should_retry(&self, attempt: u32, error: &HttpClientError) -> bool;

    /// Get the delay before the next retry.
    fn retry_delay(&self, attempt: u32) -> Duration;
}

impl RetryStrategy for RetryConfig {
    fn should_retry(&self, attempt: u32, error: &HttpClientError) -> bool {
        if !self.has_attempts_left(attempt) {
            return false;
        }

        if error.is_timeout() {
            self.retry_on_timeout
        } else if error.is_connection() {
            self.retry_on_connection_error
        } else {
            error.is_retryable()
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.delay_for_attempt(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
            multiplier: 2.0,
        };

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(500));
    }

    #[test]
    fn test_schedule_repeats_last_delay() {
        let strategy = BackoffStrategy::Schedule(vec![
            Duration::from_millis(10),
            Duration::from_millis(30),
        ]);

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(10));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(30));
        assert_eq!(strategy.delay_for_attempt(7), Duration::from_millis(30));
        assert_eq!(BackoffStrategy::Schedule(Vec::new()).delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_delays_sets_attempts() {
        let config = RetryConfig::delays(vec![Duration::from_millis(1); 3]);
        assert_eq!(config.max_attempts, 4);
        assert!(config.has_attempts_left(2));
        assert!(!config.has_attempts_left(3));
    }

    #[test]
    fn test_should_retry() {
        let config = RetryConfig::immediate(2);
        let timeout = HttpClientError::Timeout(Duration::from_secs(1));

        assert!(config.should_retry(0, &timeout));
        assert!(!config.should_retry(1, &timeout));
        assert!(!config.should_retry(0, &HttpClientError::middleware("fatal")));
        assert!(!config.clone().no_retry_on_timeout().should_retry(0, &timeout));
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(400));
    }
}
