//! Exponential backoff with jitter for external service calls.

use std::time::Duration;

use rand::Rng;

use pantry_config::RetrySettings;

/// Backoff schedule for one guarded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    /// Spread each delay by ±25%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay_ms: settings.base_delay_ms,
            backoff_factor: settings.backoff_factor,
            max_delay_ms: settings.max_delay_ms,
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits and never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            backoff_factor: 1.0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    /// Delay before retrying after failed attempt `attempt_number` (1-indexed).
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        if attempt_number == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt_number - 1).unwrap_or(i32::MAX);
        let delay_ms = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64) as u64;

        let delay_ms = if self.jitter {
            let jitter = delay_ms / 4;
            if jitter > 0 {
                let offset = rand::thread_rng().gen_range(0..=jitter * 2);
                (delay_ms - jitter) + offset
            } else {
                delay_ms
            }
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }

    pub fn should_retry(&self, attempt_number: u32) -> bool {
        attempt_number < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> RetryPolicy {
        RetryPolicy {
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_follow_settings() {
        let policy = fixed();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2_000));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_delay_ms: 5_000,
            ..fixed()
        };
        assert_eq!(policy.delay_for(20), Duration::from_millis(5_000));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let ms = policy.delay_for(2).as_millis();
            assert!((750..=1_250).contains(&ms), "out of range: {ms}");
        }
    }

    #[test]
    fn jitter_differs_between_threads() {
        let first_delays: Vec<u128> = (0..16)
            .map(|_| std::thread::spawn(|| RetryPolicy::default().delay_for(2).as_millis()))
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();
        assert!(first_delays.iter().any(|ms| *ms != first_delays[0]));
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy {
            max_attempts: 2,
            ..fixed()
        };
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(!RetryPolicy::none().should_retry(1));
    }

    #[test]
    fn zero_attempts_in_settings_still_tries_once() {
        let settings = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&settings).max_attempts, 1);
    }
}
