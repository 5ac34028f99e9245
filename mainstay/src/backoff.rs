//! Exponential backoff with deterministic jitter.
//!
//! The jitter is computed from the attempt index rather than from
//! randomness, so retry timing is fully reproducible in tests:
//!
//! ```text
//! exponential = base * 2^n
//! jitter      = round(exponential * 0.1)
//! delay       = exponential + jitter * (0.5 - (n % 2))
//! ```
//!
//! Even attempts land slightly above the exponential curve, odd attempts
//! slightly below; the unjittered component is monotonically non-decreasing
//! in `n`.

use std::time::Duration;

/// Delay before retry attempt `n` (zero-indexed).
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exponential = exponential_component(attempt, base).as_millis() as f64;
    let jitter = (exponential * 0.1).round();
    let sign = 0.5 - f64::from(attempt % 2);
    let delay = (exponential + jitter * sign).max(0.0);
    Duration::from_millis(delay as u64)
}

/// The unjittered `base * 2^n` component, saturating on overflow.
pub fn exponential_component(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);

    #[test]
    fn exponential_component_doubles() {
        assert_eq!(exponential_component(0, BASE), Duration::from_millis(500));
        assert_eq!(exponential_component(1, BASE), Duration::from_millis(1000));
        assert_eq!(exponential_component(2, BASE), Duration::from_millis(2000));
        assert_eq!(exponential_component(3, BASE), Duration::from_millis(4000));
    }

    #[test]
    fn unjittered_component_is_monotone() {
        let mut previous = Duration::ZERO;
        for attempt in 0..16 {
            let current = exponential_component(attempt, BASE);
            assert!(current >= previous, "attempt {attempt}");
            previous = current;
        }
    }

    #[test]
    fn even_attempts_add_half_jitter() {
        // n=0: exp=500, jitter=50, delay = 500 + 25
        assert_eq!(backoff_delay(0, BASE), Duration::from_millis(525));
        // n=2: exp=2000, jitter=200, delay = 2000 + 100
        assert_eq!(backoff_delay(2, BASE), Duration::from_millis(2100));
    }

    #[test]
    fn odd_attempts_subtract_half_jitter() {
        // n=1: exp=1000, jitter=100, delay = 1000 - 50
        assert_eq!(backoff_delay(1, BASE), Duration::from_millis(950));
        // n=3: exp=4000, jitter=400, delay = 4000 - 200
        assert_eq!(backoff_delay(3, BASE), Duration::from_millis(3800));
    }

    #[test]
    fn zero_base_floors_at_zero() {
        assert_eq!(backoff_delay(0, Duration::ZERO), Duration::ZERO);
        assert_eq!(backoff_delay(1, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn delay_is_deterministic() {
        assert_eq!(backoff_delay(5, BASE), backoff_delay(5, BASE));
    }
}
