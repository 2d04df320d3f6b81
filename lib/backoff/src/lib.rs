use std::time::Duration;

use rand::Rng;

/// A retry delay strategy driven by exponential back-off.
///
/// The delay starts at a base duration and doubles on every call to
/// [`next`][ExponentialBackoff::next], saturating at an optional maximum.
/// An optional jitter ratio spreads each returned delay by up to that
/// fraction in either direction, so concurrent retriers do not resend in
/// lockstep.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: u64,
    current: u64,
    max_delay: Option<Duration>,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Constructs a new exponential back-off strategy, given a base
    /// duration in milliseconds.
    pub const fn from_millis(base: u64) -> ExponentialBackoff {
        ExponentialBackoff {
            base,
            current: base,
            max_delay: None,
            jitter: 0.0,
        }
    }

    pub const fn from_secs(base: u64) -> ExponentialBackoff {
        Self::from_millis(base * 1000)
    }

    /// Apply a maximum delay. No retry delay will be longer than this
    /// `Duration`.
    pub const fn max_delay(mut self, duration: Duration) -> ExponentialBackoff {
        self.max_delay = Some(duration);
        self
    }

    /// Spread every returned delay by up to `ratio` in either direction,
    /// e.g. `0.2` yields delays within ±20% of the undithered value.
    pub fn jitter(mut self, ratio: f64) -> ExponentialBackoff {
        assert!((0.0..1.0).contains(&ratio), "jitter ratio must be in [0, 1)");

        self.jitter = ratio;
        self
    }

    /// The next `Duration` to wait for.
    pub fn next(&mut self) -> Duration {
        let mut delay = Duration::from_millis(self.current);

        if let Some(max_delay) = self.max_delay {
            if delay > max_delay {
                delay = max_delay;
            }
        }

        self.current = self.current.saturating_mul(2);

        self.jittered(delay)
    }

    pub fn reset(&mut self) {
        self.current = self.base
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter == 0.0 {
            return delay;
        }

        let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        delay.mul_f64(1.0 + spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base() {
        let mut s = ExponentialBackoff::from_millis(10);

        assert_eq!(s.next(), Duration::from_millis(10));
        assert_eq!(s.next(), Duration::from_millis(20));
        assert_eq!(s.next(), Duration::from_millis(40));
        assert_eq!(s.next(), Duration::from_millis(80));
    }

    #[test]
    fn from_secs() {
        let mut s = ExponentialBackoff::from_secs(1);

        assert_eq!(s.next(), Duration::from_secs(1));
        assert_eq!(s.next(), Duration::from_secs(2));
    }

    #[test]
    fn saturates_at_maximum_value() {
        let mut s = ExponentialBackoff::from_millis(u64::MAX - 1);

        assert_eq!(s.next(), Duration::from_millis(u64::MAX - 1));
        assert_eq!(s.next(), Duration::from_millis(u64::MAX));
        assert_eq!(s.next(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn stops_increasing_at_max_delay() {
        let mut s = ExponentialBackoff::from_millis(10).max_delay(Duration::from_millis(20));

        assert_eq!(s.next(), Duration::from_millis(10));
        assert_eq!(s.next(), Duration::from_millis(20));
        assert_eq!(s.next(), Duration::from_millis(20));
    }

    #[test]
    fn returns_max_when_max_less_than_base() {
        let mut s = ExponentialBackoff::from_millis(40).max_delay(Duration::from_millis(10));

        assert_eq!(s.next(), Duration::from_millis(10));
        assert_eq!(s.next(), Duration::from_millis(10));
    }

    #[test]
    fn reset() {
        let mut s = ExponentialBackoff::from_millis(10);
        assert_eq!(s.next(), Duration::from_millis(10));
        assert_eq!(s.next(), Duration::from_millis(20));

        s.reset();
        assert_eq!(s.next(), Duration::from_millis(10));
    }

    #[test]
    fn jitter_stays_within_ratio() {
        for _ in 0..1000 {
            let mut s = ExponentialBackoff::from_millis(1000).jitter(0.2);

            let delay = s.next();
            assert!(delay >= Duration::from_millis(800), "{delay:?}");
            assert!(delay <= Duration::from_millis(1200), "{delay:?}");
        }
    }

    #[test]
    #[should_panic]
    fn jitter_ratio_out_of_range() {
        let _ = ExponentialBackoff::from_millis(10).jitter(1.0);
    }
}
