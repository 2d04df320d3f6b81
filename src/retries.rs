use std::time::Duration;

use backoff::ExponentialBackoff;

use crate::transport::{ErrorClass, TransportError};

/// What to do about a failed batch send.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryAction {
    /// Resend the same batch after the delay.
    Retry(Duration),
    /// The error class is permanent; resending cannot help.
    DontRetry,
    /// The attempt budget is spent.
    Exhausted,
}

/// Per-batch retry state.
///
/// One policy drives one batch's attempt sequence: it is built fresh when
/// the batch enters sending and discarded once the batch is delivered or
/// permanently failed. Consulted after each failed attempt.
#[derive(Debug)]
pub struct FixedRetryPolicy {
    remaining_attempts: usize,
    backoff: ExponentialBackoff,
}

impl FixedRetryPolicy {
    /// `max_attempts` counts every send attempt, the first one included,
    /// and must be at least 1.
    pub fn new(
        max_attempts: usize,
        initial_backoff: Duration,
        max_backoff: Duration,
        jitter: f64,
    ) -> Self {
        debug_assert!(max_attempts > 0);

        FixedRetryPolicy {
            remaining_attempts: max_attempts.saturating_sub(1),
            backoff: ExponentialBackoff::from_millis(initial_backoff.as_millis() as u64)
                .max_delay(max_backoff)
                .jitter(jitter),
        }
    }

    pub fn decide(&mut self, error: &TransportError) -> RetryAction {
        match error.class() {
            ErrorClass::Permanent => RetryAction::DontRetry,
            ErrorClass::Transient if self.remaining_attempts == 0 => RetryAction::Exhausted,
            ErrorClass::Transient => {
                self.remaining_attempts -= 1;
                RetryAction::Retry(self.backoff.next())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> TransportError {
        TransportError::Transient("connection timed out".into())
    }

    #[test]
    fn transient_errors_back_off_exponentially() {
        let mut policy = FixedRetryPolicy::new(
            4,
            Duration::from_secs(1),
            Duration::from_secs(3600),
            0.0,
        );

        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(4))
        );
        assert_eq!(policy.decide(&transient()), RetryAction::Exhausted);
    }

    #[test]
    fn delays_are_capped() {
        let mut policy =
            FixedRetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(2), 0.0);

        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(&transient()),
            RetryAction::Retry(Duration::from_secs(2))
        );
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut policy = FixedRetryPolicy::new(
            5,
            Duration::from_secs(1),
            Duration::from_secs(3600),
            0.0,
        );

        let err = TransportError::Permanent("authentication failed".into());
        assert_eq!(policy.decide(&err), RetryAction::DontRetry);

        // the budget is untouched, a later transient error may still retry
        assert!(matches!(
            policy.decide(&transient()),
            RetryAction::Retry(_)
        ));
    }

    #[test]
    fn single_attempt_budget_never_retries() {
        let mut policy = FixedRetryPolicy::new(
            1,
            Duration::from_secs(1),
            Duration::from_secs(3600),
            0.0,
        );

        assert_eq!(policy.decide(&transient()), RetryAction::Exhausted);
    }
}
