//! Bounded retry as an explicit state machine.
//!
//! ```text
//!            Succeeded            TimedOut (n < max)
//!  ┌─────────────────── Attempting(n) ──────────────► RetryWait(n+1)
//!  ▼                      │  ▲                            │
//! Succeeded     Errored,  │  └────── WaitElapsed ─────────┘
//!               TimedOut  │
//!               (n = max) ▼
//!                       Failed
//! ```
//!
//! [`RetryPolicy::transition`] is pure; [`run_with_retry`] drives it with a
//! caller-supplied attempt function and sleep, so tests never wait on a clock.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Running attempt `n` (1-based).
    Attempting(u32),
    /// Sleeping before attempt `n`.
    RetryWait(u32),
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    Succeeded,
    /// Transient failure; the only outcome that earns another attempt.
    TimedOut,
    /// Any other failure.
    Errored,
    WaitElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// `None` when `max_attempts` is zero: at least one attempt is always made.
    pub fn new(max_attempts: u32, interval: Duration) -> Option<Self> {
        (max_attempts >= 1).then_some(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Next state after `event` in `state`. Events that do not apply to a state
    /// leave it unchanged; terminal states absorb everything.
    pub fn transition(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (RetryState::Attempting(_), RetryEvent::Succeeded) => RetryState::Succeeded,
            (RetryState::Attempting(n), RetryEvent::TimedOut) if n < self.max_attempts => {
                RetryState::RetryWait(n + 1)
            }
            (RetryState::Attempting(_), RetryEvent::TimedOut | RetryEvent::Errored) => {
                RetryState::Failed
            }
            (RetryState::RetryWait(n), RetryEvent::WaitElapsed) => RetryState::Attempting(n),
            (other, _) => other,
        }
    }
}

/// Errors that know whether they are worth retrying.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Run `attempt` under `policy`, sleeping with `sleep` between attempts.
///
/// `attempt` receives the 1-based attempt number. The last attempt's outcome
/// is returned whatever its error class.
pub fn run_with_retry<T, E, A, S>(policy: &RetryPolicy, mut sleep: S, mut attempt: A) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    A: FnMut(u32) -> Result<T, E>,
    S: FnMut(Duration),
{
    let mut state = RetryState::Attempting(1);
    loop {
        let RetryState::Attempting(n) = state else {
            unreachable!("driver only runs attempts in the Attempting state");
        };

        let err = match attempt(n) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let event = if err.is_transient() {
            RetryEvent::TimedOut
        } else {
            RetryEvent::Errored
        };

        state = policy.transition(state, event);
        match state {
            RetryState::RetryWait(next) => {
                tracing::debug!(
                    "attempt {n}/{} timed out ({err}); retrying in {:?}",
                    policy.max_attempts,
                    policy.interval
                );
                sleep(policy.interval);
                state = policy.transition(RetryState::RetryWait(next), RetryEvent::WaitElapsed);
            }
            _ => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    enum TestError {
        Timeout,
        Refused,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Timeout)
        }
    }

    fn policy(max: u32) -> RetryPolicy {
        RetryPolicy::new(max, Duration::from_secs(3)).unwrap()
    }

    // =========================================================================
    // transition tests
    // =========================================================================

    #[test]
    fn zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::ZERO).is_none());
    }

    #[test]
    fn success_is_terminal() {
        let p = policy(3);
        let s = p.transition(RetryState::Attempting(1), RetryEvent::Succeeded);
        assert_eq!(s, RetryState::Succeeded);
        assert_eq!(p.transition(s, RetryEvent::TimedOut), RetryState::Succeeded);
    }

    #[test]
    fn timeout_before_last_attempt_waits() {
        let p = policy(3);
        assert_eq!(
            p.transition(RetryState::Attempting(2), RetryEvent::TimedOut),
            RetryState::RetryWait(3)
        );
        assert_eq!(
            p.transition(RetryState::RetryWait(3), RetryEvent::WaitElapsed),
            RetryState::Attempting(3)
        );
    }

    #[test]
    fn timeout_on_last_attempt_fails() {
        let p = policy(3);
        assert_eq!(
            p.transition(RetryState::Attempting(3), RetryEvent::TimedOut),
            RetryState::Failed
        );
    }

    #[test]
    fn other_error_fails_immediately() {
        let p = policy(5);
        assert_eq!(
            p.transition(RetryState::Attempting(1), RetryEvent::Errored),
            RetryState::Failed
        );
    }

    #[test]
    fn failed_absorbs_events() {
        let p = policy(2);
        assert_eq!(
            p.transition(RetryState::Failed, RetryEvent::WaitElapsed),
            RetryState::Failed
        );
    }

    // =========================================================================
    // driver tests
    // =========================================================================

    #[test]
    fn succeeds_after_k_timeouts() {
        for k in 0..4 {
            let calls = Cell::new(0);
            let sleeps = Cell::new(0);
            let result: Result<&str, TestError> = run_with_retry(
                &policy(4),
                |_| sleeps.set(sleeps.get() + 1),
                |n| {
                    calls.set(calls.get() + 1);
                    if n <= k { Err(TestError::Timeout) } else { Ok("image") }
                },
            );
            assert_eq!(result.unwrap(), "image");
            assert_eq!(calls.get(), k + 1);
            assert_eq!(sleeps.get(), k);
        }
    }

    #[test]
    fn non_timeout_error_makes_exactly_one_call() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = run_with_retry(
            &policy(5),
            |_| panic!("must not sleep"),
            |_| {
                calls.set(calls.get() + 1);
                Err(TestError::Refused)
            },
        );
        assert!(matches!(result, Err(TestError::Refused)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhausted_timeouts_return_last_error() {
        let calls = Cell::new(0);
        let result: Result<(), TestError> = run_with_retry(
            &policy(2),
            |d| assert_eq!(d, Duration::from_secs(3)),
            |_| {
                calls.set(calls.get() + 1);
                Err(TestError::Timeout)
            },
        );
        assert!(matches!(result, Err(TestError::Timeout)));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let result: Result<(), TestError> = run_with_retry(
            &policy(1),
            |_| panic!("must not sleep"),
            |_| Err(TestError::Timeout),
        );
        assert!(result.is_err());
    }
}
