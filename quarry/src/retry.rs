//! Retry strategies and backoff policies
//!
//! The client asks its [`Retrier`] what to do after every failed attempt.
//! Most retriers are a [`BackoffRetrier`] wrapping one of the backoff
//! policies below.

use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Outcome of asking a retrier about a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    RetryAfter(Duration),
}

/// Decides whether a failed request is attempted again
pub trait Retrier: Send + Sync {
    /// `retry` counts failed attempts so far, starting at 1
    fn retry(&self, retry: u32, err: &Error) -> RetryDecision;
}

/// Computes the wait before the next attempt; `None` means give up
pub trait Backoff: Send + Sync {
    fn next(&self, retry: u32) -> Option<Duration>;
}

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct StopRetrier;

impl Retrier for StopRetrier {
    fn retry(&self, _retry: u32, _err: &Error) -> RetryDecision {
        RetryDecision::Stop
    }
}

/// Retries for as long as its backoff yields a wait
#[derive(Debug, Clone)]
pub struct BackoffRetrier<B> {
    backoff: B,
}

impl<B: Backoff> BackoffRetrier<B> {
    pub fn new(backoff: B) -> Self {
        Self { backoff }
    }
}

impl<B: Backoff> Retrier for BackoffRetrier<B> {
    fn retry(&self, retry: u32, _err: &Error) -> RetryDecision {
        match self.backoff.next(retry) {
            Some(wait) => RetryDecision::RetryAfter(wait),
            None => RetryDecision::Stop,
        }
    }
}

/// Retrier equivalent to a fixed number of attempts about 100ms apart
pub fn max_retries(n: u32) -> std::sync::Arc<dyn Retrier> {
    if n == 0 {
        std::sync::Arc::new(StopRetrier)
    } else {
        let ticks = vec![100; n as usize];
        std::sync::Arc::new(BackoffRetrier::new(SimpleBackoff::new(ticks).with_jitter(true)))
    }
}

/// Retries immediately, forever
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroBackoff;

impl Backoff for ZeroBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct StopBackoff;

impl Backoff for StopBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        None
    }
}

/// Waits the same interval before every attempt
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Backoff for ConstantBackoff {
    fn next(&self, _retry: u32) -> Option<Duration> {
        Some(self.interval)
    }
}

/// Walks a fixed list of waits (in milliseconds), then gives up
#[derive(Debug, Clone)]
pub struct SimpleBackoff {
    ticks: Vec<u64>,
    jitter: bool,
}

impl SimpleBackoff {
    pub fn new(ticks: Vec<u64>) -> Self {
        Self { ticks, jitter: false }
    }

    /// Randomize each wait into `[t/2, t*1.5)`
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Backoff for SimpleBackoff {
    fn next(&self, retry: u32) -> Option<Duration> {
        let index = retry.checked_sub(1)? as usize;
        let ms = *self.ticks.get(index)?;
        let ms = if self.jitter { jitter(ms) } else { ms };
        Some(Duration::from_millis(ms))
    }
}

/// Doubles the wait on every attempt until it passes `max`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }
}

impl Backoff for ExponentialBackoff {
    fn next(&self, retry: u32) -> Option<Duration> {
        let exp = retry.saturating_sub(1).min(32);
        let base = (self.initial.as_millis() as u64).saturating_mul(1u64 << exp);
        let max = self.max.as_millis() as u64;
        if base > max {
            return None;
        }
        Some(Duration::from_millis(jitter(base).min(max)))
    }
}

fn jitter(ms: u64) -> u64 {
    if ms == 0 {
        return 0;
    }
    ms / 2 + rand::thread_rng().gen_range(0..ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err() -> Error {
        Error::NoClient("test".into())
    }

    #[test]
    fn test_stop_retrier() {
        assert_eq!(StopRetrier.retry(1, &err()), RetryDecision::Stop);
    }

    #[test]
    fn test_simple_backoff_exhausts() {
        let backoff = SimpleBackoff::new(vec![10, 20, 30]);
        assert_eq!(backoff.next(1), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next(2), Some(Duration::from_millis(20)));
        assert_eq!(backoff.next(3), Some(Duration::from_millis(30)));
        assert_eq!(backoff.next(4), None);
        assert_eq!(backoff.next(0), None);
    }

    #[test]
    fn test_simple_backoff_jitter_range() {
        let backoff = SimpleBackoff::new(vec![100; 50]).with_jitter(true);
        for retry in 1..=50 {
            let wait = backoff.next(retry).unwrap();
            assert!(wait >= Duration::from_millis(50));
            assert!(wait < Duration::from_millis(150));
        }
    }

    #[test]
    fn test_exponential_backoff_bounded() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(100));
        for retry in 1..=4 {
            let wait = backoff.next(retry).unwrap();
            assert!(wait <= Duration::from_millis(100));
        }
        // 10 * 2^4 = 160 > 100
        assert_eq!(backoff.next(5), None);
    }

    #[test]
    fn test_constant_and_zero_backoff() {
        let backoff = ConstantBackoff::new(Duration::from_millis(25));
        assert_eq!(backoff.next(1), Some(Duration::from_millis(25)));
        assert_eq!(backoff.next(100), Some(Duration::from_millis(25)));
        assert_eq!(ZeroBackoff.next(7), Some(Duration::ZERO));
        assert_eq!(StopBackoff.next(1), None);
    }

    #[test]
    fn test_max_retries() {
        let none = max_retries(0);
        assert_eq!(none.retry(1, &err()), RetryDecision::Stop);

        let three = max_retries(3);
        assert!(matches!(three.retry(1, &err()), RetryDecision::RetryAfter(_)));
        assert!(matches!(three.retry(3, &err()), RetryDecision::RetryAfter(_)));
        assert_eq!(three.retry(4, &err()), RetryDecision::Stop);
    }
}
