//! # Fibonacci Backoff
//!
//! Delay before retrying a `SIPCluster` whose scheduling attempt errored.
//! Delays follow the Fibonacci sequence in whole minutes, starting at the
//! configured floor and capped at the ceiling. With the defaults this is
//! 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...

use std::time::Duration;

/// Fibonacci backoff state for one resource
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    max_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_minutes` and capped at `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            max_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next = (self.prev_minutes + self.current_minutes).min(self.max_minutes);
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next;
        delay
    }

    /// Restart the sequence from the floor
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(backoff: &mut FibonacciBackoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_secs() / 60).collect()
    }

    #[test]
    fn test_default_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        assert_eq!(minutes(&mut backoff, 9), vec![1, 1, 2, 3, 5, 8, 10, 10, 10]);
    }

    #[test]
    fn test_custom_floor() {
        let mut backoff = FibonacciBackoff::new(2, 15);
        assert_eq!(minutes(&mut backoff, 6), vec![2, 2, 4, 6, 10, 15]);
    }

    #[test]
    fn test_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        minutes(&mut backoff, 5);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(120));
    }
}
