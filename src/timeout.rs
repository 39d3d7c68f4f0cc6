//! Deadline polling for readiness flags
//!
//! Each blocking call captures its own deadline on entry; nothing is shared
//! between calls. Polling is a busy loop without backoff since every
//! iteration already costs a bus round-trip.

use std::time::{Duration, Instant};

/// Wall-clock deadline captured once per blocking call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    expires: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Deadline {
            started,
            expires: started + timeout,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Outcome of a poll loop that did not hit a bus error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    Ready,
    TimedOut,
}

/// Poll `ready` until it reports true or `timeout` elapses.
///
/// The condition is always checked at least once, so a ready flag is seen
/// even with a zero timeout. Errors from the condition end the loop.
pub fn poll_until<F, E>(timeout: Duration, mut ready: F) -> Result<PollResult, E>
where
    F: FnMut() -> Result<bool, E>,
{
    let deadline = Deadline::after(timeout);
    let mut polls: u32 = 0;

    loop {
        polls = polls.wrapping_add(1);
        if ready()? {
            return Ok(PollResult::Ready);
        }
        if deadline.is_expired() {
            log::trace!("poll timed out after {} polls ({:?})", polls, deadline.elapsed());
            return Ok(PollResult::TimedOut);
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_ready_immediately() {
        let result: Result<_, ()> = poll_until(Duration::ZERO, || Ok(true));
        assert_eq!(result, Ok(PollResult::Ready));
    }

    #[test]
    fn test_poll_ready_after_some_attempts() {
        let mut counter = 0;
        let result: Result<_, ()> = poll_until(Duration::from_secs(5), || {
            counter += 1;
            Ok(counter >= 5)
        });
        assert_eq!(result, Ok(PollResult::Ready));
        assert_eq!(counter, 5);
    }

    #[test]
    fn test_poll_times_out() {
        let timeout = Duration::from_millis(30);
        let start = Instant::now();
        let result: Result<_, ()> = poll_until(timeout, || Ok(false));
        let elapsed = start.elapsed();

        assert_eq!(result, Ok(PollResult::TimedOut));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(500));
    }

    #[test]
    fn test_poll_error_stops_loop() {
        let mut counter = 0;
        let result = poll_until(Duration::from_secs(5), || {
            counter += 1;
            if counter == 3 {
                Err("bus")
            } else {
                Ok(false)
            }
        });
        assert_eq!(result, Err("bus"));
        assert_eq!(counter, 3);
    }

    #[test]
    fn test_deadline_expiry() {
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1));
        assert!(deadline.is_expired());
        assert!(!Deadline::after(Duration::from_secs(60)).is_expired());
    }
}
