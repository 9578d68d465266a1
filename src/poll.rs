//! Repeat a matching attempt until it succeeds, times out, or is cancelled.

use crate::candidate::MatchCandidate;
use crate::search::FindOptions;
use crate::trace::{trace_debug, trace_event, trace_span, trace_warn};
use crate::util::ScreenMatchResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared cancellation flag for [`PollLoop`].
///
/// Clones share the same flag; the loop checks it once per attempt.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous request so the flag can be reused.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Options for waiting on a template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaitOptions {
    pub timeout: Duration,
    /// Pause between attempts (shortened to the remaining time).
    pub interval: Duration,
    pub find: FindOptions,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(500),
            find: FindOptions::default(),
        }
    }
}

/// How a wait ended.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome {
    /// The first match of the first successful attempt.
    Found {
        candidate: MatchCandidate,
        attempts: usize,
        elapsed: Duration,
    },
    TimedOut { attempts: usize, elapsed: Duration },
    Cancelled { attempts: usize, elapsed: Duration },
}

impl WaitOutcome {
    pub fn candidate(&self) -> Option<&MatchCandidate> {
        match self {
            Self::Found { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Found { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Found { elapsed, .. }
            | Self::TimedOut { elapsed, .. }
            | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

/// Fixed-interval retry loop with a deadline.
#[derive(Clone, Copy, Debug)]
pub struct PollLoop {
    timeout: Duration,
    interval: Duration,
}

impl PollLoop {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_options(options: &WaitOptions) -> Self {
        Self::new(options.timeout, options.interval)
    }

    /// Runs `attempt` until it yields a candidate or time runs out.
    ///
    /// A failing attempt is logged and counted as a miss. The stop flag is
    /// checked before every attempt.
    pub fn run<F>(&self, stop: &StopFlag, mut attempt: F) -> WaitOutcome
    where
        F: FnMut() -> ScreenMatchResult<Option<MatchCandidate>>,
    {
        let _span = trace_span!(
            "poll",
            timeout_ms = self.timeout.as_millis() as u64,
            interval_ms = self.interval.as_millis() as u64
        )
        .entered();

        let start = Instant::now();
        let mut attempts = 0usize;
        loop {
            let elapsed = start.elapsed();
            if stop.is_stopped() {
                trace_event!("poll_cancelled", attempts = attempts);
                return WaitOutcome::Cancelled { attempts, elapsed };
            }
            if elapsed >= self.timeout {
                trace_event!("poll_timed_out", attempts = attempts);
                return WaitOutcome::TimedOut { attempts, elapsed };
            }

            attempts += 1;
            match attempt() {
                Ok(Some(candidate)) => {
                    trace_event!("poll_found", attempts = attempts);
                    return WaitOutcome::Found {
                        candidate,
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                Ok(None) => {
                    trace_debug!("poll_miss", attempt = attempts);
                }
                Err(err) => {
                    trace_warn!(
                        "poll_attempt_failed",
                        attempt = attempts,
                        error = err.to_string().as_str()
                    );
                }
            }

            let remaining = self.timeout.saturating_sub(start.elapsed());
            thread::sleep(self.interval.min(remaining));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PollLoop, StopFlag, WaitOutcome};
    use crate::candidate::MatchCandidate;
    use crate::frame::Rect;
    use crate::util::ScreenMatchError;
    use std::time::Duration;

    fn hit() -> MatchCandidate {
        MatchCandidate::new(Rect::new(1, 1, 2, 2).unwrap(), 0.9, 1.0)
    }

    #[test]
    fn returns_first_success() {
        let mut calls = 0;
        let outcome = PollLoop::new(Duration::from_secs(2), Duration::from_millis(1)).run(
            &StopFlag::new(),
            || {
                calls += 1;
                Ok((calls == 3).then(hit))
            },
        );
        assert_eq!(outcome.candidate(), Some(&hit()));
        assert_eq!(outcome.attempts(), 3);
    }

    #[test]
    fn failures_count_as_misses() {
        let mut calls = 0;
        let outcome = PollLoop::new(Duration::from_secs(2), Duration::from_millis(1)).run(
            &StopFlag::new(),
            || {
                calls += 1;
                if calls < 3 {
                    Err(ScreenMatchError::capture("display busy"))
                } else {
                    Ok(Some(hit()))
                }
            },
        );
        assert!(matches!(outcome, WaitOutcome::Found { attempts: 3, .. }));
    }

    #[test]
    fn stop_flag_cancels_before_next_attempt() {
        let stop = StopFlag::new();
        let outcome = PollLoop::new(Duration::from_secs(5), Duration::from_millis(1)).run(
            &stop,
            || {
                stop.stop();
                Ok(None)
            },
        );
        assert!(matches!(outcome, WaitOutcome::Cancelled { attempts: 1, .. }));
    }

    #[test]
    fn zero_timeout_makes_no_attempt() {
        let outcome = PollLoop::new(Duration::ZERO, Duration::from_millis(10))
            .run(&StopFlag::new(), || Ok(Some(hit())));
        assert!(matches!(outcome, WaitOutcome::TimedOut { attempts: 0, .. }));
    }
}
