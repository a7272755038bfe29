//! MME NAS Timer Management
//!
//! This module implements the network-side retransmission timers used by the
//! EMM common procedures (3GPP TS 24.301 Table 10.2.1).
//!
//! Each EMM context owns one timer instance per procedure type. A timer is
//! either inactive or armed with exactly one pending expiry; expiry is
//! detected by a periodic `perform_tick` call on the owning event loop, so
//! expiry handling is always serialized with the other NAS events for the
//! same UE.

use std::fmt;
use std::time::{Duration, Instant};

/// Timer code for T3470 (identification retransmission)
pub const TIMER_T3470: u16 = 3470;
/// Timer code for T3460 (authentication retransmission)
pub const TIMER_T3460: u16 = 3460;
/// Timer code for T3450 (attach/TAU accept retransmission)
pub const TIMER_T3450: u16 = 3450;

/// Default T3470 interval: 6 seconds
pub const DEFAULT_T3470_INTERVAL: u32 = 6;

/// One-shot EMM retransmission timer.
///
/// Inactive until started; `start` arms it with its configured interval and
/// `restart` re-arms an already-active timer for the same interval (used on
/// retransmission, so a resend never leaves a stale deadline). `stop` is
/// idempotent. The armed/inactive state stands in for the timer-handle
/// sentinel used by handle-based timer services.
#[derive(Debug)]
pub struct EmmTimer {
    /// Timer code (e.g., 3470 for T3470)
    code: u16,
    /// Timer interval in seconds
    interval_secs: u32,
    /// When the timer was armed
    start_time: Option<Instant>,
    /// Whether the timer is currently armed
    is_running: bool,
}

impl EmmTimer {
    /// Creates a new, inactive timer.
    pub fn new(code: u16, interval_secs: u32) -> Self {
        Self {
            code,
            interval_secs,
            start_time: None,
            is_running: false,
        }
    }

    /// Arms the timer with its configured interval.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.is_running = true;
    }

    /// Re-arms an active timer for the same interval.
    ///
    /// Equivalent to `start` when called on an inactive timer.
    pub fn restart(&mut self) {
        self.start();
    }

    /// Stops the timer. Safe to call on an already-inactive timer.
    pub fn stop(&mut self) {
        self.start_time = None;
        self.is_running = false;
    }

    /// Returns true if the timer is armed.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Returns the timer code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the configured interval in seconds.
    pub fn interval(&self) -> u32 {
        self.interval_secs
    }

    /// Returns the remaining time in seconds, or 0 if inactive or expired.
    pub fn remaining(&self) -> u32 {
        if !self.is_running {
            return 0;
        }
        if let Some(start) = self.start_time {
            let elapsed_secs = start.elapsed().as_secs() as u32;
            if elapsed_secs >= self.interval_secs {
                return 0;
            }
            return self.interval_secs - elapsed_secs;
        }
        0
    }

    /// Checks for expiry and updates state.
    ///
    /// Returns `true` if the timer just expired on this tick; an expired
    /// timer transitions back to inactive (one-shot).
    pub fn perform_tick(&mut self) -> bool {
        if self.is_running {
            if let Some(start) = self.start_time {
                if start.elapsed() >= Duration::from_secs(u64::from(self.interval_secs)) {
                    self.stop();
                    return true;
                }
            }
        }
        false
    }
}

impl fmt::Display for EmmTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_running {
            write!(
                f,
                "T{}: rem[{}] int[{}]",
                self.code,
                self.remaining(),
                self.interval_secs
            )
        } else {
            write!(f, "T{}: .", self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer_creation() {
        let timer = EmmTimer::new(TIMER_T3470, DEFAULT_T3470_INTERVAL);
        assert_eq!(timer.code(), 3470);
        assert_eq!(timer.interval(), 6);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_timer_start_stop() {
        let mut timer = EmmTimer::new(TIMER_T3470, 10);

        timer.start();
        assert!(timer.is_running());
        assert!(timer.remaining() <= 10);

        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn test_stop_idempotent() {
        let mut timer = EmmTimer::new(TIMER_T3470, 10);
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_restart_keeps_timer_armed() {
        let mut timer = EmmTimer::new(TIMER_T3470, 10);
        timer.start();
        timer.restart();
        assert!(timer.is_running());
    }

    #[test]
    fn test_timer_expiry() {
        let mut timer = EmmTimer::new(TIMER_T3470, 1);

        timer.start();
        sleep(Duration::from_millis(1100));

        assert!(timer.perform_tick());
        // One-shot: expired timer goes back to inactive
        assert!(!timer.is_running());
        assert!(!timer.perform_tick());
    }

    #[test]
    fn test_timer_not_expired_before_interval() {
        let mut timer = EmmTimer::new(TIMER_T3470, 10);
        timer.start();

        assert!(!timer.perform_tick());
        assert!(timer.is_running());
    }

    #[test]
    fn test_timer_display() {
        let mut timer = EmmTimer::new(TIMER_T3470, 6);
        assert_eq!(format!("{timer}"), "T3470: .");

        timer.start();
        let display = format!("{timer}");
        assert!(display.starts_with("T3470: rem["));
        assert!(display.contains("] int[6]"));
    }
}
