use crate::config::CHECKPOINT_POLL_MS;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Program clock that stands still while the simulator is paused
#[derive(Debug, Clone)]
pub struct SimClock {
    start: Instant,
    total_ms: i64, // Time banked before the last resume
    running: bool,
}

impl SimClock {
    pub fn new() -> Self {
        SimClock {
            start: Instant::now(),
            total_ms: 0,
            running: true,
        }
    }

    pub fn now_ms(&self) -> i64 {
        if self.running {
            self.total_ms + self.start.elapsed().as_millis() as i64
        } else {
            self.total_ms
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.total_ms = self.now_ms();
            self.running = false;
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            self.start = Instant::now();
            self.running = true;
        }
    }

    /// Back to zero, keeping the running state
    pub fn reset(&mut self) {
        self.total_ms = 0;
        self.start = Instant::now();
    }
}

impl Default for SimClock {
    fn default() -> Self {
        SimClock::new()
    }
}

/// Pause flag shared by every program thread, tied to the program clock
#[derive(Debug, Default)]
pub struct Timing {
    paused: AtomicBool,
    clock: Mutex<SimClock>,
}

impl Timing {
    pub fn new() -> Self {
        Timing::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        let mut clock = self.clock.lock();
        clock.stop();
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        let mut clock = self.clock.lock();
        clock.start();
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.lock().now_ms()
    }

    /// Restarts program time at zero
    pub fn restart(&self) {
        self.clock.lock().reset();
    }

    /// Blocks while paused. Returns false as soon as `cancelled` reports true.
    pub fn wait_while_paused(&self, cancelled: impl Fn() -> bool) -> bool {
        while self.is_paused() {
            if cancelled() {
                return false;
            }
            thread::sleep(Duration::from_millis(CHECKPOINT_POLL_MS));
        }
        !cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_when_running() {
        let clock = SimClock::new();
        thread::sleep(Duration::from_millis(20));
        assert!(clock.now_ms() >= 20);
    }

    #[test]
    fn test_pause_freezes_time() {
        let timing = Timing::new();
        thread::sleep(Duration::from_millis(15));
        timing.pause();
        let before = timing.now_ms();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(timing.now_ms(), before);
        timing.resume();
        let after = timing.now_ms();
        assert!(after - before <= 1, "clock jumped from {} to {}", before, after);
    }

    #[test]
    fn test_restart_zeroes_clock() {
        let timing = Timing::new();
        thread::sleep(Duration::from_millis(10));
        timing.restart();
        assert!(timing.now_ms() < 5);
    }

    #[test]
    fn test_wait_while_paused_honours_cancel() {
        let timing = Timing::new();
        assert!(timing.wait_while_paused(|| false));
        timing.pause();
        assert!(!timing.wait_while_paused(|| true));
    }
}
