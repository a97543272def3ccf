// Game clock with pause/resume
// Every call takes the current instant so behaviour is reproducible in tests

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,    // Waiting for the first reveal
    Running,
    Paused,
    Stopped, // Game ended, elapsed time frozen
}

#[derive(Debug, Clone)]
pub struct Timer {
    state: TimerState,
    banked: Duration,              // Time accumulated before the current run
    running_since: Option<Instant>, // Set only while Running
}

impl Default for Timer {
    fn default() -> Self {
        Timer {
            state: TimerState::Idle,
            banked: Duration::ZERO,
            running_since: None,
        }
    }
}

impl Timer {
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Start counting; ignored unless Idle
    pub fn start(&mut self, now: Instant) {
        if self.state == TimerState::Idle {
            self.state = TimerState::Running;
            self.running_since = Some(now);
        }
    }

    /// Running <-> Paused. Returns the new state, or None if the clock can't be toggled
    pub fn toggle(&mut self, now: Instant) -> Option<TimerState> {
        match self.state {
            TimerState::Running => {
                self.bank(now);
                self.state = TimerState::Paused;
            }
            TimerState::Paused => {
                self.running_since = Some(now);
                self.state = TimerState::Running;
            }
            TimerState::Idle | TimerState::Stopped => return None,
        }
        Some(self.state)
    }

    /// Freeze the elapsed time for good
    pub fn stop(&mut self, now: Instant) {
        if self.state == TimerState::Running {
            self.bank(now);
        }
        self.state = TimerState::Stopped;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(t0) => self.banked + now.saturating_duration_since(t0),
            None => self.banked,
        }
    }

    fn bank(&mut self, now: Instant) {
        if let Some(t0) = self.running_since.take() {
            self.banked += now.saturating_duration_since(t0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn idle_timer_reads_zero() {
        let t0 = Instant::now();
        let mut timer = Timer::default();

        assert_eq!(timer.elapsed(t0 + secs(30)), Duration::ZERO);
        assert_eq!(timer.toggle(t0), None);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn paused_interval_is_not_counted() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);

        assert_eq!(timer.toggle(t0 + secs(10)), Some(TimerState::Paused));
        assert_eq!(timer.elapsed(t0 + secs(500)), secs(10));
        assert_eq!(timer.toggle(t0 + secs(600)), Some(TimerState::Running));
        assert_eq!(timer.elapsed(t0 + secs(605)), secs(15));
    }

    #[test]
    fn repeated_pauses_accumulate_only_running_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);

        timer.toggle(t0 + secs(2));
        timer.toggle(t0 + secs(5));
        timer.toggle(t0 + secs(9));
        timer.toggle(t0 + secs(20));

        assert_eq!(timer.elapsed(t0 + secs(21)), secs(7));
    }

    #[test]
    fn stop_freezes_elapsed_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);

        timer.stop(t0 + secs(42));

        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.elapsed(t0 + secs(1000)), secs(42));
        assert_eq!(timer.toggle(t0 + secs(1000)), None);
    }

    #[test]
    fn stop_while_paused_keeps_banked_time() {
        let t0 = Instant::now();
        let mut timer = Timer::default();
        timer.start(t0);
        timer.toggle(t0 + secs(3));

        timer.stop(t0 + secs(50));

        assert_eq!(timer.elapsed(t0 + secs(60)), secs(3));
    }
}
