use std::time::{Duration, Instant};
use thiserror::Error;

pub const MIN_TIMER_MINUTES: u32 = 1;
pub const MAX_TIMER_MINUTES: u32 = 180;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("timer duration must be between {MIN_TIMER_MINUTES} and {MAX_TIMER_MINUTES} minutes (got {0})")]
pub struct InvalidTimerDuration(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimerDuration(u32);

impl TimerDuration {
    pub fn from_minutes(minutes: u32) -> Result<Self, InvalidTimerDuration> {
        if (MIN_TIMER_MINUTES..=MAX_TIMER_MINUTES).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(InvalidTimerDuration(minutes))
        }
    }

    /// Clamps into range instead of failing.
    pub fn saturating(minutes: u32) -> Self {
        Self(minutes.clamp(MIN_TIMER_MINUTES, MAX_TIMER_MINUTES))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TimerState {
    Ready,
    Running { expires_at: Instant },
    Paused { remaining: Duration },
    Finished,
}

/// Emitted exactly once per timer, either on natural expiry or early completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimerCompletion {
    pub credited_minutes: u32,
    pub early: bool,
}

/// A countdown driven by caller-supplied instants so it can be stepped
/// deterministically.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PomodoroTimer {
    duration: TimerDuration,
    state: TimerState,
}

impl PomodoroTimer {
    pub fn new(duration: TimerDuration) -> Self {
        Self {
            duration,
            state: TimerState::Ready,
        }
    }

    pub fn duration(&self) -> TimerDuration {
        self.duration
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, TimerState::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimerState::Paused { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, TimerState::Finished)
    }

    pub fn start(&mut self, now: Instant) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.state = TimerState::Running {
            expires_at: now + self.duration.as_duration(),
        };
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        let TimerState::Running { expires_at } = self.state else {
            return false;
        };
        self.state = TimerState::Paused {
            remaining: expires_at.saturating_duration_since(now),
        };
        true
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        let TimerState::Paused { remaining } = self.state else {
            return false;
        };
        self.state = TimerState::Running {
            expires_at: now + remaining,
        };
        true
    }

    /// Start, pause or resume depending on the current state.
    pub fn toggle(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Ready => self.start(now),
            TimerState::Running { .. } => self.pause(now),
            TimerState::Paused { .. } => self.resume(now),
            TimerState::Finished => false,
        }
    }

    /// Back to the full duration, running.
    pub fn restart(&mut self, now: Instant) {
        self.state = TimerState::Running {
            expires_at: now + self.duration.as_duration(),
        };
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.state {
            TimerState::Ready => self.duration.as_duration(),
            TimerState::Running { expires_at } => expires_at.saturating_duration_since(now),
            TimerState::Paused { remaining } => remaining,
            TimerState::Finished => Duration::ZERO,
        }
    }

    /// Whole minutes and seconds left, rounding partial seconds up.
    pub fn display(&self, now: Instant) -> (u64, u64) {
        let remaining = self.remaining(now);
        let mut secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs += 1;
        }
        (secs / 60, secs % 60)
    }

    pub fn display_text(&self, now: Instant) -> String {
        let (minutes, seconds) = self.display(now);
        format!("{minutes:02}:{seconds:02}")
    }

    /// Fraction of the duration still remaining, in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        let total = self.duration.as_duration().as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (self.remaining(now).as_secs_f64() / total).clamp(0.0, 1.0)
    }

    pub fn tick(&mut self, now: Instant) -> Option<TimerCompletion> {
        let TimerState::Running { expires_at } = self.state else {
            return None;
        };
        if now < expires_at {
            return None;
        }
        self.state = TimerState::Finished;
        Some(TimerCompletion {
            credited_minutes: self.duration.minutes(),
            early: false,
        })
    }

    /// Ends the session now. The full configured duration is credited.
    pub fn complete_early(&mut self) -> Option<TimerCompletion> {
        if self.is_finished() {
            return None;
        }
        self.state = TimerState::Finished;
        Some(TimerCompletion {
            credited_minutes: self.duration.minutes(),
            early: true,
        })
    }
}
