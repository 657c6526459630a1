use std::time::Duration;

use chrono::{DateTime, Utc};

/// Remaining seconds at which a one-shot warning is raised.
pub const WARNING_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Engine-owned countdown from the task duration (practice).
    Local,
    /// Display ticker seeded from the server's section time (official exam).
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Warning,
    ReachedZero,
}

/// Emitted at most once per event kind per seed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSignal {
    pub kind: ClockKind,
    pub event: ClockEvent,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    generation: u64,
    fired: bool,
    warned: bool,
}

impl Countdown {
    fn new(secs: u64, generation: u64) -> Self {
        Self {
            remaining: secs,
            generation,
            fired: false,
            warned: secs <= WARNING_SECS,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    fn tick(&mut self) -> Option<ClockEvent> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if self.fired {
                return None;
            }
            self.fired = true;
            return Some(ClockEvent::ReachedZero);
        }
        if self.remaining <= WARNING_SECS && !self.warned {
            self.warned = true;
            return Some(ClockEvent::Warning);
        }
        None
    }
}

/// The one live clock of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerSource {
    /// Untimed practice.
    Untimed,
    LocalCountdown(Countdown),
    /// `None` until the first status snapshot arrives.
    ServerSeeded(Option<Countdown>),
}

impl TimerSource {
    pub fn local(secs: u64) -> Self {
        TimerSource::LocalCountdown(Countdown::new(secs, 1))
    }

    pub fn server() -> Self {
        TimerSource::ServerSeeded(None)
    }

    pub fn kind(&self) -> Option<ClockKind> {
        match self {
            TimerSource::Untimed => None,
            TimerSource::LocalCountdown(_) => Some(ClockKind::Local),
            TimerSource::ServerSeeded(_) => Some(ClockKind::Server),
        }
    }

    pub fn remaining(&self) -> Option<u64> {
        match self {
            TimerSource::Untimed | TimerSource::ServerSeeded(None) => None,
            TimerSource::LocalCountdown(c) | TimerSource::ServerSeeded(Some(c)) => {
                Some(c.remaining())
            }
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            TimerSource::LocalCountdown(c) | TimerSource::ServerSeeded(Some(c)) => c.generation(),
            _ => 0,
        }
    }

    /// Starts a new generation from a server snapshot (new section).
    pub fn reseed(&mut self, secs: u64) {
        if let TimerSource::ServerSeeded(slot) = self {
            let next = slot.as_ref().map_or(1, |c| c.generation + 1);
            *slot = Some(Countdown::new(secs, next));
        }
    }

    /// Corrects drift within the same section. A generation that already
    /// reached zero stays fired.
    pub fn resync(&mut self, secs: u64) {
        match self {
            TimerSource::ServerSeeded(Some(c)) => {
                c.remaining = secs;
                if secs > WARNING_SECS {
                    c.warned = false;
                }
            }
            TimerSource::ServerSeeded(None) => self.reseed(secs),
            _ => {}
        }
    }

    /// One-second step.
    pub fn tick(&mut self) -> Option<ClockSignal> {
        let (kind, countdown) = match self {
            TimerSource::LocalCountdown(c) => (ClockKind::Local, c),
            TimerSource::ServerSeeded(Some(c)) => (ClockKind::Server, c),
            _ => return None,
        };
        countdown.tick().map(|event| ClockSignal {
            kind,
            event,
            generation: countdown.generation,
        })
    }
}

/// Task deadline, computed once at mount and fired once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineWatch {
    deadline: Option<DateTime<Utc>>,
    fired: bool,
}

impl DeadlineWatch {
    pub fn new(deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            deadline,
            fired: false,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Delay until the deadline; zero when it has already passed.
    pub fn delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let deadline = self.deadline?;
        Some((deadline - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// True exactly once, and only once the deadline has passed.
    pub fn fire(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if !self.fired && now >= deadline => {
                self.fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_edge_fires_once_per_generation() {
        let mut clock = TimerSource::server();
        assert_eq!(clock.tick(), None);

        clock.reseed(2);
        assert_eq!(clock.tick(), None);
        let edge = clock.tick().unwrap();
        assert_eq!(edge.event, ClockEvent::ReachedZero);
        assert_eq!(edge.generation, 1);
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.tick(), None);

        // Same section poll reporting zero again must not re-arm.
        clock.resync(0);
        assert_eq!(clock.tick(), None);

        clock.reseed(1);
        let edge = clock.tick().unwrap();
        assert_eq!(edge.generation, 2);
    }

    #[test]
    fn warning_raised_when_crossing_threshold() {
        let mut clock = TimerSource::local(WARNING_SECS + 1);
        let signal = clock.tick().unwrap();
        assert_eq!(signal.kind, ClockKind::Local);
        assert_eq!(signal.event, ClockEvent::Warning);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(3725), "1:02:05");
    }
}
