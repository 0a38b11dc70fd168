//! Countdown state machine
//!
//! Converts the timer state and the wall clock into a progress value in
//! [0, 1]: a spring fills the indicator when a countdown begins, a linear ramp
//! drains it over the configured duration, and a spring empties it on cancel.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::animation::{Spring, SpringMotion};

/// Timer states driven by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Stopped,
    Started,
    Paused,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Stopped => "stopped",
            TimerState::Started => "started",
            TimerState::Paused => "paused",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured countdown length in whole milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerDuration(u64);

impl TimerDuration {
    pub const ZERO: TimerDuration = TimerDuration(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn whole_seconds(&self) -> u64 {
        self.0 / 1000
    }

    pub const fn minutes(&self) -> u64 {
        self.whole_seconds() / 60
    }

    pub const fn seconds(&self) -> u64 {
        self.whole_seconds() % 60
    }

    /// Replace the minutes field, keeping seconds; negative clamps to zero
    pub fn with_minutes(&self, minutes: i64) -> Self {
        let minutes = minutes.max(0) as u64;
        Self::from_secs(minutes * 60 + self.seconds())
    }

    /// Replace the seconds field, keeping minutes; clamps to 0..=59
    pub fn with_seconds(&self, seconds: i64) -> Self {
        let seconds = seconds.clamp(0, 59) as u64;
        Self::from_secs(self.minutes() * 60 + seconds)
    }

    /// Portion of the duration still left at `progress`
    pub fn scaled(&self, progress: f32) -> Duration {
        self.as_duration()
            .mul_f64(f64::from(progress.clamp(0.0, 1.0)))
    }
}

impl From<Duration> for TimerDuration {
    fn from(duration: Duration) -> Self {
        Self(duration.as_millis().min(u128::from(u64::MAX)) as u64)
    }
}

/// Remaining time as `MM : SS`
pub fn format_remaining(progress: f32, duration: TimerDuration) -> String {
    let seconds = (progress * duration.whole_seconds() as f32).round().max(0.0) as u64;
    format!("{:02} : {:02}", seconds / 60, seconds % 60)
}

/// Notifications raised while ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// A running countdown reached zero on its own
    Expired,
}

/// Progress sample for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownFrame {
    pub progress: f32,
    pub event: Option<CountdownEvent>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Not moving
    Held(f32),
    /// Fill or drain; `then_decay` chains a linear decay once the spring settles
    Spring {
        motion: SpringMotion,
        started_at: Instant,
        then_decay: Option<TimerDuration>,
    },
    /// Linear ramp from `from` to zero
    Decay {
        from: f32,
        started_at: Instant,
        span: Duration,
    },
}

impl Phase {
    fn sample(&self, now: Instant) -> (f32, f32) {
        match *self {
            Phase::Held(value) => (value, 0.0),
            Phase::Spring {
                motion, started_at, ..
            } => motion.sample(now.saturating_duration_since(started_at)),
            Phase::Decay {
                from,
                started_at,
                span,
            } => {
                let elapsed = now.saturating_duration_since(started_at);
                if span.is_zero() || elapsed >= span {
                    return (0.0, 0.0);
                }
                let t = elapsed.as_secs_f64() / span.as_secs_f64();
                let value = (f64::from(from) * (1.0 - t)) as f32;
                let velocity = -(f64::from(from) / span.as_secs_f64()) as f32;
                (value.clamp(0.0, 1.0), velocity)
            }
        }
    }
}

/// Time-driven progress for one timer
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    spring: Spring,
    state: TimerState,
    phase: Phase,
    expired_reported: bool,
}

impl CountdownEngine {
    pub fn new(spring: Spring) -> Self {
        Self {
            spring,
            state: TimerState::Stopped,
            phase: Phase::Held(0.0),
            expired_reported: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// True while the value is moving on its own
    pub fn is_animating(&self) -> bool {
        !matches!(self.phase, Phase::Held(_))
    }

    /// Enter `state` at `now`, starting whatever motion it calls for
    ///
    /// The engine does not validate transitions; a zero `duration` with
    /// `Started` simply decays instantly.
    pub fn apply(&mut self, state: TimerState, duration: TimerDuration, now: Instant) {
        self.advance(now);
        let (value, velocity) = self.phase.sample(now);

        self.phase = match state {
            TimerState::Stopped => self.spring_to(0.0, value, velocity, None, now),
            TimerState::Started if value == 0.0 => {
                self.spring_to(1.0, value, velocity, Some(duration), now)
            }
            TimerState::Started => Phase::Decay {
                from: value,
                started_at: now,
                span: duration.scaled(value),
            },
            TimerState::Paused => Phase::Held(value),
        };

        if state == TimerState::Started && self.state != TimerState::Started {
            self.expired_reported = false;
        }
        self.state = state;
    }

    fn spring_to(
        &self,
        target: f32,
        value: f32,
        velocity: f32,
        then_decay: Option<TimerDuration>,
        now: Instant,
    ) -> Phase {
        let motion = self.spring.motion(value, velocity, target);
        if motion.settle_time().is_zero() {
            return match then_decay {
                Some(duration) => Phase::Decay {
                    from: target,
                    started_at: now,
                    span: duration.scaled(target),
                },
                None => Phase::Held(target),
            };
        }
        Phase::Spring {
            motion,
            started_at: now,
            then_decay,
        }
    }

    /// Move finished phases on to their successors
    fn advance(&mut self, now: Instant) {
        loop {
            match self.phase {
                Phase::Spring {
                    motion,
                    started_at,
                    then_decay,
                } if now >= started_at + motion.settle_time() => {
                    // Hand off at the settle instant, not at the frame that noticed it
                    let settled_at = started_at + motion.settle_time();
                    let target = motion.target();
                    self.phase = match then_decay {
                        Some(duration) => Phase::Decay {
                            from: target,
                            started_at: settled_at,
                            span: duration.scaled(target),
                        },
                        None => Phase::Held(target),
                    };
                }
                Phase::Decay {
                    started_at, span, ..
                } if now >= started_at + span => {
                    self.phase = Phase::Held(0.0);
                }
                _ => break,
            }
        }
    }

    /// Progress at `now` without advancing phases
    pub fn progress_at(&self, now: Instant) -> f32 {
        self.phase.sample(now).0
    }

    /// When the current fill spring settles, if one is running
    pub fn fill_settles_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Spring {
                motion,
                started_at,
                then_decay: Some(_),
            } => Some(started_at + motion.settle_time()),
            _ => None,
        }
    }

    /// Advance to `now` and report progress plus any expiry
    pub fn tick(&mut self, now: Instant) -> CountdownFrame {
        self.advance(now);
        let (progress, _) = self.phase.sample(now);

        let expired = self.state == TimerState::Started
            && matches!(self.phase, Phase::Held(value) if value == 0.0)
            && !self.expired_reported;
        if expired {
            self.expired_reported = true;
        }

        CountdownFrame {
            progress,
            event: expired.then_some(CountdownEvent::Expired),
        }
    }
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new(Spring::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_SECONDS: TimerDuration = TimerDuration::from_millis(10_000);

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Start a countdown and return the instant the linear decay begins
    fn started(engine: &mut CountdownEngine, origin: Instant) -> Instant {
        engine.apply(TimerState::Started, TEN_SECONDS, origin);
        engine.fill_settles_at().unwrap()
    }

    #[test]
    fn test_stopped_engine_is_empty() {
        let mut engine = CountdownEngine::default();
        let frame = engine.tick(Instant::now());
        assert_eq!(frame.progress, 0.0);
        assert!(frame.event.is_none());
    }

    #[test]
    fn test_start_fills_then_decays() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        assert!(decay_start > origin);
        let mid_fill = origin + (decay_start - origin) / 4;
        let filling = engine.tick(mid_fill).progress;
        assert!(filling > 0.0 && filling < 1.0);

        assert_eq!(engine.tick(decay_start).progress, 1.0);
        let half = engine.tick(decay_start + ms(5000)).progress;
        assert!((half - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_expires_exactly_once_at_duration() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let before = engine.tick(decay_start + ms(9984));
        assert!(before.progress > 0.0);
        assert!(before.event.is_none());

        let at_end = engine.tick(decay_start + ms(10_000));
        assert_eq!(at_end.progress, 0.0);
        assert_eq!(at_end.event, Some(CountdownEvent::Expired));

        let after = engine.tick(decay_start + ms(10_016));
        assert_eq!(after.progress, 0.0);
        assert!(after.event.is_none());
    }

    #[test]
    fn test_late_frame_still_expires_once() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        started(&mut engine, origin);

        // One frame long after everything finished
        let frame = engine.tick(origin + ms(60_000));
        assert_eq!(frame.progress, 0.0);
        assert_eq!(frame.event, Some(CountdownEvent::Expired));
        assert!(engine.tick(origin + ms(60_016)).event.is_none());
    }

    #[test]
    fn test_pause_freezes_progress() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let paused_at = decay_start + ms(4000);
        engine.apply(TimerState::Paused, TEN_SECONDS, paused_at);
        let frozen = engine.tick(paused_at).progress;
        assert!((frozen - 0.6).abs() < 1e-4);

        for later in [1, 10_000, 3_600_000] {
            let frame = engine.tick(paused_at + ms(later));
            assert_eq!(frame.progress, frozen);
            assert!(frame.event.is_none());
        }
        assert!(!engine.is_animating());
    }

    #[test]
    fn test_resume_decays_proportionally() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let paused_at = decay_start + ms(4000);
        engine.apply(TimerState::Paused, TEN_SECONDS, paused_at);

        let resumed_at = paused_at + ms(20_000);
        engine.apply(TimerState::Started, TEN_SECONDS, resumed_at);

        // Resuming at 0.6 of 10s leaves 6s
        let halfway = engine.tick(resumed_at + ms(3000)).progress;
        assert!((halfway - 0.3).abs() < 1e-3);
        let almost = engine.tick(resumed_at + ms(5990));
        assert!(almost.progress > 0.0);
        assert!(almost.event.is_none());

        let done = engine.tick(resumed_at + ms(6001));
        assert_eq!(done.progress, 0.0);
        assert_eq!(done.event, Some(CountdownEvent::Expired));
    }

    #[test]
    fn test_cancel_drains_monotonically() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let cancelled_at = decay_start + ms(2500);
        let start_value = engine.tick(cancelled_at).progress;
        engine.apply(TimerState::Stopped, TEN_SECONDS, cancelled_at);
        assert_eq!(engine.state(), TimerState::Stopped);

        let mut previous = start_value;
        let mut t = cancelled_at;
        for _ in 0..200 {
            t += ms(16);
            let frame = engine.tick(t);
            assert!(frame.progress <= previous + 1e-6, "drain went up");
            assert!(frame.event.is_none());
            previous = frame.progress;
        }
        assert_eq!(previous, 0.0);
        assert!(!engine.is_animating());
    }

    #[test]
    fn test_cancel_from_pause_drains() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let paused_at = decay_start + ms(1000);
        engine.apply(TimerState::Paused, TEN_SECONDS, paused_at);
        engine.apply(TimerState::Stopped, TEN_SECONDS, paused_at + ms(500));

        assert!(engine.tick(paused_at + ms(600)).progress < 0.9);
        assert_eq!(engine.tick(paused_at + ms(10_000)).progress, 0.0);
    }

    #[test]
    fn test_cancel_during_fill_drains() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let cancelled_at = origin + (decay_start - origin) / 3;
        let value = engine.tick(cancelled_at).progress;
        engine.apply(TimerState::Stopped, TEN_SECONDS, cancelled_at);

        let mut previous = value;
        for step in 1..120 {
            let progress = engine.tick(cancelled_at + ms(step * 16)).progress;
            assert!(progress <= previous + 1e-6);
            previous = progress;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_restart_while_draining_skips_fill() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        let decay_start = started(&mut engine, origin);

        let cancelled_at = decay_start + ms(1000);
        engine.apply(TimerState::Stopped, TEN_SECONDS, cancelled_at);
        let restart_at = cancelled_at + ms(50);
        let value = engine.tick(restart_at).progress;
        assert!(value > 0.0);

        engine.apply(TimerState::Started, TEN_SECONDS, restart_at);
        assert!(engine.fill_settles_at().is_none());
        assert!(engine.tick(restart_at + ms(16)).progress < value);
    }

    #[test]
    fn test_zero_duration_decays_instantly() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        engine.apply(TimerState::Started, TimerDuration::ZERO, origin);
        let settled = engine.fill_settles_at().unwrap();

        let frame = engine.tick(settled);
        assert_eq!(frame.progress, 0.0);
        assert_eq!(frame.event, Some(CountdownEvent::Expired));
    }

    #[test]
    fn test_progress_stays_in_unit_range() {
        let origin = Instant::now();
        let mut engine = CountdownEngine::default();
        engine.apply(TimerState::Started, TimerDuration::from_secs(2), origin);
        for step in 0..400 {
            let progress = engine.tick(origin + ms(step * 10)).progress;
            assert!((0.0..=1.0).contains(&progress));
        }
    }

    #[test]
    fn test_duration_fields() {
        let duration = TimerDuration::from_secs(125);
        assert_eq!(duration.minutes(), 2);
        assert_eq!(duration.seconds(), 5);
        assert_eq!(duration.with_minutes(-3), TimerDuration::from_secs(5));
        assert_eq!(duration.with_seconds(75), TimerDuration::from_secs(179));
        assert_eq!(duration.with_seconds(-1), TimerDuration::from_secs(120));
        assert_eq!(TimerDuration::from(Duration::from_millis(1500)).as_millis(), 1500);
    }

    #[test]
    fn test_format_remaining() {
        let duration = TimerDuration::from_secs(90);
        assert_eq!(format_remaining(1.0, duration), "01 : 30");
        assert_eq!(format_remaining(0.5, duration), "00 : 45");
        assert_eq!(format_remaining(0.0, duration), "00 : 00");
    }
}
