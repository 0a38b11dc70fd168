//! Wave timer controller
//!
//! Owns the duration and the timer state, validates the discrete actions a
//! host sends, and multiplexes the countdown, the oscillator and the texture
//! cache on a single frame clock. Hosts call [`WaveTimer::frame`] once per
//! tick and paint the result with [`WaveTimer::render`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tiny_skia::{Color, Pixmap};

use crate::conf::Settings;
use crate::countdown::{CountdownEngine, CountdownEvent, TimerDuration, TimerState, format_remaining};
use crate::waves::{
    Oscillator, OscillatorRatios, TextureCache, TextureKey, TextureWorker, WaveGeometry,
    WaveTexture, render_frame,
};

/// Discrete actions a host can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Cancel,
}

impl TimerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Resume => "resume",
            TimerAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timer control error types
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("Cannot {action} a timer that is {from}")]
    InvalidTransition {
        from: TimerState,
        action: TimerAction,
    },

    #[error("Cannot start a timer with a zero duration")]
    ZeroDuration,

    #[error("Duration can only be changed while the timer is stopped")]
    DurationLocked,
}

/// Notifications delivered with the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    StateChanged { from: TimerState, to: TimerState },
    /// The countdown ran out on its own
    Expired,
}

/// Everything needed to paint one frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub progress: f32,
    pub ratios: OscillatorRatios,
    pub texture: Option<Arc<WaveTexture>>,
    pub state: TimerState,
    pub events: Vec<TimerEvent>,
}

enum TextureSource {
    /// Generate on the calling thread
    Inline,
    Worker(TextureWorker),
    /// Shut down; requests are ignored
    Closed,
}

pub struct WaveTimer {
    duration: TimerDuration,
    engine: CountdownEngine,
    oscillator: Oscillator,
    geometry: WaveGeometry,
    offset_y: f32,
    color: Color,
    viewport: Option<(u32, u32)>,
    source: TextureSource,
    cache: TextureCache,
    wanted: Option<TextureKey>,
    events: Vec<TimerEvent>,
}

impl WaveTimer {
    pub fn new(settings: &Settings) -> Self {
        Self::with_clock_origin(settings, Instant::now())
    }

    /// Build a stopped timer whose oscillator starts at `origin`
    ///
    /// Textures are generated on a background thread; if it cannot be
    /// spawned, generation falls back to the calling thread.
    pub fn with_clock_origin(settings: &Settings, origin: Instant) -> Self {
        let source = match TextureWorker::spawn(settings.geometry()) {
            Ok(worker) => TextureSource::Worker(worker),
            Err(e) => {
                log::warn!("Failed to spawn texture worker: {}, generating inline", e);
                TextureSource::Inline
            }
        };
        Self::build(settings, origin, source)
    }

    /// Build a stopped timer that generates textures synchronously
    pub fn inline(settings: &Settings, origin: Instant) -> Self {
        Self::build(settings, origin, TextureSource::Inline)
    }

    fn build(settings: &Settings, origin: Instant, source: TextureSource) -> Self {
        Self {
            duration: settings.duration(),
            engine: CountdownEngine::new(settings.spring()),
            oscillator: Oscillator::new(&settings.oscillator(), origin),
            geometry: settings.geometry(),
            offset_y: settings.offset_y,
            color: settings.wave_color(),
            viewport: None,
            source,
            cache: TextureCache::new(),
            wanted: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn duration(&self) -> TimerDuration {
        self.duration
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    /// Remaining time for `progress` as `MM : SS`
    pub fn remaining_text(&self, progress: f32) -> String {
        format_remaining(progress, self.duration)
    }

    pub fn set_duration(&mut self, duration: TimerDuration) -> Result<(), TimerError> {
        if self.state() != TimerState::Stopped {
            return Err(TimerError::DurationLocked);
        }
        self.duration = duration;
        log::debug!("Duration set to {}ms", duration.as_millis());
        Ok(())
    }

    pub fn start(&mut self, now: Instant) -> Result<(), TimerError> {
        self.expect_state(TimerState::Stopped, TimerAction::Start)?;
        if self.duration.is_zero() {
            return Err(TimerError::ZeroDuration);
        }
        self.transition(TimerState::Started, now);
        Ok(())
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), TimerError> {
        self.expect_state(TimerState::Started, TimerAction::Pause)?;
        self.transition(TimerState::Paused, now);
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<(), TimerError> {
        self.expect_state(TimerState::Paused, TimerAction::Resume)?;
        self.transition(TimerState::Started, now);
        Ok(())
    }

    /// Pause a running timer or resume a paused one
    pub fn toggle_pause(&mut self, now: Instant) -> Result<(), TimerError> {
        match self.state() {
            TimerState::Paused => self.resume(now),
            _ => self.pause(now),
        }
    }

    pub fn cancel(&mut self, now: Instant) -> Result<(), TimerError> {
        if self.state() == TimerState::Stopped {
            return Err(TimerError::InvalidTransition {
                from: TimerState::Stopped,
                action: TimerAction::Cancel,
            });
        }
        self.transition(TimerState::Stopped, now);
        Ok(())
    }

    fn expect_state(&self, expected: TimerState, action: TimerAction) -> Result<(), TimerError> {
        let from = self.state();
        if from != expected {
            return Err(TimerError::InvalidTransition { from, action });
        }
        Ok(())
    }

    fn transition(&mut self, to: TimerState, now: Instant) {
        let from = self.state();
        self.engine.apply(to, self.duration, now);
        log::info!("Timer: {} -> {}", from, to);
        self.events.push(TimerEvent::StateChanged { from, to });
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if self.viewport == Some((width, height)) {
            return;
        }
        self.viewport = Some((width, height));
        self.request_texture();
    }

    pub fn set_color(&mut self, color: Color) {
        if self.color == color {
            return;
        }
        self.color = color;
        self.request_texture();
    }

    fn request_texture(&mut self) {
        let Some((width, height)) = self.viewport else {
            return;
        };
        let key = TextureKey::new(width, height, self.color);
        self.wanted = Some(key);

        if self.cache.get(&key).is_some() {
            log::trace!("Texture already cached for {}x{}", width, height);
            return;
        }

        match &self.source {
            TextureSource::Worker(worker) => {
                if worker.request(key) {
                    return;
                }
                log::warn!("Texture worker is gone, generating inline");
                self.source = TextureSource::Inline;
            }
            TextureSource::Inline => {}
            TextureSource::Closed => {
                log::debug!("Ignoring texture request after shutdown");
                return;
            }
        }

        if let Err(e) = self.cache.get_or_generate(key, &self.geometry) {
            log::warn!("Texture generation failed: {}", e);
        }
    }

    /// Collect a finished texture from the worker, dropping stale ones
    fn collect_texture(&mut self) {
        let TextureSource::Worker(worker) = &mut self.source else {
            return;
        };
        let Some((key, result)) = worker.poll() else {
            return;
        };
        if self.wanted != Some(key) {
            log::debug!("Discarding stale {}x{} texture", key.width, key.height);
            return;
        }
        match result {
            Ok(texture) => {
                self.cache.insert(texture);
            }
            Err(e) => log::warn!("Texture generation failed: {}", e),
        }
    }

    /// Advance every animated value to `now`
    pub fn frame(&mut self, now: Instant) -> Frame {
        self.collect_texture();

        let countdown = self.engine.tick(now);
        if countdown.event == Some(CountdownEvent::Expired) {
            log::info!("Timer expired");
            self.events.push(TimerEvent::Expired);
            self.transition(TimerState::Stopped, now);
        }

        let ratios = self.oscillator.ratios(now);
        log::trace!(
            "Frame: progress={:.4} shift={:.3} amplitude={:.4}",
            countdown.progress,
            ratios.phase_shift,
            ratios.amplitude_scale
        );

        Frame {
            progress: countdown.progress,
            ratios,
            // The previous texture stays in use until its replacement arrives
            texture: self.cache.latest(),
            state: self.state(),
            events: std::mem::take(&mut self.events),
        }
    }

    /// Paint `frame` into `pixmap`; false when nothing was drawn
    pub fn render(&self, frame: &Frame, pixmap: &mut Pixmap) -> bool {
        render_frame(
            pixmap,
            frame.texture.as_deref(),
            frame.ratios,
            frame.progress,
            self.offset_y,
        )
    }

    /// Stop the texture worker
    pub fn shutdown(&mut self) {
        if let TextureSource::Worker(worker) = &mut self.source {
            worker.shutdown();
            log::debug!("Texture worker stopped");
        }
        self.source = TextureSource::Closed;
    }
}

impl Drop for WaveTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(duration_secs: u64) -> Settings {
        Settings {
            duration_secs,
            offset_y: 0.0,
            ..Settings::default()
        }
    }

    fn inline_timer(duration_secs: u64) -> (WaveTimer, Instant) {
        let origin = Instant::now();
        (WaveTimer::inline(&settings(duration_secs), origin), origin)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Run frames every 16ms from `from` until `until`, collecting events
    fn run_frames(timer: &mut WaveTimer, from: Instant, until: Instant) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        let mut now = from;
        while now <= until {
            events.extend(timer.frame(now).events);
            now += ms(16);
        }
        events
    }

    #[test]
    fn test_new_timer_is_stopped_and_empty() {
        let (mut timer, origin) = inline_timer(10);
        let frame = timer.frame(origin);
        assert_eq!(frame.state, TimerState::Stopped);
        assert_eq!(frame.progress, 0.0);
        assert!(frame.texture.is_none());
        assert!(frame.events.is_empty());
    }

    #[test]
    fn test_start_requires_duration() {
        let (mut timer, origin) = inline_timer(0);
        assert_eq!(timer.start(origin), Err(TimerError::ZeroDuration));
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let (mut timer, origin) = inline_timer(10);
        assert_eq!(
            timer.pause(origin),
            Err(TimerError::InvalidTransition {
                from: TimerState::Stopped,
                action: TimerAction::Pause
            })
        );
        assert!(timer.resume(origin).is_err());
        assert!(timer.cancel(origin).is_err());

        timer.start(origin).unwrap();
        assert_eq!(
            timer.start(origin),
            Err(TimerError::InvalidTransition {
                from: TimerState::Started,
                action: TimerAction::Start
            })
        );
        assert!(timer.resume(origin).is_err());
    }

    #[test]
    fn test_duration_locked_while_running() {
        let (mut timer, origin) = inline_timer(10);
        timer.set_duration(TimerDuration::from_secs(20)).unwrap();
        timer.start(origin).unwrap();
        assert_eq!(
            timer.set_duration(TimerDuration::from_secs(5)),
            Err(TimerError::DurationLocked)
        );
        timer.pause(origin + ms(100)).unwrap();
        assert!(timer.set_duration(TimerDuration::from_secs(5)).is_err());
        assert_eq!(timer.duration(), TimerDuration::from_secs(20));
    }

    #[test]
    fn test_state_changes_are_reported() {
        let (mut timer, origin) = inline_timer(10);
        timer.start(origin).unwrap();
        timer.toggle_pause(origin + ms(500)).unwrap();
        assert_eq!(timer.state(), TimerState::Paused);
        timer.toggle_pause(origin + ms(600)).unwrap();
        assert_eq!(timer.state(), TimerState::Started);

        let events = timer.frame(origin + ms(700)).events;
        assert_eq!(
            events,
            vec![
                TimerEvent::StateChanged {
                    from: TimerState::Stopped,
                    to: TimerState::Started
                },
                TimerEvent::StateChanged {
                    from: TimerState::Started,
                    to: TimerState::Paused
                },
                TimerEvent::StateChanged {
                    from: TimerState::Paused,
                    to: TimerState::Started
                },
            ]
        );
        assert!(timer.frame(origin + ms(716)).events.is_empty());
    }

    #[test]
    fn test_expiry_stops_timer_once() {
        let (mut timer, origin) = inline_timer(2);
        timer.start(origin).unwrap();
        timer.frame(origin);

        let events = run_frames(&mut timer, origin, origin + ms(5000));
        let expired = events.iter().filter(|e| **e == TimerEvent::Expired).count();
        assert_eq!(expired, 1);
        assert!(events.contains(&TimerEvent::StateChanged {
            from: TimerState::Started,
            to: TimerState::Stopped
        }));
        assert_eq!(timer.state(), TimerState::Stopped);

        // A new countdown can start and expire again
        timer.start(origin + ms(6000)).unwrap();
        let events = run_frames(&mut timer, origin + ms(6000), origin + ms(10_000));
        assert_eq!(events.iter().filter(|e| **e == TimerEvent::Expired).count(), 1);
    }

    #[test]
    fn test_cancel_drains_without_expiry() {
        let (mut timer, origin) = inline_timer(10);
        timer.start(origin).unwrap();
        run_frames(&mut timer, origin, origin + ms(2000));

        let cancelled_at = origin + ms(2000);
        timer.cancel(cancelled_at).unwrap();
        assert_eq!(timer.state(), TimerState::Stopped);

        let mut previous = 1.0;
        let mut now = cancelled_at;
        for _ in 0..150 {
            let frame = timer.frame(now);
            assert!(frame.progress <= previous + 1e-6);
            assert!(!frame.events.contains(&TimerEvent::Expired));
            previous = frame.progress;
            now += ms(16);
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_viewport_produces_texture() {
        let (mut timer, origin) = inline_timer(10);
        timer.set_viewport(80, 120);
        let frame = timer.frame(origin);
        let texture = frame.texture.unwrap();
        assert_eq!((texture.width(), texture.height()), (80, 120));
        assert_eq!(texture.key().color(), timer.color());
    }

    #[test]
    fn test_unchanged_viewport_reuses_texture() {
        let (mut timer, origin) = inline_timer(10);
        timer.set_viewport(80, 120);
        let first = timer.frame(origin).texture.unwrap();
        timer.set_viewport(80, 120);
        timer.set_color(timer.color());
        let second = timer.frame(origin + ms(16)).texture.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        timer.set_color(Color::from_rgba8(255, 0, 0, 255));
        let third = timer.frame(origin + ms(32)).texture.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_worker_texture_arrives() {
        let origin = Instant::now();
        let mut timer = WaveTimer::with_clock_origin(&settings(10), origin);
        timer.set_viewport(64, 64);

        let deadline = Instant::now() + Duration::from_secs(10);
        let texture = loop {
            if let Some(texture) = timer.frame(Instant::now()).texture {
                break texture;
            }
            assert!(Instant::now() < deadline, "texture never arrived");
            std::thread::sleep(ms(5));
        };
        assert_eq!((texture.width(), texture.height()), (64, 64));
        timer.shutdown();
    }

    #[test]
    fn test_render_skips_until_running() {
        let (mut timer, origin) = inline_timer(10);
        timer.set_viewport(40, 80);
        let mut pixmap = Pixmap::new(40, 80).unwrap();

        let frame = timer.frame(origin);
        assert!(!timer.render(&frame, &mut pixmap));

        timer.start(origin).unwrap();
        let frame = timer.frame(origin + ms(1500));
        assert!(frame.progress > 0.5);
        assert!(timer.render(&frame, &mut pixmap));
        assert_eq!(pixmap.pixel(20, 79).unwrap().alpha(), 255);
    }

    #[test]
    fn test_shutdown_ignores_texture_requests() {
        let (mut timer, origin) = inline_timer(10);
        timer.shutdown();
        timer.set_viewport(40, 40);
        assert!(timer.frame(origin).texture.is_none());
    }

    #[test]
    fn test_remaining_text() {
        let (timer, _) = inline_timer(75);
        assert_eq!(timer.remaining_text(1.0), "01 : 15");
        assert_eq!(timer.remaining_text(0.0), "00 : 00");
    }
}
