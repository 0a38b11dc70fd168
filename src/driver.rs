//! Headless frame host
//!
//! Plays the part of the outer UI: feeds actions from stdin into the
//! [`WaveTimer`], ticks it on a fixed frame clock, and shows the result as a
//! terminal progress bar and, optionally, a directory of PNG frames.

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Zoned;
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tiny_skia::{Color, Pixmap};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use wavetimer::colors;
use wavetimer::conf::Settings;
use wavetimer::countdown::format_remaining;
use wavetimer::waves::{self, Oscillator, TextureCache, TextureKey};
use wavetimer::{Frame, TimerEvent, TimerState, WaveTimer};

/// Resolution of the terminal progress bar
const BAR_STEPS: u64 = 1000;

/// Actions read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    TogglePause,
    Cancel,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "s" | "start" => Ok(Command::Start),
            "p" | "pause" | "resume" => Ok(Command::TogglePause),
            "c" | "cancel" => Ok(Command::Cancel),
            "q" | "quit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: {:?} (s, p, c, q)", other)),
        }
    }
}

/// Read commands from stdin on a plain thread
///
/// The thread ends on EOF, on `q`, or once the receiver is gone.
pub fn spawn_stdin_reader(commands: UnboundedSender<Command>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if commands.send(command).is_err() || command == Command::Quit {
                            break;
                        }
                    }
                    Err(e) => log::warn!("{}", e),
                }
            }
            log::debug!("Stdin reader exiting");
        })?;
    Ok(())
}

/// Writes every N-th frame as a PNG
pub struct FrameSink {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl FrameSink {
    /// Create a fresh timestamped directory under `base`
    pub fn create(base: &Path, every: u64) -> Result<Self> {
        let timestamp = Zoned::now().strftime("%Y-%m-%d_%H-%M-%S");
        let dir = base.join(timestamp.to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create frames directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write(&mut self, index: u64, pixmap: &Pixmap) -> Result<()> {
        if index % self.every != 0 {
            return Ok(());
        }
        let path = self.dir.join(format!("frame-{:06}.png", index));
        pixmap
            .save_png(&path)
            .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
        self.written += 1;
        Ok(())
    }
}

pub struct RunOptions {
    pub fps: u32,
    pub auto_start: bool,
    pub background: Color,
    pub sink: Option<FrameSink>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub expired: bool,
    pub written: u64,
    pub frames_dir: Option<PathBuf>,
}

pub struct FrameLoop {
    timer: WaveTimer,
    pixmap: Pixmap,
    commands: UnboundedReceiver<Command>,
    options: RunOptions,
    bar: ProgressBar,
}

impl FrameLoop {
    pub fn new(
        mut timer: WaveTimer,
        width: u32,
        height: u32,
        commands: UnboundedReceiver<Command>,
        options: RunOptions,
    ) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .with_context(|| format!("Cannot allocate a {}x{} frame", width, height))?;
        timer.set_viewport(width, height);

        let bar = ProgressBar::new(BAR_STEPS);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .progress_chars("#>-"),
        );

        Ok(Self {
            timer,
            pixmap,
            commands,
            options,
            bar,
        })
    }

    /// Create the command channel and start reading stdin into it
    pub fn stdin_commands() -> Result<UnboundedReceiver<Command>> {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_stdin_reader(tx).context("Failed to start stdin reader")?;
        Ok(rx)
    }

    pub async fn run(mut self) -> Result<RunSummary> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.options.fps.max(1)));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if self.options.auto_start {
            self.apply(Command::Start, Instant::now());
        }

        let mut frames = 0u64;
        let mut expired = false;
        let mut has_run = self.options.auto_start;

        loop {
            interval.tick().await;
            let now = Instant::now();

            let mut quit = false;
            while let Ok(command) = self.commands.try_recv() {
                if command == Command::Quit {
                    quit = true;
                    break;
                }
                has_run |= command == Command::Start;
                self.apply(command, now);
            }
            if quit {
                log::info!("Quit requested");
                break;
            }

            let frame = self.timer.frame(now);
            expired |= self.report(&frame);
            self.draw(&frame, frames)?;
            frames += 1;

            if has_run && frame.state == TimerState::Stopped && frame.progress == 0.0 {
                break;
            }
        }

        self.bar.finish_with_message(if expired {
            "Time's up!".to_string()
        } else {
            "Stopped".to_string()
        });
        self.timer.shutdown();

        let (written, frames_dir) = match &self.options.sink {
            Some(sink) => (sink.written(), Some(sink.dir().to_path_buf())),
            None => (0, None),
        };

        Ok(RunSummary {
            frames,
            expired,
            written,
            frames_dir,
        })
    }

    fn apply(&mut self, command: Command, now: Instant) {
        let result = match command {
            Command::Start => self.timer.start(now),
            Command::TogglePause => self.timer.toggle_pause(now),
            Command::Cancel => self.timer.cancel(now),
            Command::Quit => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("{}", e);
        }
    }

    /// Update the progress bar; true if the countdown expired this frame
    fn report(&self, frame: &Frame) -> bool {
        let mut expired = false;
        for event in &frame.events {
            match event {
                TimerEvent::Expired => expired = true,
                TimerEvent::StateChanged { from, to } => {
                    log::debug!("State changed: {} -> {}", from, to);
                }
            }
        }

        self.bar
            .set_position((frame.progress * BAR_STEPS as f32).round() as u64);
        self.bar.set_message(format!(
            "{} {}",
            self.timer.remaining_text(frame.progress),
            frame.state
        ));
        self.bar.tick();
        expired
    }

    fn draw(&mut self, frame: &Frame, index: u64) -> Result<()> {
        waves::clear(&mut self.pixmap, self.options.background);
        self.timer.render(frame, &mut self.pixmap);
        if let Some(sink) = self.options.sink.as_mut() {
            sink.write(index, &self.pixmap)?;
        }
        Ok(())
    }
}

/// Metadata for a single rendered frame
#[derive(Debug, Serialize)]
pub struct SnapshotReport {
    pub width: u32,
    pub height: u32,
    pub progress: f32,
    pub elapsed_ms: u64,
    pub phase_shift: f32,
    pub amplitude_scale: f32,
    pub remaining: String,
    pub color: String,
    pub drawn: bool,
    pub output: Option<PathBuf>,
}

/// Render one deterministic frame at `progress`, `elapsed` into the oscillators
pub fn snapshot(
    settings: &Settings,
    progress: f32,
    elapsed: Duration,
    output: Option<&Path>,
) -> Result<SnapshotReport> {
    let (width, height) = (settings.width, settings.height);
    let color = settings.wave_color();
    let progress = progress.clamp(0.0, 1.0);

    let mut pixmap = Pixmap::new(width, height)
        .with_context(|| format!("Cannot allocate a {}x{} frame", width, height))?;
    let texture = TextureCache::new()
        .get_or_generate(TextureKey::new(width, height, color), &settings.geometry())
        .context("Failed to generate wave texture")?;

    let origin = Instant::now();
    let ratios = Oscillator::new(&settings.oscillator(), origin).ratios(origin + elapsed);

    waves::clear(&mut pixmap, settings.theme.background());
    let drawn = waves::render_frame(
        &mut pixmap,
        Some(texture.as_ref()),
        ratios,
        progress,
        settings.offset_y,
    );

    if let Some(path) = output {
        pixmap
            .save_png(path)
            .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
        log::info!("Snapshot written to {}", path.display());
    }

    Ok(SnapshotReport {
        width,
        height,
        progress,
        elapsed_ms: elapsed.as_millis() as u64,
        phase_shift: ratios.phase_shift,
        amplitude_scale: ratios.amplitude_scale,
        remaining: format_remaining(progress, settings.duration()),
        color: colors::to_hex(color),
        drawn,
        output: output.map(Path::to_path_buf),
    })
}
