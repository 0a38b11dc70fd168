use crate::animation::Spring;
use crate::colors::{self, Theme};
use crate::countdown::TimerDuration;
use crate::waves::{OscillatorConfig, WaveGeometry};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tiny_skia::Color;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Countdown length in whole seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    #[serde(default)]
    pub theme: Theme,

    /// Wave colour override as "#rrggbb"
    /// If None, the theme's primary colour is used
    #[serde(default)]
    pub color: Option<String>,

    /// Viewport size in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames per second for `run`
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Pixels left empty above the wave
    #[serde(default = "default_offset_y")]
    pub offset_y: f32,

    #[serde(default)]
    pub waves: WaveSettings,

    #[serde(default)]
    pub spring: SpringSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WaveSettings {
    pub amplitude_ratio: f32,
    pub water_level_ratio: f32,
    pub shift_period_ms: u64,
    pub amplitude_period_ms: u64,
    pub amplitude_min: f32,
    pub amplitude_max: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        let geometry = WaveGeometry::default();
        let oscillator = OscillatorConfig::default();
        Self {
            amplitude_ratio: geometry.amplitude_ratio,
            water_level_ratio: geometry.water_level_ratio,
            shift_period_ms: oscillator.shift_period.as_millis() as u64,
            amplitude_period_ms: oscillator.amplitude_period.as_millis() as u64,
            amplitude_min: oscillator.amplitude_min,
            amplitude_max: oscillator.amplitude_max,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpringSettings {
    pub stiffness: f32,
    pub damping_ratio: f32,
}

impl Default for SpringSettings {
    fn default() -> Self {
        let spring = Spring::default();
        Self {
            stiffness: spring.stiffness,
            damping_ratio: spring.damping_ratio,
        }
    }
}

fn default_duration_secs() -> u64 {
    60
}

fn default_width() -> u32 {
    360
}

fn default_height() -> u32 {
    640
}

fn default_fps() -> u32 {
    60
}

fn default_offset_y() -> f32 {
    16.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            theme: Theme::default(),
            color: None,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            offset_y: default_offset_y(),
            waves: WaveSettings::default(),
            spring: SpringSettings::default(),
        }
    }
}

impl Settings {
    /// Load config from ~/.config/wavetimer/config.toml
    /// Returns default settings if file doesn't exist or fails to parse
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            log::warn!("[config] Could not determine config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    log::info!("[config] Loaded settings from: {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("[config] Failed to parse config: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "[config] No config file found at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save config to ~/.config/wavetimer/config.toml
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let Some(path) = config_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        // Create parent dir if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        log::info!("[config] Saved settings to: {}", path.display());

        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings to TOML")
    }

    pub fn duration(&self) -> TimerDuration {
        TimerDuration::from_secs(self.duration_secs)
    }

    /// Wave colour: the override if it parses, the theme primary otherwise
    pub fn wave_color(&self) -> Color {
        match self.color.as_deref().map(colors::parse_hex_color) {
            Some(Ok(color)) => color,
            Some(Err(e)) => {
                log::warn!("[config] {}, using the {} theme colour", e, self.theme.as_str());
                self.theme.primary()
            }
            None => self.theme.primary(),
        }
    }

    pub fn geometry(&self) -> WaveGeometry {
        WaveGeometry {
            amplitude_ratio: self.waves.amplitude_ratio,
            water_level_ratio: self.waves.water_level_ratio,
        }
    }

    pub fn oscillator(&self) -> OscillatorConfig {
        OscillatorConfig {
            shift_period: Duration::from_millis(self.waves.shift_period_ms),
            amplitude_period: Duration::from_millis(self.waves.amplitude_period_ms),
            amplitude_min: self.waves.amplitude_min,
            amplitude_max: self.waves.amplitude_max,
        }
    }

    pub fn spring(&self) -> Spring {
        Spring::new(self.spring.stiffness, self.spring.damping_ratio)
    }
}

/// Get the path to the config file: ~/.config/wavetimer/config.toml
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wavetimer").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the directory recorded frames go under: ~/.local/share/wavetimer/frames
pub fn frames_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wavetimer").map(|dirs| dirs.data_dir().join("frames"))
}
