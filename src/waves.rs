//! Wave fill indicator
//!
//! The texture is generated once per (size, colour) and reused; the
//! oscillator and the countdown progress only change how it is placed.

pub mod oscillator;
pub mod render;
pub mod texture;
pub mod worker;

pub use oscillator::{Oscillator, OscillatorConfig, OscillatorRatios};
pub use render::{MAX_PROGRESS, WaveTransform, clear, render_frame};
pub use texture::{TextureCache, TextureError, TextureKey, WaveGeometry, WaveTexture};
pub use worker::TextureWorker;
