//! Countdown timer with an animated filling-water wave indicator
//!
//! The library holds the animation engine: [`countdown`] turns timer state and
//! wall-clock time into a remaining fraction, [`waves`] synthesizes and paints
//! the wave fill, and [`widget::WaveTimer`] ties them to a single frame clock.

pub mod animation;
pub mod colors;
pub mod conf;
pub mod countdown;
pub mod waves;
pub mod widget;

pub use countdown::{TimerDuration, TimerState};
pub use widget::{Frame, TimerAction, TimerError, TimerEvent, WaveTimer};
