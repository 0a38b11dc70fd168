//! Free-running wave motion
//!
//! Two independent infinite loops sampled from elapsed time: a linear
//! horizontal phase shift and a swelling amplitude. Neither is tied to the
//! countdown; they run for as long as the widget exists.

use std::time::{Duration, Instant};

use crate::animation::{Chain, fast_out_linear_in, linear};

/// Oscillator timing and amplitude bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorConfig {
    /// Time for the wave to travel one full tile width
    pub shift_period: Duration,
    /// Time for one half swing of the amplitude (min to max)
    pub amplitude_period: Duration,
    pub amplitude_min: f32,
    pub amplitude_max: f32,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            shift_period: Duration::from_millis(2500),
            amplitude_period: Duration::from_millis(3000),
            amplitude_min: 0.005,
            amplitude_max: 0.015,
        }
    }
}

/// Snapshot of the oscillator for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorRatios {
    /// Horizontal offset as a fraction of the viewport width, in [0, 1)
    pub phase_shift: f32,
    /// Wave height as a fraction of the viewport height
    pub amplitude_scale: f32,
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: Chain,
    amplitude: Chain,
    started_at: Instant,
}

impl Oscillator {
    pub fn new(config: &OscillatorConfig, started_at: Instant) -> Self {
        let (low, high) = if config.amplitude_min <= config.amplitude_max {
            (config.amplitude_min, config.amplitude_max)
        } else {
            (config.amplitude_max, config.amplitude_min)
        };

        Self {
            phase: Chain::new(0.0)
                .then_eased(1.0, config.shift_period, linear)
                .restarting(),
            amplitude: Chain::new(low)
                .then_eased(high, config.amplitude_period, fast_out_linear_in)
                .reversing(),
            started_at,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Sample both loops at `now`
    pub fn ratios(&self, now: Instant) -> OscillatorRatios {
        let elapsed = now.saturating_duration_since(self.started_at);
        let (low, high) = self.amplitude.bounds();

        // phase_shift is always below 1.0 so it wraps cleanly
        let phase_shift = self.phase.value_at(elapsed);
        let phase_shift = if phase_shift >= 1.0 { 0.0 } else { phase_shift };

        OscillatorRatios {
            phase_shift,
            amplitude_scale: self.amplitude.value_at(elapsed).clamp(low, high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oscillator() -> (Oscillator, Instant) {
        let origin = Instant::now();
        (Oscillator::new(&OscillatorConfig::default(), origin), origin)
    }

    #[test]
    fn test_starts_at_rest_values() {
        let (osc, origin) = oscillator();
        let ratios = osc.ratios(origin);
        assert_eq!(ratios.phase_shift, 0.0);
        assert_eq!(ratios.amplitude_scale, 0.005);
    }

    #[test]
    fn test_phase_shift_is_periodic() {
        let (osc, origin) = oscillator();
        for ms in (0..10_000).step_by(37) {
            let t = origin + Duration::from_millis(ms);
            let now = osc.ratios(t).phase_shift;
            let later = osc.ratios(t + Duration::from_millis(2500)).phase_shift;
            assert_eq!(now, later, "phase mismatch at {}ms", ms);
            assert!((0.0..1.0).contains(&now));
        }
    }

    #[test]
    fn test_phase_shift_is_linear() {
        let (osc, origin) = oscillator();
        let quarter = osc.ratios(origin + Duration::from_millis(625)).phase_shift;
        assert!((quarter - 0.25).abs() < 1e-5);
        let wrapped = osc.ratios(origin + Duration::from_millis(2500)).phase_shift;
        assert_eq!(wrapped, 0.0);
    }

    #[test]
    fn test_amplitude_stays_in_bounds() {
        let (osc, origin) = oscillator();
        // Includes every reversal point (multiples of 3000ms)
        for ms in (0..=30_000).step_by(10) {
            let scale = osc.ratios(origin + Duration::from_millis(ms)).amplitude_scale;
            assert!((0.005..=0.015).contains(&scale), "{} out of bounds at {}ms", scale, ms);
        }
    }

    #[test]
    fn test_amplitude_reverses_at_bounds() {
        let (osc, origin) = oscillator();
        let at = |ms| osc.ratios(origin + Duration::from_millis(ms)).amplitude_scale;
        assert!((at(3000) - 0.015).abs() < 1e-6);
        assert!((at(6000) - 0.005).abs() < 1e-6);
        // Mirror symmetry around the reversal point
        assert!((at(2500) - at(3500)).abs() < 1e-6);
        assert!(at(1500) < at(2500));
        assert!(at(4500) < at(3500));
    }

    #[test]
    fn test_swapped_bounds_are_normalized() {
        let config = OscillatorConfig {
            amplitude_min: 0.02,
            amplitude_max: 0.01,
            ..OscillatorConfig::default()
        };
        let origin = Instant::now();
        let osc = Oscillator::new(&config, origin);
        for ms in (0..7000).step_by(100) {
            let scale = osc.ratios(origin + Duration::from_millis(ms)).amplitude_scale;
            assert!((0.01..=0.02).contains(&scale));
        }
    }
}
