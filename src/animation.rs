//! Time-based animation primitives
//!
//! Every animated value in the widget is a pure function of elapsed time, so a
//! frame only needs the current `Instant` to sample it. Key concepts:
//! - **Easing**: maps a linear fraction to an eased fraction
//! - **Chain**: sequence of keyframes, optionally repeating (restart or reverse)
//! - **Spring**: analytical damped harmonic motion toward a target

use std::time::Duration;

// =============================================================================
// Easing Functions
// =============================================================================

/// Easing function type
pub type EasingFn = fn(f32) -> f32;

/// Linear easing (no acceleration)
pub fn linear(t: f32) -> f32 {
    t
}

/// Accelerating curve that ends at full speed - used for the amplitude swell
pub fn fast_out_linear_in(t: f32) -> f32 {
    CubicBezier::FAST_OUT_LINEAR_IN.transform(t)
}

/// Cubic Bézier easing curve anchored at (0, 0) and (1, 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl CubicBezier {
    pub const FAST_OUT_LINEAR_IN: CubicBezier = CubicBezier::new(0.4, 0.0, 1.0, 1.0);

    /// Bisection iterations; 2^-24 is below f32 resolution for fractions in [0, 1]
    const MAX_ITERATIONS: usize = 24;

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn component(t: f32, p1: f32, p2: f32) -> f32 {
        let inv = 1.0 - t;
        3.0 * inv * inv * t * p1 + 3.0 * inv * t * t * p2 + t * t * t
    }

    /// Map a time fraction to the eased value fraction
    pub fn transform(&self, fraction: f32) -> f32 {
        if fraction <= 0.0 {
            return 0.0;
        }
        if fraction >= 1.0 {
            return 1.0;
        }

        // x(t) is monotonic for control points inside the unit square
        let mut low = 0.0_f32;
        let mut high = 1.0_f32;
        let mut t = fraction;
        for _ in 0..Self::MAX_ITERATIONS {
            t = (low + high) / 2.0;
            let x = Self::component(t, self.x1, self.x2);
            if x < fraction {
                low = t;
            } else {
                high = t;
            }
        }

        Self::component(t, self.y1, self.y2).clamp(0.0, 1.0)
    }
}

// =============================================================================
// Keyframes
// =============================================================================

/// A single keyframe in an animation
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Target value at this keyframe
    pub value: f32,
    /// Duration to reach this keyframe from the previous one
    pub duration: Duration,
    /// Easing function to apply
    pub easing: EasingFn,
}

impl Keyframe {
    pub fn new(value: f32, duration: Duration, easing: EasingFn) -> Self {
        Self {
            value,
            duration,
            easing,
        }
    }
}

// =============================================================================
// Animation Chain
// =============================================================================

/// How a chain behaves once its keyframes have played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Hold the last keyframe value
    Once,
    /// Jump back to the start value and play forward again
    Restart,
    /// Alternate forward and backward playback
    Reverse,
}

/// A chain of keyframes forming a complete animation
#[derive(Debug, Clone)]
pub struct Chain {
    keyframes: Vec<Keyframe>,
    repeat: Repeat,
    /// Starting value (before first keyframe)
    start_value: f32,
}

impl Chain {
    /// Create a new chain starting from a value
    pub fn new(start_value: f32) -> Self {
        Self {
            keyframes: Vec::new(),
            repeat: Repeat::Once,
            start_value,
        }
    }

    /// Add a keyframe with custom easing
    pub fn then_eased(mut self, value: f32, duration: Duration, easing: EasingFn) -> Self {
        self.keyframes.push(Keyframe::new(value, duration, easing));
        self
    }

    /// Repeat forever, restarting from the start value
    pub fn restarting(mut self) -> Self {
        self.repeat = Repeat::Restart;
        self
    }

    /// Repeat forever, alternating direction each iteration
    pub fn reversing(mut self) -> Self {
        self.repeat = Repeat::Reverse;
        self
    }

    /// Get total duration of one forward pass
    pub fn total_duration(&self) -> Duration {
        self.keyframes.iter().map(|k| k.duration).sum()
    }

    /// Lowest and highest value the chain can produce
    pub fn bounds(&self) -> (f32, f32) {
        self.keyframes
            .iter()
            .fold((self.start_value, self.start_value), |(lo, hi), k| {
                (lo.min(k.value), hi.max(k.value))
            })
    }

    /// Compute the value `elapsed` after the chain started
    pub fn value_at(&self, elapsed: Duration) -> f32 {
        let total = self.total_duration();
        if total.is_zero() {
            return self
                .keyframes
                .last()
                .map(|k| k.value)
                .unwrap_or(self.start_value);
        }

        // Integer nanoseconds keep repeating chains exactly periodic
        let total_nanos = total.as_nanos();
        let elapsed_nanos = elapsed.as_nanos();
        let iteration = elapsed_nanos / total_nanos;
        let within = Duration::from_nanos((elapsed_nanos % total_nanos) as u64);

        match self.repeat {
            Repeat::Once if iteration > 0 => self.forward_value(total),
            Repeat::Once | Repeat::Restart => self.forward_value(within),
            Repeat::Reverse if iteration % 2 == 1 => self.forward_value(total - within),
            Repeat::Reverse => self.forward_value(within),
        }
    }

    fn forward_value(&self, elapsed: Duration) -> f32 {
        let mut accumulated = Duration::ZERO;
        let mut prev_value = self.start_value;

        for keyframe in &self.keyframes {
            let segment_end = accumulated + keyframe.duration;

            if elapsed <= segment_end {
                let segment_elapsed = elapsed - accumulated;
                let t = if keyframe.duration.is_zero() {
                    1.0
                } else {
                    (segment_elapsed.as_secs_f64() / keyframe.duration.as_secs_f64()) as f32
                };
                let eased_t = (keyframe.easing)(t.clamp(0.0, 1.0));
                return prev_value + (keyframe.value - prev_value) * eased_t;
            }

            accumulated = segment_end;
            prev_value = keyframe.value;
        }

        prev_value
    }

    /// Check if animation is complete (never true for repeating chains)
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        self.repeat == Repeat::Once && elapsed >= self.total_duration()
    }
}

// =============================================================================
// Spring
// =============================================================================

/// Physical parameters of a unit-mass damped spring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub stiffness: f32,
    pub damping_ratio: f32,
}

impl Spring {
    /// Displacement below which the spring counts as arrived
    pub const DISPLACEMENT_THRESHOLD: f64 = 0.001;
    /// Velocity (units per second) below which the spring counts as at rest
    pub const VELOCITY_THRESHOLD: f64 = Self::DISPLACEMENT_THRESHOLD * 10.0;

    /// Resolution used when searching for the settle instant
    const SETTLE_STEP: Duration = Duration::from_millis(1);
    /// Upper bound on any spring segment
    const MAX_SETTLE: Duration = Duration::from_secs(30);

    pub const fn new(stiffness: f32, damping_ratio: f32) -> Self {
        Self {
            stiffness,
            damping_ratio,
        }
    }

    /// Start a motion from `from` toward `target`
    ///
    /// The initial velocity is kept only when it points toward the target.
    pub fn motion(&self, from: f32, velocity: f32, target: f32) -> SpringMotion {
        let displacement = f64::from(from - target);
        let velocity = f64::from(velocity);
        let velocity = if displacement * velocity < 0.0 {
            velocity
        } else {
            0.0
        };

        let mut motion = SpringMotion {
            spring: *self,
            displacement,
            velocity,
            target: f64::from(target),
            settle_time: Duration::ZERO,
        };
        motion.settle_time = motion.find_settle_time();
        motion
    }
}

impl Default for Spring {
    fn default() -> Self {
        Self::new(100.0, 1.0)
    }
}

/// A spring released at a known displacement and velocity
///
/// The motion ends the first time it reaches the target or comes to rest
/// within the thresholds, and holds the target from then on.
#[derive(Debug, Clone, Copy)]
pub struct SpringMotion {
    spring: Spring,
    displacement: f64,
    velocity: f64,
    target: f64,
    settle_time: Duration,
}

impl SpringMotion {
    /// Time from release until the motion ends
    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    pub fn target(&self) -> f32 {
        self.target as f32
    }

    /// Value and velocity `elapsed` after release
    pub fn sample(&self, elapsed: Duration) -> (f32, f32) {
        if elapsed >= self.settle_time {
            return (self.target as f32, 0.0);
        }
        let (x, v) = self.displacement_at(elapsed.as_secs_f64());
        ((self.target + x) as f32, v as f32)
    }

    fn displacement_at(&self, t: f64) -> (f64, f64) {
        let omega = f64::from(self.spring.stiffness).max(0.0).sqrt();
        let zeta = f64::from(self.spring.damping_ratio).max(0.0);
        let x0 = self.displacement;
        let v0 = self.velocity;

        if (zeta - 1.0).abs() < 1e-6 {
            let c1 = x0;
            let c2 = v0 + omega * x0;
            let decay = (-omega * t).exp();
            let x = (c1 + c2 * t) * decay;
            let v = (c2 - omega * (c1 + c2 * t)) * decay;
            (x, v)
        } else if zeta < 1.0 {
            let a = zeta * omega;
            let omega_d = omega * (1.0 - zeta * zeta).sqrt();
            let b = (v0 + a * x0) / omega_d;
            let decay = (-a * t).exp();
            let (sin, cos) = (omega_d * t).sin_cos();
            let x = decay * (x0 * cos + b * sin);
            let v = decay * (-a * (x0 * cos + b * sin) + omega_d * (b * cos - x0 * sin));
            (x, v)
        } else {
            let root = (zeta * zeta - 1.0).sqrt();
            let r1 = -omega * (zeta - root);
            let r2 = -omega * (zeta + root);
            let c2 = (v0 - r1 * x0) / (r2 - r1);
            let c1 = x0 - c2;
            let (e1, e2) = ((r1 * t).exp(), (r2 * t).exp());
            (c1 * e1 + c2 * e2, r1 * c1 * e1 + r2 * c2 * e2)
        }
    }

    fn is_at_rest(x: f64, v: f64) -> bool {
        x.abs() < Spring::DISPLACEMENT_THRESHOLD && v.abs() < Spring::VELOCITY_THRESHOLD
    }

    fn find_settle_time(&self) -> Duration {
        if Self::is_at_rest(self.displacement, self.velocity) {
            return Duration::ZERO;
        }

        let start_sign = self.displacement.signum();
        let mut t = Duration::ZERO;
        while t < Spring::MAX_SETTLE {
            t += Spring::SETTLE_STEP;
            let (x, v) = self.displacement_at(t.as_secs_f64());
            if x.signum() != start_sign || Self::is_at_rest(x, v) {
                return t;
            }
        }
        Spring::MAX_SETTLE
    }
}
