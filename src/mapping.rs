//! Per-axis response curves and output options.

use crate::axis::DISABLED_SOURCE;
use crate::types::{Axis, Pose, AXIS_COUNT};

/// Response curve for one axis.
///
/// Implementations own their interpolation; the pipeline only evaluates
/// them and tells them whether they are the curve currently in use.
pub trait Curve: Send {
    fn get_value(&self, x: f64) -> f64;

    /// Marks whether the pipeline is currently driving this curve.
    fn set_tracking_active(&mut self, active: bool);
}

/// `y = gain * x`.
#[derive(Debug, Clone)]
pub struct LinearCurve {
    gain: f64,
    active: bool,
}

impl LinearCurve {
    pub fn new(gain: f64) -> Self {
        Self { gain, active: false }
    }

    pub fn identity() -> Self {
        Self::new(1.0)
    }

    pub fn is_tracking_active(&self) -> bool {
        self.active
    }
}

impl Curve for LinearCurve {
    fn get_value(&self, x: f64) -> f64 {
        self.gain * x
    }

    fn set_tracking_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Per-axis options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisOptions {
    /// Source channel index, `0..6`, or [`DISABLED_SOURCE`].
    pub src: i32,
    pub invert: bool,
    /// Offset added to the final output.
    pub zero: f64,
    /// Use the alt curve for negative input.
    pub altp: bool,
}

pub struct AxisMapping {
    pub opts: AxisOptions,
    pub spline_main: Box<dyn Curve>,
    pub spline_alt: Box<dyn Curve>,
}

impl AxisMapping {
    pub fn new(src: i32, main: Box<dyn Curve>, alt: Box<dyn Curve>) -> Self {
        Self {
            opts: AxisOptions {
                src,
                invert: false,
                zero: 0.0,
                altp: false,
            },
            spline_main: main,
            spline_alt: alt,
        }
    }

    /// Evaluate the curve selected for `pos`, marking it active and the
    /// other one inactive.
    pub fn map(&mut self, pos: f64) -> f64 {
        let altp = pos < 0.0 && self.opts.altp;
        self.spline_main.set_tracking_active(!altp);
        self.spline_alt.set_tracking_active(altp);
        let curve = if altp { &self.spline_alt } else { &self.spline_main };
        curve.get_value(pos)
    }

    pub fn deactivate(&mut self) {
        self.spline_main.set_tracking_active(false);
        self.spline_alt.set_tracking_active(false);
    }

    pub fn is_disabled(&self) -> bool {
        self.opts.src == DISABLED_SOURCE
    }
}

impl std::fmt::Debug for AxisMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisMapping").field("opts", &self.opts).finish_non_exhaustive()
    }
}

/// The six axis mappings, indexed by output channel.
#[derive(Debug)]
pub struct Mappings {
    axes: [AxisMapping; AXIS_COUNT],
}

impl Mappings {
    pub fn new(axes: [AxisMapping; AXIS_COUNT]) -> Self {
        Self { axes }
    }

    /// Straight-through routing with identity curves on every axis.
    pub fn identity() -> Self {
        Self::new(std::array::from_fn(|i| {
            AxisMapping::new(
                i as i32,
                Box::new(LinearCurve::identity()),
                Box::new(LinearCurve::identity()),
            )
        }))
    }

    pub fn axis(&self, axis: Axis) -> &AxisMapping {
        &self.axes[axis as usize]
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisMapping {
        &mut self.axes[axis as usize]
    }

    pub fn sources(&self) -> [i32; AXIS_COUNT] {
        std::array::from_fn(|i| self.axes[i].opts.src)
    }

    pub fn inverts(&self) -> [bool; AXIS_COUNT] {
        std::array::from_fn(|i| self.axes[i].opts.invert)
    }

    /// Map channel `i` of `value` through its curve.
    pub fn map(&mut self, i: usize, value: f64) -> f64 {
        self.axes[i].map(value)
    }

    /// Add each axis' zero offset, sign-flipped for inverted axes.
    pub fn apply_zero_pos(&self, mut value: Pose) -> Pose {
        for (i, axis) in self.axes.iter().enumerate() {
            let sign = if axis.opts.invert { -1.0 } else { 1.0 };
            value[i] += axis.opts.zero * sign;
        }
        value
    }

    pub fn deactivate_all(&mut self) {
        for axis in self.axes.iter_mut() {
            axis.deactivate();
        }
    }
}
