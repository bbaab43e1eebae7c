//! Relative translation compensation.
//!
//! When the head turns about a pivot that sits behind the tracked point,
//! the tracked point also translates. This module re-projects translation
//! into the head's rotated frame (optionally only outside the forward zone),
//! blends between the plain and the re-projected value when the zone
//! changes, and adds the neck pivot offset.

use crate::config::{ReltransConfig, ReltransDisable};
use crate::euler::{self, Rmat, Vec3};
use crate::types::{Axis, AxisMask, Pose, ReltransMode, AXIS_COUNT};
use std::time::Instant;

/// Time constant of the zone-change blend, seconds.
const INTERP_RC: f64 = 0.1;

/// Residual below which the blend is considered finished.
const INTERP_EPS: f64 = 0.05;

/// Forward zone half-widths for [`ReltransMode::NonCenteredOnly`], degrees.
const ZONE_YAW: f64 = 50.0;
const ZONE_PITCH: f64 = 40.0;

/// Rotate a translation `[TX, TY, TZ]` by `r`.
///
/// Translation and rotation matrices use opposite handedness, so the vector
/// is fed in as `(TZ, -TX, -TY)` and mapped back the same way. An axis set in
/// `disable` keeps its input value.
pub fn rotate(r: &Rmat, v: &Vec3, disable: [bool; 3]) -> Vec3 {
    let ret = euler::mul_vec(r, &[v[2], -v[0], -v[1]]);

    [
        if disable[0] { v[0] } else { -ret[1] },
        if disable[1] { v[1] } else { -ret[2] },
        if disable[2] { v[2] } else { ret[0] },
    ]
}

/// Offset that moves the tracked point as if it rotated about a pivot
/// `neck_length` units along the forward axis.
pub fn apply_neck(value: &Pose, enable: bool, neck_length: f64) -> Vec3 {
    if !enable || neck_length == 0.0 {
        return [0.0; 3];
    }

    let r = euler::euler_to_rmat(&euler::to_radians(&value.rotation()));
    let mut neck = rotate(&r, &[0.0, 0.0, neck_length], [false; 3]);
    neck[2] -= neck_length;
    neck
}

/// Transient compensation state, owned by the worker thread.
#[derive(Debug, Default)]
pub struct Reltrans {
    interp_pos: Vec3,
    last_tick: Option<Instant>,
    interpolating: bool,
    in_zone: bool,
}

impl Reltrans {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a zone-change blend is in progress.
    pub fn is_interpolating(&self) -> bool {
        self.interpolating
    }

    /// Whether the last tick was inside the compensation zone.
    pub fn in_zone(&self) -> bool {
        self.in_zone
    }

    /// Run the zone state machine for one tick and return the compensated
    /// pose. Rotation channels pass through unchanged.
    pub fn apply_pipeline(
        &mut self,
        mode: ReltransMode,
        value: &Pose,
        disable: &ReltransDisable,
        now: Instant,
    ) -> Pose {
        let in_zone = match mode {
            ReltransMode::Disabled => {
                self.reset();
                return *value;
            }
            ReltransMode::AlwaysOn => true,
            ReltransMode::NonCenteredOnly => {
                let yaw_centered = value[Axis::Yaw].abs() < ZONE_YAW;
                let pitch_centered = value[Axis::Pitch].abs() < ZONE_PITCH;
                !(yaw_centered && pitch_centered)
            }
        };

        if !self.interpolating && in_zone != self.in_zone {
            log::trace!("reltrans: interpolation start (in_zone={})", in_zone);
            self.interpolating = true;
            self.last_tick = Some(now);
        }
        self.in_zone = in_zone;

        let mut rel = value.translation();

        if self.in_zone {
            let gate = |axis: Axis, off: bool| if off { 0.0 } else { value[axis] };
            let angles = [
                gate(Axis::Yaw, disable.src_yaw),
                gate(Axis::Pitch, disable.src_pitch),
                gate(Axis::Roll, disable.src_roll),
            ];
            let r = euler::euler_to_rmat(&euler::to_radians(&angles));
            rel = rotate(&r, &rel, [disable.tx, disable.ty, disable.tz]);
        }

        if self.interpolating {
            let dt = self
                .last_tick
                .map(|t| now.saturating_duration_since(t).as_secs_f64())
                .unwrap_or(0.0);
            self.last_tick = Some(now);

            let alpha = dt / (dt + INTERP_RC);
            for i in 0..3 {
                self.interp_pos[i] = self.interp_pos[i] * (1.0 - alpha) + rel[i] * alpha;
            }

            let residual = [
                rel[0] - self.interp_pos[0],
                rel[1] - self.interp_pos[1],
                rel[2] - self.interp_pos[2],
            ];
            rel = self.interp_pos;

            // Only the first axis counts, three times over. Changing this
            // moves the point at which the blend stops.
            let delta = residual[0].abs() + residual[0].abs() + residual[0].abs();

            if delta < INTERP_EPS {
                log::trace!("reltrans: interpolation stop");
                self.interpolating = false;
            }
        } else {
            self.interp_pos = rel;
        }

        let mut out = *value;
        out.set_translation(rel);
        out
    }

    /// Full compensation step: neck offset, zone pipeline, and re-zeroing of
    /// channels that axis selection disabled.
    pub fn apply(
        &mut self,
        config: &ReltransConfig,
        value: &Pose,
        disabled: &AxisMask,
        now: Instant,
    ) -> Pose {
        let neck = apply_neck(value, config.neck_enable, -f64::from(config.neck_z));

        let mut out = self.apply_pipeline(config.mode, value, &config.disable, now);

        for (i, offset) in neck.iter().enumerate() {
            out[i] += offset;
        }

        for k in 0..AXIS_COUNT {
            if disabled[k] {
                out[k] = 0.0;
            }
        }

        out
    }

    fn reset(&mut self) {
        self.interp_pos = [0.0; 3];
        self.last_tick = None;
        self.interpolating = false;
        self.in_zone = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(4);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rotate_identity() {
        let v = rotate(&euler::IDENTITY, &[1.0, -2.0, 3.0], [false; 3]);
        assert!(approx(v[0], 1.0) && approx(v[1], -2.0) && approx(v[2], 3.0));
    }

    #[test]
    fn test_rotate_disable_passthrough() {
        let r = euler::euler_to_rmat(&euler::to_radians(&[90.0, 0.0, 0.0]));
        let v = rotate(&r, &[0.0, 0.0, 10.0], [false, false, true]);
        assert!(approx(v[0], 10.0));
        assert!(approx(v[2], 10.0));
    }

    #[test]
    fn test_neck_disabled_or_zero() {
        let p = Pose::new(0.0, 0.0, 0.0, 45.0, 10.0, 0.0);
        assert_eq!(apply_neck(&p, false, 10.0), [0.0; 3]);
        assert_eq!(apply_neck(&p, true, 0.0), [0.0; 3]);
    }

    #[test]
    fn test_neck_forward_is_zero_offset() {
        let neck = apply_neck(&Pose::ZERO, true, 8.0);
        assert!(neck.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_neck_yaw_quarter_turn() {
        let p = Pose::new(0.0, 0.0, 0.0, 90.0, 0.0, 0.0);
        let neck = apply_neck(&p, true, 8.0);
        assert!(approx(neck[0], 8.0));
        assert!(approx(neck[1], 0.0));
        assert!(approx(neck[2], -8.0));
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let mut rel = Reltrans::new();
        let now = Instant::now();
        for yaw in [-170.0, -60.0, 0.0, 30.0, 120.0] {
            let p = Pose::new(3.0, -4.0, 5.0, yaw, 20.0, -10.0);
            let out = rel.apply_pipeline(ReltransMode::Disabled, &p, &ReltransDisable::default(), now);
            assert_eq!(out, p);
            assert!(!rel.is_interpolating());
            assert!(!rel.in_zone());
        }
    }

    #[test]
    fn test_always_on_converges_to_input_at_zero_rotation() {
        let mut rel = Reltrans::new();
        let disable = ReltransDisable::default();
        let p = Pose::new(10.0, 5.0, -2.0, 0.0, 0.0, 0.0);
        let start = Instant::now();

        // entering the zone on the first tick starts a blend from the origin
        rel.apply_pipeline(ReltransMode::AlwaysOn, &p, &disable, start);
        assert!(rel.is_interpolating());

        let mut t = start;
        for _ in 0..1000 {
            t += TICK;
            rel.apply_pipeline(ReltransMode::AlwaysOn, &p, &disable, t);
        }
        assert!(!rel.is_interpolating());

        t += TICK;
        let out = rel.apply_pipeline(ReltransMode::AlwaysOn, &p, &disable, t);
        for i in 0..3 {
            assert!(approx(out[i], p[i]), "{:?} vs {:?}", out, p);
        }
    }

    #[test]
    fn test_blend_moves_monotonically() {
        let mut rel = Reltrans::new();
        let disable = ReltransDisable::default();
        let p = Pose::new(10.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut t = Instant::now();
        let mut last = rel.apply_pipeline(ReltransMode::AlwaysOn, &p, &disable, t)[Axis::TX];
        assert!(approx(last, 0.0));

        for _ in 0..20 {
            t += TICK;
            let x = rel.apply_pipeline(ReltransMode::AlwaysOn, &p, &disable, t)[Axis::TX];
            assert!(x > last && x < 10.0);
            last = x;
        }
    }

    #[test]
    fn test_zone_transition_starts_interpolation() {
        let mut rel = Reltrans::new();
        let disable = ReltransDisable::default();
        let mut t = Instant::now();

        let forward = Pose::new(1.0, 2.0, 3.0, 10.0, 5.0, 0.0);
        let out = rel.apply_pipeline(ReltransMode::NonCenteredOnly, &forward, &disable, t);
        assert!(!rel.in_zone());
        assert!(!rel.is_interpolating());
        assert_eq!(out, forward);

        t += TICK;
        let away = Pose::new(1.0, 2.0, 3.0, 60.0, 5.0, 0.0);
        rel.apply_pipeline(ReltransMode::NonCenteredOnly, &away, &disable, t);
        assert!(rel.in_zone());
        assert!(rel.is_interpolating());

        // pitch alone also leaves the forward zone
        let mut rel = Reltrans::new();
        let down = Pose::new(1.0, 2.0, 3.0, 0.0, -45.0, 0.0);
        rel.apply_pipeline(ReltransMode::NonCenteredOnly, &down, &disable, t);
        assert!(rel.in_zone());
    }

    #[test]
    fn test_disable_resets_state() {
        let mut rel = Reltrans::new();
        let disable = ReltransDisable::default();
        let t = Instant::now();
        rel.apply_pipeline(ReltransMode::AlwaysOn, &Pose::new(5.0, 0.0, 0.0, 0.0, 0.0, 0.0), &disable, t);
        assert!(rel.is_interpolating());

        rel.apply_pipeline(ReltransMode::Disabled, &Pose::ZERO, &disable, t);
        assert!(!rel.is_interpolating());
        assert!(!rel.in_zone());
        assert_eq!(rel.interp_pos, [0.0; 3]);
    }

    #[test]
    fn test_apply_zeroes_disabled_axes() {
        let mut rel = Reltrans::new();
        let config = ReltransConfig {
            mode: ReltransMode::Disabled,
            neck_enable: true,
            neck_z: -8,
            ..ReltransConfig::default()
        };
        let p = Pose::new(1.0, 2.0, 3.0, 90.0, 0.0, 0.0);
        let mut disabled = [false; AXIS_COUNT];
        disabled[Axis::TX as usize] = true;

        let out = rel.apply(&config, &p, &disabled, Instant::now());
        // neck_z = -8 gives a neck length of 8: offset (8, 0, -8)
        assert_eq!(out[Axis::TX], 0.0);
        assert!(approx(out[Axis::TY], 2.0));
        assert!(approx(out[Axis::TZ], 3.0 - 8.0));
        assert_eq!(out[Axis::Yaw], 90.0);
    }
}
