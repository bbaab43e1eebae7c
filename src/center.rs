//! Center reference frame.
//!
//! Holds the orientation captured at the last centering event and makes
//! every later pose relative to it. Two rotation frames are kept: one built
//! from the rotation divided by the configured scale (used for the output
//! rotation, to keep the Euler round trip well conditioned) and one built
//! from the unscaled rotation (used to re-project translation). Both are
//! written by the same call so they cannot drift apart.

use crate::euler::{self, Rmat, Vec3, IDENTITY};
use crate::reltrans;
use crate::types::{Pose, AXIS_COUNT};

/// What to do with the center reference on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterRequest {
    /// Keep the current reference.
    None,
    /// The tracker centers itself; reset the reference to the origin.
    Device,
    /// Capture the current pose as the new origin.
    Capture,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    rotation: Rmat,
    rot_center: Rmat,
}

impl Frame {
    const fn new() -> Self {
        Self {
            rotation: IDENTITY,
            rot_center: IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CenterFrame {
    scaled: Frame,
    real: Frame,
    t_center: Vec3,
    scale: f64,
}

impl CenterFrame {
    pub fn new(rotation_scale: f64) -> Self {
        Self {
            scaled: Frame::new(),
            real: Frame::new(),
            t_center: [0.0; 3],
            scale: rotation_scale,
        }
    }

    /// Refresh both frames' current rotation from `value`, then apply
    /// `request` to the reference. The reference is only ever written here.
    pub fn update(&mut self, value: &Pose, request: CenterRequest) {
        let angles = euler::to_radians(&value.rotation());
        self.scaled.rotation = euler::euler_to_rmat(&euler::scale(&angles, 1.0 / self.scale));
        self.real.rotation = euler::euler_to_rmat(&angles);

        match request {
            CenterRequest::None => {}
            CenterRequest::Device => {
                log::debug!("center: tracker centers itself, reference reset");
                self.scaled.rot_center = IDENTITY;
                self.real.rot_center = IDENTITY;
                self.t_center = [0.0; 3];
            }
            CenterRequest::Capture => {
                log::debug!("center: captured {:?}", value);
                self.scaled.rot_center = euler::transpose(&self.scaled.rotation);
                self.real.rot_center = euler::transpose(&self.real.rotation);
                self.t_center = value.translation();
            }
        }
    }

    /// Express `value` relative to the reference and apply per-axis
    /// inversion. Must follow [`CenterFrame::update`] for the same pose.
    pub fn apply_center(&self, mut value: Pose, invert: &[bool; AXIS_COUNT]) -> Pose {
        let rotation = euler::mul(&self.scaled.rotation, &self.scaled.rot_center);
        let t = value.translation();
        let pos = [
            t[0] - self.t_center[0],
            t[1] - self.t_center[1],
            t[2] - self.t_center[2],
        ];
        let mut rot = euler::to_degrees(&euler::scale(&euler::rmat_to_euler(&rotation), self.scale));
        let mut pos = reltrans::rotate(&self.real.rot_center, &pos, [false; 3]);

        for i in 0..3 {
            if invert[i + 3] {
                rot[i] = -rot[i];
            }
            if invert[i] {
                pos[i] = -pos[i];
            }
        }

        value.set_translation(pos);
        value.set_rotation(rot);
        value
    }

    pub fn t_center(&self) -> Vec3 {
        self.t_center
    }

    /// False if any stored matrix or the translation reference went
    /// non-finite.
    pub fn is_finite(&self) -> bool {
        euler::rmat_is_finite(&self.scaled.rotation)
            && euler::rmat_is_finite(&self.scaled.rot_center)
            && euler::rmat_is_finite(&self.real.rotation)
            && euler::rmat_is_finite(&self.real.rot_center)
            && self.t_center.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;

    const NO_INVERT: [bool; AXIS_COUNT] = [false; AXIS_COUNT];

    fn assert_pose_near(a: &Pose, b: &Pose) {
        for i in 0..AXIS_COUNT {
            assert!((a[i] - b[i]).abs() < 1e-6, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_uncentered_is_passthrough() {
        let mut frame = CenterFrame::new(16.0);
        let p = Pose::new(1.0, 2.0, 3.0, 30.0, -15.0, 5.0);
        frame.update(&p, CenterRequest::None);
        assert_pose_near(&frame.apply_center(p, &NO_INVERT), &p);
    }

    #[test]
    fn test_capture_makes_origin() {
        let mut frame = CenterFrame::new(16.0);
        let p = Pose::new(4.0, -3.0, 12.0, 40.0, 20.0, -10.0);
        frame.update(&p, CenterRequest::Capture);
        assert_pose_near(&frame.apply_center(p, &NO_INVERT), &Pose::ZERO);
        assert_eq!(frame.t_center(), [4.0, -3.0, 12.0]);
    }

    #[test]
    fn test_reference_stable_between_events() {
        let mut frame = CenterFrame::new(16.0);
        let origin = Pose::new(0.0, 0.0, 0.0, 20.0, 0.0, 0.0);
        frame.update(&origin, CenterRequest::Capture);

        let turned = Pose::new(0.0, 0.0, 0.0, 30.0, 0.0, 0.0);
        frame.update(&turned, CenterRequest::None);
        let out = frame.apply_center(turned, &NO_INVERT);
        assert!((out[Axis::Yaw] - 10.0).abs() < 1e-6);
        assert!(out[Axis::Pitch].abs() < 1e-6);
    }

    #[test]
    fn test_device_centering_resets_reference() {
        let mut frame = CenterFrame::new(16.0);
        let p = Pose::new(4.0, -3.0, 12.0, 40.0, 20.0, -10.0);
        frame.update(&p, CenterRequest::Capture);
        frame.update(&p, CenterRequest::Device);
        assert_eq!(frame.t_center(), [0.0; 3]);
        assert_pose_near(&frame.apply_center(p, &NO_INVERT), &p);
    }

    #[test]
    fn test_inversion() {
        let mut frame = CenterFrame::new(1.0);
        let p = Pose::new(1.0, 2.0, 3.0, 10.0, 0.0, 0.0);
        frame.update(&p, CenterRequest::None);
        let mut invert = NO_INVERT;
        invert[Axis::TY as usize] = true;
        invert[Axis::Yaw as usize] = true;
        let out = frame.apply_center(p, &invert);
        assert!((out[Axis::TY] + 2.0).abs() < 1e-9);
        assert!((out[Axis::Yaw] + 10.0).abs() < 1e-6);
        assert!((out[Axis::TX] - 1.0).abs() < 1e-9);
    }
}
