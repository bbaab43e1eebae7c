//! Axis selection and rotation range clamping.

use crate::types::{AxisMask, Pose, AXIS_COUNT};

/// Source index that marks an output channel as disabled.
pub const DISABLED_SOURCE: i32 = 6;

/// Slack allowed past +-180 before an angle is re-wrapped instead of clamped.
const WRAP_EPS: f64 = 1e-2;

/// Route raw channels to output channels.
///
/// Output channel `i` takes `raw[sources[i]]`; any source outside `0..6`
/// yields 0. Channels whose source is [`DISABLED_SOURCE`] are also flagged
/// in the returned mask.
pub fn select_axes(raw: &Pose, sources: &[i32; AXIS_COUNT]) -> (Pose, AxisMask) {
    let mut value = Pose::ZERO;
    let mut disabled = [false; AXIS_COUNT];

    for (i, &src) in sources.iter().enumerate() {
        disabled[i] = src == DISABLED_SOURCE;
        value[i] = match usize::try_from(src) {
            Ok(k) if k < AXIS_COUNT => raw[k],
            _ => 0.0,
        };
    }

    (value, disabled)
}

/// Bring the three rotation channels back into +-180 degrees.
///
/// Some trackers emit angles past the canonical range, or exactly on the
/// boundary with rounding noise; both are folded back here. Translation
/// channels are untouched.
pub fn clamp_value(mut value: Pose) -> Pose {
    for i in 3..AXIS_COUNT {
        let x = value[i] % 360.0;
        value[i] = if x.abs() - WRAP_EPS > 180.0 {
            let offset = 180.0_f64.copysign(x);
            (x + offset) % 360.0 - offset
        } else {
            x.clamp(-180.0, 180.0)
        };
    }

    value
}
