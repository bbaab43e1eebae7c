//! Smoothing filter interface.

use crate::types::{Pose, AXIS_COUNT};
use std::time::Instant;

/// Pluggable smoothing stage.
///
/// The pipeline checks the output for NaN/infinity itself; filters are not
/// expected to validate.
pub trait Filter: Send {
    fn filter(&mut self, input: &Pose, output: &mut Pose);

    /// Drop internal history. Called on every centering event.
    fn center(&mut self) {}
}

/// Run `filter` on `value`, or pass it through when no filter is set.
pub fn maybe_apply_filter(filter: Option<&mut (dyn Filter + '_)>, value: &Pose) -> Pose {
    let mut out = *value;
    if let Some(f) = filter {
        f.filter(value, &mut out);
    }
    out
}

/// First-order low-pass filter with a per-channel time constant.
///
/// `alpha = dt / (dt + rc)` from the wall-clock time between calls.
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    rc: [f64; AXIS_COUNT],
    last: Option<(Instant, Pose)>,
}

impl ExponentialFilter {
    pub fn new(rc: [f64; AXIS_COUNT]) -> Self {
        Self { rc, last: None }
    }

    /// Same time constant on every channel.
    pub fn uniform(rc: f64) -> Self {
        Self::new([rc; AXIS_COUNT])
    }

    fn step(&mut self, input: &Pose, now: Instant) -> Pose {
        let out = match self.last {
            None => *input,
            Some((t, prev)) => {
                let dt = now.saturating_duration_since(t).as_secs_f64();
                let mut out = prev;
                for i in 0..AXIS_COUNT {
                    let rc = self.rc[i].max(0.0);
                    let alpha = if dt + rc > 0.0 { dt / (dt + rc) } else { 1.0 };
                    out[i] = prev[i] + alpha * (input[i] - prev[i]);
                }
                out
            }
        };
        self.last = Some((now, out));
        out
    }
}

impl Filter for ExponentialFilter {
    fn filter(&mut self, input: &Pose, output: &mut Pose) {
        *output = self.step(input, Instant::now());
    }

    fn center(&mut self) {
        self.last = None;
    }
}
