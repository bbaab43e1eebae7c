//! NaN/infinity detection for pipeline risk points.

use crate::types::Pose;

/// A pose failed the finiteness check at the named stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonFinite {
    pub stage: &'static str,
}

/// Detects non-finite values and reports the first hit only.
#[derive(Debug, Default)]
pub struct NanGuard {
    reported: bool,
    hits: u64,
}

impl NanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when any channel of any pose is NaN or infinite.
    pub fn check(&mut self, stage: &'static str, poses: &[&Pose]) -> Result<(), NonFinite> {
        if poses.iter().all(|p| !p.has_non_finite()) {
            return Ok(());
        }

        self.hits += 1;
        if !self.reported {
            self.reported = true;
            log::warn!("nan check failed for: {} ({:?})", stage, poses);
        }
        Err(NonFinite { stage })
    }

    /// Number of failed checks so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of diagnostics emitted; never more than one.
    pub fn reports(&self) -> u64 {
        u64::from(self.reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;

    #[test]
    fn test_finite_passes() {
        let mut guard = NanGuard::new();
        let p = Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert!(guard.check("raw", &[&p, &Pose::ZERO]).is_ok());
        assert_eq!(guard.hits(), 0);
    }

    #[test]
    fn test_reports_once() {
        let mut guard = NanGuard::new();
        let mut bad = Pose::ZERO;
        bad[Axis::Roll] = f64::INFINITY;

        for _ in 0..5 {
            let err = guard.check("filtered", &[&Pose::ZERO, &bad]).unwrap_err();
            assert_eq!(err.stage, "filtered");
        }
        assert_eq!(guard.hits(), 5);
        assert_eq!(guard.reports(), 1);
    }
}
