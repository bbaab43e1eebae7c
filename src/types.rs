use std::ops::{Index, IndexMut};

/// Index of one of the six pose channels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    TX = 0,
    TY = 1,
    TZ = 2,
    Yaw = 3,
    Pitch = 4,
    Roll = 5,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::TX,
        Axis::TY,
        Axis::TZ,
        Axis::Yaw,
        Axis::Pitch,
        Axis::Roll,
    ];

    /// Short column name, as used in telemetry headers.
    pub fn name(self) -> &'static str {
        match self {
            Axis::TX => "TX",
            Axis::TY => "TY",
            Axis::TZ => "TZ",
            Axis::Yaw => "Yaw",
            Axis::Pitch => "Pitch",
            Axis::Roll => "Roll",
        }
    }

    pub fn is_rotation(self) -> bool {
        self as usize >= 3
    }
}

/// Number of pose channels.
pub const AXIS_COUNT: usize = 6;

/// 6DOF pose `[TX, TY, TZ, Yaw, Pitch, Roll]`.
///
/// Translations are in tracker units (usually centimeters), rotations in
/// degrees. Nothing here normalizes angles; see [`crate::axis::clamp_value`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose(pub [f64; AXIS_COUNT]);

impl Pose {
    pub const ZERO: Pose = Pose([0.0; AXIS_COUNT]);

    pub fn new(tx: f64, ty: f64, tz: f64, yaw: f64, pitch: f64, roll: f64) -> Self {
        Pose([tx, ty, tz, yaw, pitch, roll])
    }

    /// Translation part `[TX, TY, TZ]`.
    pub fn translation(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Rotation part `[Yaw, Pitch, Roll]` in degrees.
    pub fn rotation(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    pub fn set_translation(&mut self, t: [f64; 3]) {
        self.0[..3].copy_from_slice(&t);
    }

    pub fn set_rotation(&mut self, r: [f64; 3]) {
        self.0[3..].copy_from_slice(&r);
    }

    /// True when any channel is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.0.iter().any(|v| !v.is_finite())
    }
}

impl From<[f64; AXIS_COUNT]> for Pose {
    fn from(values: [f64; AXIS_COUNT]) -> Self {
        Pose(values)
    }
}

impl Index<Axis> for Pose {
    type Output = f64;

    fn index(&self, axis: Axis) -> &f64 {
        &self.0[axis as usize]
    }
}

impl IndexMut<Axis> for Pose {
    fn index_mut(&mut self, axis: Axis) -> &mut f64 {
        &mut self.0[axis as usize]
    }
}

impl Index<usize> for Pose {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Pose {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

/// Per-channel "disabled" marks produced by axis selection.
pub type AxisMask = [bool; AXIS_COUNT];

bitflags::bitflags! {
    /// Control bits shared between the worker thread and control callers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    pub struct Flags: u32 {
        /// A centering request is pending.
        const CENTER         = 1 << 0;
        /// Tracking enabled by the hardware switch / hotkey hold.
        const ENABLED_HOTKEY = 1 << 1;
        /// Tracking enabled by the user toggle.
        const ENABLED_USER   = 1 << 2;
        /// Force the output to the zero pose.
        const ZERO           = 1 << 3;
    }
}

/// Relative translation compensation mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReltransMode {
    #[default]
    Disabled = 0,
    /// Compensate at every orientation.
    AlwaysOn = 1,
    /// Compensate only when looking away from the forward zone.
    NonCenteredOnly = 2,
}

impl std::str::FromStr for ReltransMode {
    type Err = crate::PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "0" => Ok(ReltransMode::Disabled),
            "always" | "always_on" | "on" | "1" => Ok(ReltransMode::AlwaysOn),
            "non_centered" | "non_centered_only" | "noncenter" | "2" => {
                Ok(ReltransMode::NonCenteredOnly)
            }
            other => Err(crate::PipelineError::InvalidConfig(format!(
                "unknown reltrans mode '{}'",
                other
            ))),
        }
    }
}

/// Last raw and mapped pose, as published once per tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub raw: Pose,
    pub mapped: Pose,
}
