//! Pipeline settings.
//!
//! Defaults match a fresh profile. [`MainSettings::from_env`] lets a host
//! override individual values through `POSEPIPE_*` environment variables;
//! unparseable values keep the default.

use crate::types::ReltransMode;
use std::time::Duration;

/// Per-axis exclusions for relative translation compensation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReltransDisable {
    /// Leave source yaw out of the compensation matrix.
    pub src_yaw: bool,
    pub src_pitch: bool,
    pub src_roll: bool,
    /// Pass TX through unrotated.
    pub tx: bool,
    pub ty: bool,
    pub tz: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReltransConfig {
    pub mode: ReltransMode,
    pub disable: ReltransDisable,
    pub neck_enable: bool,
    /// Neck pivot position along the forward axis, tracker units. The pivot
    /// sits behind the head for negative values.
    pub neck_z: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MainSettings {
    /// Raise a centering request on the first non-zero tracker sample.
    pub center_at_startup: bool,
    pub reltrans: ReltransConfig,
    /// Target period of one pipeline tick.
    pub tick_interval: Duration,
    /// Divisor applied to rotations before they enter the scaled center
    /// frame; the result is multiplied back after conversion. Keeps the
    /// matrix/Euler round trip far from gimbal lock.
    pub rotation_scale: f64,
}

impl Default for MainSettings {
    fn default() -> Self {
        Self {
            center_at_startup: true,
            reltrans: ReltransConfig::default(),
            tick_interval: Duration::from_millis(4),
            rotation_scale: 16.0,
        }
    }
}

impl MainSettings {
    /// Defaults, overridden by any `POSEPIPE_*` variables that are set.
    pub fn from_env() -> Self {
        let d = Self::default();

        let mode = match std::env::var("POSEPIPE_RELTRANS") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                log::warn!("{} (keeping {:?})", e, d.reltrans.mode);
                d.reltrans.mode
            }),
            Err(_) => d.reltrans.mode,
        };

        let disable = ReltransDisable {
            src_yaw: read_env_bool("POSEPIPE_RELTRANS_DISABLE_SRC_YAW", false),
            src_pitch: read_env_bool("POSEPIPE_RELTRANS_DISABLE_SRC_PITCH", false),
            src_roll: read_env_bool("POSEPIPE_RELTRANS_DISABLE_SRC_ROLL", false),
            tx: read_env_bool("POSEPIPE_RELTRANS_DISABLE_TX", false),
            ty: read_env_bool("POSEPIPE_RELTRANS_DISABLE_TY", false),
            tz: read_env_bool("POSEPIPE_RELTRANS_DISABLE_TZ", false),
        };

        let tick_ms = read_env_u8("POSEPIPE_TICK_MS", d.tick_interval.as_millis() as u8).max(1);
        let rotation_scale = read_env_f64("POSEPIPE_ROTATION_SCALE", d.rotation_scale);

        Self {
            center_at_startup: read_env_bool("POSEPIPE_CENTER_AT_STARTUP", d.center_at_startup),
            reltrans: ReltransConfig {
                mode,
                disable,
                neck_enable: read_env_bool("POSEPIPE_NECK_ENABLE", d.reltrans.neck_enable),
                neck_z: read_env_i32("POSEPIPE_NECK_Z", d.reltrans.neck_z),
            },
            tick_interval: Duration::from_millis(u64::from(tick_ms)),
            rotation_scale: if rotation_scale.is_finite() && rotation_scale > 0.0 {
                rotation_scale
            } else {
                d.rotation_scale
            },
        }
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn read_env_i32(name: &str, default: i32) -> i32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn read_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = MainSettings::default();
        assert!(s.center_at_startup);
        assert_eq!(s.reltrans.mode, ReltransMode::Disabled);
        assert!(!s.reltrans.neck_enable);
        assert_eq!(s.tick_interval, Duration::from_millis(4));
        assert_eq!(s.rotation_scale, 16.0);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_from_env_overrides() {
        // variable names unique to this test; nothing else reads them
        std::env::set_var("POSEPIPE_NECK_Z", "-12");
        std::env::set_var("POSEPIPE_RELTRANS", "non_centered");
        std::env::set_var("POSEPIPE_ROTATION_SCALE", "-3");
        let s = MainSettings::from_env();
        std::env::remove_var("POSEPIPE_NECK_Z");
        std::env::remove_var("POSEPIPE_RELTRANS");
        std::env::remove_var("POSEPIPE_ROTATION_SCALE");

        assert_eq!(s.reltrans.neck_z, -12);
        assert_eq!(s.reltrans.mode, ReltransMode::NonCenteredOnly);
        // non-positive scale falls back
        assert_eq!(s.rotation_scale, 16.0);
    }
}
