//! # posepipe - real-time head pose pipeline
//!
//! Turns raw 6DOF tracker samples into a centered, compensated and
//! curve-mapped pose, pushed to an output protocol at a fixed tick rate.
//! Provides:
//! - A lock-free control flag register (center, enable, zero)
//! - Center reference frames and relative translation compensation
//! - A self-correcting tick scheduler on a dedicated worker thread
//! - Per-tick telemetry (CSV or channel)
//! - C FFI for integration with C/C++ hosts
//!
//! ## Quick Start
//! ```no_run
//! use posepipe::{Pipeline, Pose, Protocol, Tracker};
//! use std::time::Duration;
//!
//! struct Still;
//! impl Tracker for Still {
//!     fn data(&mut self, pose: &mut Pose) {
//!         *pose = Pose::new(0.0, 0.0, 0.0, 15.0, 0.0, 0.0);
//!     }
//! }
//!
//! struct Print;
//! impl Protocol for Print {
//!     fn pose(&mut self, pose: &Pose) {
//!         println!("{:?}", pose);
//!     }
//! }
//!
//! let handle = Pipeline::builder(Box::new(Still), Box::new(Print))
//!     .build()
//!     .start()
//!     .unwrap();
//! handle.control().set_center();
//! std::thread::sleep(Duration::from_millis(100));
//! handle.stop().unwrap();
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod flags;
pub mod euler;
pub mod axis;
pub mod center;
pub mod reltrans;
pub mod filter;
pub mod nan;
pub mod mapping;
pub mod plugin;
pub mod telemetry;
pub mod scheduler;
pub mod pipeline;
pub mod ffi;

pub use error::PipelineError;
pub use types::*;
pub use config::MainSettings;
pub use filter::Filter;
pub use mapping::{AxisMapping, Curve, Mappings};
pub use plugin::{EventHandler, EventOrdinal, Protocol, Tracker};
pub use telemetry::TrackLogger;
pub use pipeline::{Pipeline, PipelineControl};
pub use scheduler::PipelineHandle;

/// Result type alias for posepipe operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
