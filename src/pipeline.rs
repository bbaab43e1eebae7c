//! The per-tick pose pipeline.
//!
//! One tick reads the tracker, routes and clamps axes, recenters, filters,
//! maps rotations, applies relative translation compensation, maps
//! translations, and hands the result to the protocol. A non-finite value
//! at any checked stage replaces the tick's result with the last published
//! one.

use crate::axis::{clamp_value, select_axes};
use crate::center::{CenterFrame, CenterRequest};
use crate::config::MainSettings;
use crate::filter::{maybe_apply_filter, Filter};
use crate::flags::FlagRegister;
use crate::mapping::Mappings;
use crate::nan::{NanGuard, NonFinite};
use crate::plugin::{EventHandler, EventOrdinal, NoEvents, Protocol, Tracker};
use crate::reltrans::Reltrans;
use crate::scheduler::PipelineHandle;
use crate::telemetry::{self, NullLogger, TrackLogger};
use crate::types::{Flags, Pose, Snapshot, AXIS_COUNT};
use crate::Result;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// State shared between the worker and control callers.
struct Shared {
    flags: FlagRegister,
    output: Mutex<Snapshot>,
}

impl Shared {
    fn output(&self) -> MutexGuard<'_, Snapshot> {
        match self.output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cloneable, thread-safe control surface of a pipeline.
///
/// Flag changes are lock-free; the snapshot read takes a short lock.
#[derive(Clone)]
pub struct PipelineControl {
    shared: Arc<Shared>,
}

impl PipelineControl {
    /// Request centering on the next tick.
    pub fn set_center(&self) {
        self.shared.flags.set(Flags::CENTER, true);
    }

    /// Hardware switch / held hotkey.
    pub fn set_enabled(&self, value: bool) {
        self.shared.flags.set(Flags::ENABLED_HOTKEY, value);
    }

    /// User toggle.
    pub fn toggle_enabled(&self) {
        self.shared.flags.negate(Flags::ENABLED_USER);
    }

    pub fn set_zero(&self, value: bool) {
        self.shared.flags.set(Flags::ZERO, value);
    }

    pub fn toggle_zero(&self) {
        self.shared.flags.negate(Flags::ZERO);
    }

    pub fn flags(&self) -> Flags {
        self.shared.flags.load()
    }

    /// Last published raw and mapped pose.
    pub fn snapshot(&self) -> Snapshot {
        *self.shared.output()
    }

    /// Copy the last raw and mapped pose into caller buffers.
    pub fn raw_and_mapped_pose(&self, raw: &mut [f64; AXIS_COUNT], mapped: &mut [f64; AXIS_COUNT]) {
        let out = self.shared.output();
        *raw = out.raw.0;
        *mapped = out.mapped.0;
    }
}

impl std::fmt::Debug for PipelineControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineControl")
            .field("flags", &self.shared.flags)
            .finish_non_exhaustive()
    }
}

pub struct PipelineBuilder {
    tracker: Box<dyn Tracker>,
    protocol: Box<dyn Protocol>,
    settings: MainSettings,
    mappings: Mappings,
    filter: Option<Box<dyn Filter>>,
    events: Box<dyn EventHandler>,
    logger: Box<dyn TrackLogger>,
}

impl PipelineBuilder {
    pub fn settings(mut self, settings: MainSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn mappings(mut self, mappings: Mappings) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn events(mut self, events: Box<dyn EventHandler>) -> Self {
        self.events = events;
        self
    }

    pub fn logger(mut self, logger: Box<dyn TrackLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Pipeline {
        let center = CenterFrame::new(self.settings.rotation_scale);
        Pipeline {
            shared: Arc::new(Shared {
                flags: FlagRegister::new(),
                output: Mutex::new(Snapshot::default()),
            }),
            settings: self.settings,
            mappings: self.mappings,
            tracker: self.tracker,
            filter: self.filter,
            protocol: self.protocol,
            events: self.events,
            logger: self.logger,
            center,
            reltrans: Reltrans::new(),
            nan: NanGuard::new(),
            newpose: Pose::ZERO,
            tracking_started: false,
            logged_stages: 0,
        }
    }
}

/// Pipeline context: collaborators plus all state one tick touches.
///
/// Everything except the flags and the output snapshot is owned by whoever
/// calls [`Pipeline::tick`], normally the worker started by
/// [`Pipeline::start`].
pub struct Pipeline {
    shared: Arc<Shared>,
    settings: MainSettings,
    mappings: Mappings,
    tracker: Box<dyn Tracker>,
    filter: Option<Box<dyn Filter>>,
    protocol: Box<dyn Protocol>,
    events: Box<dyn EventHandler>,
    logger: Box<dyn TrackLogger>,
    center: CenterFrame,
    reltrans: Reltrans,
    nan: NanGuard,
    /// Last accepted tracker sample; held while tracking is disabled.
    newpose: Pose,
    tracking_started: bool,
    /// Pose columns written to the current telemetry line.
    logged_stages: usize,
}

impl Pipeline {
    /// Start building a pipeline with default settings, identity mappings,
    /// no filter, no hooks and no telemetry.
    pub fn builder(tracker: Box<dyn Tracker>, protocol: Box<dyn Protocol>) -> PipelineBuilder {
        PipelineBuilder {
            tracker,
            protocol,
            settings: MainSettings::default(),
            mappings: Mappings::identity(),
            filter: None,
            events: Box::new(NoEvents),
            logger: Box::new(NullLogger),
        }
    }

    /// Run the pipeline on its own thread at the configured tick rate.
    pub fn start(self) -> Result<PipelineHandle> {
        PipelineHandle::start(self)
    }

    pub fn control(&self) -> PipelineControl {
        PipelineControl {
            shared: self.shared.clone(),
        }
    }

    pub fn settings(&self) -> &MainSettings {
        &self.settings
    }

    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    pub fn mappings_mut(&mut self) -> &mut Mappings {
        &mut self.mappings
    }

    pub fn reltrans(&self) -> &Reltrans {
        &self.reltrans
    }

    pub fn nan_guard(&self) -> &NanGuard {
        &self.nan
    }

    pub fn center_frame(&self) -> &CenterFrame {
        &self.center
    }

    pub(crate) fn write_log_header(&mut self) {
        telemetry::write_header(self.logger.as_mut());
        self.logger.reset_dt();
    }

    /// Run one full tick. `now` drives the reltrans blend timer.
    pub fn tick(&mut self, now: Instant) {
        self.logger.write_dt();
        self.logger.reset_dt();

        // must be decided before the tracker is read
        let center_ordered = self.shared.flags.get(Flags::CENTER) && self.tracking_started;
        let own_center_logic = center_ordered && self.tracker.center();

        match self.compute(own_center_logic, now) {
            Ok((value, raw)) => self.finish(value, raw, true),
            Err(_) => {
                let (value, raw) = self.fallback();
                self.finish(value, raw, false);
            }
        }
    }

    /// Orderly stop: release the protocol at the origin and drop curve
    /// highlighting.
    pub fn shutdown(&mut self) {
        self.protocol.pose(&Pose::ZERO);
        self.mappings.deactivate_all();
    }

    fn compute(&mut self, own_center_logic: bool, now: Instant) -> std::result::Result<(Pose, Pose), NonFinite> {
        let mut sample = Pose::ZERO;
        self.tracker.data(&mut sample);
        self.nan.check("tracker data", &[&sample])?;
        self.events.run_events(EventOrdinal::Raw, &mut sample);

        let flags = self.shared.flags.load();
        if flags.contains(Flags::ENABLED_USER) ^ !flags.contains(Flags::ENABLED_HOTKEY) {
            self.newpose = sample;
        }

        let raw = self.newpose;
        let (value, disabled) = select_axes(&raw, &self.mappings.sources());
        self.log_stage(&raw);

        let mut value = clamp_value(value);

        self.maybe_enable_center_on_tracking_started();
        let request = if self.shared.flags.get(Flags::CENTER) {
            if let Some(filter) = self.filter.as_deref_mut() {
                filter.center();
            }
            if own_center_logic {
                CenterRequest::Device
            } else {
                CenterRequest::Capture
            }
        } else {
            CenterRequest::None
        };
        self.center.update(&value, request);
        value = self.center.apply_center(value, &self.mappings.inverts());
        self.log_stage(&value);

        self.events.run_events(EventOrdinal::BeforeFilter, &mut value);
        value = maybe_apply_filter(self.filter.as_deref_mut(), &value);
        self.nan.check("filtered", &[&value])?;
        self.log_stage(&value);

        // rotations are mapped before reltrans, translations after
        self.events.run_events(EventOrdinal::BeforeMapping, &mut value);
        for i in 3..AXIS_COUNT {
            value[i] = self.mappings.map(i, value[i]);
        }

        value = self.reltrans.apply(&self.settings.reltrans, &value, &disabled, now);

        for i in 0..3 {
            value[i] = self.mappings.map(i, value[i]);
        }
        self.nan.check("mapped", &[&value])?;

        Ok((value, raw))
    }

    /// Last published poses, with the curves re-evaluated for display.
    fn fallback(&mut self) -> (Pose, Pose) {
        let last = *self.shared.output();
        for i in 0..AXIS_COUNT {
            let _ = self.mappings.map(i, last.raw[i]);
        }
        (last.mapped, last.raw)
    }

    /// Publish the tick's result. `fresh` is false for a fallback value,
    /// which already carries the zero offsets.
    fn finish(&mut self, mut value: Pose, raw: Pose, fresh: bool) {
        let flags = &self.shared.flags;
        flags.set(Flags::CENTER, false);

        if flags.get(Flags::ZERO) {
            value = Pose::ZERO;
        }
        if fresh {
            value = self.mappings.apply_zero_pos(value);
        }

        self.events.run_events(EventOrdinal::Finished, &mut value);
        self.protocol.pose(&value);

        *self.shared.output() = Snapshot { raw, mapped: value };

        // stages skipped by a non-finite value still fill their columns
        let unfilled = Pose([f64::NAN; AXIS_COUNT]);
        while self.logged_stages < telemetry::STAGES.len() - 1 {
            self.log_stage(&unfilled);
        }
        self.logged_stages = 0;
        self.logger.write_pose(&value);
        self.logger.reset_dt();
        self.logger.next_line();
    }

    fn log_stage(&mut self, pose: &Pose) {
        self.logger.write_pose(pose);
        self.logged_stages += 1;
    }

    fn maybe_enable_center_on_tracking_started(&mut self) {
        if self.tracking_started {
            return;
        }

        if self.newpose.0.iter().any(|v| *v != 0.0) {
            self.tracking_started = true;
            log::info!("tracking started");
            if self.settings.center_at_startup {
                self.shared.flags.set(Flags::CENTER, true);
            }
        }
    }
}
