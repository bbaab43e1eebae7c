//! Collaborator interfaces the pipeline drives once per tick.
//!
//! All collaborators move onto the worker thread together with the
//! pipeline, hence the `Send` bounds.

use crate::types::Pose;

/// Source of raw 6DOF samples.
pub trait Tracker: Send {
    /// Fill `pose` with the latest sample.
    fn data(&mut self, pose: &mut Pose);

    /// Called when a centering request is pending. Return true if the device
    /// recenters itself, in which case the pipeline resets its own reference
    /// to the origin instead of capturing the current pose.
    fn center(&mut self) -> bool {
        false
    }
}

/// Consumer of the final mapped pose.
pub trait Protocol: Send {
    fn pose(&mut self, pose: &Pose);
}

/// Fixed hook points inside one tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrdinal {
    /// Right after the tracker sample was read.
    Raw = 0,
    BeforeFilter = 1,
    BeforeMapping = 2,
    /// After zero offsets, just before the protocol sees the pose.
    Finished = 3,
}

/// User hooks that may inspect or rewrite the pose at each [`EventOrdinal`].
pub trait EventHandler: Send {
    fn run_events(&mut self, event: EventOrdinal, pose: &mut Pose);
}

/// Handler with no hooks installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl EventHandler for NoEvents {
    fn run_events(&mut self, _event: EventOrdinal, _pose: &mut Pose) {}
}
