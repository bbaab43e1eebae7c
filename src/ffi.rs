//! C API for posepipe.
//!
//! A C host supplies the tracker and protocol as callbacks and drives the
//! running pipeline through an opaque handle. Settings come from the
//! `POSEPIPE_*` environment variables. The header is written to
//! `include/posepipe.h` by cbindgen.

use crate::error::LastError;
use crate::pipeline::Pipeline;
use crate::plugin::{Protocol, Tracker};
use crate::scheduler::PipelineHandle;
use crate::types::{Pose, AXIS_COUNT};
use crate::{MainSettings, PipelineError};
use std::ffi::{c_char, c_int, c_void};

static LAST_ERROR: LastError = LastError::new();

/// Opaque running-pipeline handle for C consumers.
pub struct PpPipeline(PipelineHandle);

/// Fill `pose` (6 doubles: TX, TY, TZ, yaw, pitch, roll) with the latest sample.
pub type PpTrackerData = Option<extern "C" fn(user: *mut c_void, pose: *mut f64)>;

/// Return true if the device recenters itself. May be NULL.
pub type PpTrackerCenter = Option<extern "C" fn(user: *mut c_void) -> bool>;

/// Receive the mapped pose (6 doubles).
pub type PpProtocolPose = Option<extern "C" fn(user: *mut c_void, pose: *const f64)>;

/// Host-owned context pointer handed back to the callbacks.
struct UserData(*mut c_void);

// The host promises its callbacks may be invoked from the worker thread.
unsafe impl Send for UserData {}

struct CallbackTracker {
    data: extern "C" fn(*mut c_void, *mut f64),
    center: PpTrackerCenter,
    user: UserData,
}

impl Tracker for CallbackTracker {
    fn data(&mut self, pose: &mut Pose) {
        (self.data)(self.user.0, pose.0.as_mut_ptr());
    }

    fn center(&mut self) -> bool {
        match self.center {
            Some(f) => f(self.user.0),
            None => false,
        }
    }
}

struct CallbackProtocol {
    pose: extern "C" fn(*mut c_void, *const f64),
    user: UserData,
}

impl Protocol for CallbackProtocol {
    fn pose(&mut self, pose: &Pose) {
        (self.pose)(self.user.0, pose.0.as_ptr());
    }
}

fn start(
    tracker_data: PpTrackerData,
    tracker_center: PpTrackerCenter,
    tracker_user: *mut c_void,
    protocol_pose: PpProtocolPose,
    protocol_user: *mut c_void,
) -> crate::Result<PipelineHandle> {
    let data = tracker_data.ok_or(PipelineError::NullPointer)?;
    let pose = protocol_pose.ok_or(PipelineError::NullPointer)?;

    let tracker = CallbackTracker {
        data,
        center: tracker_center,
        user: UserData(tracker_user),
    };
    let protocol = CallbackProtocol {
        pose,
        user: UserData(protocol_user),
    };

    Pipeline::builder(Box::new(tracker), Box::new(protocol))
        .settings(MainSettings::from_env())
        .build()
        .start()
}

/// Start a pipeline on its own thread.
/// Returns NULL on error (check pp_last_error()).
#[no_mangle]
pub extern "C" fn pp_start(
    tracker_data: PpTrackerData,
    tracker_center: PpTrackerCenter,
    tracker_user: *mut c_void,
    protocol_pose: PpProtocolPose,
    protocol_user: *mut c_void,
) -> *mut PpPipeline {
    match start(tracker_data, tracker_center, tracker_user, protocol_pose, protocol_user) {
        Ok(handle) => Box::into_raw(Box::new(PpPipeline(handle))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Stop the pipeline, wait for its worker, and free the handle.
///
/// # Safety
/// `p` must be a pointer returned by `pp_start`, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_stop(p: *mut PpPipeline) {
    if !p.is_null() {
        let handle = Box::from_raw(p).0;
        if let Err(e) = handle.stop() {
            LAST_ERROR.set(&e);
        }
    }
}

/// Request centering on the next tick.
///
/// # Safety
/// `p` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_set_center(p: *const PpPipeline) {
    if let Some(p) = p.as_ref() {
        p.0.control().set_center();
    }
}

/// # Safety
/// `p` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_set_enabled(p: *const PpPipeline, value: bool) {
    if let Some(p) = p.as_ref() {
        p.0.control().set_enabled(value);
    }
}

/// # Safety
/// `p` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_toggle_enabled(p: *const PpPipeline) {
    if let Some(p) = p.as_ref() {
        p.0.control().toggle_enabled();
    }
}

/// # Safety
/// `p` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_set_zero(p: *const PpPipeline, value: bool) {
    if let Some(p) = p.as_ref() {
        p.0.control().set_zero(value);
    }
}

/// # Safety
/// `p` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn pp_toggle_zero(p: *const PpPipeline) {
    if let Some(p) = p.as_ref() {
        p.0.control().toggle_zero();
    }
}

/// Copy the last raw and mapped pose (6 doubles each).
/// Returns 0 on success, -1 on a null argument.
///
/// # Safety
/// `p` must be a valid pipeline pointer; `raw` and `mapped` must each point
/// to at least 6 writable doubles. Any of them may be null.
#[no_mangle]
pub unsafe extern "C" fn pp_raw_and_mapped_pose(
    p: *const PpPipeline,
    raw: *mut f64,
    mapped: *mut f64,
) -> c_int {
    if p.is_null() || raw.is_null() || mapped.is_null() {
        LAST_ERROR.set(&PipelineError::NullPointer);
        return -1;
    }
    let p = &*p;

    let mut r = [0.0; AXIS_COUNT];
    let mut m = [0.0; AXIS_COUNT];
    p.0.control().raw_and_mapped_pose(&mut r, &mut m);
    raw.copy_from_nonoverlapping(r.as_ptr(), AXIS_COUNT);
    mapped.copy_from_nonoverlapping(m.as_ptr(), AXIS_COUNT);
    0
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next posepipe API call.
#[no_mangle]
pub extern "C" fn pp_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    extern "C" fn fixed_pose(_user: *mut c_void, pose: *mut f64) {
        let values = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        unsafe { pose.copy_from_nonoverlapping(values.as_ptr(), 6) };
    }

    extern "C" fn count_pose(user: *mut c_void, _pose: *const f64) {
        let counter = unsafe { &*(user as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_null_callbacks_rejected() {
        let p = pp_start(None, None, std::ptr::null_mut(), None, std::ptr::null_mut());
        assert!(p.is_null());
        assert!(!pp_last_error().is_null());
    }

    #[test]
    fn test_start_read_stop() {
        static POSES: AtomicUsize = AtomicUsize::new(0);
        let user = &POSES as *const AtomicUsize as *mut c_void;

        let p = pp_start(
            Some(fixed_pose),
            None,
            std::ptr::null_mut(),
            Some(count_pose),
            user,
        );
        assert!(!p.is_null());

        unsafe { pp_set_center(p) };
        std::thread::sleep(Duration::from_millis(40));

        let mut raw = [0.0; 6];
        let mut mapped = [0.0; 6];
        let rc = unsafe { pp_raw_and_mapped_pose(p, raw.as_mut_ptr(), mapped.as_mut_ptr()) };
        assert_eq!(rc, 0);
        assert_eq!(raw, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);

        unsafe { pp_stop(p) };
        assert!(POSES.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_null_handle_is_ignored() {
        unsafe {
            pp_set_center(std::ptr::null());
            pp_toggle_zero(std::ptr::null());
            pp_stop(std::ptr::null_mut());
            assert_eq!(
                pp_raw_and_mapped_pose(std::ptr::null(), std::ptr::null_mut(), std::ptr::null_mut()),
                -1
            );
        }
    }
}
