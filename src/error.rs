use std::fmt;

/// Errors raised outside the tick: starting/stopping the worker,
/// configuration, and telemetry I/O.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to spawn pipeline thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("Pipeline already stopped")]
    AlreadyStopped,

    #[error("Pipeline worker panicked")]
    WorkerPanicked,

    #[error("Telemetry write failed: {0}")]
    Telemetry(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Null pointer passed across the C API")]
    NullPointer,
}

/// Thread-safe last-error storage for the C API.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &PipelineError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_nul_terminated() {
        let last = LastError::new();
        assert!(last.as_ptr().is_null());

        last.set(&PipelineError::AlreadyStopped);
        let ptr = last.as_ptr();
        assert!(!ptr.is_null());
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "Pipeline already stopped");
    }
}
