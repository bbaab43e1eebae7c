use crate::pipeline::{Pipeline, PipelineControl};
use crate::{PipelineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backlog beyond which the loop gives up catching up.
pub const MAX_BACKLOG: Duration = Duration::from_secs(3);

/// Longest sleep between ticks.
pub const MAX_SLEEP: Duration = Duration::from_millis(10);

/// Signed drift between the target tick period and the measured one.
///
/// Slow ticks accumulate positive backlog, which shortens the following
/// sleeps until the loop is back on schedule.
#[derive(Debug, Clone)]
pub struct Backlog {
    target: Duration,
    backlog_ns: i128,
}

impl Backlog {
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            backlog_ns: 0,
        }
    }

    /// Account for one tick that took `elapsed` and return how long to
    /// sleep before the next one, within `[0, MAX_SLEEP]`.
    pub fn update(&mut self, elapsed: Duration) -> Duration {
        self.backlog_ns += elapsed.as_nanos() as i128 - self.target.as_nanos() as i128;

        if self.backlog_ns.unsigned_abs() > MAX_BACKLOG.as_nanos() {
            log::warn!(
                "tracker: backlog interval overflow {} ms",
                self.backlog_ns / 1_000_000
            );
            self.backlog_ns = 0;
        }

        let sleep_ns = (self.target.as_nanos() as i128 - self.backlog_ns)
            .clamp(0, MAX_SLEEP.as_nanos() as i128);
        Duration::from_nanos(sleep_ns as u64)
    }

    /// Current backlog in nanoseconds; positive means behind schedule.
    pub fn backlog_ns(&self) -> i128 {
        self.backlog_ns
    }
}

/// Handle to a pipeline running on its own thread.
///
/// Dropping the handle stops the worker and waits for it.
pub struct PipelineHandle {
    control: PipelineControl,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<Pipeline>>,
}

impl PipelineHandle {
    /// Move `pipeline` onto a new worker thread and start ticking.
    pub(crate) fn start(pipeline: Pipeline) -> Result<PipelineHandle> {
        let control = pipeline.control();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("posepipe-worker".into())
            .spawn(move || run_loop(pipeline, stop_clone))
            .map_err(PipelineError::ThreadSpawn)?;

        Ok(PipelineHandle {
            control,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Flag and snapshot access for control callers.
    pub fn control(&self) -> &PipelineControl {
        &self.control
    }

    /// True until a stop has been requested.
    pub fn is_running(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the worker after its current tick and get the pipeline back.
    pub fn stop(mut self) -> Result<Pipeline> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<Pipeline> {
        self.stop_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.take().ok_or(PipelineError::AlreadyStopped)?;
        thread.join().map_err(|_| PipelineError::WorkerPanicked)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.shutdown();
        }
    }
}

/// Tick loop. Runs in the worker thread until `stop_flag` is set; the flag
/// is only polled between ticks.
fn run_loop(mut pipeline: Pipeline, stop_flag: Arc<AtomicBool>) -> Pipeline {
    let target = pipeline.settings().tick_interval;
    let mut backlog = Backlog::new(target);

    log::info!("pipeline worker started ({:?} tick)", target);
    pipeline.write_log_header();

    let mut t = Instant::now();

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("pipeline worker stopping (stop flag set)");
            break;
        }

        pipeline.tick(Instant::now());

        let now = Instant::now();
        let elapsed = now.duration_since(t);
        t = now;

        let sleep = backlog.update(elapsed);
        log::trace!(
            "tick elapsed {:?} backlog {} us sleep {:?}",
            elapsed,
            backlog.backlog_ns() / 1000,
            sleep
        );
        std::thread::sleep(sleep);
    }

    pipeline.shutdown();
    pipeline
}
