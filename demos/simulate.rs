//! Run the pipeline against a synthetic head that sways and looks around.
//!
//! Usage: cargo run --example simulate [seconds] [telemetry.csv]
//! Set POSEPIPE_RELTRANS=always (or non_centered) and POSEPIPE_NECK_ENABLE=1
//! to see the compensation at work. RUST_LOG=debug shows centering events.

use posepipe::filter::ExponentialFilter;
use posepipe::telemetry::{CsvLogger, NullLogger};
use posepipe::{MainSettings, Pipeline, Pose, Protocol, TrackLogger, Tracker};
use std::fs::File;
use std::io::BufWriter;
use std::time::{Duration, Instant};

/// Slow yaw sweep with a little pitch bob and lateral sway.
struct SwayingHead {
    start: Instant,
}

impl Tracker for SwayingHead {
    fn data(&mut self, pose: &mut Pose) {
        let t = self.start.elapsed().as_secs_f64();
        *pose = Pose::new(
            2.0 * (t * 0.7).sin(),
            0.5 * (t * 1.3).sin(),
            1.0,
            70.0 * (t * 0.4).sin(),
            15.0 * (t * 0.9).sin(),
            3.0 * (t * 2.1).sin(),
        );
    }
}

struct Stdout {
    count: u64,
}

impl Protocol for Stdout {
    fn pose(&mut self, p: &Pose) {
        self.count += 1;
        // Print every ~100th pose to avoid flooding the terminal
        if self.count % 100 == 1 {
            println!(
                "pos=[{:+7.3}, {:+7.3}, {:+7.3}]  rot=[{:+7.2}, {:+7.2}, {:+7.2}]",
                p[0], p[1], p[2], p[3], p[4], p[5],
            );
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);

    let logger: Box<dyn TrackLogger> = match args.next() {
        Some(path) => match File::create(&path) {
            Ok(f) => Box::new(CsvLogger::new(BufWriter::new(f))),
            Err(e) => {
                eprintln!("Failed to create {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Box::new(NullLogger),
    };

    let settings = MainSettings::from_env();
    println!("Settings: {:?}", settings);

    let pipeline = Pipeline::builder(
        Box::new(SwayingHead {
            start: Instant::now(),
        }),
        Box::new(Stdout { count: 0 }),
    )
    .settings(settings)
    .filter(Box::new(ExponentialFilter::uniform(0.05)))
    .logger(logger)
    .build();

    let handle = match pipeline.start() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to start pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // recenter halfway through
    std::thread::sleep(Duration::from_secs(seconds) / 2);
    println!("--- center ---");
    handle.control().set_center();
    std::thread::sleep(Duration::from_secs(seconds) / 2);

    let snap = handle.control().snapshot();
    println!("\nLast raw:    {:?}", snap.raw);
    println!("Last mapped: {:?}", snap.mapped);

    if let Err(e) = handle.stop() {
        eprintln!("Error: {}", e);
    }
}
