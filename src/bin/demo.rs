//! Offline walkthrough of the detection pipeline.
//!
//! Feeds synthetic frames through the session with scripted person detections,
//! so the decision loop (detect, annotate, persist, notice) can be observed
//! without a camera or a model file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use watchcam::{
    CameraConfig, CameraSource, Detection, DetectionSession, PollOutcome, SnapshotStore,
    StubBackend,
};

#[derive(Parser, Debug)]
#[command(name = "demo", about = "Feed synthetic frames through the detection pipeline")]
struct Args {
    /// Number of frames to process.
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Report a scripted person on every Nth frame (0 disables).
    #[arg(long, default_value_t = 5)]
    person_every: u32,

    /// Snapshot directory.
    #[arg(long, default_value = "demo_detections")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut backend = StubBackend::new();
    for i in 0..args.frames {
        if args.person_every > 0 && i % args.person_every == 0 {
            backend.push_frame(vec![Detection::person(10.0, 10.0, 50.0, 120.0, 0.9)]);
        } else {
            backend.push_frame(vec![]);
        }
    }

    let camera = CameraSource::new(CameraConfig {
        device: "stub://demo".to_string(),
        width: 640,
        height: 480,
    })?;
    let store = SnapshotStore::open(&args.out_dir)?;

    let mut session = DetectionSession::new(camera, Box::new(backend), store);
    session.start()?;

    for i in 0..args.frames {
        match session.poll()? {
            PollOutcome::Processed { persons, saved } => {
                print!("frame {:3}: {} person(s)", i, persons);
                match saved {
                    Some(name) => println!(", saved {}", name),
                    None => println!(),
                }
            }
            PollOutcome::SessionEnded => {
                println!("frame {:3}: session ended (grab failure)", i);
                break;
            }
            PollOutcome::Idle => break,
        }
    }

    session.stop();

    let saved = session.store().list()?;
    println!("{} snapshot(s) in {}", saved.len(), args.out_dir.display());
    for name in saved {
        println!("  {}", name);
    }
    Ok(())
}
