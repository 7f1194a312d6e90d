// Audition host: probe and play sound-effect files through the default output device
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use sfxplay::{Engine, EngineSettings, PlayerState};

#[derive(Parser, Debug)]
#[command(name = "sfx-audition", about = "Audition short sound-effect files")]
struct Args {
    /// Directory holding settings.json
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Files to play, one after another
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    sfxplay::logging::init("sfxplay=info,sfx_audition=info");

    let args = Args::parse();

    let engine = match &args.settings_dir {
        Some(dir) => Engine::start_from_dir(dir),
        None => Engine::start(EngineSettings::default()),
    }
    .context("Failed to start playback engine")?;
    if let Some(output) = engine.output() {
        info!("Output device: {}", output.device_name());
    }

    for file in &args.files {
        match engine.probe(file) {
            Ok(props) => info!(
                "{}: {:.3}s, {} Hz, {} ch, {} bit",
                file.display(),
                props.duration_secs,
                props.sample_rate,
                props.channels,
                props.bit_depth.map_or("?".to_string(), |b| b.to_string())
            ),
            Err(e) => warn!("{}: {}", file.display(), e),
        }

        engine.play(file);

        // Wait for the sample to finish before starting the next one
        while engine.state() != PlayerState::Idle {
            thread::sleep(Duration::from_millis(20));
        }
    }

    engine.shutdown();
    Ok(())
}
