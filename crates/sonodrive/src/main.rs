//! Sonodrive - turns recorded audio into driver streams for audio-reactive visuals.

mod logging_setup;
mod wav;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver};
use serde::Serialize;
use sonodrive_core::{settings, AudioProcessor, DriverSnapshot, PipelineConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};

/// Snapshots buffered between the analysis loop and the writer
const SNAPSHOT_QUEUE: usize = 64;

#[derive(Parser)]
#[command(name = "sonodrive")]
#[command(about = "Extract smoothly varying driver signals from audio", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a WAV file through the pipeline and emit JSON-lines snapshots
    Analyze {
        /// Input WAV file
        input: PathBuf,

        /// Pipeline config (RON or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exported settings array, overrides the config's parameters
        #[arg(long)]
        settings: Option<String>,

        /// Override the bucket count
        #[arg(long)]
        buckets: Option<usize>,

        /// Override the amplitude history length
        #[arg(long)]
        length: Option<usize>,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Emit one snapshot every N driver updates
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
    },

    /// Print the versioned settings array for a config
    ExportSettings {
        /// Pipeline config (RON or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default pipeline config
    InitConfig {
        /// Destination (`.ron` or `.json`)
        file: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// One JSON line of `analyze` output
#[derive(Serialize)]
struct SnapshotRecord {
    /// Driver update counter
    update: u64,
    /// Stream position of the update (seconds)
    time: f32,
    #[serde(flatten)]
    drivers: DriverSnapshot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            settings,
            buckets,
            length,
            output,
            every,
        } => {
            let mut config = load_config(config.as_deref())?;
            let _log_guard = logging_setup::init(&config.logging)?;

            if let Some(settings) = settings {
                config.params =
                    settings::import_str(&settings).context("Failed to import settings")?;
            }
            if let Some(buckets) = buckets {
                config.analysis.buckets = buckets;
            }
            if let Some(length) = length {
                config.analysis.length = length;
            }

            analyze(&input, config, output.as_deref(), every)
        }
        Commands::ExportSettings { config } => {
            let config = load_config(config.as_deref())?;
            let _log_guard = logging_setup::init(&config.logging)?;
            println!("{}", settings::export_string(&config.params));
            Ok(())
        }
        Commands::InitConfig { file, force } => {
            if file.exists() && !force {
                bail!("{:?} already exists (use --force to overwrite)", file);
            }
            PipelineConfig::default()
                .save(&file)
                .with_context(|| format!("Failed to write {:?}", file))?;
            eprintln!("Wrote default config to {:?}", file);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(PipelineConfig::default()),
    }
}

fn analyze(
    input: &Path,
    mut config: PipelineConfig,
    output: Option<&Path>,
    every: u64,
) -> Result<()> {
    let signal = wav::load(input)?;
    info!(
        "Analyzing {:?}: {:.2}s at {}Hz",
        input,
        signal.duration_secs(),
        signal.sample_rate
    );

    let analysis = &mut config.analysis;
    analysis.sample_rate = signal.sample_rate;
    if analysis.f_max > analysis.nyquist() {
        warn!(
            "f_max {}Hz above Nyquist, clamping to {}Hz",
            analysis.f_max,
            analysis.nyquist()
        );
        analysis.f_max = analysis.nyquist();
    }

    let mut processor = AudioProcessor::new(config.analysis, config.params)?;
    let frame_size = config.analysis.frame_size;
    let sample_rate = signal.sample_rate as f32;

    let sink: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let (tx, rx) = bounded::<SnapshotRecord>(SNAPSHOT_QUEUE);
    let writer = thread::Builder::new()
        .name("snapshot-writer".to_string())
        .spawn(move || write_snapshots(rx, sink))
        .context("Failed to spawn writer thread")?;

    let mut updates = 0u64;
    for (i, frame) in signal.samples.chunks_exact(frame_size).enumerate() {
        processor.process(frame)?;

        let (drivers, updated) = processor.get_drivers();
        if !updated {
            continue;
        }
        updates += 1;
        if updates % every != 0 {
            continue;
        }

        let record = SnapshotRecord {
            update: updates,
            time: ((i + 1) * frame_size) as f32 / sample_rate,
            drivers: drivers.snapshot(),
        };
        if tx.send(record).is_err() {
            // Writer gave up; its error is reported on join
            break;
        }
    }
    drop(tx);

    let written = writer
        .join()
        .map_err(|_| anyhow!("Snapshot writer panicked"))??;

    let tail = signal.samples.len() % frame_size;
    let drivers = processor.drivers();
    let mean_energy = drivers.energy.iter().sum::<f32>() / drivers.energy.len() as f32;
    info!(
        "Done: {} frames, {} driver updates, {} snapshots written, {} trailing samples skipped, mean energy {:.3}",
        processor.frames_processed(),
        updates,
        written,
        tail,
        mean_energy
    );
    Ok(())
}

fn write_snapshots(rx: Receiver<SnapshotRecord>, sink: Box<dyn Write + Send>) -> Result<usize> {
    let mut out = BufWriter::new(sink);
    let mut written = 0;
    for record in rx {
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::f32::consts::PI;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_must_be_positive() {
        assert!(Cli::try_parse_from(["sonodrive", "analyze", "in.wav", "--every", "0"]).is_err());
        assert!(Cli::try_parse_from(["sonodrive", "analyze", "in.wav", "--every", "4"]).is_ok());
    }

    #[test]
    fn test_analyze_writes_json_lines() {
        let dir = tempdir().unwrap();
        let wav_path = dir.path().join("tone.wav");
        let out_path = dir.path().join("drivers.jsonl");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
        for i in 0..(512 * 10 + 100) {
            let t = i as f32 / 22050.0;
            writer.write_sample((2.0 * PI * 330.0 * t).sin() * 0.5).unwrap();
        }
        writer.finalize().unwrap();

        let mut config = PipelineConfig::default();
        config.analysis.buckets = 8;
        config.analysis.length = 4;

        analyze(&wav_path, config, Some(&out_path), 2).unwrap();

        let content = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["update"], 2);
        assert_eq!(first["amp"].as_array().unwrap().len(), 4);
        assert_eq!(first["energy"].as_array().unwrap().len(), 8);
    }
}
