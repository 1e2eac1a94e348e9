//! Wavescope CLI - offline analysis driver
//!
//! Feeds a WAV file through a pipeline configuration in simulated
//! real-time ticks and prints the final snapshot as JSON.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wavescope::engine::ChannelLayout;
use wavescope::graph::{DataSnapshot, EngineConfig, SnapshotExtra};
use wavescope::Orchestrator;

#[derive(Parser)]
#[command(name = "wavescope-cli", version, about = "Offline audio analysis")]
struct Cli {
    /// Pipeline configuration, JSON
    #[arg(short, long)]
    config: PathBuf,

    /// Input WAV file
    input: PathBuf,

    /// Tick length in milliseconds
    #[arg(long, default_value_t = 16.0)]
    tick_ms: f64,

    /// Print the snapshot after every tick instead of only at the end
    #[arg(long)]
    verbose_ticks: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config: EngineConfig = serde_json::from_str(
        &std::fs::read_to_string(&cli.config)
            .with_context(|| format!("reading {}", cli.config.display()))?,
    )
    .context("parsing pipeline configuration")?;

    let mut reader = hound::WavReader::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?;
    let spec = reader.spec();
    let layout = layout_for_channels(spec.channels)?;
    info!(
        rate = spec.sample_rate,
        channels = spec.channels,
        "analyzing {}",
        cli.input.display()
    );

    let samples = read_samples(&mut reader)?;

    let mut orchestrator = Orchestrator::new(config, spec.sample_rate, layout)?;

    let samples_per_tick = ((f64::from(spec.sample_rate) * cli.tick_ms / 1e3) as usize).max(1)
        * usize::from(spec.channels);
    for tick in samples.chunks(samples_per_tick) {
        orchestrator.process_frames(tick);
        if cli.verbose_ticks {
            print_snapshot(orchestrator.snapshot());
        }
    }

    let mut snapshot = DataSnapshot::default();
    orchestrator.exchange(&mut snapshot);
    print_snapshot(&snapshot);
    Ok(())
}

fn layout_for_channels(channels: u16) -> anyhow::Result<ChannelLayout> {
    match channels {
        1 => Ok(ChannelLayout::mono()),
        2 => Ok(ChannelLayout::stereo()),
        6 => Ok(ChannelLayout::surround_5_1()),
        other => bail!("unsupported channel count: {other}"),
    }
}

fn read_samples(
    reader: &mut hound::WavReader<std::io::BufReader<std::fs::File>>,
) -> anyhow::Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("decoding float samples")?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<Vec<_>, _>>()
                .context("decoding integer samples")?
        }
    };
    Ok(samples)
}

fn print_snapshot(snapshot: &DataSnapshot) {
    match serde_json::to_string_pretty(&snapshot_to_json(snapshot)) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("failed to render snapshot: {err}"),
    }
}

fn snapshot_to_json(snapshot: &DataSnapshot) -> serde_json::Value {
    let mut root = serde_json::Map::new();
    for (processing, channel, handler, data) in snapshot.iter() {
        let mut body = serde_json::Map::new();
        for (layer, values) in data.layers.iter().enumerate() {
            body.insert(format!("layer{layer}"), serde_json::json!(values));
        }
        if let SnapshotExtra::Image(image) = &data.extra {
            body.insert(
                "image".to_string(),
                serde_json::json!({ "width": image.width, "height": image.height }),
            );
        }

        let path = format!("{processing}.{}.{handler}", channel.technical_name());
        root.insert(path, serde_json::Value::Object(body));
    }
    serde_json::Value::Object(root)
}
