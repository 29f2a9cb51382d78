//! CLI Entry Point for sensor_stream
//!
//! Offline tooling around the signal chain:
//! - Replaying a CSV packet log through one channel and printing telemetry
//! - Ingesting hex-encoded frames through a full session (CRC, decode, route)
//! - Checking a configuration file
//!
//! # Usage
//!
//! ```bash
//! sensor_stream replay packets.csv --channel main
//! sensor_stream frames capture.hex
//! sensor_stream check-config --config config/stream.toml
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sensor_stream::channel::{ChannelKey, ChannelPipeline};
use sensor_stream::codec::Packet;
use sensor_stream::config::{StreamConfig, DEFAULT_PATH};
use sensor_stream::logging;
use sensor_stream::session::{Ingested, StreamSession};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sensor_stream")]
#[command(about = "Step-corrected, phase-aligned sensor telemetry", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV packet log (timestamp,channel0_raw,offset1,offset2,gain)
    Replay {
        /// Path to the CSV file
        input: PathBuf,

        /// Channel whose settings are used
        #[arg(long, value_enum, default_value = "main")]
        channel: ChannelArg,

        /// Print the snapshot after every packet, not only after emitting ones
        #[arg(long)]
        all: bool,
    },

    /// Feed hex-encoded frames (one per line, payload followed by CRC)
    Frames {
        /// Path to the hex file
        input: PathBuf,
    },

    /// Load, validate and print the resolved configuration
    CheckConfig,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ChannelArg {
    Main,
    Aux,
}

impl From<ChannelArg> for ChannelKey {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Main => ChannelKey::Main,
            ChannelArg::Aux => ChannelKey::Aux,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_from_config(&config).map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Replay { input, channel, all } => replay(&config, &input, channel.into(), all),
        Commands::Frames { input } => frames(&config, &input),
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<StreamConfig> {
    if path.exists() {
        StreamConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    } else {
        warn!(path = %path.display(), "configuration file not found, using defaults");
        Ok(StreamConfig::default())
    }
}

fn replay(config: &StreamConfig, input: &Path, channel: ChannelKey, all: bool) -> Result<()> {
    let definition = config
        .channel(channel)
        .ok_or_else(|| anyhow!("Channel '{}' is not configured", channel))?;
    let mut pipeline = ChannelPipeline::new(channel, definition.extractor.clone());

    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let (mut packets, mut corrected) = (0u64, 0u64);
    for row in reader.deserialize::<Packet>() {
        let packet = row.with_context(|| format!("Bad row after {} packets", packets))?;
        packets += 1;
        if !packet.is_usable() {
            warn!(row = packets, ?packet, "skipping packet with zero gain or non-finite fields");
            continue;
        }
        let output = pipeline.process(&packet);
        if output.corrected {
            corrected += 1;
        }
        if all || output.emitted {
            serde_json::to_writer(&mut out, &pipeline.snapshot())?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    info!(
        packets,
        corrected,
        steps = pipeline.extractor().corrector().steps_fired(),
        "replay finished"
    );
    Ok(())
}

fn frames(config: &StreamConfig, input: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut session = StreamSession::from_config(config);

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame = match parse_hex(line) {
            Some(frame) => frame,
            None => {
                warn!(line = line_no + 1, "skipping line that is not hex");
                continue;
            }
        };
        match session.ingest(&frame) {
            Ok(Ingested::Sample { channel, emitted: true, .. }) => {
                if let Some(snapshot) = session.snapshot(channel) {
                    println!("{}", serde_json::json!({ "channel": channel, "telemetry": snapshot }));
                }
            }
            Ok(_) => {}
            Err(e) if e.can_recover() => warn!(line = line_no + 1, error = %e, "frame dropped"),
            Err(e) => return Err(e.into()),
        }
    }

    let stats = session.stats();
    info!(
        accepted = stats.frames_accepted,
        crc_failures = stats.crc_failures,
        malformed = stats.malformed_frames,
        boundaries = stats.boundaries,
        "frames finished"
    );
    eprintln!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

fn parse_hex(line: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(text, 16).ok()
        })
        .collect()
}
