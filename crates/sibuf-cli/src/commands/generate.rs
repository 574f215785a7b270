//! Punch stream generation command.
//!
//! Writes the stimulus a station (or several) would send, either as raw
//! bytes for replaying into a serial port or as hex text for inspection.

use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::common::{load_profile, punch_generator, to_hex};

#[derive(Args)]
pub struct GenerateArgs {
    /// Output file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Relay profile supplying the record format and channel count
    #[arg(short, long, default_value = "srr")]
    profile: String,

    /// Number of punches
    #[arg(short = 'n', long, default_value = "10")]
    punches: usize,

    /// Seed for a reproducible stream
    #[arg(long)]
    seed: Option<u64>,

    /// Override the profile's channel count
    #[arg(long)]
    channels: Option<usize>,

    /// Only write the punches of this channel
    #[arg(long, value_name = "CH")]
    channel: Option<usize>,

    /// Write hex text, one punch per line, instead of raw bytes
    #[arg(long)]
    hex: bool,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let profile = load_profile(&args.profile)?;
    let format = profile.frame_format();
    let channels = args.channels.unwrap_or(profile.channels);

    if channels == 0 {
        anyhow::bail!("Channel count must be at least 1");
    }
    if let Some(ch) = args.channel
        && ch >= channels
    {
        anyhow::bail!("Channel {} out of range (0..{})", ch, channels);
    }

    let punches: Vec<_> = punch_generator(channels, format, args.seed)
        .generate(args.punches)
        .into_iter()
        .filter(|p| args.channel.is_none_or(|ch| p.channel == ch))
        .collect();

    let bytes = if args.hex {
        let mut text = String::new();
        for punch in &punches {
            writeln!(text, "{}  # ch{} #{}", to_hex(&punch.bytes), punch.channel, punch.index)?;
        }
        text.into_bytes()
    } else {
        punches.iter().flat_map(|p| p.bytes.iter().copied()).collect()
    };

    std::fs::write(&args.output, &bytes)?;

    tracing::info!(
        output = %args.output.display(),
        punches = punches.len(),
        bytes = bytes.len(),
        "punch stream written"
    );
    println!(
        "Wrote {} punches ({} bytes) to {}",
        punches.len(),
        bytes.len(),
        args.output.display()
    );
    Ok(())
}
