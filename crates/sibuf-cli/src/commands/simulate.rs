//! End-to-end relay simulation.
//!
//! Generates a punch stream, spreads it over the input channels, relays it
//! through the engine with a throttled shared line, then splits the line
//! back into records and compares them with the stimulus per station.

use clap::Args;
use serde::Serialize;
use sibuf_core::{ChannelStats, Engine};
use sibuf_platform::sim::{CtsMode, SimBench, SimInput, SimOutput};
use std::path::PathBuf;

use super::common::{CtsPattern, load_profile, parse_cts_pattern, punch_generator};
use crate::punch::{Verification, channel_streams, extract_records, verify};

#[derive(Args)]
pub struct SimulateArgs {
    /// Relay profile name or path
    #[arg(short, long, default_value = "srr")]
    profile: String,

    /// Number of punches to generate
    #[arg(short = 'n', long, default_value = "100")]
    punches: usize,

    /// Seed for a reproducible punch stream
    #[arg(long)]
    seed: Option<u64>,

    /// Assert CTS only on every Nth tick
    #[arg(long, value_name = "N", conflicts_with_all = ["cts_pattern", "hold_cts"])]
    cts_every: Option<u32>,

    /// Repeating CTS pattern, e.g. "1100"
    #[arg(long, value_parser = parse_cts_pattern, conflicts_with = "hold_cts")]
    cts_pattern: Option<CtsPattern>,

    /// Hold CTS off for this many ticks, then release it
    #[arg(long, value_name = "TICKS")]
    hold_cts: Option<u64>,

    /// Silent ticks between bytes on each input
    #[arg(long, default_value = "0")]
    gap: u32,

    /// Give up after this many ticks
    #[arg(long, default_value = "10000000")]
    max_ticks: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the raw shared-line bytes to a file
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChannelReport {
    channel: usize,
    bytes_received: u64,
    bytes_sent: u64,
    rx_dropped: u64,
    records_framed: u64,
    forced_flushes: u64,
}

impl ChannelReport {
    fn new(channel: usize, stats: ChannelStats) -> Self {
        Self {
            channel,
            bytes_received: stats.bytes_received,
            bytes_sent: stats.bytes_sent,
            rx_dropped: stats.rx_dropped,
            records_framed: stats.records_framed,
            forced_flushes: stats.forced_flushes,
        }
    }
}

#[derive(Serialize)]
struct SimulationReport {
    profile: String,
    policy: &'static str,
    punches: usize,
    ticks: u64,
    settled: bool,
    stranded: usize,
    bytes_relayed: u64,
    lock_grants: u64,
    stalled_ticks: u64,
    line_time_ms: u64,
    skipped: usize,
    trailing: usize,
    channels: Vec<ChannelReport>,
    verification: Verification,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let profile = load_profile(&args.profile)?;
    let config = profile.engine_config()?;
    let line = profile.line_settings()?;
    let policy = profile.policy();

    let engine = Engine::with_policy(config, policy.build())?;

    let mut generator = punch_generator(config.channels, config.format, args.seed);
    let punches = generator.generate(args.punches);
    let inputs: Vec<SimInput> = channel_streams(&punches, config.channels)
        .into_iter()
        .map(|stream| SimInput::new(stream).with_gap(args.gap))
        .collect();

    let cts = match (args.cts_every, args.cts_pattern, args.hold_cts) {
        (Some(n), _, _) => CtsMode::EveryNth(n),
        (_, Some(CtsPattern(pattern)), _) => CtsMode::Pattern(pattern),
        (_, _, Some(ticks)) => CtsMode::HeldUntil(ticks),
        _ => CtsMode::Always,
    };

    tracing::info!(
        profile = %profile.name,
        policy = policy.name(),
        punches = punches.len(),
        channels = config.channels,
        ?cts,
        "starting simulation"
    );

    let mut bench = SimBench::new(engine, inputs, SimOutput::with_cts(cts));
    let summary = bench.run(args.max_ticks);
    if !summary.settled {
        tracing::warn!(
            ticks = summary.ticks,
            "tick limit reached before the relay settled"
        );
    }

    let sent = bench.output().sent();
    if let Some(path) = &args.dump {
        std::fs::write(path, sent)?;
        tracing::info!(path = %path.display(), bytes = sent.len(), "shared line written");
    }

    let extracted = extract_records(sent, &config.format);
    let verification = verify(&punches, &extracted.records, config.channels, &config.format);

    let stats = bench.engine().stats();
    let report = SimulationReport {
        profile: profile.name.clone(),
        policy: policy.name(),
        punches: punches.len(),
        ticks: summary.ticks,
        settled: summary.settled,
        stranded: summary.stranded,
        bytes_relayed: stats.bytes_relayed,
        lock_grants: stats.lock_grants,
        stalled_ticks: stats.stalled_ticks,
        line_time_ms: line.transfer_micros(stats.bytes_relayed) / 1000,
        skipped: extracted.skipped,
        trailing: extracted.trailing.len(),
        channels: bench
            .engine()
            .channel_stats()
            .enumerate()
            .map(|(i, s)| ChannelReport::new(i, s))
            .collect(),
        verification,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &line.to_string());
    }

    let v = &report.verification;
    if !v.passed() {
        anyhow::bail!(
            "Verification failed: {} of {} punches intact \
             ({} corrupted, {} missing, {} unexpected)",
            v.matched,
            v.sent,
            v.corrupted,
            v.missing,
            v.unexpected
        );
    }
    Ok(())
}

fn print_report(report: &SimulationReport, line: &str) {
    println!("Profile:   {} ({} arbitration, {})", report.profile, report.policy, line);
    println!(
        "Ticks:     {}{}",
        report.ticks,
        if report.settled { "" } else { " (limit reached)" }
    );
    println!(
        "Relayed:   {} bytes in {} grants, {} ticks waiting for CTS",
        report.bytes_relayed, report.lock_grants, report.stalled_ticks
    );
    println!("Line time: {} ms", report.line_time_ms);
    if report.stranded > 0 {
        println!("Stranded:  {} bytes waiting for a header", report.stranded);
    }
    println!();

    println!(
        "  {:>2}  {:>10}  {:>10}  {:>8}  {:>7}  {:>7}",
        "ch", "received", "sent", "dropped", "framed", "flushed"
    );
    for ch in &report.channels {
        println!(
            "  {:>2}  {:>10}  {:>10}  {:>8}  {:>7}  {:>7}",
            ch.channel,
            ch.bytes_received,
            ch.bytes_sent,
            ch.rx_dropped,
            ch.records_framed,
            ch.forced_flushes
        );
    }
    println!();

    let v = &report.verification;
    for tally in &v.channels {
        println!(
            "  station {}: {} sent, {} received, {} intact",
            tally.channel, tally.sent, tally.received, tally.matched
        );
    }
    if report.skipped > 0 || report.trailing > 0 {
        println!(
            "  {} bytes outside records, {} bytes in an incomplete tail",
            report.skipped, report.trailing
        );
    }
    println!(
        "{}: {} of {} punches intact",
        if v.passed() { "PASS" } else { "FAIL" },
        v.matched,
        v.sent
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SimulateArgs,
    }

    #[test]
    fn test_cts_pattern_parses() {
        let harness = Harness::try_parse_from(["sibuf", "--cts-pattern", "110"]).unwrap();
        assert_eq!(
            harness.args.cts_pattern,
            Some(CtsPattern(vec![true, true, false]))
        );
        assert_eq!(harness.args.cts_every, None);
    }

    #[test]
    fn test_cts_options_conflict() {
        let args = ["sibuf", "--cts-pattern", "10", "--hold-cts", "5"];
        assert!(Harness::try_parse_from(args).is_err());
        assert!(Harness::try_parse_from(["sibuf", "--cts-pattern", "12"]).is_err());
    }
}
