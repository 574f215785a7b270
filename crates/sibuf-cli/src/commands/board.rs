//! Board pin table and bring-up dry run.
//!
//! Runs the UART bring-up for a profile's line settings against a recording
//! driver, so the exact HAL call sequence and the achievable baud rates can
//! be checked without hardware.

use clap::Args;
use std::cell::Cell;
use sibuf_config::validate_for_board;
use sibuf_platform::sim::{DriverCall, PERI_CLOCK_HZ, RecordingDriver};
use sibuf_platform::{BoardLayout, STARTUP_BLINK, StatusLed, bring_up, play_pattern};

use super::common::load_profile;

#[derive(Args)]
pub struct BoardArgs {
    /// Relay profile supplying the line settings
    #[arg(short, long, default_value = "srr")]
    profile: String,

    /// Peripheral clock in Hz
    #[arg(long, default_value_t = PERI_CLOCK_HZ)]
    clock: u32,

    /// Print every driver call
    #[arg(short, long)]
    verbose: bool,

    /// Show the startup blink pattern
    #[arg(long)]
    blink: bool,
}

/// LED that prints its transitions with a running timestamp.
struct PrintedLed<'a> {
    elapsed_ms: &'a Cell<u32>,
}

impl StatusLed for PrintedLed<'_> {
    fn set(&mut self, on: bool) {
        println!(
            "  {:>5} ms  LED {}",
            self.elapsed_ms.get(),
            if on { "on" } else { "off" }
        );
    }
}

pub fn run(args: BoardArgs) -> anyhow::Result<()> {
    let profile = load_profile(&args.profile)?;
    let line = profile.line_settings()?;
    let board = BoardLayout::SERIAL_BUFFER;

    validate_for_board(&profile, board.channels.len())?;

    println!("Board: serial buffer ({} channels)", board.channels.len());
    println!();
    println!(
        "  {:>2}  {:6}  {:>3}  {:>3}  {:>3}  {:>3}  {:>3}",
        "ch", "uart", "tx", "rx", "cts", "cts", "rts"
    );
    for (i, pins) in board.channels.iter().enumerate() {
        let shared = if i == board.shared_output { "  shared output" } else { "" };
        println!(
            "  {:>2}  {:6}  {:>3}  {:>3}  {:>3}  {:>3}  {:>3}{}",
            i,
            pins.uart.to_string(),
            pins.tx,
            pins.rx,
            pins.cts,
            if pins.cts_enabled { "on" } else { "off" },
            if pins.rts_enabled { "on" } else { "off" },
            shared
        );
    }
    println!("  LED on GPIO{}", board.led);
    println!();

    let mut driver = RecordingDriver::with_clock(args.clock);
    let result = bring_up(&mut driver, &board, &line);

    if args.verbose {
        println!("Driver calls:");
        for call in driver.calls() {
            println!("  {}", describe(call));
        }
        println!();
    }

    let report = result?;
    println!("Line: {}", line);
    for (i, actual) in report.actual_baud.iter().enumerate() {
        println!("  ch{}: {} baud", i, actual);
    }
    println!(
        "  worst deviation {} permille",
        report.worst_deviation_permille(line.baud)
    );

    if args.blink {
        println!();
        println!("Startup blink:");
        let elapsed = Cell::new(0);
        let mut led = PrintedLed {
            elapsed_ms: &elapsed,
        };
        play_pattern(&mut led, &STARTUP_BLINK, |ms| elapsed.set(elapsed.get() + ms));
        println!("  total {} ms", elapsed.get());
    }

    Ok(())
}

fn describe(call: &DriverCall) -> String {
    match *call {
        DriverCall::Init { uart, baud } => format!("{uart}: init at {baud} baud"),
        DriverCall::SetBaudrate {
            uart,
            requested,
            actual,
        } => format!("{uart}: set baud {requested} -> {actual}"),
        DriverCall::PinFunction { gpio, function } => format!("GPIO{gpio}: {function:?}"),
        DriverCall::Pulls { gpio, up, down } => {
            format!("GPIO{gpio}: pull-up {up}, pull-down {down}")
        }
        DriverCall::HwFlow { uart, cts, rts } => format!("{uart}: flow cts={cts} rts={rts}"),
        DriverCall::Format {
            uart,
            data_bits,
            stop_bits,
            parity,
        } => format!(
            "{uart}: format {}{}{}",
            data_bits.count(),
            parity.code(),
            stop_bits.count()
        ),
        DriverCall::Fifo { uart, enabled } => format!("{uart}: fifo {enabled}"),
    }
}
