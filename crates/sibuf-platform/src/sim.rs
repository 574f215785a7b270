//! Host-side stand-ins for the board's serial hardware.
//!
//! - [`SimInput`] replays a byte script, optionally pausing between bytes.
//! - [`SimOutput`] captures the shared line and models the radio's CTS.
//! - [`RecordingDriver`] logs bring-up calls and rounds baud rates the way
//!   a PL011 fractional divider does.
//! - [`SimBench`] ties them to an [`Engine`] and runs until nothing moves.

use std::collections::VecDeque;

use sibuf_core::{ArbitrationPolicy, Engine, FramingState, SerialPort, TickReport};

use crate::board::UartId;
use crate::bringup::{PinFunction, UartDriver};
use crate::line::{DataBits, Parity, StopBits};

/// Peripheral clock of the reference board.
pub const PERI_CLOCK_HZ: u32 = 125_000_000;

/// Scripted input line.
///
/// After each byte the line stays silent for `gap` ticks, which models a
/// station slower than the poll loop.
#[derive(Debug, Clone, Default)]
pub struct SimInput {
    script: VecDeque<u8>,
    gap: u32,
    wait: u32,
    delivered: u64,
}

impl SimInput {
    /// Creates an input that delivers `bytes` one per tick.
    pub fn new(bytes: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: bytes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sets the number of silent ticks after each byte.
    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    /// Appends bytes to the script.
    pub fn push(&mut self, bytes: &[u8]) {
        self.script.extend(bytes);
    }

    /// Bytes not yet delivered.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Bytes delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Advances the line clock by one tick.
    pub fn tick(&mut self) {
        self.wait = self.wait.saturating_sub(1);
    }
}

impl SerialPort for SimInput {
    fn is_readable(&self) -> bool {
        self.wait == 0 && !self.script.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        match self.script.pop_front() {
            Some(byte) => {
                self.wait = self.gap;
                self.delivered += 1;
                byte
            }
            None => 0,
        }
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn write_byte(&mut self, _byte: u8) {}
}

/// CTS behavior of the simulated radio module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CtsMode {
    /// CTS always asserted.
    #[default]
    Always,
    /// CTS asserted on every `n`th tick only. `0` and `1` mean always.
    EveryNth(u32),
    /// CTS follows the pattern, repeating it. An empty pattern means always.
    Pattern(Vec<bool>),
    /// CTS held off until the given tick, then always asserted.
    HeldUntil(u64),
}

impl CtsMode {
    fn asserted(&self, clock: u64) -> bool {
        match self {
            Self::Always => true,
            Self::EveryNth(n) => *n <= 1 || clock % u64::from(*n) == 0,
            Self::Pattern(p) => p.is_empty() || p[(clock % p.len() as u64) as usize],
            Self::HeldUntil(tick) => clock >= *tick,
        }
    }
}

/// Captured shared line with CTS flow control.
#[derive(Debug, Clone, Default)]
pub struct SimOutput {
    sent: Vec<u8>,
    cts: CtsMode,
    clock: u64,
}

impl SimOutput {
    /// Creates a line with CTS always asserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a line with the given CTS behavior.
    pub fn with_cts(cts: CtsMode) -> Self {
        Self {
            cts,
            ..Self::default()
        }
    }

    /// Bytes written so far.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Takes the captured bytes, leaving the capture empty.
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }

    /// Ticks elapsed.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Advances the line clock by one tick.
    pub fn tick(&mut self) {
        self.clock += 1;
    }
}

impl SerialPort for SimOutput {
    fn is_readable(&self) -> bool {
        false
    }

    fn read_byte(&mut self) -> u8 {
        0
    }

    fn is_writable(&self) -> bool {
        self.cts.asserted(self.clock)
    }

    fn write_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }
}

/// Baud rate a PL011 UART actually produces for `requested` at `clock_hz`.
///
/// The divider has a 16-bit integer part and a 6-bit fraction; the result is
/// clamped to the divider range.
pub fn pl011_actual_baud(clock_hz: u32, requested: u32) -> u32 {
    if requested == 0 {
        return 0;
    }
    let div = 8 * u64::from(clock_hz) / u64::from(requested);
    let (ibrd, fbrd) = match div >> 7 {
        0 => (1, 0),
        i if i >= 65_535 => (65_535, 0),
        i => (i, ((div & 0x7f) + 1) / 2),
    };
    (4 * u64::from(clock_hz) / (64 * ibrd + fbrd)) as u32
}

/// One call made to a [`RecordingDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    /// `init`
    Init {
        /// UART
        uart: UartId,
        /// Requested baud
        baud: u32,
    },
    /// `set_baudrate`
    SetBaudrate {
        /// UART
        uart: UartId,
        /// Requested baud
        requested: u32,
        /// Reported baud
        actual: u32,
    },
    /// `set_pin_function`
    PinFunction {
        /// GPIO
        gpio: u8,
        /// Selected function
        function: PinFunction,
    },
    /// `set_pulls`
    Pulls {
        /// GPIO
        gpio: u8,
        /// Pull-up enabled
        up: bool,
        /// Pull-down enabled
        down: bool,
    },
    /// `set_hw_flow`
    HwFlow {
        /// UART
        uart: UartId,
        /// CTS enabled
        cts: bool,
        /// RTS enabled
        rts: bool,
    },
    /// `set_format`
    Format {
        /// UART
        uart: UartId,
        /// Data bits
        data_bits: DataBits,
        /// Stop bits
        stop_bits: StopBits,
        /// Parity
        parity: Parity,
    },
    /// `set_fifo_enabled`
    Fifo {
        /// UART
        uart: UartId,
        /// FIFO enabled
        enabled: bool,
    },
}

/// [`UartDriver`] that records every call.
#[derive(Debug, Clone)]
pub struct RecordingDriver {
    clock_hz: u32,
    calls: Vec<DriverCall>,
}

impl RecordingDriver {
    /// Creates a driver clocked at [`PERI_CLOCK_HZ`].
    pub fn new() -> Self {
        Self::with_clock(PERI_CLOCK_HZ)
    }

    /// Creates a driver with a different peripheral clock.
    pub fn with_clock(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            calls: Vec::new(),
        }
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// UART-level calls that targeted `uart`.
    pub fn calls_for(&self, uart: UartId) -> impl Iterator<Item = &DriverCall> {
        self.calls.iter().filter(move |call| match call {
            DriverCall::Init { uart: u, .. }
            | DriverCall::SetBaudrate { uart: u, .. }
            | DriverCall::HwFlow { uart: u, .. }
            | DriverCall::Format { uart: u, .. }
            | DriverCall::Fifo { uart: u, .. } => *u == uart,
            DriverCall::PinFunction { .. } | DriverCall::Pulls { .. } => false,
        })
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl UartDriver for RecordingDriver {
    fn init(&mut self, uart: UartId, baud: u32) -> u32 {
        self.calls.push(DriverCall::Init { uart, baud });
        pl011_actual_baud(self.clock_hz, baud)
    }

    fn set_baudrate(&mut self, uart: UartId, baud: u32) -> u32 {
        let actual = pl011_actual_baud(self.clock_hz, baud);
        self.calls.push(DriverCall::SetBaudrate {
            uart,
            requested: baud,
            actual,
        });
        actual
    }

    fn set_pin_function(&mut self, gpio: u8, function: PinFunction) {
        self.calls.push(DriverCall::PinFunction { gpio, function });
    }

    fn set_pulls(&mut self, gpio: u8, up: bool, down: bool) {
        self.calls.push(DriverCall::Pulls { gpio, up, down });
    }

    fn set_hw_flow(&mut self, uart: UartId, cts: bool, rts: bool) {
        self.calls.push(DriverCall::HwFlow { uart, cts, rts });
    }

    fn set_format(
        &mut self,
        uart: UartId,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) {
        self.calls.push(DriverCall::Format {
            uart,
            data_bits,
            stop_bits,
            parity,
        });
    }

    fn set_fifo_enabled(&mut self, uart: UartId, enabled: bool) {
        self.calls.push(DriverCall::Fifo { uart, enabled });
    }
}

/// Result of [`SimBench::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// True if the run stopped because nothing could move any more.
    pub settled: bool,
    /// Bytes left in output queues while searching for a header. They are
    /// only sent once more data arrives.
    pub stranded: usize,
}

/// An engine wired to simulated ports.
pub struct SimBench<P> {
    engine: Engine<P>,
    inputs: Vec<SimInput>,
    output: SimOutput,
}

impl<P: ArbitrationPolicy> SimBench<P> {
    /// Wires `engine` to one input per channel and the shared output.
    pub fn new(engine: Engine<P>, inputs: Vec<SimInput>, output: SimOutput) -> Self {
        Self {
            engine,
            inputs,
            output,
        }
    }

    /// The engine.
    pub fn engine(&self) -> &Engine<P> {
        &self.engine
    }

    /// The input lines.
    pub fn inputs(&self) -> &[SimInput] {
        &self.inputs
    }

    /// The shared line.
    pub fn output(&self) -> &SimOutput {
        &self.output
    }

    /// Mutable access to the input lines, e.g. to append more data.
    pub fn inputs_mut(&mut self) -> &mut [SimInput] {
        &mut self.inputs
    }

    /// Advances every port clock, then runs one engine tick.
    pub fn step(&mut self) -> TickReport {
        for input in &mut self.inputs {
            input.tick();
        }
        let report = self.engine.tick(&mut self.inputs, &mut self.output);
        self.output.tick();
        report
    }

    /// True when scripts are exhausted and no channel can make progress.
    pub fn is_settled(&self) -> bool {
        self.inputs.iter().all(|i| i.remaining() == 0)
            && self.engine.lock_holder().is_none()
            && self
                .engine
                .channels()
                .iter()
                .all(|ch| ch.state() == FramingState::Header && ch.input().is_empty())
    }

    /// Steps until settled or `max_ticks` have run.
    pub fn run(&mut self, max_ticks: u64) -> RunSummary {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_settled() {
            self.step();
            ticks += 1;
        }
        RunSummary {
            ticks,
            settled: self.is_settled(),
            stranded: self.engine.channels().iter().map(|ch| ch.output().len()).sum(),
        }
    }

    /// Splits the bench into its parts.
    pub fn into_parts(self) -> (Engine<P>, Vec<SimInput>, SimOutput) {
        (self.engine, self.inputs, self.output)
    }
}
