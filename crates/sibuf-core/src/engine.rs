//! The polled relay loop.
//!
//! [`Engine`] owns every [`Channel`] and the [`Arbiter`]. The caller owns the
//! ports and lends them to [`Engine::tick`] once per loop iteration:
//!
//! ```text
//! for each channel (index order):
//!     port readable?  -> read one byte into the input queue
//!     advance framing state machine one step
//! arbitration: release a drained lock, or grant a free one
//! shared output writable and a lock held? -> send one byte
//! ```
//!
//! There are no suspension points and no error path. The shared line carries
//! at most one byte per tick, always from the lock holder.
//!
//! # Example
//!
//! ```rust
//! use sibuf_core::{Engine, EngineConfig, FramingState, SerialPort};
//!
//! struct Input(Vec<u8>);
//! impl SerialPort for Input {
//!     fn is_readable(&self) -> bool { !self.0.is_empty() }
//!     fn read_byte(&mut self) -> u8 { self.0.remove(0) }
//!     fn is_writable(&self) -> bool { false }
//!     fn write_byte(&mut self, _: u8) {}
//! }
//!
//! struct Line(Vec<u8>);
//! impl SerialPort for Line {
//!     fn is_readable(&self) -> bool { false }
//!     fn read_byte(&mut self) -> u8 { 0 }
//!     fn is_writable(&self) -> bool { true }
//!     fn write_byte(&mut self, b: u8) { self.0.push(b) }
//! }
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let mut inputs = [
//!     Input(vec![0xD3, 0x02, 0xAA, 0xBB, 0xC1, 0xC0, 0x03]),
//!     Input(Vec::new()),
//! ];
//! let mut line = Line(Vec::new());
//!
//! for _ in 0..32 {
//!     engine.tick(&mut inputs, &mut line);
//! }
//! assert_eq!(line.0, [0xD3, 0x02, 0xAA, 0xBB, 0xC1, 0xC0, 0x03]);
//! assert_eq!(engine.channel(0).unwrap().state(), FramingState::Header);
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use crate::arbiter::{Arbiter, ArbitrationPolicy, LockEvent, PriorityPolicy};
use crate::channel::{Channel, ChannelStats, Step};
use crate::config::{EngineConfig, EngineConfigError};
use crate::frame::FramingState;
use crate::port::SerialPort;

/// Engine-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Bytes written to the shared line.
    pub bytes_relayed: u64,
    /// Transmit-lock grants.
    pub lock_grants: u64,
    /// Ticks in which a byte was ready to send but the line was not writable.
    pub stalled_ticks: u64,
}

/// One byte placed on the shared line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentByte {
    /// Originating channel.
    pub channel: usize,
    /// The byte.
    pub byte: u8,
}

/// What happened during one [`Engine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Channels that completed a record this tick (bit per index, low 32 only).
    pub framed: u32,
    /// Channels that flushed a partial record this tick (bit per index, low 32 only).
    pub flushed: u32,
    /// Lock grant or release.
    pub lock: Option<LockEvent>,
    /// Byte sent on the shared line.
    pub sent: Option<SentByte>,
}

/// Multiplexes framed punches from several inputs onto one shared output.
#[derive(Debug)]
pub struct Engine<P = PriorityPolicy> {
    config: EngineConfig,
    channels: Vec<Channel>,
    arbiter: Arbiter<P>,
    stats: EngineStats,
}

impl Engine<PriorityPolicy> {
    /// Creates an engine with index-priority arbitration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineConfigError> {
        Self::with_policy(config, PriorityPolicy)
    }
}

impl<P: ArbitrationPolicy> Engine<P> {
    /// Creates an engine with the given arbitration policy.
    ///
    /// All queues are allocated here and never resized.
    pub fn with_policy(config: EngineConfig, policy: P) -> Result<Self, EngineConfigError> {
        config.validate()?;
        let channels = (0..config.channels)
            .map(|index| Channel::new(index, &config))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::info!(
            channels = config.channels,
            rx_capacity = config.rx_capacity,
            tx_capacity = config.tx_capacity,
            trailer_len = config.format.trailer_len,
            policy = policy.name(),
            "relay engine created"
        );

        Ok(Self {
            config,
            channels,
            arbiter: Arbiter::new(policy),
            stats: EngineStats::default(),
        })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// All channels in priority order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel by index.
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Index of the channel currently holding the transmit lock.
    pub fn lock_holder(&self) -> Option<usize> {
        self.arbiter.holder()
    }

    /// Engine-wide counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Per-channel counters, in index order.
    pub fn channel_stats(&self) -> impl Iterator<Item = ChannelStats> + '_ {
        self.channels.iter().map(Channel::stats)
    }

    /// Number of channels currently in `Transmit`.
    pub fn transmitting(&self) -> usize {
        self.channels
            .iter()
            .filter(|ch| ch.state() == FramingState::Transmit)
            .count()
    }

    /// Returns true when no bytes are buffered anywhere and the lock is free.
    pub fn is_idle(&self) -> bool {
        self.arbiter.holder().is_none() && self.channels.iter().all(Channel::is_idle)
    }

    /// Runs one iteration of the polled loop.
    ///
    /// `inputs[i]` feeds channel `i`; channels without a port receive
    /// nothing. `output` is the shared, flow-controlled line.
    pub fn tick<I, O>(&mut self, inputs: &mut [I], output: &mut O) -> TickReport
    where
        I: SerialPort,
        O: SerialPort,
    {
        let mut report = TickReport::default();
        self.stats.ticks += 1;

        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Some(port) = inputs.get_mut(index)
                && port.is_readable()
            {
                channel.receive(port.read_byte());
            }

            let bit = if index < 32 { 1u32 << index } else { 0 };
            match channel.advance() {
                Step::Framed => report.framed |= bit,
                Step::Flushed => report.flushed |= bit,
                Step::Idle | Step::Relayed | Step::Finished => {}
            }
        }

        report.lock = self.arbiter.update(&mut self.channels);
        if let Some(LockEvent::Granted(_)) = report.lock {
            self.stats.lock_grants += 1;
        }

        if let Some(index) = self.arbiter.holder() {
            let channel = &mut self.channels[index];
            if !channel.output().is_empty() {
                if output.is_writable() {
                    if let Some(byte) = channel.take_output() {
                        output.write_byte(byte);
                        self.stats.bytes_relayed += 1;
                        report.sent = Some(SentByte {
                            channel: index,
                            byte,
                        });
                    }
                } else {
                    self.stats.stalled_ticks += 1;
                }
            }
        }

        report
    }

    /// Ticks until the engine is idle or `max_ticks` have run.
    ///
    /// Returns the number of ticks executed.
    pub fn run_until_idle<I, O>(&mut self, inputs: &mut [I], output: &mut O, max_ticks: u64) -> u64
    where
        I: SerialPort,
        O: SerialPort,
    {
        let mut ticks = 0;
        while ticks < max_ticks {
            let pending_input = inputs.iter().any(SerialPort::is_readable);
            if !pending_input && self.is_idle() {
                break;
            }
            self.tick(inputs, output);
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::RoundRobinPolicy;
    use crate::frame::FrameFormat;
    use std::collections::VecDeque;

    struct TestInput(VecDeque<u8>);

    impl TestInput {
        fn new(bytes: &[u8]) -> Self {
            Self(bytes.iter().copied().collect())
        }
    }

    impl SerialPort for TestInput {
        fn is_readable(&self) -> bool {
            !self.0.is_empty()
        }
        fn read_byte(&mut self) -> u8 {
            self.0.pop_front().unwrap_or(0)
        }
        fn is_writable(&self) -> bool {
            false
        }
        fn write_byte(&mut self, _byte: u8) {}
    }

    #[derive(Default)]
    struct TestLine {
        sent: Vec<u8>,
        cts: bool,
    }

    impl SerialPort for TestLine {
        fn is_readable(&self) -> bool {
            false
        }
        fn read_byte(&mut self) -> u8 {
            0
        }
        fn is_writable(&self) -> bool {
            self.cts
        }
        fn write_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }
    }

    const TRAILER: [u8; 3] = [0xC1, 0xC0, 0x03];

    fn record(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xD3, payload.len() as u8];
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&TRAILER);
        bytes
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Engine::new(EngineConfig::default().with_channels(0));
        assert_eq!(result.err(), Some(EngineConfigError::NoChannels));
    }

    #[test]
    fn test_single_record_relayed() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let rec = record(&[0xAA, 0xBB]);
        let mut inputs = [TestInput::new(&rec), TestInput::new(&[])];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };

        let ticks = engine.run_until_idle(&mut inputs, &mut line, 1000);
        assert!(ticks < 1000);
        assert_eq!(line.sent, rec);
        assert_eq!(engine.channel(0).unwrap().state(), FramingState::Header);
        assert_eq!(engine.stats().bytes_relayed, rec.len() as u64);
        assert_eq!(engine.stats().lock_grants, 1);
    }

    #[test]
    fn test_nothing_sent_before_record_complete() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let rec = record(&[1, 2, 3]);
        let mut inputs = [TestInput::new(&rec[..rec.len() - 1])];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };
        for _ in 0..100 {
            engine.tick(&mut inputs, &mut line);
        }
        assert!(line.sent.is_empty());
        assert_eq!(engine.channel(0).unwrap().state(), FramingState::Payload);
    }

    #[test]
    fn test_cts_deasserted_stalls_output() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let rec = record(&[0x10]);
        let mut inputs = [TestInput::new(&rec)];
        let mut line = TestLine::default();

        for _ in 0..50 {
            engine.tick(&mut inputs, &mut line);
        }
        assert!(line.sent.is_empty());
        assert_eq!(engine.lock_holder(), Some(0));
        assert!(engine.stats().stalled_ticks > 0);

        line.cts = true;
        engine.run_until_idle(&mut inputs, &mut line, 100);
        assert_eq!(line.sent, rec);
    }

    #[test]
    fn test_one_byte_per_tick() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let rec = record(&[0x10, 0x20]);
        let mut inputs = [TestInput::new(&rec), TestInput::new(&rec)];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };

        for _ in 0..200 {
            let before = line.sent.len();
            engine.tick(&mut inputs, &mut line);
            assert!(line.sent.len() - before <= 1);
        }
        assert_eq!(line.sent.len(), 2 * rec.len());
    }

    #[test]
    fn test_tick_report_events() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let rec = record(&[]);
        let mut inputs = [TestInput::new(&rec)];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };

        let reports: Vec<TickReport> = (0..20)
            .map(|_| engine.tick(&mut inputs, &mut line))
            .collect();

        let framed_at = reports.iter().position(|r| r.framed & 1 != 0).unwrap();
        assert_eq!(framed_at, rec.len() - 1);
        // Arbitration runs after framing in the same tick
        assert_eq!(reports[framed_at].lock, Some(LockEvent::Granted(0)));
        assert_eq!(
            reports[framed_at].sent,
            Some(SentByte {
                channel: 0,
                byte: 0xD3
            })
        );
        assert!(
            reports
                .iter()
                .any(|r| r.lock == Some(LockEvent::Released(0)))
        );
    }

    #[test]
    fn test_round_robin_engine() {
        let config = EngineConfig::default().with_format(FrameFormat::new(0xD3, 3));
        let mut engine = Engine::with_policy(config, RoundRobinPolicy::default()).unwrap();
        let mut stream = record(&[0x01]);
        stream.extend(record(&[0x02]));
        let mut inputs = [TestInput::new(&stream), TestInput::new(&record(&[0x03]))];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };
        engine.run_until_idle(&mut inputs, &mut line, 1000);

        let mut expected = record(&[0x01]);
        expected.extend(record(&[0x03]));
        expected.extend(record(&[0x02]));
        assert_eq!(line.sent, expected);
    }

    #[test]
    fn test_ports_fewer_than_channels() {
        let mut engine = Engine::new(EngineConfig::default().with_channels(3)).unwrap();
        let rec = record(&[0x42]);
        let mut inputs = [TestInput::new(&rec)];
        let mut line = TestLine {
            cts: true,
            ..Default::default()
        };
        engine.run_until_idle(&mut inputs, &mut line, 1000);
        assert_eq!(line.sent, rec);
        assert!(engine.is_idle());
    }
}
