//! One serial input line and its punch assembly state machine.
//!
//! A [`Channel`] owns two [`RingQueue`]s: the input queue receives raw bytes
//! from the port, the output queue holds the record being assembled and,
//! once the channel holds the transmit lock, is drained onto the shared line.
//!
//! Every byte is relayed verbatim, including bytes seen before a header was
//! recognized. Framing only decides *when* the output queue is handed to the
//! shared line.
//!
//! # Forced flush
//!
//! When a record would not fit in the output queue (header never seen for
//! `tx_capacity` bytes, or a declared length too large), the channel stops
//! assembling and offers what it has as a best-effort record. Data fidelity
//! is traded for liveness: the channel never stalls waiting for a
//! well-formed record.

use crate::config::{EngineConfig, OverflowPolicy};
use crate::frame::{FrameFormat, FramingState};
use crate::queue::RingQueue;

/// Diagnostic counters for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Bytes read from the port.
    pub bytes_received: u64,
    /// Bytes written to the shared line.
    pub bytes_sent: u64,
    /// Received bytes lost to input-queue overflow.
    pub rx_dropped: u64,
    /// Records assembled according to their declared length.
    pub records_framed: u64,
    /// Partial records flushed because they would not fit the output queue.
    pub forced_flushes: u64,
}

/// Result of one [`Channel::advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do this tick.
    Idle,
    /// One input byte moved to the output queue, no record boundary reached.
    Relayed,
    /// A complete record is waiting for the transmit lock.
    Framed,
    /// A partial record is waiting for the transmit lock.
    Flushed,
    /// Transmission finished; the channel looks for the next header.
    Finished,
}

/// A single input channel multiplexed onto the shared output.
#[derive(Debug, Clone)]
pub struct Channel {
    index: usize,
    state: FramingState,
    /// Payload plus trailer bytes still expected.
    pending: usize,
    /// Bytes placed in the output queue for the record being assembled.
    frame_len: usize,
    format: FrameFormat,
    overflow: OverflowPolicy,
    input: RingQueue,
    output: RingQueue,
    stats: ChannelStats,
}

impl Channel {
    /// Creates channel `index` with queues sized from `config`.
    pub fn new(index: usize, config: &EngineConfig) -> Self {
        Self {
            index,
            state: FramingState::Header,
            pending: 0,
            frame_len: 0,
            format: config.format,
            overflow: config.overflow,
            input: RingQueue::new(config.rx_capacity),
            output: RingQueue::new(config.tx_capacity),
            stats: ChannelStats::default(),
        }
    }

    /// Channel index, which is also its arbitration priority (0 = highest).
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current framing state.
    #[inline]
    pub fn state(&self) -> FramingState {
        self.state
    }

    /// Payload and trailer bytes still expected for the current record.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Bytes assembled so far for the current record.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Received bytes not yet examined by the state machine.
    #[inline]
    pub fn input(&self) -> &RingQueue {
        &self.input
    }

    /// Assembled bytes not yet sent.
    #[inline]
    pub fn output(&self) -> &RingQueue {
        &self.output
    }

    /// Diagnostic counters.
    #[inline]
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Returns true when the channel has nothing buffered and is looking for
    /// a header.
    pub fn is_idle(&self) -> bool {
        self.state == FramingState::Header && self.input.is_empty() && self.output.is_empty()
    }

    /// Stores one byte read from the port in the input queue.
    ///
    /// Returns false if a byte was lost to overflow: either `byte` itself
    /// ([`OverflowPolicy::DropNewest`]) or the oldest unread byte
    /// ([`OverflowPolicy::OverwriteOldest`]).
    pub fn receive(&mut self, byte: u8) -> bool {
        self.stats.bytes_received += 1;

        let lost = match self.overflow {
            OverflowPolicy::DropNewest => self.input.write(byte).is_err(),
            OverflowPolicy::OverwriteOldest => self.input.force_write(byte).is_some(),
        };
        if lost {
            self.stats.rx_dropped += 1;
            #[cfg(feature = "tracing")]
            tracing::warn!(
                channel = self.index,
                policy = self.overflow.name(),
                "input queue full, byte lost"
            );
        }
        !lost
    }

    /// Runs one step of the framing state machine.
    ///
    /// Consumes at most one input byte and performs at most one state
    /// transition.
    pub fn advance(&mut self) -> Step {
        match self.state {
            FramingState::Header => {
                let Some(byte) = self.input.read() else {
                    return Step::Idle;
                };
                self.relay(byte);
                if self.frame_len >= self.output.capacity() {
                    self.flush()
                } else {
                    if byte == self.format.header {
                        self.state = FramingState::Length;
                    }
                    Step::Relayed
                }
            }
            FramingState::Length => {
                let Some(declared) = self.input.read() else {
                    return Step::Idle;
                };
                self.relay(declared);
                let remainder = self.format.remainder(declared);
                if self.frame_len + remainder > self.output.capacity() {
                    self.flush()
                } else if remainder == 0 {
                    self.framed()
                } else {
                    self.pending = remainder;
                    self.state = FramingState::Payload;
                    Step::Relayed
                }
            }
            FramingState::Payload => {
                let Some(byte) = self.input.read() else {
                    return Step::Idle;
                };
                self.relay(byte);
                self.pending -= 1;
                if self.pending == 0 {
                    self.framed()
                } else {
                    Step::Relayed
                }
            }
            FramingState::Ready => Step::Idle,
            FramingState::Transmit => {
                if self.output.is_empty() {
                    self.state = FramingState::Header;
                    Step::Finished
                } else {
                    Step::Idle
                }
            }
        }
    }

    /// Moves a `Ready` channel to `Transmit`.
    ///
    /// Returns false (and changes nothing) if the channel is not `Ready`.
    pub fn grant(&mut self) -> bool {
        if self.state == FramingState::Ready {
            self.state = FramingState::Transmit;
            true
        } else {
            false
        }
    }

    /// Takes the next byte to put on the shared line.
    ///
    /// Returns `None` unless the channel is transmitting and has bytes left.
    pub fn take_output(&mut self) -> Option<u8> {
        if self.state != FramingState::Transmit {
            return None;
        }
        let byte = self.output.read()?;
        self.stats.bytes_sent += 1;
        Some(byte)
    }

    /// Appends to the output queue. The length checks in `advance` guarantee
    /// room for every byte of an assembling record.
    fn relay(&mut self, byte: u8) {
        let written = self.output.write(byte);
        debug_assert!(written.is_ok(), "output queue overflow while framing");
        self.frame_len += 1;
    }

    fn framed(&mut self) -> Step {
        self.enter_ready();
        self.stats.records_framed += 1;
        Step::Framed
    }

    fn flush(&mut self) -> Step {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            channel = self.index,
            state = self.state.name(),
            bytes = self.frame_len,
            "forced flush of partial record"
        );
        self.enter_ready();
        self.stats.forced_flushes += 1;
        Step::Flushed
    }

    fn enter_ready(&mut self) {
        self.state = FramingState::Ready;
        self.pending = 0;
        self.frame_len = 0;
    }
}
