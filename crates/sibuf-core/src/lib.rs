//! sibuf Core - punch framing and transmit arbitration for the serial buffer
//!
//! This crate relays variable-length punch records arriving on several
//! independent serial inputs onto one shared, flow-controlled output. A
//! transmitter without flow control (an SI station) can then feed a slow
//! receiver (a radio module) that asserts CTS only when it can accept data.
//!
//! Records from different inputs are never interleaved: each channel
//! assembles one whole record, waits for the transmit lock, and drains it
//! onto the shared line one byte per tick.
//!
//! # Core Abstractions
//!
//! - [`RingQueue`] - Fixed-capacity byte FIFO, never reallocates
//! - [`Channel`] - One input line: input queue, framing state machine, output queue
//! - [`Arbiter`] - Owner of the transmit lock, driven by an [`ArbitrationPolicy`]
//! - [`Engine`] - The polled loop tying channels, arbiter and ports together
//! - [`SerialPort`] - Capability set a UART driver provides
//!
//! # Record Format
//!
//! ```text
//! [STX] 0xD3 LEN payload[LEN] CRC1 CRC0 ETX
//! ```
//!
//! See [`FrameFormat`]. Only the header byte and the lengths are inspected;
//! everything is relayed verbatim.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for the queues).
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sibuf-core = { version = "0.1", default-features = false }
//! ```
//!
//! Enable the `tracing` feature to get lock and flush events as `tracing`
//! spans and events.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod arbiter;
pub mod channel;
pub mod config;
pub mod engine;
pub mod frame;
pub mod port;
pub mod queue;

// Re-export main types at crate root
pub use arbiter::{
    Arbiter, ArbitrationPolicy, LockEvent, PolicyKind, PriorityPolicy, RoundRobinPolicy,
};
pub use channel::{Channel, ChannelStats, Step};
pub use config::{
    CHANNEL_COUNT, EngineConfig, EngineConfigError, OverflowPolicy, RX_QUEUE_CAPACITY,
    TX_QUEUE_CAPACITY,
};
pub use engine::{Engine, EngineStats, SentByte, TickReport};
pub use frame::{
    FrameFormat, FramingState, PUNCH_ETX, PUNCH_HEADER, PUNCH_PAYLOAD_LEN, PUNCH_PREAMBLE,
    PUNCH_TRAILER_LEN,
};
pub use port::SerialPort;
pub use queue::{QueueFull, RingQueue};
