//! sibuf Platform - board description and serial hardware abstraction
//!
//! This crate describes the serial buffer board and the capabilities the
//! relay engine needs from it, separate from the engine itself.
//!
//! # Core Abstractions
//!
//! ## Board
//!
//! - [`BoardLayout`] - Per-channel UART and GPIO assignment, shared output, LED
//! - [`LineSettings`] - Baud rate, character format and flow control
//!
//! ## Bring-up
//!
//! - [`UartDriver`] - UART/GPIO configuration calls provided by the HAL
//! - [`bring_up`] - Configures every channel and reports actual baud rates
//!
//! ## Status
//!
//! - [`StatusLed`] - The activity LED
//! - [`ActivityIndicator`] - Drives the LED from engine traffic counters
//!
//! ## Simulation (`std` only)
//!
//! - [`sim::SimInput`], [`sim::SimOutput`] - Scripted ports with CTS throttling
//! - [`sim::RecordingDriver`] - Logs bring-up calls, models the baud divider
//! - [`sim::SimBench`] - Engine plus simulated ports
//!
//! # no_std Support
//!
//! Everything except [`sim`] is `no_std` compatible:
//!
//! ```toml
//! [dependencies]
//! sibuf-platform = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sibuf_core::{Engine, EngineConfig};
//! use sibuf_platform::{BoardLayout, LineSettings, bring_up};
//!
//! let report = bring_up(&mut hal_uarts, &BoardLayout::SERIAL_BUFFER, &LineSettings::PUNCH)?;
//! let mut engine = Engine::new(EngineConfig::default())?;
//! loop {
//!     engine.tick(&mut inputs, &mut shared_line);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod board;
pub mod bringup;
pub mod line;
#[cfg(feature = "std")]
pub mod sim;
pub mod status;

// Re-export the port trait the simulated ports implement
pub use sibuf_core::SerialPort;

// Re-export main types at crate root
pub use board::{BOARD_CHANNELS, BoardLayout, ChannelPins, UartId};
pub use bringup::{
    BAUD_TOLERANCE_PERMILLE, BringUpError, BringUpReport, PinFunction, UartDriver, bring_up,
};
pub use line::{DataBits, FlowControl, INIT_BAUD, LineSettings, PUNCH_BAUD, Parity, StopBits};
pub use status::{ActivityIndicator, BlinkStep, STARTUP_BLINK, StatusLed, play_pattern};
