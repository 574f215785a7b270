//! Build-time relay constants and the engine configuration derived from them.
//!
//! The firmware build uses [`EngineConfig::default()`], which bundles the
//! constants below. Host tooling may construct other configurations (see
//! the `sibuf-config` crate) but every value is fixed once the engine exists.

use crate::frame::FrameFormat;

/// Number of serial input channels on the board.
pub const CHANNEL_COUNT: usize = 2;

/// Input queue size per channel, accommodates many punches as stream bytes.
pub const RX_QUEUE_CAPACITY: usize = 10 * 1024;

/// Output queue size per channel, one complete punch at a time (oversized).
pub const TX_QUEUE_CAPACITY: usize = 128;

/// What a channel does with a received byte when its input queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OverflowPolicy {
    /// Discard the incoming byte.
    #[default]
    DropNewest,
    /// Discard the oldest unread byte to make room.
    OverwriteOldest,
}

impl OverflowPolicy {
    /// Short lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DropNewest => "drop-newest",
            Self::OverwriteOldest => "overwrite-oldest",
        }
    }
}

/// Errors reported by [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineConfigError {
    /// At least one input channel is required.
    NoChannels,
    /// Queue capacities must be non-zero.
    ZeroCapacity,
    /// The output queue cannot hold even the smallest record.
    OutputTooSmall {
        /// Configured output capacity.
        capacity: usize,
        /// Length of a zero-payload record in this format.
        minimum: usize,
    },
}

#[cfg(feature = "std")]
impl std::fmt::Display for EngineConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoChannels => write!(f, "at least one channel is required"),
            Self::ZeroCapacity => write!(f, "queue capacity must be > 0"),
            Self::OutputTooSmall { capacity, minimum } => write!(
                f,
                "output queue capacity {capacity} is below the minimum record length {minimum}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineConfigError {}

/// Sizing and framing parameters for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of input channels.
    pub channels: usize,
    /// Input queue capacity per channel, in bytes.
    pub rx_capacity: usize,
    /// Output queue capacity per channel, in bytes.
    pub tx_capacity: usize,
    /// Record format used to find punch boundaries.
    pub format: FrameFormat,
    /// Input-queue overflow handling.
    pub overflow: OverflowPolicy,
}

impl EngineConfig {
    /// The firmware configuration.
    pub const FIRMWARE: Self = Self {
        channels: CHANNEL_COUNT,
        rx_capacity: RX_QUEUE_CAPACITY,
        tx_capacity: TX_QUEUE_CAPACITY,
        format: FrameFormat::SI_PUNCH,
        overflow: OverflowPolicy::DropNewest,
    };

    /// Sets the number of channels.
    pub const fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Sets both queue capacities.
    pub const fn with_capacities(mut self, rx_capacity: usize, tx_capacity: usize) -> Self {
        self.rx_capacity = rx_capacity;
        self.tx_capacity = tx_capacity;
        self
    }

    /// Sets the record format.
    pub const fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the input overflow policy.
    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Checks that an engine can be built from this configuration.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.channels == 0 {
            return Err(EngineConfigError::NoChannels);
        }
        if self.rx_capacity == 0 || self.tx_capacity == 0 {
            return Err(EngineConfigError::ZeroCapacity);
        }
        let minimum = self.format.record_len(0);
        if self.tx_capacity < minimum {
            return Err(EngineConfigError::OutputTooSmall {
                capacity: self.tx_capacity,
                minimum,
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::FIRMWARE
    }
}
