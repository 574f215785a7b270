//! Relay profile file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use sibuf_core::{EngineConfig, FrameFormat, OverflowPolicy, PolicyKind};
use sibuf_platform::{LineSettings, Parity, StopBits};

use crate::error::ConfigError;
use crate::validation::{self, ValidationResult};

/// Relay configuration for the serial buffer and its host tooling.
///
/// Profiles are stored as TOML files. Missing fields take the firmware
/// defaults, so an empty file is a valid profile.
///
/// # TOML Format
///
/// ```toml
/// name = "SRR"
/// description = "SPORTident SRR dongle behind a radio module"
/// channels = 2
/// arbitration = "priority"
/// overflow = "drop-newest"
///
/// [queues]
/// rx = 10240
/// tx = 128
///
/// [frame]
/// header = 0xD3
/// preamble = 0x02
/// trailer = 3
///
/// [line]
/// baud = 38400
/// data_bits = 8
/// parity = "none"
/// stop_bits = 1
/// cts = true
/// rts = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayProfile {
    /// Name of the profile.
    pub name: String,

    /// Optional description of the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Number of input channels.
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Transmit-lock arbitration.
    #[serde(default)]
    pub arbitration: Arbitration,

    /// Input overflow handling.
    #[serde(default)]
    pub overflow: Overflow,

    /// Queue capacities.
    #[serde(default)]
    pub queues: QueueSection,

    /// Record format.
    #[serde(default)]
    pub frame: FrameSection,

    /// Serial line settings.
    #[serde(default)]
    pub line: LineSection,
}

fn default_channels() -> usize {
    sibuf_core::CHANNEL_COUNT
}

/// Arbitration policy name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Arbitration {
    /// Lowest channel index wins.
    #[default]
    Priority,
    /// Rotate after each grant.
    RoundRobin,
}

impl From<Arbitration> for PolicyKind {
    fn from(value: Arbitration) -> Self {
        match value {
            Arbitration::Priority => PolicyKind::Priority,
            Arbitration::RoundRobin => PolicyKind::RoundRobin,
        }
    }
}

/// Overflow policy name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Overflow {
    /// Discard the incoming byte.
    #[default]
    DropNewest,
    /// Evict the oldest queued byte.
    OverwriteOldest,
}

impl From<Overflow> for OverflowPolicy {
    fn from(value: Overflow) -> Self {
        match value {
            Overflow::DropNewest => OverflowPolicy::DropNewest,
            Overflow::OverwriteOldest => OverflowPolicy::OverwriteOldest,
        }
    }
}

/// `[queues]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueSection {
    /// Input queue capacity per channel.
    pub rx: usize,
    /// Output queue capacity per channel.
    pub tx: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            rx: sibuf_core::RX_QUEUE_CAPACITY,
            tx: sibuf_core::TX_QUEUE_CAPACITY,
        }
    }
}

/// `[frame]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrameSection {
    /// Header byte.
    pub header: u8,
    /// Preamble byte, if the stations send one. Leaving it out of a
    /// `[frame]` table means no preamble; only a missing table gets the
    /// firmware's STX.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<u8>,
    /// Bytes after the declared payload.
    pub trailer: u8,
}

impl Default for FrameSection {
    fn default() -> Self {
        let format = FrameFormat::SI_PUNCH;
        Self {
            header: format.header,
            preamble: format.preamble,
            trailer: format.trailer_len,
        }
    }
}

impl From<FrameSection> for FrameFormat {
    fn from(value: FrameSection) -> Self {
        let format = FrameFormat::new(value.header, value.trailer);
        match value.preamble {
            Some(preamble) => format.with_preamble(preamble),
            None => format,
        }
    }
}

/// Parity name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParityName {
    /// No parity.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

impl From<ParityName> for Parity {
    fn from(value: ParityName) -> Self {
        match value {
            ParityName::None => Parity::None,
            ParityName::Even => Parity::Even,
            ParityName::Odd => Parity::Odd,
        }
    }
}

/// `[line]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LineSection {
    /// Baud rate.
    pub baud: u32,
    /// Data bits, 5 to 8.
    pub data_bits: u8,
    /// Parity.
    pub parity: ParityName,
    /// Stop bits, 1 or 2.
    pub stop_bits: u8,
    /// Respect CTS on the shared output.
    pub cts: bool,
    /// Drive RTS on the inputs.
    pub rts: bool,
}

impl LineSection {
    /// Stop bits as a line setting, `None` if unsupported.
    pub fn stop_bits(&self) -> Option<StopBits> {
        match self.stop_bits {
            1 => Some(StopBits::One),
            2 => Some(StopBits::Two),
            _ => None,
        }
    }
}

impl Default for LineSection {
    fn default() -> Self {
        let line = LineSettings::PUNCH;
        Self {
            baud: line.baud,
            data_bits: line.data_bits.count() as u8,
            parity: ParityName::None,
            stop_bits: line.stop_bits.count() as u8,
            cts: line.flow.cts,
            rts: line.flow.rts,
        }
    }
}

impl RelayProfile {
    /// Create a profile with firmware defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            channels: default_channels(),
            arbitration: Arbitration::default(),
            overflow: Overflow::default(),
            queues: QueueSection::default(),
            frame: FrameSection::default(),
            line: LineSection::default(),
        }
    }

    /// Create a profile with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the trailer length.
    pub fn with_trailer(mut self, trailer: u8) -> Self {
        self.frame.trailer = trailer;
        self
    }

    /// Set the arbitration policy.
    pub fn with_arbitration(mut self, arbitration: Arbitration) -> Self {
        self.arbitration = arbitration;
        self
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let profile: RelayProfile = toml::from_str(&content)?;
        Ok(profile)
    }

    /// Load a profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the profile to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the profile to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Record format described by the `[frame]` table.
    pub fn frame_format(&self) -> FrameFormat {
        self.frame.into()
    }

    /// Arbitration policy to build the engine with.
    pub fn policy(&self) -> PolicyKind {
        self.arbitration.into()
    }

    /// Engine configuration, validated.
    pub fn engine_config(&self) -> ValidationResult<EngineConfig> {
        validation::validate_engine(self)
    }

    /// Line settings, validated.
    pub fn line_settings(&self) -> ValidationResult<LineSettings> {
        validation::validate_line(self)
    }

    pub(crate) fn engine_config_unchecked(&self) -> EngineConfig {
        EngineConfig::default()
            .with_channels(self.channels)
            .with_capacities(self.queues.rx, self.queues.tx)
            .with_format(self.frame_format())
            .with_overflow(self.overflow.into())
    }
}

impl Default for RelayProfile {
    fn default() -> Self {
        Self::new("default")
    }
}
