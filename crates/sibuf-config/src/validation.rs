//! Relay profile validation.
//!
//! A profile is valid when it converts into an [`EngineConfig`] the engine
//! accepts and a [`LineSettings`] the UART can produce. Each check returns
//! the first problem found.
//!
//! # Example
//!
//! ```rust
//! use sibuf_config::{RelayProfile, validate_profile};
//!
//! let mut profile = RelayProfile::new("bad");
//! profile.frame.preamble = Some(profile.frame.header);
//! assert!(validate_profile(&profile).is_err());
//! ```

use sibuf_core::{EngineConfig, EngineConfigError};
use sibuf_platform::{DataBits, LineSettings};
use thiserror::Error;

use crate::profile::RelayProfile;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The engine rejected the channel or queue settings.
    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineConfigError),

    /// Preamble and header are the same byte, so the preamble would start a
    /// record on its own.
    #[error("preamble 0x{0:02X} is the same as the header byte")]
    PreambleIsHeader(u8),

    /// Baud rate of zero.
    #[error("baud rate must be non-zero")]
    ZeroBaud,

    /// Unsupported character size.
    #[error("data bits must be 5 to 8, got {0}")]
    DataBits(u8),

    /// Unsupported stop bit count.
    #[error("stop bits must be 1 or 2, got {0}")]
    StopBits(u8),

    /// The profile asks for more channels than the board has.
    #[error("profile uses {requested} channels, board has {available}")]
    TooManyChannels {
        /// Channels in the profile.
        requested: usize,
        /// Channels on the board.
        available: usize,
    },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Builds and checks the engine configuration of `profile`.
pub fn validate_engine(profile: &RelayProfile) -> ValidationResult<EngineConfig> {
    if let Some(preamble) = profile.frame.preamble
        && preamble == profile.frame.header
    {
        return Err(ValidationError::PreambleIsHeader(preamble));
    }
    let config = profile.engine_config_unchecked();
    config.validate()?;
    Ok(config)
}

/// Builds and checks the line settings of `profile`.
pub fn validate_line(profile: &RelayProfile) -> ValidationResult<LineSettings> {
    let line = &profile.line;
    if line.baud == 0 {
        return Err(ValidationError::ZeroBaud);
    }
    let data_bits = DataBits::from_count(u32::from(line.data_bits))
        .ok_or(ValidationError::DataBits(line.data_bits))?;
    let stop_bits = line
        .stop_bits()
        .ok_or(ValidationError::StopBits(line.stop_bits))?;
    Ok(LineSettings {
        baud: line.baud,
        data_bits,
        parity: line.parity.into(),
        stop_bits,
        flow: sibuf_platform::FlowControl {
            cts: line.cts,
            rts: line.rts,
        },
    })
}

/// Checks that `profile` fits a board with `available` channels.
pub fn validate_for_board(profile: &RelayProfile, available: usize) -> ValidationResult<()> {
    if profile.channels > available {
        return Err(ValidationError::TooManyChannels {
            requested: profile.channels,
            available,
        });
    }
    Ok(())
}

/// Runs every profile check that does not depend on a board.
pub fn validate_profile(profile: &RelayProfile) -> ValidationResult<()> {
    validate_engine(profile)?;
    validate_line(profile)?;
    Ok(())
}
