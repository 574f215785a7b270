//! Relay profiles for the sibuf serial buffer.
//!
//! A [`RelayProfile`] bundles everything that differs between deployments:
//! channel count, queue sizes, record format, arbitration, overflow handling
//! and line settings. Profiles are TOML files validated into an
//! [`EngineConfig`](sibuf_core::EngineConfig) and a
//! [`LineSettings`](sibuf_platform::LineSettings).
//!
//! # Features
//!
//! - **Profiles**: Load and save relay profiles from TOML files
//! - **Validation**: Check engine and line settings before use
//! - **Paths**: Platform-specific profile directory
//! - **Factory Profiles**: `srr`, `srr-bench`, `round-robin`
//!
//! # Example
//!
//! ```rust
//! use sibuf_config::{RelayProfile, get_factory_profile};
//!
//! let profile = get_factory_profile("srr-bench").unwrap().unwrap();
//! let config = profile.engine_config().unwrap();
//! assert_eq!(config.format.trailer_len, 2);
//!
//! let custom = RelayProfile::from_toml(
//!     "name = \"site\"\n[frame]\npreamble = 0x02\ntrailer = 2",
//! ).unwrap();
//! assert_eq!(custom.frame_format(), config.format);
//! ```

mod error;
mod profile;

/// Platform-specific paths for profiles.
pub mod paths;

/// Profile validation.
pub mod validation;

/// Factory profiles bundled with the library.
pub mod factory_profiles;

pub use error::ConfigError;
pub use factory_profiles::{
    FACTORY_PROFILE_NAMES, factory_profile_names, factory_profiles, get_factory_profile,
    is_factory_profile,
};
pub use paths::{
    ensure_user_profiles_dir, find_profile, list_user_profiles, profile_name_from_path,
    user_config_dir, user_profiles_dir,
};
pub use profile::{
    Arbitration, FrameSection, LineSection, Overflow, ParityName, QueueSection, RelayProfile,
};
pub use validation::{
    ValidationError, ValidationResult, validate_engine, validate_for_board, validate_line,
    validate_profile,
};

/// Resolves a profile by path, user profile name, or factory name, in that
/// order, and validates it.
pub fn resolve_profile(name: &str) -> Result<RelayProfile, ConfigError> {
    let profile = match find_profile(name) {
        Some(path) => RelayProfile::load(path)?,
        None => get_factory_profile(name)?
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?,
    };
    validate_profile(&profile)?;
    Ok(profile)
}
