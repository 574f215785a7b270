//! Shared CLI helpers used across multiple commands.

use sibuf_config::{ConfigError, RelayProfile, resolve_profile};
use sibuf_core::FrameFormat;

use crate::punch::{PunchGenerator, PunchTime};

/// Start time of seeded streams, so a seed reproduces the bytes exactly.
const SEEDED_START: PunchTime = PunchTime::new(0, 10 * 60 * 60, 0);

/// Load and validate a profile by path, user profile name, or factory name.
pub fn load_profile(name: &str) -> anyhow::Result<RelayProfile> {
    match resolve_profile(name) {
        Ok(profile) => Ok(profile),
        Err(ConfigError::ProfileNotFound(_)) => anyhow::bail!(
            "Profile '{}' not found. Use 'sibuf profiles list' to see available profiles.",
            name
        ),
        Err(e) => Err(anyhow::anyhow!("{}", e)),
    }
}

/// Punch generator for a command. Seeded generators start at a fixed time.
pub fn punch_generator(channels: usize, format: FrameFormat, seed: Option<u64>) -> PunchGenerator {
    let generator = PunchGenerator::new(channels, format, seed);
    match seed {
        Some(_) => generator.with_start(SEEDED_START),
        None => generator,
    }
}

/// Repeating CTS schedule, `true` = asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtsPattern(pub Vec<bool>);

/// Parse a CTS pattern such as `1100` (`1` = asserted) for clap's `value_parser`.
pub fn parse_cts_pattern(s: &str) -> Result<CtsPattern, String> {
    if s.is_empty() {
        return Err("CTS pattern must not be empty".to_string());
    }
    s.chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(format!(
                "Invalid CTS pattern character '{}' (expected 0 or 1)",
                other
            )),
        })
        .collect::<Result<_, _>>()
        .map(CtsPattern)
}

/// Space-separated uppercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
