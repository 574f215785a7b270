//! Factory profiles bundled with sibuf.
//!
//! These are embedded at compile time and always available, and serve as
//! starting points for site-specific profiles.

use crate::{ConfigError, RelayProfile};

/// Array of factory profile names for external access.
pub static FACTORY_PROFILE_NAMES: &[&str] = &["srr", "srr-bench", "round-robin"];

static FACTORY_PROFILES_TOML: &[(&str, &str)] = &[
    ("srr", SRR_PROFILE),
    ("srr-bench", SRR_BENCH_PROFILE),
    ("round-robin", ROUND_ROBIN_PROFILE),
];

/// The deployed firmware: two stations, CRC plus ETX trailer.
const SRR_PROFILE: &str = r#"
name = "srr"
description = "Two SI stations into one radio module, trailer CRC1 CRC0 ETX"
channels = 2
arbitration = "priority"
overflow = "drop-newest"

[queues]
rx = 10240
tx = 128

[frame]
header = 0xD3
preamble = 0x02
trailer = 3

[line]
baud = 38400
data_bits = 8
parity = "none"
stop_bits = 1
cts = true
rts = false
"#;

/// Bench format: punches end at the CRC, no ETX.
const SRR_BENCH_PROFILE: &str = r#"
name = "srr-bench"
description = "Bench test punches, trailer CRC1 CRC0 only"
channels = 2
arbitration = "priority"
overflow = "drop-newest"

[queues]
rx = 10240
tx = 128

[frame]
header = 0xD3
preamble = 0x02
trailer = 2

[line]
baud = 38400
data_bits = 8
parity = "none"
stop_bits = 1
cts = true
rts = false
"#;

/// Fair arbitration so a busy first station cannot hold back the second.
const ROUND_ROBIN_PROFILE: &str = r#"
name = "round-robin"
description = "Firmware format with rotating transmit priority"
channels = 2
arbitration = "round-robin"
overflow = "drop-newest"

[queues]
rx = 10240
tx = 128

[frame]
header = 0xD3
preamble = 0x02
trailer = 3

[line]
baud = 38400
data_bits = 8
parity = "none"
stop_bits = 1
cts = true
rts = false
"#;

/// Returns every factory profile, in [`FACTORY_PROFILE_NAMES`] order.
///
/// A bundled profile that fails to parse is reported, never skipped.
pub fn factory_profiles() -> Result<Vec<RelayProfile>, ConfigError> {
    parse_all(FACTORY_PROFILES_TOML)
}

/// Returns the factory profile called `name`, case-insensitive.
pub fn get_factory_profile(name: &str) -> Result<Option<RelayProfile>, ConfigError> {
    FACTORY_PROFILES_TOML
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, toml)| RelayProfile::from_toml(toml))
        .transpose()
}

fn parse_all(entries: &[(&str, &str)]) -> Result<Vec<RelayProfile>, ConfigError> {
    entries
        .iter()
        .map(|(_, toml)| RelayProfile::from_toml(toml))
        .collect()
}

/// Returns the names of all factory profiles.
pub fn factory_profile_names() -> &'static [&'static str] {
    FACTORY_PROFILE_NAMES
}

/// True if `name` is a factory profile.
pub fn is_factory_profile(name: &str) -> bool {
    FACTORY_PROFILE_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_profile;
    use sibuf_core::{EngineConfig, FrameFormat, PolicyKind};

    #[test]
    fn test_all_factory_profiles_parse_and_validate() {
        let profiles = factory_profiles().unwrap();
        assert_eq!(profiles.len(), FACTORY_PROFILE_NAMES.len());
        for (profile, name) in profiles.iter().zip(FACTORY_PROFILE_NAMES) {
            assert_eq!(profile.name, *name);
            validate_profile(profile).unwrap();
        }
    }

    #[test]
    fn test_srr_is_firmware() {
        let srr = get_factory_profile("SRR").unwrap().unwrap();
        assert_eq!(srr.engine_config().unwrap(), EngineConfig::FIRMWARE);
    }

    #[test]
    fn test_bench_trailer() {
        let bench = get_factory_profile("srr-bench").unwrap().unwrap();
        assert_eq!(
            bench.frame_format(),
            FrameFormat::new(0xD3, 2).with_preamble(0x02)
        );
    }

    #[test]
    fn test_round_robin_policy() {
        let rr = get_factory_profile("round-robin").unwrap().unwrap();
        assert_eq!(rr.policy(), PolicyKind::RoundRobin);
        assert!(is_factory_profile("Round-Robin"));
        assert!(!is_factory_profile("lottery"));
        assert!(get_factory_profile("lottery").unwrap().is_none());
    }

    #[test]
    fn test_broken_entry_is_an_error() {
        let entries = [
            ("srr", SRR_PROFILE),
            ("broken", "name = \"broken\"\nchannels = \"two\""),
        ];
        let err = parse_all(&entries).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
