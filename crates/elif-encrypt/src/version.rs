//! Version signals consumed by the compatibility resolver.
//!
//! Three independent moving parts decide which wiring can work: the host
//! framework, the runtime and the persistence-mapping library. Each is read
//! once at startup and never mutated afterwards.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

pub use semver::{Version, VersionReq};

/// Parse a version as reported by a hosting environment.
///
/// Accepts `1`, `1.2`, `1.2.3` and an optional leading `v`. Missing
/// components are zero. Pre-release and build suffixes (`8.2.0-rc1`,
/// `3.1.0+build`) are dropped: decisions are made on the release line only.
pub fn parse_version(input: &str) -> Result<Version, ConfigError> {
    let invalid = || ConfigError::invalid_value("version", input, "major[.minor[.patch]]");

    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();

    let components = core.split('.').count();
    if core.is_empty() || components > 3 {
        return Err(invalid());
    }

    let padded = format!("{}{}", core, ".0".repeat(3 - components));
    Version::parse(&padded).map_err(|_| invalid())
}

/// The three version signals read from the hosting environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSignal {
    pub framework: Version,
    pub runtime: Version,
    pub mapping_library: Version,
}

impl VersionSignal {
    pub fn new(framework: Version, runtime: Version, mapping_library: Version) -> Self {
        Self {
            framework,
            runtime,
            mapping_library,
        }
    }

    /// Parse all three signals from version strings
    pub fn parse(framework: &str, runtime: &str, mapping_library: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            parse_version(framework)?,
            parse_version(runtime)?,
            parse_version(mapping_library)?,
        ))
    }

    /// Read the signals from `ELIF_ENCRYPT_*_VERSION` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        fn read(var: &str) -> Result<Version, ConfigError> {
            let value = env::var(var).map_err(|_| {
                ConfigError::missing_required(
                    var,
                    "The hosting environment must report its component versions",
                )
            })?;
            parse_version(&value)
        }

        Ok(Self::new(
            read("ELIF_ENCRYPT_FRAMEWORK_VERSION")?,
            read("ELIF_ENCRYPT_RUNTIME_VERSION")?,
            read("ELIF_ENCRYPT_MAPPING_VERSION")?,
        ))
    }
}

impl fmt::Display for VersionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "framework {}, runtime {}, mapping library {}",
            self.framework, self.runtime, self.mapping_library
        )
    }
}

/// Source of version signals.
pub trait VersionProbe {
    fn detect(&self) -> Result<VersionSignal, ConfigError>;
}

impl VersionProbe for VersionSignal {
    fn detect(&self) -> Result<VersionSignal, ConfigError> {
        Ok(self.clone())
    }
}

/// Probe backed by environment variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvVersionProbe;

impl VersionProbe for EnvVersionProbe {
    fn detect(&self) -> Result<VersionSignal, ConfigError> {
        VersionSignal::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(v("6.4"), Version::new(6, 4, 0));
        assert_eq!(v("8"), Version::new(8, 0, 0));
        assert_eq!(v(" v3.1.2 "), Version::new(3, 1, 2));
        assert_eq!(v("8.2.0-rc1"), Version::new(8, 2, 0));
        assert_eq!(v("2.17.1+build.5"), Version::new(2, 17, 1));

        assert!(parse_version("").is_err());
        assert!(parse_version("six").is_err());
        assert!(parse_version("1.2.3.4").is_err());
        assert!(parse_version("1..2").is_err());
    }

    #[test]
    fn test_caret_range_stays_within_major() {
        let req = VersionReq::parse("^3.0").unwrap();
        assert!(req.matches(&v("3.0")));
        assert!(req.matches(&v("3.4.2")));
        assert!(!req.matches(&v("2.19")));
        assert!(!req.matches(&v("4.0")));
    }

    #[test]
    fn test_signal_parse_and_display() {
        let signal = VersionSignal::parse("6.4", "8", "2.17.1").unwrap();
        assert_eq!(
            signal.to_string(),
            "framework 6.4.0, runtime 8.0.0, mapping library 2.17.1"
        );
        assert!(VersionSignal::parse("6.4", "eight", "2.17").is_err());
    }

    #[test]
    #[serial]
    fn test_env_probe() {
        env::set_var("ELIF_ENCRYPT_FRAMEWORK_VERSION", "6.4.1");
        env::set_var("ELIF_ENCRYPT_RUNTIME_VERSION", "8.2");
        env::set_var("ELIF_ENCRYPT_MAPPING_VERSION", "2.17");

        let signal = EnvVersionProbe.detect();
        env::remove_var("ELIF_ENCRYPT_MAPPING_VERSION");
        let missing = EnvVersionProbe.detect();
        env::remove_var("ELIF_ENCRYPT_FRAMEWORK_VERSION");
        env::remove_var("ELIF_ENCRYPT_RUNTIME_VERSION");

        let signal = signal.unwrap();
        assert_eq!(signal.framework, Version::new(6, 4, 1));
        assert_eq!(signal.runtime.major, 8);
        assert_eq!(signal.mapping_library, Version::new(2, 17, 0));
        assert!(matches!(missing, Err(ConfigError::MissingRequired { .. })));
    }
}
