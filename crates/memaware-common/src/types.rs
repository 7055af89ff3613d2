//! Domain primitive types used across the memaware workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Reference to the container image the scenarios run in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageName(String);

impl ImageName {
    /// Creates an image name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name given to a single container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    /// Creates a container name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates a unique container name.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}-{}",
            crate::constants::APP_NAME,
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A memory quantity as written on the engine command line.
///
/// Keeps the original text so it reaches the engine untouched, alongside
/// the byte count the runtime is expected to report. Units are binary
/// multiples, matching the engine's own interpretation of `--memory`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemorySize {
    raw: String,
    bytes: u64,
}

impl MemorySize {
    /// Parses sizes like `"100m"`, `"1G"`, `"512MiB"` or `"1048576"`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidSize`] if the value has no digits, an
    /// unknown unit, or overflows `u64`.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || HarnessError::InvalidSize {
            value: value.to_string(),
        };
        let trimmed = value.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (number, suffix) = trimmed.split_at(digits_end);
        if number.is_empty() {
            return Err(invalid());
        }
        let number: u64 = number.parse().map_err(|_| invalid())?;

        let suffix = suffix.trim_start().to_ascii_lowercase();
        let unit = suffix.strip_suffix('b').unwrap_or(&suffix);
        // A single `i` is only meaningful after a unit letter, as in `MiB`.
        let unit = match unit.strip_suffix('i') {
            Some(letter) if !letter.is_empty() => letter,
            _ => unit,
        };
        let shift = match unit {
            "" => 0,
            "k" => 10,
            "m" => 20,
            "g" => 30,
            "t" => 40,
            _ => return Err(invalid()),
        };
        let bytes = number.checked_mul(1u64 << shift).ok_or_else(invalid)?;
        Ok(Self {
            raw: trimmed.to_string(),
            bytes,
        })
    }

    /// Builds a size from a whole number of mebibytes.
    #[must_use]
    pub fn from_mib(mib: u64) -> Self {
        Self {
            raw: format!("{mib}m"),
            bytes: mib << 20,
        }
    }

    /// Returns the size as originally written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the size in bytes.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Returns the size in whole mebibytes, rounding down.
    #[must_use]
    pub const fn mib(&self) -> u64 {
        self.bytes >> 20
    }
}

impl FromStr for MemorySize {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lowercase_units() {
        assert_eq!(MemorySize::parse("100m").unwrap().bytes(), 104_857_600);
        assert_eq!(MemorySize::parse("500m").unwrap().bytes(), 524_288_000);
        assert_eq!(MemorySize::parse("1g").unwrap().bytes(), 1_073_741_824);
        assert_eq!(MemorySize::parse("4g").unwrap().bytes(), 4_294_967_296);
    }

    #[test]
    fn parse_uppercase_and_long_units() {
        assert_eq!(MemorySize::parse("150M").unwrap().bytes(), 150 << 20);
        assert_eq!(MemorySize::parse("1G").unwrap().bytes(), 1 << 30);
        assert_eq!(MemorySize::parse("512MiB").unwrap().bytes(), 512 << 20);
        assert_eq!(MemorySize::parse("64kb").unwrap().bytes(), 64 << 10);
    }

    #[test]
    fn parse_plain_bytes() {
        let size = MemorySize::parse("1048576").unwrap();
        assert_eq!(size.bytes(), 1_048_576);
        assert_eq!(size.raw(), "1048576");
    }

    #[test]
    fn parse_keeps_raw_text() {
        let size = MemorySize::parse(" 1500M ").unwrap();
        assert_eq!(size.raw(), "1500M");
        assert_eq!(size.to_string(), "1500M");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(MemorySize::parse("abc").is_err());
        assert!(MemorySize::parse("").is_err());
        assert!(MemorySize::parse("10x").is_err());
        assert!(MemorySize::parse("99999999999999999999").is_err());
    }

    #[test]
    fn parse_rejects_stray_binary_marker() {
        for value in ["100i", "100ii", "100ib", "1mii", "1mib b"] {
            assert!(MemorySize::parse(value).is_err(), "{value} should be rejected");
        }
        assert_eq!(MemorySize::parse("1Mi").unwrap().bytes(), 1 << 20);
        assert_eq!(MemorySize::parse("2KiB").unwrap().bytes(), 2048);
    }

    #[test]
    fn parse_rejects_overflow_after_multiplying() {
        assert!(MemorySize::parse("18446744073709551615k").is_err());
    }

    #[test]
    fn from_mib_round_trips_through_engine_text() {
        let size = MemorySize::from_mib(256);
        assert_eq!(size.raw(), "256m");
        assert_eq!(MemorySize::parse(size.raw()).unwrap(), size);
        assert_eq!(size.mib(), 256);
    }

    #[test]
    fn generated_container_names_are_unique() {
        let a = ContainerName::generate();
        let b = ContainerName::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("memaware-"));
    }
}
