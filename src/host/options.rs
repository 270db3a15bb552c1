//! Connection upgrade options.
//!
//! Options are accepted at upgrade time and apply to one connection. They
//! deserialize from JSON using the camelCase names shared across hosts.
//!
//! # Example
//!
//! ```ignore
//! use websock::UpgradeOptions;
//!
//! let options = UpgradeOptions::new()
//!     .with_timeout_ms(30_000)
//!     .with_max_frame_size(1 << 20);
//!
//! let parsed = UpgradeOptions::from_json(r#"{"timeout": 30000, "maxFrameSize": 1048576}"#)?;
//! assert_eq!(options, parsed);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default idle timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// OptionKey
// ============================================================================

/// Names of the recognized upgrade options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    /// `timeout`
    Timeout,
    /// `compress`
    Compress,
    /// `maxFrameSize`
    MaxFrameSize,
    /// `fullsweepAfter`
    FullsweepAfter,
}

impl OptionKey {
    /// All recognized keys.
    pub const ALL: [Self; 4] = [
        Self::Timeout,
        Self::Compress,
        Self::MaxFrameSize,
        Self::FullsweepAfter,
    ];

    /// The option's external name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Compress => "compress",
            Self::MaxFrameSize => "maxFrameSize",
            Self::FullsweepAfter => "fullsweepAfter",
        }
    }
}

// ============================================================================
// UpgradeOptions
// ============================================================================

/// Per-connection options accepted at upgrade time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct UpgradeOptions {
    /// Idle timeout in milliseconds. `0` disables the idle timeout.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,

    /// Negotiate a compression extension.
    pub compress: bool,

    /// Largest accepted frame payload in bytes. `None` is unbounded.
    pub max_frame_size: Option<usize>,

    /// Runtime GC tuning hint. Advisory.
    pub fullsweep_after: Option<u32>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl UpgradeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: false,
            max_frame_size: None,
            fullsweep_after: None,
        }
    }

    /// Parses options from a JSON object.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed or names an unknown option
    /// - [`Error::Config`] if validation fails
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl UpgradeOptions {
    /// Sets the idle timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Disables the idle timeout.
    #[inline]
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout_ms = 0;
        self
    }

    /// Requests compression.
    #[inline]
    #[must_use]
    pub fn with_compress(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Sets the maximum frame size in bytes.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = Some(bytes);
        self
    }

    /// Sets the fullsweep hint.
    #[inline]
    #[must_use]
    pub fn with_fullsweep_after(mut self, count: u32) -> Self {
        self.fullsweep_after = Some(count);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl UpgradeOptions {
    /// Returns the idle timeout, or `None` when disabled.
    #[inline]
    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Returns `true` if the option differs from its default.
    #[must_use]
    pub fn is_set(&self, key: OptionKey) -> bool {
        match key {
            OptionKey::Timeout => self.timeout_ms != DEFAULT_TIMEOUT_MS,
            OptionKey::Compress => self.compress,
            OptionKey::MaxFrameSize => self.max_frame_size.is_some(),
            OptionKey::FullsweepAfter => self.fullsweep_after.is_some(),
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `maxFrameSize` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == Some(0) {
            return Err(Error::config("maxFrameSize must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = UpgradeOptions::new();
        assert_eq!(options.timeout_ms, 60_000);
        assert!(!options.compress);
        assert!(options.max_frame_size.is_none());
        assert!(options.fullsweep_after.is_none());
        assert_eq!(options, UpgradeOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = UpgradeOptions::new()
            .with_timeout_ms(500)
            .with_compress()
            .with_max_frame_size(1024)
            .with_fullsweep_after(20);

        assert_eq!(options.idle_timeout(), Some(Duration::from_millis(500)));
        assert!(options.compress);
        assert_eq!(options.max_frame_size, Some(1024));
        assert_eq!(options.fullsweep_after, Some(20));
    }

    #[test]
    fn test_zero_timeout_disables() {
        assert!(UpgradeOptions::new().without_timeout().idle_timeout().is_none());
    }

    #[test]
    fn test_is_set() {
        let options = UpgradeOptions::new().with_compress();
        assert!(options.is_set(OptionKey::Compress));
        assert!(!options.is_set(OptionKey::Timeout));
        assert!(!options.is_set(OptionKey::MaxFrameSize));
    }

    #[test]
    fn test_from_json_uses_external_names() {
        let options = UpgradeOptions::from_json(
            r#"{"timeout": 1500, "compress": true, "maxFrameSize": 4096, "fullsweepAfter": 10}"#,
        )
        .unwrap();

        assert_eq!(options.timeout_ms, 1500);
        assert!(options.compress);
        assert_eq!(options.max_frame_size, Some(4096));
        assert_eq!(options.fullsweep_after, Some(10));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let options = UpgradeOptions::from_json("{}").unwrap();
        assert_eq!(options, UpgradeOptions::new());
    }

    #[test]
    fn test_from_json_rejects_unknown_option() {
        let result = UpgradeOptions::from_json(r#"{"activeN": 5}"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_validate_zero_frame_size() {
        let result = UpgradeOptions::new().with_max_frame_size(0).validate();
        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(UpgradeOptions::from_json(r#"{"maxFrameSize": 0}"#).is_err());
    }

    #[test]
    fn test_option_names() {
        let names: Vec<_> = OptionKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["timeout", "compress", "maxFrameSize", "fullsweepAfter"]);
    }
}
