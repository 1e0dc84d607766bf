//! Probe configuration (verbosity + build floor).
//!
//! The probe never reads process-wide state on its own: callers thread a
//! [`ProbeConfig`] into [`probe_with`](crate::probe_with). The cached entry
//! points use [`ProbeConfig::current`], which reads the environment once.
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `CPUID_VERBOSE` | Diagnostic verbosity (`0` = silent, default). Negative means everything. |

use crate::level::{CapabilityLevel, static_target};

/// Environment variable holding the diagnostic verbosity.
pub const VERBOSE_ENV: &str = "CPUID_VERBOSE";

/// Diagnostic verbosity.
///
/// Library code is mute by default: only a non-zero verbosity lets the
/// reconciler report a CPU/OS mismatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Verbosity(pub i32);

impl Verbosity {
  pub const QUIET: Self = Self(0);
  pub const WARN: Self = Self(1);
  pub const DEBUG: Self = Self(2);
  /// Negative levels enable every message.
  pub const ALL: Self = Self(-1);

  /// Whether warnings (CPU/OS mismatch) are reported.
  #[inline]
  #[must_use]
  pub const fn warnings(self) -> bool {
    self.0 != 0
  }

  /// Parse a verbosity value (trimmed decimal `i32`).
  #[must_use]
  pub fn parse(s: &str) -> Option<Self> {
    let s = s.trim();
    if s.is_empty() {
      return None;
    }
    s.parse::<i32>().ok().map(Self)
  }
}

/// Inputs to one probe beyond the hardware itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
  /// Gates the mismatch diagnostic.
  pub verbosity: Verbosity,
  /// Minimum level the build requires; results are clamped up to it.
  pub static_target: CapabilityLevel,
}

impl Default for ProbeConfig {
  #[inline]
  fn default() -> Self {
    Self::new(Verbosity::QUIET, static_target())
  }
}

impl ProbeConfig {
  #[inline]
  #[must_use]
  pub const fn new(verbosity: Verbosity, static_target: CapabilityLevel) -> Self {
    Self { verbosity, static_target }
  }

  /// Config with a `GENERIC` floor.
  ///
  /// [`probe_with`](crate::probe_with) then reports the raw detected level,
  /// even when it sits below this build's [`static_target()`]. Useful for
  /// diagnosing detection on a machine the build would not otherwise run on.
  #[inline]
  #[must_use]
  pub const fn unfloored(verbosity: Verbosity) -> Self {
    Self::new(verbosity, CapabilityLevel::GENERIC)
  }

  /// Replace the verbosity.
  #[inline]
  #[must_use]
  pub const fn with_verbosity(self, verbosity: Verbosity) -> Self {
    Self { verbosity, ..self }
  }

  /// Replace the build floor.
  #[inline]
  #[must_use]
  pub const fn with_static_target(self, static_target: CapabilityLevel) -> Self {
    Self { static_target, ..self }
  }

  /// Build a config from the environment (no caching).
  ///
  /// Unset, empty or unparsable variables fall back to the defaults.
  #[cfg(feature = "std")]
  #[must_use]
  pub fn from_env() -> Self {
    let verbosity = std::env::var(VERBOSE_ENV).ok().and_then(|v| Verbosity::parse(&v)).unwrap_or_default();
    Self::default().with_verbosity(verbosity)
  }

  /// Process-scope config: the environment is read once, on first use.
  #[cfg(feature = "std")]
  #[must_use]
  pub fn current() -> Self {
    use std::sync::OnceLock;
    static CONFIG: OnceLock<ProbeConfig> = OnceLock::new();
    *CONFIG.get_or_init(Self::from_env)
  }

  /// Process-scope config: without `std` there is no environment.
  #[cfg(not(feature = "std"))]
  #[must_use]
  pub fn current() -> Self {
    Self::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbosity_parse() {
    assert_eq!(Verbosity::parse("1"), Some(Verbosity::WARN));
    assert_eq!(Verbosity::parse("  2 "), Some(Verbosity::DEBUG));
    assert_eq!(Verbosity::parse("-1"), Some(Verbosity::ALL));
    assert_eq!(Verbosity::parse(""), None);
    assert_eq!(Verbosity::parse("   "), None);
    assert_eq!(Verbosity::parse("loud"), None);
  }

  #[test]
  fn test_verbosity_gates() {
    assert!(!Verbosity::QUIET.warnings());
    assert!(Verbosity::WARN.warnings());
    assert!(Verbosity::ALL.warnings());
    assert!(Verbosity::DEBUG.warnings());
  }

  #[test]
  fn test_unfloored_config() {
    let config = ProbeConfig::unfloored(Verbosity::DEBUG);
    assert_eq!(config.verbosity, Verbosity::DEBUG);
    assert_eq!(config.static_target, CapabilityLevel::GENERIC);
  }

  #[test]
  fn test_default_config() {
    let config = ProbeConfig::default();
    assert_eq!(config.verbosity, Verbosity::QUIET);
    assert_eq!(config.static_target, static_target());
  }

  #[test]
  fn test_builders() {
    let config = ProbeConfig::default().with_verbosity(Verbosity::WARN).with_static_target(CapabilityLevel::AVX);
    assert_eq!(config, ProbeConfig::new(Verbosity::WARN, CapabilityLevel::AVX));
  }

  #[test]
  #[cfg(feature = "std")]
  fn test_current_is_stable() {
    assert_eq!(ProbeConfig::current(), ProbeConfig::current());
    assert_eq!(ProbeConfig::current().static_target, static_target());
  }
}
