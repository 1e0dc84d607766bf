//! Combining the CPU level and the OS ceiling.
//!
//! The CPU-reported level wins. The OS ceiling only feeds a diagnostic, and
//! the result is never below the build floor.

use crate::{config::ProbeConfig, level::CapabilityLevel};

/// Outcome of one probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reconciled {
  /// Level the CPU reported, unfloored: it can sit below
  /// `static_target` (down to `GENERIC` when the SSE4.2 gate fails), while
  /// `level` never does.
  pub cpu: CapabilityLevel,
  /// Ceiling the OS permits.
  pub os: CapabilityLevel,
  /// Level callers should use.
  pub level: CapabilityLevel,
  /// The CPU level is above the build floor and above the OS ceiling.
  pub mismatch: bool,
}

impl Reconciled {
  /// Result for targets without a raw query: everything equals the floor.
  #[inline]
  #[must_use]
  pub const fn floor(static_target: CapabilityLevel) -> Self {
    Self { cpu: static_target, os: static_target, level: static_target, mismatch: false }
  }
}

/// Pure reconciliation (no diagnostics).
#[inline]
#[must_use]
pub const fn reconcile_levels(cpu: CapabilityLevel, os: CapabilityLevel, static_target: CapabilityLevel) -> Reconciled {
  let mismatch = cpu.id() > static_target.id() && os.id() < cpu.id();
  Reconciled { cpu, os, level: cpu.max(static_target), mismatch }
}

/// Reconcile and, when `config.verbosity` allows, report a mismatch.
#[must_use]
pub fn reconcile(cpu: CapabilityLevel, os: CapabilityLevel, config: &ProbeConfig) -> Reconciled {
  let result = reconcile_levels(cpu, os, config.static_target);
  if result.mismatch && config.verbosity.warnings() {
    tracing::warn!(
      target: "cpuid",
      cpu = cpu.name(),
      os = os.name(),
      "detected CPU features are not permitted by the OS"
    );
  }
  result
}
