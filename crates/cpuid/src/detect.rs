//! Top-level probe, process cache and override hook.

use core::fmt;

use crate::{
  config::ProbeConfig,
  level::{CapabilityLevel, static_target},
  os::os_level,
  query::RawQuery,
  reconcile::{Reconciled, reconcile},
  resolve::resolve,
};

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Run the full decision procedure against `query`.
///
/// Uncached and infallible: every branch ends at a defined level, and the
/// result is never below `config.static_target`.
///
/// Pass [`ProbeConfig::unfloored`] to see the raw detected level of a machine
/// that sits below this build's floor.
#[must_use]
pub fn probe_with<Q: RawQuery + ?Sized>(query: &Q, config: &ProbeConfig) -> Reconciled {
  let cpu = resolve(query);
  let os = os_level(query, &cpu);
  let result = reconcile(cpu.level, os, config);
  tracing::debug!(
    target: "cpuid",
    level = result.level.name(),
    id = result.level.id(),
    cpu = result.cpu.name(),
    os = result.os.name(),
    "probed capability level"
  );
  result
}

/// Probe the executing machine (uncached).
///
/// On x86/x86_64 this queries the CPU through [`Native`](crate::Native).
/// Every other architecture, and Miri, returns the build floor without
/// touching hardware.
#[must_use]
pub fn probe() -> Reconciled {
  let config = ProbeConfig::current();

  #[cfg(all(any(target_arch = "x86_64", target_arch = "x86"), not(miri)))]
  {
    probe_with(&crate::query::Native, &config)
  }

  #[cfg(not(all(any(target_arch = "x86_64", target_arch = "x86"), not(miri))))]
  {
    Reconciled::floor(config.static_target)
  }
}

/// Resolved capability level of this process.
///
/// # Caching
///
/// - With `std`: cached in a `OnceLock` on first call.
/// - Without `std`: cached in an atomic state cell.
///
/// An override installed before the first call can only lower the detected
/// level, and never below [`static_target()`].
#[inline]
#[must_use]
pub fn level() -> CapabilityLevel {
  #[cfg(feature = "std")]
  {
    *STD_CACHE.get_or_init(detect_with_override)
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::get_or_init(detect_with_override)
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    detect_with_override()
  }
}

#[cold]
fn detect_with_override() -> CapabilityLevel {
  let requested = seal_override();
  apply_override(requested, probe().level)
}

/// Cap `detected` at the requested override, then lift to the build floor.
#[inline]
#[must_use]
const fn apply_override(requested: Option<CapabilityLevel>, detected: CapabilityLevel) -> CapabilityLevel {
  match requested {
    Some(ov) => ov.min(detected).max(static_target()),
    None => detected,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Override System
// ─────────────────────────────────────────────────────────────────────────────

/// Why an override was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverrideError {
  /// [`level()`] already cached a value.
  AlreadyInitialized,
  /// This build has no storage for an override.
  Unsupported,
}

impl fmt::Display for OverrideError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::AlreadyInitialized => f.write_str("capability level already initialized"),
      Self::Unsupported => f.write_str("capability override unsupported on this build"),
    }
  }
}

impl core::error::Error for OverrideError {}

#[cfg(feature = "std")]
use std::sync::{OnceLock, RwLock};

#[cfg(feature = "std")]
static STD_CACHE: OnceLock<CapabilityLevel> = OnceLock::new();

/// Override value plus the "detection has started" flag, behind one lock.
#[cfg(feature = "std")]
struct OverrideSlot {
  value: Option<CapabilityLevel>,
  sealed: bool,
}

#[cfg(feature = "std")]
static OVERRIDE: RwLock<OverrideSlot> = RwLock::new(OverrideSlot { value: None, sealed: false });

/// Set the level override.
///
/// # Panics
///
/// Panics if [`try_set_override`] fails.
#[cold]
pub fn set_override(value: Option<CapabilityLevel>) {
  if let Err(err) = try_set_override(value) {
    panic!("cpuid::set_override failed: {err}");
  }
}

/// Try to set the level override.
///
/// The override is a ceiling: [`level()`] reports
/// `min(override, detected)`, lifted to [`static_target()`]. It never
/// reports a level the machine was not detected to support.
///
/// Pre-init only: once [`level()`] has started detection this returns
/// [`OverrideError::AlreadyInitialized`]. The check and the store happen
/// under the same lock the first [`level()`] call takes to read the
/// override, so an `Ok(())` is always observed by detection.
#[cold]
pub fn try_set_override(value: Option<CapabilityLevel>) -> Result<(), OverrideError> {
  #[cfg(feature = "std")]
  {
    let Ok(mut slot) = OVERRIDE.write() else {
      return Err(OverrideError::Unsupported);
    };
    if slot.sealed {
      return Err(OverrideError::AlreadyInitialized);
    }
    slot.value = value;
    Ok(())
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::try_set_override(value)
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    let _ = value;
    Err(OverrideError::Unsupported)
  }
}

/// Clear the level override.
#[cold]
pub fn clear_override() {
  set_override(None);
}

/// Check if an override is set.
#[inline]
#[must_use]
pub fn has_override() -> bool {
  #[cfg(feature = "std")]
  {
    OVERRIDE.read().is_ok_and(|slot| slot.value.is_some())
  }

  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::get_override().is_some()
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    false
  }
}

/// Close the override window and return the installed value.
///
/// Only called from the cache initializer.
fn seal_override() -> Option<CapabilityLevel> {
  #[cfg(feature = "std")]
  {
    OVERRIDE.write().ok().and_then(|mut slot| {
      slot.sealed = true;
      slot.value
    })
  }

  // The atomic state is INITING here, which already excludes setters.
  #[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
  {
    atomic_cache::get_override()
  }

  #[cfg(all(not(feature = "std"), not(target_has_atomic = "32")))]
  {
    None
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomic Cache (no_std)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(not(feature = "std"), target_has_atomic = "32"))]
mod atomic_cache {
  use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

  use super::{CapabilityLevel, OverrideError};

  const STATE_UNINIT: u8 = 0;
  const STATE_INITING: u8 = 1;
  const STATE_READY: u8 = 2;
  /// A setter holds the cell; initializers wait.
  const STATE_SETTING: u8 = 3;

  /// Level ids are never `i32::MIN`.
  const NO_OVERRIDE: i32 = i32::MIN;

  static STATE: AtomicU8 = AtomicU8::new(STATE_UNINIT);
  static CACHED: AtomicI32 = AtomicI32::new(0);
  static OVERRIDE: AtomicI32 = AtomicI32::new(NO_OVERRIDE);

  pub fn get_or_init(f: fn() -> CapabilityLevel) -> CapabilityLevel {
    loop {
      match STATE.compare_exchange(STATE_UNINIT, STATE_INITING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
          let result = f();
          CACHED.store(result.id(), Ordering::Relaxed);
          STATE.store(STATE_READY, Ordering::Release);
          return result;
        }
        Err(STATE_READY) => return load_cached(),
        // INITING or SETTING: wait for the other side to finish.
        Err(_) => core::hint::spin_loop(),
      }
    }
  }

  fn load_cached() -> CapabilityLevel {
    CapabilityLevel::from_id(CACHED.load(Ordering::Relaxed))
  }

  pub fn try_set_override(value: Option<CapabilityLevel>) -> Result<(), OverrideError> {
    loop {
      match STATE.compare_exchange(STATE_UNINIT, STATE_SETTING, Ordering::Acquire, Ordering::Acquire) {
        Ok(_) => {
          OVERRIDE.store(value.map_or(NO_OVERRIDE, CapabilityLevel::id), Ordering::Relaxed);
          STATE.store(STATE_UNINIT, Ordering::Release);
          return Ok(());
        }
        Err(STATE_SETTING) => core::hint::spin_loop(),
        Err(_) => return Err(OverrideError::AlreadyInitialized),
      }
    }
  }

  pub fn get_override() -> Option<CapabilityLevel> {
    match OVERRIDE.load(Ordering::Acquire) {
      NO_OVERRIDE => None,
      id => Some(CapabilityLevel::from_id(id)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    config::Verbosity,
    os::xcr0,
    query::Simulated,
    resolve::{leaf1, leaf7},
  };

  const SKX_LEAF1: u32 = leaf1::SSE42_CRC32 | leaf1::AVX | leaf1::FMA | leaf1::XSAVE_ENABLED;
  const SKX_LEAF7: u32 = leaf7::AVX512_COMMON | leaf7::AVX512_CORE;

  fn config(floor: CapabilityLevel) -> ProbeConfig {
    ProbeConfig::new(Verbosity::QUIET, floor)
  }

  #[test]
  fn test_probe_with_full_stack() {
    let sim = Simulated::new()
      .max_leaf(0xD)
      .leaf1_ecx(SKX_LEAF1)
      .leaf7(SKX_LEAF7, 0, 0)
      .xcr0(u64::from(xcr0::YMM | xcr0::ZMM | 1));
    let r = probe_with(&sim, &config(CapabilityLevel::X86_GENERIC));
    assert_eq!(r.cpu, CapabilityLevel::AVX512_CORE);
    assert_eq!(r.os, CapabilityLevel::UNLIMITED);
    assert_eq!(r.level, CapabilityLevel::AVX512_CORE);
    assert!(!r.mismatch);
  }

  #[test]
  fn test_probe_with_os_without_zmm() {
    let sim = Simulated::new()
      .max_leaf(0xD)
      .leaf1_ecx(SKX_LEAF1)
      .leaf7(SKX_LEAF7, 0, 0)
      .xcr0(u64::from(xcr0::YMM | 1));
    let r = probe_with(&sim, &config(CapabilityLevel::X86_GENERIC).with_verbosity(Verbosity::WARN));
    assert_eq!(r.os, CapabilityLevel::AVX2);
    assert_eq!(r.level, CapabilityLevel::AVX512_CORE);
    assert!(r.mismatch);
  }

  #[test]
  fn test_probe_with_is_idempotent() {
    let sim = Simulated::new().max_leaf(7).leaf1_ecx(SKX_LEAF1).leaf7(SKX_LEAF7, leaf7::AVX512_VNNI, 0);
    let cfg = config(CapabilityLevel::X86_GENERIC);
    assert_eq!(probe_with(&sim, &cfg), probe_with(&sim, &cfg));
  }

  #[test]
  fn test_probe_with_clamps_to_floor() {
    let sim = Simulated::new();
    let r = probe_with(&sim, &config(CapabilityLevel::AVX2));
    assert_eq!(r.cpu, CapabilityLevel::GENERIC);
    assert_eq!(r.level, CapabilityLevel::AVX2);
  }

  #[test]
  fn test_probe_is_stable() {
    let a = probe();
    let b = probe();
    assert_eq!(a, b);
    assert!(a.level >= static_target());
  }

  #[test]
  #[cfg(any(miri, not(any(target_arch = "x86_64", target_arch = "x86"))))]
  fn test_probe_without_query_is_floor() {
    assert_eq!(probe(), Reconciled::floor(static_target()));
  }

  #[test]
  fn test_level_is_cached_and_floored() {
    let first = level();
    assert_eq!(first, level());
    assert!(first >= static_target());
  }

  #[test]
  fn test_override_only_lowers() {
    let floor = static_target();
    let detected = CapabilityLevel::AVX2.max(floor);
    assert_eq!(apply_override(None, detected), detected);
    assert_eq!(apply_override(Some(CapabilityLevel::UNLIMITED), detected), detected);
    assert_eq!(apply_override(Some(CapabilityLevel::AVX512_CPX), detected), detected);
    assert_eq!(apply_override(Some(CapabilityLevel::GENERIC), detected), floor);
    assert_eq!(apply_override(Some(CapabilityLevel::AVX), detected), CapabilityLevel::AVX.max(floor));
  }

  #[test]
  fn test_override_error_display() {
    use std::string::ToString;
    assert_eq!(OverrideError::AlreadyInitialized.to_string(), "capability level already initialized");
    assert!(OverrideError::Unsupported.to_string().contains("unsupported"));
  }
}
