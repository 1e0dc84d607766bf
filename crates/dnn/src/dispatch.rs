//! Forward-kernel selection.
//!
//! - [`Candidate`]: a kernel with a minimum capability level
//! - [`Selected`]: the result of selection
//! - [`select`]: choose the best kernel from a candidate list
//! - [`FwdTable`]: one candidate list per [`FwdPath`]
//! - [`dispatch_fwd`]: route a [`DispatchKey`], select, run
//!
//! # Usage
//!
//! ```
//! use cpuid::CapabilityLevel;
//! use dnn::{DispatchKey, FormatTag, FwdTable, candidates, dispatch_fwd};
//!
//! type Kernel = fn(u32) -> u32;
//!
//! fn skx(x: u32) -> u32 { x + 3 }
//! fn hsw(x: u32) -> u32 { x + 2 }
//! fn generic(x: u32) -> u32 { x + 1 }
//!
//! static TABLE: FwdTable<'static, Kernel> = FwdTable::new(
//!   candidates![
//!     "stream/skx" => CapabilityLevel::AVX512_CORE => skx as Kernel,
//!     "stream/generic" => CapabilityLevel::GENERIC => generic as Kernel,
//!   ],
//!   candidates![
//!     "custom_1/hsw" => CapabilityLevel::AVX2 => hsw as Kernel,
//!     "custom_1/generic" => CapabilityLevel::GENERIC => generic as Kernel,
//!   ],
//!   candidates!["custom_2/generic" => CapabilityLevel::GENERIC => generic as Kernel],
//! );
//!
//! let key = DispatchKey::new(FormatTag::CUSTOM_1, false);
//! assert_eq!(dispatch_fwd(&TABLE, key, CapabilityLevel::AVX2, |k| k(0)), Some(2));
//!
//! // Unknown formats run nothing.
//! let key = DispatchKey::new(FormatTag(7), false);
//! assert_eq!(dispatch_fwd(&TABLE, key, CapabilityLevel::AVX2, |k| k(0)), None);
//! ```

use cpuid::CapabilityLevel;

use crate::format::{DispatchKey, FwdPath};

// ─────────────────────────────────────────────────────────────────────────────
// Core Types
// ─────────────────────────────────────────────────────────────────────────────

/// A candidate kernel with a capability requirement.
///
/// Candidates are ordered from best to worst. Selection takes the first one
/// whose requirement the resolved level meets.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<F> {
  /// Human-readable name for diagnostics (e.g., "custom_1/skx").
  pub name: &'static str,
  /// Minimum capability level the kernel was built for.
  pub requires: CapabilityLevel,
  /// The kernel.
  pub func: F,
}

impl<F> Candidate<F> {
  #[inline]
  #[must_use]
  pub const fn new(name: &'static str, requires: CapabilityLevel, func: F) -> Self {
    Self { name, requires, func }
  }

  /// Whether this kernel may run at `level`.
  #[inline]
  #[must_use]
  pub const fn eligible(&self, level: CapabilityLevel) -> bool {
    level.at_least(self.requires)
  }
}

/// The result of kernel selection.
#[derive(Clone, Copy, Debug)]
pub struct Selected<F> {
  /// Name of the selected candidate.
  pub name: &'static str,
  /// Path the candidate was taken from.
  pub path: FwdPath,
  /// Level the candidate needs.
  pub requires: CapabilityLevel,
  /// The selected kernel.
  pub func: F,
}

/// Build a `&[Candidate]` slice: `"name" => requires => func, ...`.
#[macro_export]
macro_rules! candidates {
  ($($name:expr => $requires:expr => $func:expr),* $(,)?) => {
    &[$($crate::Candidate::new($name, $requires, $func)),*]
  };
}

/// Select the best kernel from `candidates` for `level`.
///
/// Returns `None` when no candidate is eligible; lists normally end with a
/// [`GENERIC`](CapabilityLevel::GENERIC) fallback.
#[inline]
#[must_use]
pub fn select<F: Copy>(path: FwdPath, level: CapabilityLevel, candidates: &[Candidate<F>]) -> Option<Selected<F>> {
  candidates
    .iter()
    .find(|candidate| candidate.eligible(level))
    .map(|candidate| Selected { name: candidate.name, path, requires: candidate.requires, func: candidate.func })
}

// ─────────────────────────────────────────────────────────────────────────────
// Forward Table
// ─────────────────────────────────────────────────────────────────────────────

/// Candidate lists for every forward path.
#[derive(Clone, Copy, Debug)]
pub struct FwdTable<'a, F> {
  pub stream: &'a [Candidate<F>],
  pub custom_1: &'a [Candidate<F>],
  pub custom_2: &'a [Candidate<F>],
}

impl<'a, F> FwdTable<'a, F> {
  #[must_use]
  pub const fn new(stream: &'a [Candidate<F>], custom_1: &'a [Candidate<F>], custom_2: &'a [Candidate<F>]) -> Self {
    Self { stream, custom_1, custom_2 }
  }

  /// Candidate list for `path`.
  #[inline]
  #[must_use]
  pub const fn candidates(&self, path: FwdPath) -> &'a [Candidate<F>] {
    match path {
      FwdPath::Stream => self.stream,
      FwdPath::Custom1 => self.custom_1,
      FwdPath::Custom2 => self.custom_2,
    }
  }
}

impl<F: Copy> FwdTable<'_, F> {
  /// Route `key` and select the best kernel for `level`.
  ///
  /// `None` for an unknown format, or when no candidate of the path is
  /// eligible.
  #[must_use]
  pub fn select(&self, key: DispatchKey, level: CapabilityLevel) -> Option<Selected<F>> {
    let Some(path) = key.path() else {
      tracing::debug!(target: "dnn", format = key.format.0, "no forward path for format");
      return None;
    };

    let selected = select(path, level, self.candidates(path));
    match &selected {
      Some(s) => {
        tracing::trace!(target: "dnn", path = path.name(), kernel = s.name, level = level.name(), "selected forward kernel");
      }
      None => {
        tracing::debug!(target: "dnn", path = path.name(), level = level.name(), "no eligible forward kernel");
      }
    }
    selected
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Select a kernel for `key` at `level` and hand it to `run`.
///
/// Returns `None` without calling `run` when nothing was selected; an unknown
/// format is not an error.
#[inline]
pub fn dispatch_fwd<F: Copy, R>(
  table: &FwdTable<'_, F>,
  key: DispatchKey,
  level: CapabilityLevel,
  run: impl FnOnce(F) -> R,
) -> Option<R> {
  table.select(key, level).map(|selected| run(selected.func))
}

/// [`dispatch_fwd`] at the process capability level ([`cpuid::level`]).
#[inline]
pub fn dispatch_fwd_auto<F: Copy, R>(table: &FwdTable<'_, F>, key: DispatchKey, run: impl FnOnce(F) -> R) -> Option<R> {
  dispatch_fwd(table, key, cpuid::level(), run)
}

// ─────────────────────────────────────────────────────────────────────────────
// Cached Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Forward dispatcher that caches one selection per path.
///
/// Selection runs against [`cpuid::level`] the first time a path is used;
/// later calls are a single load.
///
/// # Example
///
/// ```
/// use cpuid::CapabilityLevel;
/// use dnn::{DispatchKey, FormatTag, FwdDispatcher, FwdTable, candidates};
///
/// fn generic(x: u32) -> u32 { x }
///
/// static FWD: FwdDispatcher<fn(u32) -> u32> = FwdDispatcher::new(FwdTable::new(
///   candidates!["stream/generic" => CapabilityLevel::GENERIC => generic as fn(u32) -> u32],
///   candidates!["custom_1/generic" => CapabilityLevel::GENERIC => generic as fn(u32) -> u32],
///   &[],
/// ));
///
/// let key = DispatchKey::new(FormatTag::CUSTOM_1, true);
/// assert_eq!(FWD.kernel_name(key), Some("stream/generic"));
/// assert_eq!(FWD.run(key, |k| k(5)), Some(5));
/// assert_eq!(FWD.run(DispatchKey::new(FormatTag::CUSTOM_2, false), |k| k(5)), None);
/// ```
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct FwdDispatcher<F: Copy + 'static> {
  table: FwdTable<'static, F>,
  cache: [std::sync::OnceLock<Option<Selected<F>>>; 3],
}

#[cfg(feature = "std")]
impl<F: Copy + 'static> FwdDispatcher<F> {
  #[must_use]
  pub const fn new(table: FwdTable<'static, F>) -> Self {
    Self {
      table,
      cache: [std::sync::OnceLock::new(), std::sync::OnceLock::new(), std::sync::OnceLock::new()],
    }
  }

  /// The selected kernel for `key`, initializing its path on first use.
  #[must_use]
  pub fn get(&self, key: DispatchKey) -> Option<Selected<F>> {
    let path = key.path()?;
    let slot = self.cache.get(usize::from(path.as_u8()))?;
    *slot.get_or_init(|| self.table.select(key, cpuid::level()))
  }

  /// Name of the kernel selected for `key`.
  #[inline]
  #[must_use]
  pub fn kernel_name(&self, key: DispatchKey) -> Option<&'static str> {
    self.get(key).map(|selected| selected.name)
  }

  /// Run the kernel selected for `key`.
  #[inline]
  pub fn run<R>(&self, key: DispatchKey, run: impl FnOnce(F) -> R) -> Option<R> {
    self.get(key).map(|selected| run(selected.func))
  }
}
