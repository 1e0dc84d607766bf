//! Runtime vector-ISA capability detection.
//!
//! This crate reduces what the executing CPU and its operating system jointly
//! support to one ordered [`CapabilityLevel`], and maps that level to the
//! short target name kernel-selection tables are keyed by.
//!
//! # Main Entry Point
//!
//! ```
//! let level = cpuid::level();
//! assert!(level >= cpuid::static_target());
//!
//! if level >= cpuid::CapabilityLevel::AVX512_CORE {
//!   // AVX-512 (DQ/BW/VL) kernels are eligible.
//! }
//! println!("target: {}", cpuid::name(level));
//! ```
//!
//! # Pipeline
//!
//! 1. [`query`]: raw CPUID / XGETBV words behind the [`RawQuery`] trait.
//! 2. [`resolve`]: CPUID leaves → CPU-reported level (strict gate ladder).
//! 3. [`os`]: XCR0 → ceiling the OS permits.
//! 4. [`reconcile`]: CPU level wins, the OS ceiling only feeds a diagnostic,
//!    and the result is clamped up to [`static_target()`].
//!
//! # Design
//!
//! 1. **Infallible**: every gate has a fallback; detection never errors.
//! 2. **Testable**: the procedure runs against any [`RawQuery`], including
//!    [`Simulated`] words (`testing` feature).
//! 3. **Cached once**: [`level()`] caches in a `OnceLock` (std) or an atomic
//!    cell (no_std). [`probe_with`] is the uncached form.
//! 4. **Miri-safe**: under Miri, and on non-x86 targets, the build floor is
//!    returned without executing CPUID.

#![no_std]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

#[cfg(any(feature = "std", test))]
extern crate std;

// ─────────────────────────────────────────────────────────────────────────────
// Core modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod config;
mod detect;
pub mod level;
pub mod os;
pub mod query;
pub mod reconcile;
pub mod resolve;

// Proptest uses file I/O for failure persistence that Miri cannot interpret.
#[cfg(all(test, not(miri)))]
mod proptests;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

pub use config::{ProbeConfig, Verbosity};
pub use detect::{OverrideError, clear_override, has_override, level, probe, probe_with, set_override, try_set_override};
pub use level::{CapabilityLevel, name, static_target};
#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
pub use query::Native;
#[cfg(any(test, feature = "testing"))]
pub use query::Simulated;
pub use query::{RawFeatureWords, RawQuery, XcrValue};
pub use reconcile::Reconciled;
pub use resolve::CpuReport;
