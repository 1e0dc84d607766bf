//! Capability levels and their canonical target names.
//!
//! A [`CapabilityLevel`] answers one question: "which vector ISA tier can
//! kernels on this machine assume?" Levels form a single ladder where a
//! higher value always implies every instruction of the lower ones.
//!
//! # Ladder
//!
//! | Level | Id | Name | Requires |
//! |-------|----|------|----------|
//! | `GENERIC` | 1 | generic | nothing (non-x86 or probe unavailable) |
//! | `X86_GENERIC` | 1002 | x86 | any x86 CPU |
//! | `SSE3` | 1003 | wsm | baseline-extension threshold |
//! | `SSE4` | 1004 | wsm | SSE4.2 (CRC32 bit as proxy) |
//! | `AVX` | 1005 | snb | + AVX |
//! | `AVX2` | 1006 | hsw | + FMA |
//! | `AVX512` | 1007 | hsw | + AVX512F + AVX512CD |
//! | `AVX512_MIC` | 1010 | knl | + AVX512PF + AVX512ER |
//! | `AVX512_KNM` | 1011 | knm | + AVX512_4VNNIW + AVX512_4FMAPS |
//! | `AVX512_CORE` | 1020 | skx | + AVX512DQ + AVX512BW + AVX512VL |
//! | `AVX512_CLX` | 1021 | clx | + AVX512_VNNI |
//! | `AVX512_CPX` | 1022 | cpx | + AVX512_BF16 |
//!
//! The name strings are lookup keys for code-generator tables, which is why
//! several levels share a name.

use core::fmt;

/// An ordered vector ISA capability level.
///
/// Backed by an `i32` so that ids outside the named ladder (for example a
/// level reported by a newer producer) stay representable and still have a
/// name via [`CapabilityLevel::name`].
///
/// # Ordering
///
/// `Ord` follows the integer id, so `level >= CapabilityLevel::AVX2` reads as
/// "at least AVX2".
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CapabilityLevel(i32);

impl CapabilityLevel {
  /// Below every real level. Never produced by detection.
  pub const UNKNOWN: Self = Self(0);
  /// No vector ISA assumed (non-x86 targets, or detection unavailable).
  pub const GENERIC: Self = Self(1);
  /// Any x86 CPU; threshold for the "x86" name.
  pub const X86_GENERIC: Self = Self(1002);
  pub const SSE3: Self = Self(1003);
  pub const SSE4: Self = Self(1004);
  pub const AVX: Self = Self(1005);
  pub const AVX2: Self = Self(1006);
  pub const AVX512: Self = Self(1007);
  pub const AVX512_MIC: Self = Self(1010);
  pub const AVX512_KNM: Self = Self(1011);
  pub const AVX512_CORE: Self = Self(1020);
  pub const AVX512_CLX: Self = Self(1021);
  pub const AVX512_CPX: Self = Self(1022);
  /// OS ceiling meaning "every state component the CPU can use is enabled".
  pub const UNLIMITED: Self = Self(i32::MAX);

  /// Every named level on the ladder, lowest first.
  pub const LADDER: [Self; 12] = [
    Self::GENERIC,
    Self::X86_GENERIC,
    Self::SSE3,
    Self::SSE4,
    Self::AVX,
    Self::AVX2,
    Self::AVX512,
    Self::AVX512_MIC,
    Self::AVX512_KNM,
    Self::AVX512_CORE,
    Self::AVX512_CLX,
    Self::AVX512_CPX,
  ];

  /// Wrap a raw level id.
  #[inline]
  #[must_use]
  pub const fn from_id(id: i32) -> Self {
    Self(id)
  }

  /// The raw level id.
  #[inline]
  #[must_use]
  pub const fn id(self) -> i32 {
    self.0
  }

  /// `const` maximum of two levels.
  #[inline]
  #[must_use]
  pub const fn max(self, other: Self) -> Self {
    if self.0 >= other.0 { self } else { other }
  }

  /// `const` minimum of two levels.
  #[inline]
  #[must_use]
  pub const fn min(self, other: Self) -> Self {
    if self.0 <= other.0 { self } else { other }
  }

  /// `const` form of `self >= other`.
  #[inline]
  #[must_use]
  pub const fn at_least(self, other: Self) -> bool {
    self.0 >= other.0
  }

  /// Canonical target name used by kernel-selection tables.
  ///
  /// Total: unnamed ids at or above [`X86_GENERIC`](Self::X86_GENERIC) are
  /// `"x86"`, everything below is `"unknown"`.
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::AVX512_CPX => "cpx",
      Self::AVX512_CLX => "clx",
      Self::AVX512_CORE => "skx",
      Self::AVX512_KNM => "knm",
      Self::AVX512_MIC => "knl",
      // Code generators have no distinct AVX-512 common target yet.
      Self::AVX512 => "hsw",
      Self::AVX2 => "hsw",
      Self::AVX => "snb",
      Self::SSE4 => "wsm",
      // The SSE4 target only relies on SSE3 instructions.
      Self::SSE3 => "wsm",
      Self::GENERIC => "generic",
      other if other.0 >= Self::X86_GENERIC.0 => "x86",
      _ => "unknown",
    }
  }

  /// Returns `true` for the AVX-512 family (common, MIC and core variants).
  #[inline]
  #[must_use]
  pub const fn is_avx512(self) -> bool {
    self.0 >= Self::AVX512.0 && self.0 <= Self::AVX512_CPX.0
  }
}

impl fmt::Debug for CapabilityLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "CapabilityLevel({}:{})", self.0, self.name())
  }
}

impl fmt::Display for CapabilityLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl From<CapabilityLevel> for i32 {
  #[inline]
  fn from(level: CapabilityLevel) -> Self {
    level.0
  }
}

impl From<i32> for CapabilityLevel {
  #[inline]
  fn from(id: i32) -> Self {
    Self(id)
  }
}

/// Canonical target name for `level`.
///
/// Free-function form of [`CapabilityLevel::name`].
#[inline]
#[must_use]
pub const fn name(level: CapabilityLevel) -> &'static str {
  level.name()
}

// ─────────────────────────────────────────────────────────────────────────────
// Compile-Time Floor
// ─────────────────────────────────────────────────────────────────────────────

/// The minimum level this build was compiled to require.
///
/// Derived from `-C target-feature` / `-C target-cpu`. Detection never reports
/// a level below this value: code compiled for it already executes those
/// instructions unconditionally.
///
/// ```
/// const FLOOR: cpuid::CapabilityLevel = cpuid::static_target();
///
/// #[cfg(target_arch = "x86_64")]
/// assert!(FLOOR >= cpuid::CapabilityLevel::X86_GENERIC);
/// ```
#[inline(always)]
#[must_use]
pub const fn static_target() -> CapabilityLevel {
  #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
  {
    let mut level = CapabilityLevel::X86_GENERIC;

    if cfg!(target_feature = "sse3") {
      level = CapabilityLevel::SSE3;
    }
    if cfg!(target_feature = "sse4.2") {
      level = CapabilityLevel::SSE4;
    }
    if cfg!(target_feature = "avx") {
      level = CapabilityLevel::AVX;
    }
    if cfg!(all(target_feature = "avx2", target_feature = "fma")) {
      level = CapabilityLevel::AVX2;
    }
    if cfg!(all(target_feature = "avx512f", target_feature = "avx512cd")) {
      level = CapabilityLevel::AVX512;
      if cfg!(all(target_feature = "avx512dq", target_feature = "avx512bw", target_feature = "avx512vl")) {
        level = CapabilityLevel::AVX512_CORE;
        if cfg!(target_feature = "avx512vnni") {
          level = CapabilityLevel::AVX512_CLX;
          if cfg!(target_feature = "avx512bf16") {
            level = CapabilityLevel::AVX512_CPX;
          }
        }
      }
    }
    level
  }

  #[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
  {
    CapabilityLevel::GENERIC
  }
}
