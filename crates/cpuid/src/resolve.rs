//! CPU-reported capability level.
//!
//! Walks the CPUID leaves as a strict ladder: every step is only taken when
//! the previous gate passed, and a failed gate settles on the highest level
//! already proven. Gates are bitmask containment checks ([`has_bits`]).

use crate::{
  level::CapabilityLevel,
  query::{RawFeatureWords, RawQuery, has_bits},
};

/// Leaf 1 ECX feature bits.
pub mod leaf1 {
  /// SSE4.2 `crc32`. Used as the proxy gate for the 128-bit path; it does not
  /// prove every SSE4.x instruction.
  pub const SSE42_CRC32: u32 = 1 << 20;
  pub const FMA: u32 = 1 << 12;
  pub const AVX: u32 = 1 << 28;
  /// XSAVE/XRSTOR/XGETBV supported by the CPU.
  pub const XSAVE: u32 = 1 << 26;
  /// OS has set CR4.OSXSAVE.
  pub const OSXSAVE: u32 = 1 << 27;
  pub const XSAVE_ENABLED: u32 = XSAVE | OSXSAVE;
}

/// Leaf 7 (subleaf 0 and 1) feature bits.
pub mod leaf7 {
  // ─── EBX ───
  pub const AVX512F: u32 = 1 << 16;
  pub const AVX512DQ: u32 = 1 << 17;
  pub const AVX512PF: u32 = 1 << 26;
  pub const AVX512ER: u32 = 1 << 27;
  pub const AVX512CD: u32 = 1 << 28;
  pub const AVX512BW: u32 = 1 << 30;
  pub const AVX512VL: u32 = 1 << 31;

  /// Foundation + conflict detection.
  pub const AVX512_COMMON: u32 = AVX512F | AVX512CD;
  /// Skylake-SP style core extensions.
  pub const AVX512_CORE: u32 = AVX512DQ | AVX512BW | AVX512VL;
  /// Xeon Phi (Knights Landing) extensions.
  pub const AVX512_MIC: u32 = AVX512PF | AVX512ER;

  // ─── ECX ───
  pub const AVX512_VNNI: u32 = 1 << 11;

  // ─── EDX ───
  pub const AVX512_4VNNIW: u32 = 1 << 2;
  pub const AVX512_4FMAPS: u32 = 1 << 3;
  /// Knights Mill additions on top of the MIC set.
  pub const AVX512_KNM: u32 = AVX512_4VNNIW | AVX512_4FMAPS;

  // ─── Subleaf 1 EAX ───
  pub const AVX512_BF16: u32 = 1 << 5;
}

/// What the CPU reported, plus the raw words the OS validator needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuReport {
  /// Highest level whose gates all passed.
  pub level: CapabilityLevel,
  /// Maximum basic leaf (leaf 0 EAX).
  pub max_leaf: u32,
  /// Leaf 1 words; zero when leaf 1 was never queried.
  pub leaf1: RawFeatureWords,
}

impl CpuReport {
  /// A CPU that answered nothing beyond leaf 0.
  pub const GENERIC: Self = Self { level: CapabilityLevel::GENERIC, max_leaf: 0, leaf1: RawFeatureWords::ZERO };
}

/// Resolve the CPU-reported level from `query`.
///
/// Issues at most four queries: leaf 0, leaf 1, leaf 7.0 (only once the FMA
/// gate passed) and leaf 7.1 (only once the VNNI gate passed).
#[must_use]
pub fn resolve<Q: RawQuery + ?Sized>(query: &Q) -> CpuReport {
  let max_leaf = query.cpuid(0, 0).eax;
  if max_leaf < 1 {
    return CpuReport { max_leaf, ..CpuReport::GENERIC };
  }

  let leaf1 = query.cpuid(1, 0);
  CpuReport { level: ladder(query, leaf1.ecx), max_leaf, leaf1 }
}

/// Convenience: only the level of [`resolve`].
#[inline]
#[must_use]
pub fn resolve_level<Q: RawQuery + ?Sized>(query: &Q) -> CapabilityLevel {
  resolve(query).level
}

fn ladder<Q: RawQuery + ?Sized>(query: &Q, ecx1: u32) -> CapabilityLevel {
  if !has_bits(ecx1, leaf1::SSE42_CRC32) {
    return CapabilityLevel::GENERIC;
  }
  if !has_bits(ecx1, leaf1::AVX) {
    return CapabilityLevel::SSE4;
  }
  if !has_bits(ecx1, leaf1::FMA) {
    return CapabilityLevel::AVX;
  }

  let ext = query.cpuid(7, 0);
  if !has_bits(ext.ebx, leaf7::AVX512_COMMON) {
    return CapabilityLevel::AVX2;
  }

  if has_bits(ext.ebx, leaf7::AVX512_CORE) {
    if !has_bits(ext.ecx, leaf7::AVX512_VNNI) {
      return CapabilityLevel::AVX512_CORE;
    }
    let ext1 = query.cpuid(7, 1);
    return if has_bits(ext1.eax, leaf7::AVX512_BF16) {
      CapabilityLevel::AVX512_CPX
    } else {
      CapabilityLevel::AVX512_CLX
    };
  }

  if has_bits(ext.ebx, leaf7::AVX512_MIC) {
    return if has_bits(ext.edx, leaf7::AVX512_KNM) {
      CapabilityLevel::AVX512_KNM
    } else {
      CapabilityLevel::AVX512_MIC
    };
  }

  CapabilityLevel::AVX512
}
