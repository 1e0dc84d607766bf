//! OS-enabled capability ceiling.
//!
//! CPUID says what the silicon implements; XCR0 says which register state the
//! kernel saves on context switch. Executing AVX without YMM state enabled
//! faults, so the OS ceiling is tracked separately from the CPU level.

use crate::{
  level::CapabilityLevel,
  query::{RawQuery, has_bits},
  resolve::{CpuReport, leaf1},
};

/// XCR0 state-component bits.
pub mod xcr0 {
  /// SSE (XMM) state.
  pub const SSE: u32 = 1 << 1;
  /// AVX (upper YMM) state.
  pub const AVX: u32 = 1 << 2;
  /// XMM + YMM: required for any 256-bit code.
  pub const YMM: u32 = SSE | AVX;
  pub const OPMASK: u32 = 1 << 5;
  pub const ZMM_HI256: u32 = 1 << 6;
  pub const HI16_ZMM: u32 = 1 << 7;
  /// opmask + ZMM_Hi256 + Hi16_ZMM: required for any 512-bit code.
  pub const ZMM: u32 = OPMASK | ZMM_HI256 | HI16_ZMM;
}

/// Level the OS permits, given what the CPU reported.
///
/// - Below [`SSE3`](CapabilityLevel::SSE3), or without XSAVE + OSXSAVE:
///   [`GENERIC`](CapabilityLevel::GENERIC).
/// - XSAVE enabled: at least [`SSE4`](CapabilityLevel::SSE4).
/// - CPU at [`AVX`](CapabilityLevel::AVX) or above: XCR0 is read; XMM + YMM
///   state raises the ceiling to [`AVX2`](CapabilityLevel::AVX2).
/// - CPU in the AVX-512 family, leaf 7 reachable, and all three ZMM
///   components enabled: [`UNLIMITED`](CapabilityLevel::UNLIMITED).
///
/// XCR0 is only read when CPUID reported OSXSAVE, which is what makes XGETBV
/// legal to execute.
#[must_use]
pub fn os_level<Q: RawQuery + ?Sized>(query: &Q, cpu: &CpuReport) -> CapabilityLevel {
  if cpu.level < CapabilityLevel::SSE3 || !has_bits(cpu.leaf1.ecx, leaf1::XSAVE_ENABLED) {
    return CapabilityLevel::GENERIC;
  }
  if cpu.level < CapabilityLevel::AVX {
    return CapabilityLevel::SSE4;
  }

  let state = query.xgetbv(0).low;
  if !has_bits(state, xcr0::YMM) {
    return CapabilityLevel::SSE4;
  }
  if cpu.level >= CapabilityLevel::AVX512 && cpu.max_leaf >= 7 && has_bits(state, xcr0::ZMM) {
    return CapabilityLevel::UNLIMITED;
  }
  CapabilityLevel::AVX2
}
