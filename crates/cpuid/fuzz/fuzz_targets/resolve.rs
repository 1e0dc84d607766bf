//! Fuzz target for the capability resolver and OS ceiling.
//!
//! Tests that:
//! - No panics on arbitrary leaf words
//! - The resolved level is reached only through passed gates
//! - Leaf 7 and XGETBV are only touched when their gates allow it
//! - Probing is idempotent and never below the build floor

#![no_main]

use arbitrary::Arbitrary;
use cpuid::{
  CapabilityLevel, ProbeConfig, Simulated, Verbosity,
  os::os_level,
  probe_with,
  query::has_bits,
  resolve::{leaf1, leaf7, resolve},
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Machine {
  max_leaf: u32,
  ecx1: u32,
  ebx7: u32,
  ecx7: u32,
  edx7: u32,
  eax7_1: u32,
  xcr0: u64,
  floor: u8,
}

fuzz_target!(|m: Machine| {
  let sim = Simulated::new()
    .max_leaf(m.max_leaf)
    .leaf1_ecx(m.ecx1)
    .leaf7(m.ebx7, m.ecx7, m.edx7)
    .leaf7_1_eax(m.eax7_1)
    .xcr0(m.xcr0);

  let cpu = resolve(&sim);
  let level = cpu.level;

  // ─── Invariant: no gate skipped ───
  if level > CapabilityLevel::GENERIC {
    assert!(m.max_leaf >= 1 && has_bits(m.ecx1, leaf1::SSE42_CRC32));
  }
  if level >= CapabilityLevel::AVX {
    assert!(has_bits(m.ecx1, leaf1::AVX));
  }
  if level >= CapabilityLevel::AVX2 {
    assert!(has_bits(m.ecx1, leaf1::FMA));
  }
  if level.is_avx512() {
    assert!(has_bits(m.ebx7, leaf7::AVX512_COMMON));
  }
  if level >= CapabilityLevel::AVX512_CORE {
    assert!(has_bits(m.ebx7, leaf7::AVX512_CORE));
  }
  if level >= CapabilityLevel::AVX512_CLX {
    assert!(has_bits(m.ecx7, leaf7::AVX512_VNNI));
  }
  if level == CapabilityLevel::AVX512_CPX {
    assert!(has_bits(m.eax7_1, leaf7::AVX512_BF16));
  }

  // ─── Invariant: query budget ───
  let expected_queries = if m.max_leaf < 1 {
    1
  } else if level < CapabilityLevel::AVX2 {
    2
  } else if level >= CapabilityLevel::AVX512_CLX {
    4
  } else {
    3
  };
  assert_eq!(sim.cpuid_calls(), expected_queries, "unexpected CPUID count for {m:?}");

  // ─── Invariant: XGETBV only behind OSXSAVE ───
  let _ = os_level(&sim, &cpu);
  if !has_bits(m.ecx1, leaf1::XSAVE_ENABLED) {
    assert_eq!(sim.xgetbv_calls(), 0, "XGETBV without OSXSAVE");
  }

  // ─── Invariant: idempotent and floored ───
  let floor = CapabilityLevel::LADDER[usize::from(m.floor) % CapabilityLevel::LADDER.len()];
  let config = ProbeConfig::new(Verbosity::QUIET, floor);
  let a = probe_with(&sim, &config);
  let b = probe_with(&sim, &config);
  assert_eq!(a, b);
  assert!(a.level >= floor);
  assert_eq!(a.level, level.max(floor));
});
