use proptest::prelude::*;

use crate::{
  CapabilityLevel, ProbeConfig, Simulated, Verbosity,
  os::{os_level, xcr0},
  probe_with,
  reconcile::reconcile_levels,
  resolve::{leaf1, leaf7, resolve},
};

/// Scripted words for one simulated machine.
#[derive(Clone, Copy, Debug)]
struct Words {
  max_leaf: u32,
  ecx1: u32,
  ebx7: u32,
  ecx7: u32,
  edx7: u32,
  eax7_1: u32,
  xcr0: u64,
}

impl Words {
  fn sim(self) -> Simulated {
    Simulated::new()
      .max_leaf(self.max_leaf)
      .leaf1_ecx(self.ecx1)
      .leaf7(self.ebx7, self.ecx7, self.edx7)
      .leaf7_1_eax(self.eax7_1)
      .xcr0(self.xcr0)
  }

  fn union(self, other: Self) -> Self {
    Self {
      max_leaf: self.max_leaf | other.max_leaf,
      ecx1: self.ecx1 | other.ecx1,
      ebx7: self.ebx7 | other.ebx7,
      ecx7: self.ecx7 | other.ecx7,
      edx7: self.edx7 | other.edx7,
      eax7_1: self.eax7_1 | other.eax7_1,
      xcr0: self.xcr0 | other.xcr0,
    }
  }
}

/// Uniform words rarely pass multi-bit gates; mix in dense ones.
fn word() -> impl Strategy<Value = u32> {
  prop_oneof![
    any::<u32>(),
    (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(a, b, c)| a | b | c),
    Just(0),
    Just(u32::MAX),
  ]
}

fn arb_words() -> impl Strategy<Value = Words> {
  (prop_oneof![0u32..=13, any::<u32>()], word(), word(), word(), word(), word(), any::<u64>()).prop_map(
    |(max_leaf, ecx1, ebx7, ecx7, edx7, eax7_1, xcr0)| Words { max_leaf, ecx1, ebx7, ecx7, edx7, eax7_1, xcr0 },
  )
}

fn arb_floor() -> impl Strategy<Value = CapabilityLevel> {
  prop::sample::select(CapabilityLevel::LADDER.to_vec())
}

/// Bits every level's gates demand, cumulatively.
fn gates_hold(level: CapabilityLevel, w: &Words) -> bool {
  let has = crate::query::has_bits;
  let mut ok = true;
  if level > CapabilityLevel::GENERIC {
    ok &= w.max_leaf >= 1 && has(w.ecx1, leaf1::SSE42_CRC32);
  }
  if level >= CapabilityLevel::AVX {
    ok &= has(w.ecx1, leaf1::AVX);
  }
  if level >= CapabilityLevel::AVX2 {
    ok &= has(w.ecx1, leaf1::FMA);
  }
  if level >= CapabilityLevel::AVX512 {
    ok &= has(w.ebx7, leaf7::AVX512_COMMON);
  }
  if level == CapabilityLevel::AVX512_MIC || level == CapabilityLevel::AVX512_KNM {
    ok &= has(w.ebx7, leaf7::AVX512_MIC);
  }
  if level == CapabilityLevel::AVX512_KNM {
    ok &= has(w.edx7, leaf7::AVX512_KNM);
  }
  if level >= CapabilityLevel::AVX512_CORE {
    ok &= has(w.ebx7, leaf7::AVX512_CORE);
  }
  if level >= CapabilityLevel::AVX512_CLX {
    ok &= has(w.ecx7, leaf7::AVX512_VNNI);
  }
  if level == CapabilityLevel::AVX512_CPX {
    ok &= has(w.eax7_1, leaf7::AVX512_BF16);
  }
  ok
}

const RESOLVABLE: [CapabilityLevel; 10] = [
  CapabilityLevel::GENERIC,
  CapabilityLevel::SSE4,
  CapabilityLevel::AVX,
  CapabilityLevel::AVX2,
  CapabilityLevel::AVX512,
  CapabilityLevel::AVX512_MIC,
  CapabilityLevel::AVX512_KNM,
  CapabilityLevel::AVX512_CORE,
  CapabilityLevel::AVX512_CLX,
  CapabilityLevel::AVX512_CPX,
];

proptest! {
  /// The resolver only lands on ladder levels whose gates all passed.
  #[test]
  fn resolver_never_skips_a_gate(w in arb_words()) {
    let level = resolve(&w.sim()).level;
    prop_assert!(RESOLVABLE.contains(&level), "unexpected level {:?}", level);
    prop_assert!(gates_hold(level, &w), "{:?} reached without its gates for {:?}", level, w);
  }

  /// Setting more feature bits never lowers the resolved level.
  #[test]
  fn resolver_is_monotone(base in arb_words(), extra in arb_words()) {
    let lower = resolve(&base.sim()).level;
    let upper = resolve(&base.union(extra).sim()).level;
    prop_assert!(upper >= lower, "{:?} | extra resolved to {:?} < {:?}", base, upper, lower);
  }

  /// Two probes of the same machine agree.
  #[test]
  fn probe_is_idempotent(w in arb_words(), floor in arb_floor()) {
    let sim = w.sim();
    let config = ProbeConfig::new(Verbosity::QUIET, floor);
    prop_assert_eq!(probe_with(&sim, &config), probe_with(&sim, &config));
  }

  /// The result is the CPU level lifted to the floor, never lower.
  #[test]
  fn probe_clamps_to_floor(w in arb_words(), floor in arb_floor()) {
    let r = probe_with(&w.sim(), &ProbeConfig::new(Verbosity::QUIET, floor));
    prop_assert!(r.level >= floor);
    prop_assert!(r.level >= r.cpu);
    prop_assert_eq!(r.level, r.cpu.max(floor));
  }

  /// The OS ceiling only reaches 512-bit when the CPU is in the AVX-512 family.
  #[test]
  fn os_unlimited_needs_avx512(w in arb_words()) {
    let sim = w.sim();
    let cpu = resolve(&sim);
    let os = os_level(&sim, &cpu);
    if os == CapabilityLevel::UNLIMITED {
      prop_assert!(cpu.level.is_avx512());
      prop_assert!(crate::query::has_bits(w.xcr0 as u32, xcr0::ZMM | xcr0::YMM));
    } else {
      prop_assert!(os <= CapabilityLevel::AVX2);
    }
  }

  /// Mismatch is exactly "above the floor and above the OS ceiling".
  #[test]
  fn mismatch_flag_definition(
    cpu in prop::sample::select(RESOLVABLE.to_vec()),
    os in prop::sample::select(CapabilityLevel::LADDER.to_vec()),
    floor in arb_floor()
  ) {
    let r = reconcile_levels(cpu, os, floor);
    prop_assert_eq!(r.mismatch, cpu > floor && os < cpu);
    prop_assert_eq!(r.cpu, cpu);
    prop_assert_eq!(r.os, os);
  }

  /// Every id has a non-empty name; ids below the x86 threshold never say "x86".
  #[test]
  fn name_is_total(id in any::<i32>()) {
    let level = CapabilityLevel::from_id(id);
    prop_assert!(!level.name().is_empty());
    if level < CapabilityLevel::X86_GENERIC {
      prop_assert_ne!(level.name(), "x86");
    }
  }
}
