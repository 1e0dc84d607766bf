//! Fuzz target for level reconciliation and naming.
//!
//! Tests that:
//! - No panics for any pair of level ids
//! - The CPU level wins, lifted to the floor
//! - The mismatch flag matches its definition
//! - Every id has a non-empty name

#![no_main]

use cpuid::{CapabilityLevel, reconcile::reconcile_levels};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (i32, i32, i32)| {
  let (cpu, os, floor) = (CapabilityLevel::from_id(data.0), CapabilityLevel::from_id(data.1), CapabilityLevel::from_id(data.2));

  let r = reconcile_levels(cpu, os, floor);

  // ─── Invariant: CPU level wins ───
  assert_eq!(r.level, if cpu >= floor { cpu } else { floor });
  assert_eq!(r.cpu, cpu);
  assert_eq!(r.os, os);

  // ─── Invariant: mismatch definition ───
  assert_eq!(r.mismatch, cpu > floor && os < cpu);

  // ─── Invariant: name totality ───
  for level in [cpu, os, floor, r.level] {
    let name = level.name();
    assert!(!name.is_empty());
    if level < CapabilityLevel::X86_GENERIC {
      assert_ne!(name, "x86");
    }
  }
});
