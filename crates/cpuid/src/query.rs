//! Raw hardware queries: CPUID leaves and extended control registers.
//!
//! Everything above this module works on plain `u32` words, so the decision
//! procedure can be driven by the real instruction ([`Native`]) or by scripted
//! words ([`Simulated`], `testing` feature) without conditional compilation in
//! the resolver itself.

/// The four result words of one CPUID query, named by register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawFeatureWords {
  pub eax: u32,
  pub ebx: u32,
  pub ecx: u32,
  pub edx: u32,
}

impl RawFeatureWords {
  /// All-zero words (what an unsupported or masked leaf reports).
  pub const ZERO: Self = Self::new(0, 0, 0, 0);

  #[inline]
  #[must_use]
  pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
    Self { eax, ebx, ecx, edx }
  }
}

/// Bitmask containment: every bit of `mask` is set in `value`.
///
/// Gates never compare whole registers, so unrelated bits cannot suppress
/// detection.
#[inline(always)]
#[must_use]
pub const fn has_bits(value: u32, mask: u32) -> bool {
  (value & mask) == mask
}

/// Split form of a 64-bit extended control register: `(low, high)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct XcrValue {
  pub low: u32,
  pub high: u32,
}

impl XcrValue {
  #[inline]
  #[must_use]
  pub const fn from_u64(value: u64) -> Self {
    Self { low: value as u32, high: (value >> 32) as u32 }
  }

  #[inline]
  #[must_use]
  pub const fn as_u64(self) -> u64 {
    ((self.high as u64) << 32) | self.low as u64
  }
}

/// Source of raw capability information.
///
/// One implementation exists per platform family; the resolver, the OS
/// validator and the reconciler are written against this trait only.
///
/// Implementations must be side-effect free and must not panic for any
/// `(leaf, subleaf)` or register selector.
pub trait RawQuery {
  /// Execute CPUID for `(leaf, subleaf)`.
  fn cpuid(&self, leaf: u32, subleaf: u32) -> RawFeatureWords;

  /// Read extended control register `xcr` (XGETBV).
  ///
  /// The OS validator only reads XCRs after CPUID reported OSXSAVE. Sources
  /// that run the real instruction must check it themselves and read zero
  /// without it.
  fn xgetbv(&self, xcr: u32) -> XcrValue;
}

impl<Q: RawQuery + ?Sized> RawQuery for &Q {
  #[inline]
  fn cpuid(&self, leaf: u32, subleaf: u32) -> RawFeatureWords {
    (**self).cpuid(leaf, subleaf)
  }

  #[inline]
  fn xgetbv(&self, xcr: u32) -> XcrValue {
    (**self).xgetbv(xcr)
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native x86 / x86_64
// ─────────────────────────────────────────────────────────────────────────────

/// The executing CPU, queried through `core::arch` intrinsics.
///
/// Only exists on x86 and x86_64. Other architectures have no raw query and
/// detection short-circuits to the build floor.
#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[allow(unsafe_code)]
impl RawQuery for Native {
  #[inline]
  fn cpuid(&self, leaf: u32, subleaf: u32) -> RawFeatureWords {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::__cpuid_count;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::__cpuid_count;

    // SAFETY: CPUID is available on every x86_64 CPU and on every 32-bit x86
    // CPU Rust targets (i586+). Older toolchains still mark it unsafe.
    #[allow(unused_unsafe)]
    let r = unsafe { __cpuid_count(leaf, subleaf) };
    RawFeatureWords::new(r.eax, r.ebx, r.ecx, r.edx)
  }

  /// Reads zero when CPUID leaf 1 does not report XSAVE + OSXSAVE.
  #[inline]
  fn xgetbv(&self, xcr: u32) -> XcrValue {
    if !has_bits(self.cpuid(1, 0).ecx, crate::resolve::leaf1::XSAVE_ENABLED) {
      return XcrValue::default();
    }
    // SAFETY: XSAVE and OSXSAVE were observed on the line above, which makes
    // XGETBV a legal instruction.
    XcrValue::from_u64(unsafe { xgetbv_native(xcr) })
  }
}

#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
#[target_feature(enable = "xsave")]
unsafe fn xgetbv_native(xcr: u32) -> u64 {
  // SAFETY: the caller observed XSAVE + OSXSAVE.
  unsafe { core::arch::x86_64::_xgetbv(xcr) }
}

#[cfg(target_arch = "x86")]
#[allow(unsafe_code)]
#[target_feature(enable = "xsave")]
unsafe fn xgetbv_native(xcr: u32) -> u64 {
  // SAFETY: the caller observed XSAVE + OSXSAVE.
  unsafe { core::arch::x86::_xgetbv(xcr) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated source
// ─────────────────────────────────────────────────────────────────────────────

/// Scripted raw query for tests and fuzzing.
///
/// Holds the words for the four queries the decision procedure can issue
/// (leaf 0, leaf 1, leaf 7.0, leaf 7.1) plus the XCR0 value. Any other query
/// returns zeros. Every query is counted so tests can assert which hardware
/// primitives were touched.
///
/// # Availability
///
/// Only available with the `testing` feature or in test builds:
/// ```toml
/// [dev-dependencies]
/// cpuid = { version = "...", features = ["testing"] }
/// ```
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct Simulated {
  pub leaf0: RawFeatureWords,
  pub leaf1: RawFeatureWords,
  pub leaf7_0: RawFeatureWords,
  pub leaf7_1: RawFeatureWords,
  pub xcr0: u64,
  cpuid_calls: core::sync::atomic::AtomicU32,
  xgetbv_calls: core::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "testing"))]
impl Simulated {
  /// A CPU reporting max leaf 0 (no extended queries).
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the maximum basic leaf reported by leaf 0.
  #[must_use]
  pub fn max_leaf(mut self, max_leaf: u32) -> Self {
    self.leaf0.eax = max_leaf;
    self
  }

  /// Set leaf 1 ECX (baseline feature bits).
  #[must_use]
  pub fn leaf1_ecx(mut self, ecx: u32) -> Self {
    self.leaf1.ecx = ecx;
    self
  }

  /// Set leaf 7.0 EBX/ECX/EDX (extended feature bits).
  #[must_use]
  pub fn leaf7(mut self, ebx: u32, ecx: u32, edx: u32) -> Self {
    self.leaf7_0.ebx = ebx;
    self.leaf7_0.ecx = ecx;
    self.leaf7_0.edx = edx;
    self
  }

  /// Set leaf 7.1 EAX (further extended feature bits).
  #[must_use]
  pub fn leaf7_1_eax(mut self, eax: u32) -> Self {
    self.leaf7_1.eax = eax;
    self
  }

  /// Set the XCR0 value returned by XGETBV(0).
  #[must_use]
  pub fn xcr0(mut self, xcr0: u64) -> Self {
    self.xcr0 = xcr0;
    self
  }

  /// Number of CPUID queries issued so far.
  #[must_use]
  pub fn cpuid_calls(&self) -> u32 {
    self.cpuid_calls.load(core::sync::atomic::Ordering::Relaxed)
  }

  /// Number of XGETBV reads issued so far.
  #[must_use]
  pub fn xgetbv_calls(&self) -> u32 {
    self.xgetbv_calls.load(core::sync::atomic::Ordering::Relaxed)
  }
}

#[cfg(any(test, feature = "testing"))]
impl Clone for Simulated {
  fn clone(&self) -> Self {
    Self {
      leaf0: self.leaf0,
      leaf1: self.leaf1,
      leaf7_0: self.leaf7_0,
      leaf7_1: self.leaf7_1,
      xcr0: self.xcr0,
      cpuid_calls: core::sync::atomic::AtomicU32::new(0),
      xgetbv_calls: core::sync::atomic::AtomicU32::new(0),
    }
  }
}

#[cfg(any(test, feature = "testing"))]
impl RawQuery for Simulated {
  fn cpuid(&self, leaf: u32, subleaf: u32) -> RawFeatureWords {
    self.cpuid_calls.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
    match (leaf, subleaf) {
      (0, _) => self.leaf0,
      (1, _) => self.leaf1,
      (7, 0) => self.leaf7_0,
      (7, 1) => self.leaf7_1,
      _ => RawFeatureWords::ZERO,
    }
  }

  fn xgetbv(&self, xcr: u32) -> XcrValue {
    self.xgetbv_calls.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
    if xcr == 0 { XcrValue::from_u64(self.xcr0) } else { XcrValue::default() }
  }
}
