//! Tensor-format tags and forward code paths.
//!
//! # Routing
//!
//! | Format | Thread-private JIT | Path |
//! |--------|--------------------|------|
//! | `CUSTOM_1` | yes | [`FwdPath::Stream`] |
//! | `CUSTOM_1` | no | [`FwdPath::Custom1`] |
//! | `CUSTOM_2` | ignored | [`FwdPath::Custom2`] |
//! | anything else | ignored | none (nothing runs) |

use core::fmt;

/// Custom tensor-layout tag.
///
/// The set is open: tags without a named constant are valid values that
/// simply have no forward path yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FormatTag(pub u8);

impl FormatTag {
  /// First blocked custom layout.
  pub const CUSTOM_1: Self = Self(1);
  /// Second blocked custom layout.
  pub const CUSTOM_2: Self = Self(2);

  /// Whether a forward path exists for this tag.
  #[inline]
  #[must_use]
  pub const fn is_known(self) -> bool {
    matches!(self, Self::CUSTOM_1 | Self::CUSTOM_2)
  }
}

impl fmt::Display for FormatTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Self::CUSTOM_1 => f.write_str("custom_1"),
      Self::CUSTOM_2 => f.write_str("custom_2"),
      Self(other) => write!(f, "format({other})"),
    }
  }
}

/// Inputs that pick a forward code path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DispatchKey {
  pub format: FormatTag,
  /// Use the per-thread compiled (streamed) kernels.
  pub thread_private_jit: bool,
}

impl DispatchKey {
  #[inline]
  #[must_use]
  pub const fn new(format: FormatTag, thread_private_jit: bool) -> Self {
    Self { format, thread_private_jit }
  }

  /// The forward path for this key, or `None` for an unknown format.
  #[inline]
  #[must_use]
  pub const fn path(self) -> Option<FwdPath> {
    match self.format {
      FormatTag::CUSTOM_1 if self.thread_private_jit => Some(FwdPath::Stream),
      FormatTag::CUSTOM_1 => Some(FwdPath::Custom1),
      FormatTag::CUSTOM_2 => Some(FwdPath::Custom2),
      _ => None,
    }
  }
}

/// Forward-convolution code path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FwdPath {
  /// Streamed per-thread JIT kernels over the first custom layout.
  Stream = 0,
  /// Shared kernels over the first custom layout.
  Custom1 = 1,
  /// Shared kernels over the second custom layout.
  Custom2 = 2,
}

impl FwdPath {
  /// All paths, in discriminant order.
  pub const ALL: [Self; 3] = [Self::Stream, Self::Custom1, Self::Custom2];

  #[inline]
  #[must_use]
  pub const fn as_u8(self) -> u8 {
    self as u8
  }

  /// Human-readable path name.
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Stream => "stream",
      Self::Custom1 => "custom_1",
      Self::Custom2 => "custom_2",
    }
  }
}

impl fmt::Display for FwdPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use std::string::ToString;

  use super::*;

  #[test]
  fn test_routing_table() {
    assert_eq!(DispatchKey::new(FormatTag::CUSTOM_1, true).path(), Some(FwdPath::Stream));
    assert_eq!(DispatchKey::new(FormatTag::CUSTOM_1, false).path(), Some(FwdPath::Custom1));
    assert_eq!(DispatchKey::new(FormatTag::CUSTOM_2, true).path(), Some(FwdPath::Custom2));
    assert_eq!(DispatchKey::new(FormatTag::CUSTOM_2, false).path(), Some(FwdPath::Custom2));
  }

  #[test]
  fn test_unknown_formats_have_no_path() {
    for tag in (0..=u8::MAX).map(FormatTag).filter(|t| !t.is_known()) {
      assert_eq!(DispatchKey::new(tag, true).path(), None);
      assert_eq!(DispatchKey::new(tag, false).path(), None);
    }
  }

  #[test]
  fn test_names() {
    assert_eq!(FwdPath::ALL.map(FwdPath::name), ["stream", "custom_1", "custom_2"]);
    assert_eq!(FormatTag::CUSTOM_2.to_string(), "custom_2");
    assert_eq!(FormatTag(9).to_string(), "format(9)");
  }

  #[test]
  fn test_discriminants_index_all() {
    for (i, path) in FwdPath::ALL.iter().enumerate() {
      assert_eq!(usize::from(path.as_u8()), i);
    }
  }
}
