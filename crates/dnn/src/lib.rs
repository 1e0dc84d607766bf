//! Forward-convolution kernel variant dispatch.
//!
//! Kernels are grouped by forward code path, and each path holds an ordered
//! candidate list keyed on the [`cpuid::CapabilityLevel`] a kernel needs.
//!
//! - [`DispatchKey`] (tensor format + thread-private JIT flag) picks the
//!   [`FwdPath`]; an unknown format picks nothing.
//! - The capability level picks the best [`Candidate`] of that path.
//!
//! The kernels themselves live with their generators; this crate only
//! decides which one runs.
//!
//! # Usage
//!
//! ```
//! use cpuid::CapabilityLevel;
//! use dnn::{DispatchKey, FormatTag, FwdTable, candidates, dispatch_fwd_auto};
//!
//! fn generic(tid: usize) -> usize { tid }
//!
//! static TABLE: FwdTable<'static, fn(usize) -> usize> = FwdTable::new(
//!   &[],
//!   candidates!["custom_1/generic" => CapabilityLevel::GENERIC => generic as fn(usize) -> usize],
//!   &[],
//! );
//!
//! let key = DispatchKey::new(FormatTag::CUSTOM_1, false);
//! assert_eq!(dispatch_fwd_auto(&TABLE, key, |kernel| kernel(3)), Some(3));
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod dispatch;
pub mod format;

#[cfg(feature = "std")]
pub use dispatch::FwdDispatcher;
pub use dispatch::{Candidate, FwdTable, Selected, dispatch_fwd, dispatch_fwd_auto, select};
pub use format::{DispatchKey, FormatTag, FwdPath};
