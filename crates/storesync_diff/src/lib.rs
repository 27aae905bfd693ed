//! # storesync diff
//!
//! Structural diff and immutable patch for storesync values.
//!
//! This crate provides:
//! - [`diff`] / [`Differ`]: a cycle-safe structural diff producing
//!   [`ChangeRecord`]s
//! - [`apply_change_records`]: an immutable, structurally-sharing patch
//! - [`select_partial`]: selection of the top-level sections worth diffing
//!
//! ## Key Invariants
//!
//! - `apply_change_records(&diff(a, b), a)` equals `b` for acyclic values
//! - `diff(a, a)` is empty, including for `NaN` fields
//! - The diff terminates on self-referential values
//! - Applying records never mutates the input, and containers off the
//!   changed paths keep their identity
//!
//! ## Usage
//!
//! ```
//! use storesync_diff::{apply_change_records, diff};
//! use storesync_value::Value;
//!
//! let before = Value::object([("todos", Value::array(["a", "b"]))]);
//! let after = Value::object([("todos", Value::array(["a"]))]);
//!
//! let records = diff(&before, &after);
//! assert_eq!(apply_change_records(&records, &before).unwrap(), after);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod error;
mod patch;
mod record;
mod select;

pub use diff::{diff, Differ, Prefilter, PrefilterDecision};
pub use error::{PatchError, PatchResult};
pub use patch::{apply_change, apply_change_records};
pub use record::{ChangeRecord, ItemChange};
pub use select::{diff_changed_sections, pick_sections, select_partial, PartialStates};
