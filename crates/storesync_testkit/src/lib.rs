//! # storesync testkit
//!
//! Test utilities for storesync.
//!
//! This crate provides:
//! - Property-based generators for values, states, and actions
//! - A todo application fixture and a wired host/worker pair
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storesync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn todo_round_trip() {
//!     let pair = SyncPair::todo();
//!     pair.host.bootstrap().unwrap();
//!     pair.pump();
//!     assert!(pair.host.sync_state().is_synced());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
