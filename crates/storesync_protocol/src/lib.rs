//! # storesync protocol
//!
//! Wire types for synchronizing a host store with a worker store.
//!
//! This crate provides:
//! - [`Action`] and the reserved action types owned by the protocol
//! - [`Envelope`]: `SYNC_FOR_CLIENT_STORE` (worker to host, change records)
//!   and `SYNC_FOR_WORKER_STORE` (host to worker, forwarded action plus
//!   partial state)
//! - Encoding of change records and envelopes as values and as CBOR
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Usage
//!
//! ```
//! use storesync_protocol::{Action, Envelope, SyncForWorker};
//! use storesync_value::Value;
//!
//! let envelope = Envelope::from(SyncForWorker::new(
//!     Value::object([("ui", Value::object([("open", true)]))]),
//!     Action::new("ui/open"),
//! ));
//! let message = envelope.to_message();
//! assert_eq!(Envelope::from_message(&message).unwrap(), Some(envelope));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod envelope;
mod error;
mod records;

pub use action::{
    is_reserved_type, Action, INIT_ACTION_TYPE, PRIORITY_FIELD, SYNC_FOR_CLIENT_STORE,
    SYNC_FOR_WORKER_STORE,
};
pub use envelope::{Envelope, SyncForClient, SyncForWorker};
pub use error::{ProtocolError, ProtocolResult};
pub use records::{records_from_value, records_to_value};
