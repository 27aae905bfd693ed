//! # storesync engine
//!
//! Keeps a host store and a worker store eventually consistent over an
//! asynchronous, order-preserving message channel.
//!
//! This crate provides:
//! - [`HostSync`]: forwards local actions to the worker and applies change
//!   records coming back, gating deferred work on the first full sync
//! - [`WorkerSync`]: merges forwarded client sections, reduces forwarded
//!   actions, and publishes the changed sections as change records
//! - [`OutgoingBatcher`]: debounced coalescing of outgoing records with an
//!   immediate path for priority actions
//! - [`Deferred`]: the single-resolution handshake gate
//! - Collaborator traits ([`Store`], [`Reducer`], [`MessageChannel`]) and
//!   in-memory implementations
//!
//! ## Protocol
//!
//! 1. The host sends the bootstrap action (`STORESYNC_INIT`)
//! 2. The worker answers with a full sync flagged `isInitAction`
//! 3. The host applies it and resolves the handshake
//! 4. Host actions are forwarded as `SYNC_FOR_WORKER_STORE` with the
//!    client-owned sections of the host state
//! 5. Worker changes flow back as batched `SYNC_FOR_CLIENT_STORE` records
//!
//! ## Key Invariants
//!
//! - Records from the worker are applied on the host without re-triggering
//!   forwarding
//! - The worker only accepts allow-listed sections from the host
//! - Outgoing records keep their dispatch order, including across priority
//!   sends
//! - Handshake continuations run exactly once
//! - A record that does not fit the local state is an error, never skipped

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batcher;
mod channel;
mod config;
mod deferred;
mod error;
mod host;
mod reducer;
mod state;
mod store;
mod worker;

pub use batcher::{FlushReceipt, OutgoingBatcher};
pub use channel::{LoopbackChannel, MessageChannel, MessageHandler, MockChannel, SentMessage};
pub use config::{SyncConfig, DEFAULT_BATCH_QUIET_PERIOD};
pub use deferred::{Continuation, Deferred};
pub use error::{SyncError, SyncResult};
pub use host::HostSync;
pub use reducer::ClientReducer;
pub use state::{HostState, SyncStats, WorkerState};
pub use store::{DispatchOptions, DispatchResult, MemoryStore, Reducer, SideEffect, Store};
pub use worker::WorkerSync;
