//! # storesync value
//!
//! Dynamic state values shared by every storesync crate.
//!
//! This crate provides:
//! - [`Value`], the tree of scalars, [`Object`]s, and [`Array`]s that make up
//!   store state, actions, and wire messages
//! - [`Kind`], the closed classification used when comparing values
//! - [`Path`], the sequential address of a location inside a value
//! - A CBOR codec for values
//!
//! ## Identity
//!
//! Containers are reference counted and immutable once built. Cloning a
//! container clones a handle, so "the same reference" is a meaningful and
//! cheap question ([`Value::same_ref`]). A new state that reuses an unchanged
//! section keeps that section's identity.
//!
//! ## Usage
//!
//! ```
//! use storesync_value::{decode, encode, Path, Value};
//!
//! let state = Value::object([("todos", Value::array(["write docs"]))]);
//! let title = state.get_path(&Path::root().key("todos").index(0));
//! assert_eq!(title, Some(&Value::from("write docs")));
//!
//! let bytes = encode(&state).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), state);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod kind;
mod path;
mod value;

pub use codec::{decode, encode, TAG_EPOCH, TAG_REGEX, TAG_UNDEFINED};
pub use error::{CodecError, CodecResult};
pub use kind::Kind;
pub use path::{Path, PathSegment};
pub use value::{Array, Map, Object, Value};

/// Trait for types that can be encoded to CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        codec::encode(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        codec::decode(bytes)
    }
}
