// SPDX-License-Identifier: CC0-1.0

//! Consensus-compatible serialization.
//!
//! Everything the filtering core puts on the wire round-trips through the
//! [`Encodable`] and [`Decodable`] traits defined here.

pub mod encode;

pub use self::encode::{
    deserialize, deserialize_partial, serialize, Decodable, Encodable, Error, ReadExt, VarInt,
    WriteExt,
};
