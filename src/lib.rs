// SPDX-License-Identifier: CC0-1.0

//! SPV transaction filtering for Bitcoin-like networks.
//!
//! This crate implements the two halves of BIP37-style filtered block
//! download:
//!
//! * [`BloomFilter`] — the probabilistic filter a light client loads into a
//!   peer to declare interest in transactions without revealing exactly which
//!   addresses it owns.
//! * [`PartialMerkleTree`] — the proof a full node sends back, establishing
//!   which transactions of a block matched the filter while transmitting only
//!   the matched ids plus the sibling hashes needed to recompute the block's
//!   merkle root.
//!
//! Both structures are bit-exact with the deployed wire protocol. The crate
//! also carries the minimal transaction data model the scanning operations
//! consume, and the consensus-compatible codec both structures serialize
//! with.

pub mod blockdata;
pub mod bloom;
pub mod consensus;
pub mod hash_types;
mod internal_macros;
pub mod merkle_tree;

pub use hashes;

pub use crate::blockdata::script::Script;
pub use crate::blockdata::transaction::{OutPoint, Transaction, TxIn, TxOut};
pub use crate::bloom::{BloomError, BloomFilter, BloomFilterBuilder, BloomFlags};
pub use crate::hash_types::{Txid, TxMerkleNode};
pub use crate::merkle_tree::{MerkleTreeError, PartialMerkleTree};
