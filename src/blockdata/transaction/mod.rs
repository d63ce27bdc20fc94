// SPDX-License-Identifier: CC0-1.0

//! Transactions, as consumed by the filtering core.
//!
//! The core only reads transactions: it derives their ids and walks their
//! inputs and outputs when matching against a bloom filter. Witness data and
//! any extended payloads are outside its interfaces, so the model here is the
//! legacy layout.

pub mod outpoint;
pub mod txin;
pub mod txout;

use hashes::Hash;

use crate::consensus::Encodable;
use crate::hash_types::Txid;
use crate::internal_macros::impl_consensus_encoding;

pub use self::outpoint::OutPoint;
pub use self::txin::TxIn;
pub use self::txout::TxOut;

/// A transfer of coins from previously created outputs to new outputs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    /// The protocol version.
    pub version: u32,
    /// List of transaction inputs.
    pub input: Vec<TxIn>,
    /// List of transaction outputs.
    pub output: Vec<TxOut>,
    /// Block number before which this transaction is invalid, or 0 for valid
    /// immediately.
    pub lock_time: u32,
}
impl_consensus_encoding!(Transaction, version, input, output, lock_time);

impl Transaction {
    /// Computes the transaction id by double-SHA256 hashing the serialized
    /// transaction.
    pub fn txid(&self) -> Txid {
        let mut enc = Txid::engine();
        self.consensus_encode(&mut enc).expect("engines don't error");
        Txid::from_engine(enc)
    }
}
