// SPDX-License-Identifier: CC0-1.0

//! The hash-based identifiers the filtering core passes around.

use hashes::{hash_newtype, sha256d};

use crate::internal_macros::impl_hashencode;

hash_newtype! {
    /// A transaction id: the double-SHA256 of a transaction's serialization.
    pub struct Txid(sha256d::Hash);

    /// A node in a block's transaction merkle tree.
    ///
    /// Leaves are transaction ids; interior nodes are the double-SHA256 of
    /// their concatenated children.
    pub struct TxMerkleNode(sha256d::Hash);
}
impl_hashencode!(Txid);
impl_hashencode!(TxMerkleNode);

impl From<Txid> for TxMerkleNode {
    fn from(txid: Txid) -> Self {
        Self::from_raw_hash(txid.to_raw_hash())
    }
}
