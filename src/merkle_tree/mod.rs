// SPDX-License-Identifier: CC0-1.0

//! Merkle trees over a block's transactions.
//!
//! [`calculate_root`] computes a full tree's root; [`PartialMerkleTree`]
//! proves which leaves of that tree matched a filter without shipping the
//! whole transaction list.

mod block;

use hashes::Hash;

pub use self::block::{MerkleTreeError, PartialMerkleTree};
use crate::consensus::Encodable;
use crate::hash_types::{Txid, TxMerkleNode};

/// Computes the merkle root of a block's transaction ids.
///
/// Returns `None` for an empty list; a single id is its own root. A level of
/// odd width treats its last node as its own sibling — this duplication is a
/// consensus rule and applies at every height.
pub fn calculate_root(txids: &[Txid]) -> Option<TxMerkleNode> {
    if txids.is_empty() {
        return None;
    }

    let mut level: Vec<TxMerkleNode> = txids.iter().copied().map(TxMerkleNode::from).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| combine(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    Some(level[0])
}

/// Hashes a pair of sibling nodes into their parent.
pub(crate) fn combine(left: &TxMerkleNode, right: &TxMerkleNode) -> TxMerkleNode {
    let mut engine = TxMerkleNode::engine();
    left.consensus_encode(&mut engine).expect("engines don't error");
    right.consensus_encode(&mut engine).expect("engines don't error");
    TxMerkleNode::from_engine(engine)
}

#[cfg(test)]
mod tests {
    use hashes::sha256d;

    use super::*;

    fn txid(tag: u8) -> Txid {
        let mut bytes = [0u8; 32];
        bytes[0] = tag;
        Txid::from_byte_array(bytes)
    }

    #[test]
    fn empty_list_has_no_root() {
        assert_eq!(calculate_root(&[]), None);
    }

    #[test]
    fn single_txid_is_its_own_root() {
        let id = txid(1);
        assert_eq!(calculate_root(&[id]), Some(TxMerkleNode::from(id)));
    }

    #[test]
    fn two_txids_hash_as_a_pair() {
        let (a, b) = (txid(1), txid(2));

        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&a.to_byte_array());
        buf.extend_from_slice(&b.to_byte_array());
        let expected = TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&buf));

        assert_eq!(calculate_root(&[a, b]), Some(expected));
    }

    #[test]
    fn odd_level_duplicates_its_last_node() {
        let (a, b, c) = (txid(1), txid(2), txid(3));

        let left = combine(&a.into(), &b.into());
        let right = combine(&c.into(), &c.into());
        let expected = combine(&left, &right);

        assert_eq!(calculate_root(&[a, b, c]), Some(expected));
    }
}
