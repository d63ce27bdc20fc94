// SPDX-License-Identifier: CC0-1.0

//! Partial merkle trees.
//!
//! A partial merkle tree encodes the subset of a block's transaction ids that
//! matched a filter, together with just enough interior hashes to recompute
//! the block's merkle root. Flag bits and hashes are produced by a
//! depth-first pre-order traversal of the full tree and are consumed in the
//! same order when reconstructing; on the wire the bits are packed LSB-first
//! into bytes with zero padding up to the byte boundary.

use std::io;

use thiserror::Error;

use super::combine;
use crate::consensus::{encode, Decodable, Encodable};
use crate::hash_types::{Txid, TxMerkleNode};

/// The smallest transaction a block can carry, used to bound how many
/// transactions a partial tree may claim to describe.
const MIN_TRANSACTION_SIZE: u32 = 60;

/// Maximum serialized size of a block.
const MAX_BLOCK_SIZE: u32 = 1_000_000;

/// Reasons a partial merkle tree fails to build or reconstruct.
///
/// All of these are terminal: a proof that trips any of them is discarded,
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MerkleTreeError {
    /// A tree must describe at least one transaction.
    #[error("merkle tree with zero transactions")]
    NoTransactions,
    /// The claimed transaction count exceeds what a block can hold.
    #[error("transaction count exceeds block capacity")]
    TooManyTransactions,
    /// One match flag is required per transaction id.
    #[error("match flag list length differs from transaction id list length")]
    LengthMismatch,
    /// More hashes than transactions.
    #[error("more hashes than transactions")]
    TooManyHashes,
    /// Fewer flag bits than hashes.
    #[error("fewer flag bits than hashes")]
    NotEnoughBits,
    /// The traversal ran out of flag bits.
    #[error("flag bits exhausted during traversal")]
    BitsExhausted,
    /// The traversal ran out of hashes.
    #[error("hashes exhausted during traversal")]
    HashesExhausted,
    /// Flag bits beyond byte-alignment padding were never consumed.
    #[error("unconsumed flag bits beyond padding")]
    UnconsumedBits,
    /// Hashes were never consumed by the traversal.
    #[error("unconsumed hashes")]
    UnconsumedHashes,
    /// Sibling nodes hash identically although both exist.
    #[error("duplicate sibling hashes in the tree")]
    DuplicateSibling,
}

/// A merkle proof for a filtered subset of a block's transactions.
///
/// This is the partial-tree portion of a `merkleblock` payload. Building one
/// requires the full transaction id list; reconstructing one recovers the
/// merkle root and the matched ids, which the caller then checks against the
/// block header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialMerkleTree {
    /// Total number of transactions in the original block.
    num_transactions: u32,
    /// Flag bits, in depth-first traversal order.
    bits: Vec<bool>,
    /// Node hashes, in depth-first traversal order.
    hashes: Vec<TxMerkleNode>,
}

impl PartialMerkleTree {
    /// Total number of transactions in the block this tree describes.
    pub fn num_transactions(&self) -> u32 {
        self.num_transactions
    }

    /// The traversal's flag bits.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// The traversal's node hashes.
    pub fn hashes(&self) -> &[TxMerkleNode] {
        &self.hashes
    }

    /// Builds the partial tree for a block's `txids`, keeping the leaves
    /// where `matches` is true.
    pub fn from_txids(txids: &[Txid], matches: &[bool]) -> Result<Self, MerkleTreeError> {
        if txids.is_empty() {
            return Err(MerkleTreeError::NoTransactions);
        }
        if txids.len() != matches.len() {
            return Err(MerkleTreeError::LengthMismatch);
        }

        let mut pmt = PartialMerkleTree {
            num_transactions: txids.len() as u32,
            bits: Vec::with_capacity(txids.len()),
            hashes: Vec::new(),
        };
        let height = pmt.height();
        pmt.traverse_and_build(height, 0, txids, matches);
        Ok(pmt)
    }

    /// Reconstructs the tree, returning its merkle root and filling `matches`
    /// and `indexes` with the matched transaction ids and their positions, in
    /// ascending block order.
    ///
    /// Whether the returned root equals the block header's merkle root is for
    /// the caller to check.
    pub fn extract_matches(
        &self,
        matches: &mut Vec<Txid>,
        indexes: &mut Vec<u32>,
    ) -> Result<TxMerkleNode, MerkleTreeError> {
        matches.clear();
        indexes.clear();

        if self.num_transactions == 0 {
            return Err(MerkleTreeError::NoTransactions);
        }
        if self.num_transactions > MAX_BLOCK_SIZE / MIN_TRANSACTION_SIZE {
            return Err(MerkleTreeError::TooManyTransactions);
        }
        if self.hashes.len() > self.num_transactions as usize {
            return Err(MerkleTreeError::TooManyHashes);
        }
        if self.bits.len() < self.hashes.len() {
            return Err(MerkleTreeError::NotEnoughBits);
        }

        let mut bits_used = 0usize;
        let mut hashes_used = 0usize;
        let root = self.traverse_and_extract(
            self.height(),
            0,
            &mut bits_used,
            &mut hashes_used,
            matches,
            indexes,
        )?;

        // Anything after the consumed bits may only be zero padding up to the
        // byte boundary of the wire encoding.
        if (bits_used + 7) / 8 != (self.bits.len() + 7) / 8 {
            return Err(MerkleTreeError::UnconsumedBits);
        }
        if hashes_used != self.hashes.len() {
            return Err(MerkleTreeError::UnconsumedHashes);
        }

        Ok(root)
    }

    /// Height of the tree: leaves sit at height 0, the root at `height()`.
    fn height(&self) -> u32 {
        let mut height = 0;
        while self.tree_width(height) > 1 {
            height += 1;
        }
        height
    }

    /// Number of nodes at the given height.
    fn tree_width(&self, height: u32) -> u32 {
        let shift = 1u64 << height;
        ((self.num_transactions as u64 + shift - 1) >> height) as u32
    }

    /// Hash of the subtree rooted at `(height, pos)`, computed from the full
    /// id list.
    fn calc_hash(&self, height: u32, pos: u32, txids: &[Txid]) -> TxMerkleNode {
        if height == 0 {
            return txids[pos as usize].into();
        }
        let left = self.calc_hash(height - 1, pos * 2, txids);
        let right = if pos * 2 + 1 < self.tree_width(height - 1) {
            self.calc_hash(height - 1, pos * 2 + 1, txids)
        } else {
            // A node without a right sibling pairs with itself.
            left
        };
        combine(&left, &right)
    }

    fn traverse_and_build(&mut self, height: u32, pos: u32, txids: &[Txid], matches: &[bool]) {
        // Is any matched leaf under this node?
        let begin = (pos as u64) << height;
        let end = u64::min(self.num_transactions as u64, (pos as u64 + 1) << height);
        let parent_of_match = (begin..end).any(|i| matches[i as usize]);

        self.bits.push(parent_of_match);

        if height == 0 || !parent_of_match {
            // Nothing interesting below: one summary hash stands in for the
            // whole subtree.
            self.hashes.push(self.calc_hash(height, pos, txids));
        } else {
            self.traverse_and_build(height - 1, pos * 2, txids, matches);
            if pos * 2 + 1 < self.tree_width(height - 1) {
                self.traverse_and_build(height - 1, pos * 2 + 1, txids, matches);
            }
        }
    }

    fn traverse_and_extract(
        &self,
        height: u32,
        pos: u32,
        bits_used: &mut usize,
        hashes_used: &mut usize,
        matches: &mut Vec<Txid>,
        indexes: &mut Vec<u32>,
    ) -> Result<TxMerkleNode, MerkleTreeError> {
        if *bits_used >= self.bits.len() {
            return Err(MerkleTreeError::BitsExhausted);
        }
        let parent_of_match = self.bits[*bits_used];
        *bits_used += 1;

        if height == 0 || !parent_of_match {
            // This node's hash is supplied verbatim.
            if *hashes_used >= self.hashes.len() {
                return Err(MerkleTreeError::HashesExhausted);
            }
            let hash = self.hashes[*hashes_used];
            *hashes_used += 1;
            if height == 0 && parent_of_match {
                matches.push(Txid::from_raw_hash(hash.to_raw_hash()));
                indexes.push(pos);
            }
            return Ok(hash);
        }

        let left =
            self.traverse_and_extract(height - 1, pos * 2, bits_used, hashes_used, matches, indexes)?;
        let right = if pos * 2 + 1 < self.tree_width(height - 1) {
            let right = self.traverse_and_extract(
                height - 1,
                pos * 2 + 1,
                bits_used,
                hashes_used,
                matches,
                indexes,
            )?;
            if left == right {
                // Identical siblings allow mutating the proof without
                // changing the root (CVE-2012-2459); a genuine right child
                // never equals its left sibling.
                return Err(MerkleTreeError::DuplicateSibling);
            }
            right
        } else {
            left
        };
        Ok(combine(&left, &right))
    }
}

impl Encodable for PartialMerkleTree {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.num_transactions.consensus_encode(w)?;
        len += self.hashes.consensus_encode(w)?;

        let mut bytes = vec![0u8; (self.bits.len() + 7) / 8];
        for (i, bit) in self.bits.iter().enumerate() {
            bytes[i / 8] |= (*bit as u8) << (i % 8);
        }
        len += bytes.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for PartialMerkleTree {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let num_transactions = u32::consensus_decode(r)?;
        let hashes = Vec::<TxMerkleNode>::consensus_decode(r)?;

        let bytes = Vec::<u8>::consensus_decode(r)?;
        let mut bits = vec![false; bytes.len() * 8];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = bytes[i / 8] & (1u8 << (i % 8)) != 0;
        }

        Ok(PartialMerkleTree { num_transactions, bits, hashes })
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::consensus::{deserialize, serialize};
    use crate::merkle_tree::calculate_root;

    fn txid(tag: u8) -> Txid {
        let mut bytes = [0u8; 32];
        bytes[0] = tag;
        Txid::from_byte_array(bytes)
    }

    fn extract(pmt: &PartialMerkleTree) -> Result<(TxMerkleNode, Vec<Txid>, Vec<u32>), MerkleTreeError> {
        let mut matches = Vec::new();
        let mut indexes = Vec::new();
        let root = pmt.extract_matches(&mut matches, &mut indexes)?;
        Ok((root, matches, indexes))
    }

    /// Assembles wire bytes for a partial tree with fewer than 0xFD hashes
    /// and flag bytes.
    fn pmt_bytes(num_transactions: u32, hashes: &[[u8; 32]], flag_bytes: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&num_transactions.to_le_bytes());
        bytes.push(hashes.len() as u8);
        for hash in hashes {
            bytes.extend_from_slice(hash);
        }
        bytes.push(flag_bytes.len() as u8);
        bytes.extend_from_slice(flag_bytes);
        bytes
    }

    #[test]
    fn round_trips_over_many_shapes() {
        let mut rng = StdRng::seed_from_u64(0x50f1);
        for &tx_count in &[1usize, 2, 3, 4, 5, 7, 16, 17, 56, 100, 127] {
            let txids: Vec<Txid> =
                (0..tx_count).map(|_| Txid::from_byte_array(rng.gen::<[u8; 32]>())).collect();

            for round in 0..4 {
                let matches: Vec<bool> = match round {
                    0 => vec![false; tx_count],
                    1 => vec![true; tx_count],
                    _ => (0..tx_count).map(|_| rng.gen_bool(0.3)).collect(),
                };

                let pmt = PartialMerkleTree::from_txids(&txids, &matches).unwrap();
                let wire = serialize(&pmt);
                let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
                assert_eq!(serialize(&decoded), wire);

                let (root, matched, indexes) = extract(&decoded).unwrap();
                assert_eq!(root, calculate_root(&txids).unwrap());

                let expected: Vec<Txid> = txids
                    .iter()
                    .zip(&matches)
                    .filter_map(|(txid, &m)| m.then_some(*txid))
                    .collect();
                assert_eq!(matched, expected);

                let expected_indexes: Vec<u32> = matches
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &m)| m.then_some(i as u32))
                    .collect();
                assert_eq!(indexes, expected_indexes);
            }
        }
    }

    #[test]
    fn single_transaction_block() {
        let id = txid(9);
        let pmt = PartialMerkleTree::from_txids(&[id], &[true]).unwrap();

        assert_eq!(pmt.bits(), &[true]);
        assert_eq!(pmt.hashes(), &[TxMerkleNode::from(id)]);

        // u32 count, one hash, one flag byte with the single bit set.
        let mut expected_wire = vec![1, 0, 0, 0, 1];
        expected_wire.extend_from_slice(&id.to_byte_array());
        expected_wire.extend_from_slice(&[1, 0x01]);
        assert_eq!(serialize(&pmt), expected_wire);

        let (root, matched, indexes) = extract(&pmt).unwrap();
        assert_eq!(root, TxMerkleNode::from(id));
        assert_eq!(matched, vec![id]);
        assert_eq!(indexes, vec![0]);
    }

    #[test]
    fn odd_width_levels_duplicate_the_last_node() {
        let ids = [txid(1), txid(2), txid(3)];
        let pmt = PartialMerkleTree::from_txids(&ids, &[true, false, false]).unwrap();

        // The matched left branch descends to both leaves; the unmatched
        // right branch is summarised by the duplicated-pair hash.
        let dup = combine(&ids[2].into(), &ids[2].into());
        assert_eq!(pmt.bits(), &[true, true, true, false, false]);
        assert_eq!(
            pmt.hashes(),
            &[TxMerkleNode::from(ids[0]), TxMerkleNode::from(ids[1]), dup]
        );

        let (root, matched, indexes) = extract(&pmt).unwrap();
        assert_eq!(root, combine(&combine(&ids[0].into(), &ids[1].into()), &dup));
        assert_eq!(root, calculate_root(&ids).unwrap());
        assert_eq!(matched, vec![ids[0]]);
        assert_eq!(indexes, vec![0]);
    }

    #[test]
    fn zero_padding_within_the_last_byte_is_tolerated() {
        let ids = [txid(1), txid(2)];
        let pmt = PartialMerkleTree::from_txids(&ids, &[true, false]).unwrap();
        // Three traversal bits, five zero padding bits in the single byte.
        assert_eq!(pmt.bits().len(), 3);

        let decoded: PartialMerkleTree = deserialize(&serialize(&pmt)).unwrap();
        assert_eq!(decoded.bits().len(), 8);
        let (root, matched, _) = extract(&decoded).unwrap();
        assert_eq!(root, calculate_root(&ids).unwrap());
        assert_eq!(matched, vec![ids[0]]);
    }

    #[test]
    fn a_full_extra_padding_byte_is_rejected() {
        let ids = [txid(1), txid(2)];
        let pmt = PartialMerkleTree::from_txids(&ids, &[true, false]).unwrap();

        let mut wire = serialize(&pmt);
        // Stretch the flag byte vector by one zero byte: more than 7 padding
        // bits can never be valid.
        let flag_count_at = wire.len() - 2;
        wire[flag_count_at] = 2;
        wire.push(0x00);

        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::UnconsumedBits));
    }

    #[test]
    fn duplicate_siblings_are_rejected() {
        // Two transactions, both "matched", carrying the same hash twice.
        let hash = [0x11; 32];
        let wire = pmt_bytes(2, &[hash, hash], &[0x07]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::DuplicateSibling));
    }

    #[test]
    fn running_out_of_bits_is_rejected() {
        // Five transactions, all-ones flags: the traversal needs more than
        // the eight bits a single flag byte provides.
        let hashes = [[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32], [5u8; 32]];
        let wire = pmt_bytes(5, &hashes, &[0xff]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::BitsExhausted));
    }

    #[test]
    fn running_out_of_hashes_is_rejected() {
        // The flags promise two leaf hashes but only one is present.
        let wire = pmt_bytes(2, &[[1u8; 32]], &[0x07]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::HashesExhausted));
    }

    #[test]
    fn leftover_hashes_are_rejected() {
        // The root flag bit is zero, so only one summary hash may be present.
        let wire = pmt_bytes(2, &[[1u8; 32], [2u8; 32]], &[0x00]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::UnconsumedHashes));
    }

    #[test]
    fn more_hashes_than_transactions_is_rejected() {
        let wire = pmt_bytes(1, &[[1u8; 32], [2u8; 32]], &[0x01]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::TooManyHashes));
    }

    #[test]
    fn absurd_transaction_count_is_rejected() {
        let wire = pmt_bytes(u32::MAX, &[[1u8; 32]], &[0x00]);
        let decoded: PartialMerkleTree = deserialize(&wire).unwrap();
        assert_eq!(extract(&decoded), Err(MerkleTreeError::TooManyTransactions));
    }

    #[test]
    fn empty_tree_cannot_be_built() {
        assert_eq!(
            PartialMerkleTree::from_txids(&[], &[]),
            Err(MerkleTreeError::NoTransactions)
        );
        assert_eq!(
            PartialMerkleTree::from_txids(&[txid(1)], &[true, false]),
            Err(MerkleTreeError::LengthMismatch)
        );
    }
}
