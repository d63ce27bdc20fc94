// SPDX-License-Identifier: CC0-1.0

//! A reference to a particular transaction output.

use std::fmt;

use hashes::Hash;

use crate::hash_types::Txid;
use crate::internal_macros::impl_consensus_encoding;

/// A reference to an output of an earlier transaction.
///
/// On the wire this is the 32-byte transaction id followed by the
/// little-endian output index, and that byte form is also what bloom filters
/// match outpoints by.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutPoint {
    /// The id of the transaction holding the referenced output.
    pub txid: Txid,
    /// The index of the referenced output in that transaction's output list.
    pub vout: u32,
}
impl_consensus_encoding!(OutPoint, txid, vout);

impl OutPoint {
    /// Creates a new outpoint.
    pub fn new(txid: Txid, vout: u32) -> OutPoint {
        OutPoint { txid, vout }
    }

    /// The outpoint coinbase transactions spend.
    pub fn null() -> OutPoint {
        OutPoint { txid: Txid::all_zeros(), vout: u32::MAX }
    }
}

impl Default for OutPoint {
    fn default() -> OutPoint {
        OutPoint::null()
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::serialize;

    #[test]
    fn wire_form_is_txid_then_le_index() {
        let txid = Txid::from_byte_array([0xab; 32]);
        let bytes = serialize(&OutPoint::new(txid, 7));
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[..32], &[0xab; 32]);
        assert_eq!(&bytes[32..], &[7, 0, 0, 0]);
    }
}
