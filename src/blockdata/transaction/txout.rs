// SPDX-License-Identifier: CC0-1.0

//! Transaction outputs.

use crate::blockdata::script::Script;
use crate::internal_macros::impl_consensus_encoding;

/// A transaction output, which defines new coins to be created from old ones.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOut {
    /// The value of the output, in satoshis.
    pub value: u64,
    /// The script which must be satisfied for the output to be spent.
    pub script_pubkey: Script,
}
impl_consensus_encoding!(TxOut, value, script_pubkey);

// This is used as a "null txout" in consensus signing code.
impl Default for TxOut {
    fn default() -> TxOut {
        TxOut { value: u64::MAX, script_pubkey: Script::new() }
    }
}
