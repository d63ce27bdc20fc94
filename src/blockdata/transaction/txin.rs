// SPDX-License-Identifier: CC0-1.0

//! Transaction inputs.

use crate::blockdata::script::Script;
use crate::blockdata::transaction::OutPoint;
use crate::internal_macros::impl_consensus_encoding;

/// An input of a transaction, consuming an output of an earlier one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxIn {
    /// The outpoint this input spends.
    pub previous_output: OutPoint,
    /// The script satisfying the spent output's spending conditions.
    pub script_sig: Script,
    /// The input's sequence number.
    pub sequence: u32,
}
impl_consensus_encoding!(TxIn, previous_output, script_sig, sequence);

impl Default for TxIn {
    fn default() -> TxIn {
        TxIn {
            previous_output: OutPoint::null(),
            script_sig: Script::new(),
            sequence: u32::MAX,
        }
    }
}
