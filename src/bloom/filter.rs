// SPDX-License-Identifier: CC0-1.0

//! Bloom filter implementation for BIP37-style filtering.

use std::cmp;
use std::io;

use bitvec::prelude::*;
use hashes::Hash;

use crate::blockdata::script::Script;
use crate::blockdata::transaction::{OutPoint, Transaction};
use crate::consensus::{encode, serialize, Decodable, Encodable, ReadExt, WriteExt};
use crate::hash_types::Txid;

use super::error::BloomError;
use super::hash::murmur3;

/// Maximum size of a bloom filter in bytes (36KB).
pub const MAX_BLOOM_FILTER_SIZE: usize = 36_000;

/// Maximum number of hash functions.
pub const MAX_HASH_FUNCS: u32 = 50;

/// Seed multiplier fixed by the protocol, chosen to spread the seeds of the
/// individual hash functions far apart.
const SEED_OFFSET: u32 = 0xfba4c795;

/// Controls how a transaction-relaying peer updates the filter as matches
/// stream past.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BloomFlags {
    /// Never update the filter automatically.
    None,
    /// Add the outpoint of every matching output.
    All,
    /// Add outpoints only for pay-to-pubkey and bare multisig outputs.
    PubkeyOnly,
}

impl Encodable for BloomFlags {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.emit_u8(match self {
            BloomFlags::None => 0,
            BloomFlags::All => 1,
            BloomFlags::PubkeyOnly => 2,
        })?;
        Ok(1)
    }
}

impl Decodable for BloomFlags {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(match r.read_u8()? {
            0 => BloomFlags::None,
            1 => BloomFlags::All,
            2 => BloomFlags::PubkeyOnly,
            _ => return Err(encode::Error::ParseFailed("unknown bloom flag variant")),
        })
    }
}

/// A BIP37 bloom filter.
///
/// The wire form of this structure is exactly the `filterload` payload:
/// varint-prefixed filter data, then hash function count, tweak and flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    /// The filter data as a bit vector. Always a whole number of bytes; bit
    /// `i` lives in byte `i >> 3` under mask `1 << (i & 7)`.
    filter: BitVec<u8, Lsb0>,
    /// Number of hash functions to use.
    n_hash_funcs: u32,
    /// Random value added to each hash function's seed.
    n_tweak: u32,
    /// Flags controlling filter update behavior.
    flags: BloomFlags,
}

impl BloomFilter {
    /// Creates a filter sized for `elements` entries at the desired
    /// `false_positive_rate`.
    ///
    /// The protocol caps filters at 36 000 bytes and 50 hash functions; the
    /// computed size and hash count are clamped into those ranges no matter
    /// what was asked for.
    pub fn new(
        elements: u32,
        false_positive_rate: f64,
        tweak: u32,
        flags: BloomFlags,
    ) -> Result<Self, BloomError> {
        if elements == 0 {
            return Err(BloomError::InvalidElementCount(elements));
        }
        if false_positive_rate <= 0.0 || false_positive_rate >= 1.0 {
            return Err(BloomError::InvalidFalsePositiveRate(false_positive_rate));
        }

        let ln2 = std::f64::consts::LN_2;
        let ln2_squared = ln2 * ln2;

        // Optimal size in bytes, truncated, then clamped into protocol range.
        let size =
            (-1.0 * elements as f64 * false_positive_rate.ln() / (ln2_squared * 8.0)) as usize;
        let size = cmp::max(1, cmp::min(size, MAX_BLOOM_FILTER_SIZE));

        let n_hash_funcs = ((size * 8) as f64 * ln2 / elements as f64) as u32;
        let n_hash_funcs = cmp::max(1, cmp::min(n_hash_funcs, MAX_HASH_FUNCS));

        Ok(BloomFilter {
            filter: BitVec::from_vec(vec![0u8; size]),
            n_hash_funcs,
            n_tweak: tweak,
            flags,
        })
    }

    /// Rebuilds a filter from its raw wire components.
    pub fn from_bytes(
        data: Vec<u8>,
        n_hash_funcs: u32,
        n_tweak: u32,
        flags: BloomFlags,
    ) -> Result<Self, BloomError> {
        if data.is_empty() {
            return Err(BloomError::EmptyFilter);
        }
        if data.len() > MAX_BLOOM_FILTER_SIZE {
            return Err(BloomError::FilterTooLarge(data.len()));
        }
        if n_hash_funcs == 0 || n_hash_funcs > MAX_HASH_FUNCS {
            return Err(BloomError::InvalidHashFuncs(n_hash_funcs));
        }

        Ok(BloomFilter { filter: BitVec::from_vec(data), n_hash_funcs, n_tweak, flags })
    }

    /// Bit index selected by hash function `hash_num` for `data`.
    fn bit_index(&self, hash_num: u32, data: &[u8]) -> usize {
        let seed = hash_num.wrapping_mul(SEED_OFFSET).wrapping_add(self.n_tweak);
        murmur3(data, seed) as usize % self.filter.len()
    }

    /// Inserts raw data into the filter.
    pub fn insert(&mut self, data: &[u8]) {
        for i in 0..self.n_hash_funcs {
            let index = self.bit_index(i, data);
            self.filter.set(index, true);
        }
    }

    /// Checks whether the filter might contain `data`.
    pub fn contains(&self, data: &[u8]) -> bool {
        (0..self.n_hash_funcs).all(|i| self.filter[self.bit_index(i, data)])
    }

    /// Inserts a transaction id (its raw digest bytes).
    pub fn insert_txid(&mut self, txid: &Txid) {
        self.insert(&txid.to_byte_array());
    }

    /// Checks whether the filter might contain a transaction id.
    pub fn contains_txid(&self, txid: &Txid) -> bool {
        self.contains(&txid.to_byte_array())
    }

    /// Inserts an outpoint in its wire form (`txid ++ vout`).
    pub fn insert_outpoint(&mut self, outpoint: &OutPoint) {
        self.insert(&serialize(outpoint));
    }

    /// Checks whether the filter might contain an outpoint.
    pub fn contains_outpoint(&self, outpoint: &OutPoint) -> bool {
        self.contains(&serialize(outpoint))
    }

    /// Checks whether `tx` is interesting to whoever loaded this filter.
    ///
    /// A transaction is relevant when the filter contains its id, a data push
    /// of any of its output scripts, an outpoint one of its inputs spends, or
    /// a data push of any of its input script signatures. Opcodes are never
    /// matched, only pushed constants.
    pub fn is_relevant(&self, tx: &Transaction) -> bool {
        if self.contains_txid(&tx.txid()) {
            return true;
        }
        if tx.output.iter().any(|txout| self.matches_push_data(&txout.script_pubkey)) {
            return true;
        }
        tx.input.iter().any(|txin| {
            self.contains_outpoint(&txin.previous_output)
                || self.matches_push_data(&txin.script_sig)
        })
    }

    /// Applies the filter's automatic update policy to `tx`.
    ///
    /// For every output whose script pushes a constant already in the filter,
    /// the outpoint referencing that output is inserted, so that a later
    /// transaction spending it keeps matching; the transaction id itself is
    /// inserted as well. [`BloomFlags::None`] disables the whole mechanism
    /// and [`BloomFlags::PubkeyOnly`] restricts the per-output insertion to
    /// pay-to-pubkey and bare multisig outputs, decided by script shape.
    pub fn update(&mut self, tx: &Transaction) {
        if self.flags == BloomFlags::None {
            return;
        }

        let txid = tx.txid();
        for (vout, txout) in tx.output.iter().enumerate() {
            if self.flags == BloomFlags::PubkeyOnly
                && !txout.script_pubkey.is_p2pk()
                && !txout.script_pubkey.is_multisig()
            {
                continue;
            }
            if self.matches_push_data(&txout.script_pubkey) {
                self.insert_outpoint(&OutPoint::new(txid, vout as u32));
            }
        }
        self.insert_txid(&txid);
    }

    /// True if the filter contains any non-empty constant the script pushes.
    fn matches_push_data(&self, script: &Script) -> bool {
        script
            .instructions()
            .filter_map(|instruction| instruction.ok())
            .filter_map(|instruction| instruction.push_bytes())
            .any(|data| !data.is_empty() && self.contains(data))
    }

    /// Clears the filter (sets all bits to 0).
    pub fn clear(&mut self) {
        self.filter.fill(false);
    }

    /// Checks if the filter is empty (all bits are 0).
    pub fn is_empty(&self) -> bool {
        !self.filter.any()
    }

    /// The filter size in bytes.
    pub fn size(&self) -> usize {
        self.filter.len() / 8
    }

    /// The filter data as raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.filter.as_raw_slice().to_vec()
    }

    /// The number of hash functions.
    pub fn hash_funcs(&self) -> u32 {
        self.n_hash_funcs
    }

    /// The tweak value.
    pub fn tweak(&self) -> u32 {
        self.n_tweak
    }

    /// The update flags.
    pub fn flags(&self) -> BloomFlags {
        self.flags
    }

    /// Estimates the false positive rate after `elements` insertions.
    pub fn estimate_false_positive_rate(&self, elements: u32) -> f64 {
        if elements == 0 {
            return 0.0;
        }

        // P(false positive) = (1 - e^(-k*n/m))^k
        // where k = hash functions, n = elements, m = filter size in bits.
        let ratio = -(self.n_hash_funcs as f64 * elements as f64) / self.filter.len() as f64;
        let base = 1.0 - ratio.exp();
        base.powf(self.n_hash_funcs as f64)
    }
}

impl Encodable for BloomFilter {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.to_bytes().consensus_encode(w)?;
        len += self.n_hash_funcs.consensus_encode(w)?;
        len += self.n_tweak.consensus_encode(w)?;
        len += self.flags.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for BloomFilter {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let data = Vec::<u8>::consensus_decode(r)?;
        let n_hash_funcs = u32::consensus_decode(r)?;
        let n_tweak = u32::consensus_decode(r)?;
        let flags = BloomFlags::consensus_decode(r)?;

        BloomFilter::from_bytes(data, n_hash_funcs, n_tweak, flags)
            .map_err(|_| encode::Error::ParseFailed("invalid bloom filter parameters"))
    }
}
