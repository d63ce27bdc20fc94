// SPDX-License-Identifier: CC0-1.0

//! Bloom filter construction utilities.

use std::cmp;

use tracing::debug;

use crate::blockdata::transaction::OutPoint;
use crate::hash_types::Txid;

use super::error::BloomError;
use super::filter::{BloomFilter, BloomFlags};

/// Builder assembling a [`BloomFilter`] from the items a client watches.
///
/// The tweak defaults to a fresh random value so that different clients
/// watching the same items still produce uncorrelated false positives.
pub struct BloomFilterBuilder {
    /// Expected number of elements.
    elements: u32,
    /// Desired false positive rate.
    false_positive_rate: f64,
    /// Random tweak value.
    tweak: u32,
    /// Update flags.
    flags: BloomFlags,
    /// Transaction ids to include.
    txids: Vec<Txid>,
    /// Outpoints to include.
    outpoints: Vec<OutPoint>,
    /// Raw data elements to include.
    data_elements: Vec<Vec<u8>>,
}

impl BloomFilterBuilder {
    /// Creates a new bloom filter builder.
    pub fn new() -> Self {
        Self {
            elements: 100,
            false_positive_rate: 0.001,
            tweak: rand::random::<u32>(),
            flags: BloomFlags::All,
            txids: Vec::new(),
            outpoints: Vec::new(),
            data_elements: Vec::new(),
        }
    }

    /// Sets the expected number of elements.
    pub fn elements(mut self, elements: u32) -> Self {
        self.elements = elements;
        self
    }

    /// Sets the false positive rate.
    pub fn false_positive_rate(mut self, rate: f64) -> Self {
        self.false_positive_rate = rate;
        self
    }

    /// Sets the tweak value.
    pub fn tweak(mut self, tweak: u32) -> Self {
        self.tweak = tweak;
        self
    }

    /// Sets the update flags.
    pub fn flags(mut self, flags: BloomFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a transaction id to the filter.
    pub fn add_txid(mut self, txid: Txid) -> Self {
        self.txids.push(txid);
        self
    }

    /// Adds multiple transaction ids.
    pub fn add_txids(mut self, txids: impl IntoIterator<Item = Txid>) -> Self {
        self.txids.extend(txids);
        self
    }

    /// Adds an outpoint to the filter.
    pub fn add_outpoint(mut self, outpoint: OutPoint) -> Self {
        self.outpoints.push(outpoint);
        self
    }

    /// Adds multiple outpoints.
    pub fn add_outpoints(mut self, outpoints: impl IntoIterator<Item = OutPoint>) -> Self {
        self.outpoints.extend(outpoints);
        self
    }

    /// Adds raw data to the filter.
    pub fn add_data(mut self, data: Vec<u8>) -> Self {
        self.data_elements.push(data);
        self
    }

    /// Builds the bloom filter and inserts every queued element.
    ///
    /// The filter is sized for at least the number of queued elements, even
    /// if a smaller expectation was configured.
    pub fn build(self) -> Result<BloomFilter, BloomError> {
        let queued = self.txids.len() + self.outpoints.len() + self.data_elements.len();
        let elements = cmp::max(self.elements, queued as u32);

        let mut filter =
            BloomFilter::new(elements, self.false_positive_rate, self.tweak, self.flags)?;

        for txid in &self.txids {
            filter.insert_txid(txid);
        }
        for outpoint in &self.outpoints {
            filter.insert_outpoint(outpoint);
        }
        for data in &self.data_elements {
            filter.insert(data);
        }

        debug!(
            size = filter.size(),
            hash_funcs = filter.hash_funcs(),
            elements = queued,
            "built bloom filter"
        );

        Ok(filter)
    }
}

impl Default for BloomFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;

    use super::*;
    use crate::consensus::serialize;

    fn test_outpoint() -> OutPoint {
        OutPoint::new(Txid::from_byte_array([0xcd; 32]), 1)
    }

    #[test]
    fn default_builder_produces_an_empty_filter() {
        let filter = BloomFilterBuilder::new().build().unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn configuration_is_applied() {
        let filter = BloomFilterBuilder::new()
            .elements(1000)
            .false_positive_rate(0.01)
            .tweak(12345)
            .flags(BloomFlags::None)
            .build()
            .unwrap();

        assert_eq!(filter.tweak(), 12345);
        assert_eq!(filter.flags(), BloomFlags::None);
        assert!(filter.is_empty());
    }

    #[test]
    fn queued_items_end_up_in_the_filter() {
        let txid = Txid::from_byte_array([0xab; 32]);
        let outpoint = test_outpoint();
        let data = vec![0xde, 0xad, 0xbe, 0xef];

        let filter = BloomFilterBuilder::new()
            .add_txid(txid)
            .add_outpoint(outpoint)
            .add_data(data.clone())
            .build()
            .unwrap();

        assert!(filter.contains_txid(&txid));
        assert!(filter.contains_outpoint(&outpoint));
        assert!(filter.contains(&serialize(&outpoint)));
        assert!(filter.contains(&data));
    }

    #[test]
    fn element_count_grows_to_fit_queued_items() {
        let mut builder = BloomFilterBuilder::new().elements(1);
        for i in 0..10u8 {
            builder = builder.add_data(vec![i]);
        }

        let filter = builder.build().unwrap();
        for i in 0..10u8 {
            assert!(filter.contains(&[i]));
        }
    }
}
