// SPDX-License-Identifier: CC0-1.0

//! The read-only transaction data model the filtering core consumes.

pub mod script;
pub mod transaction;
