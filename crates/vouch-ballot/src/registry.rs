//! Voucher registry and the persistent win record

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vouch_runtime::Address;

/// Identities allowed to register a commitment. Fixed at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherRegistry {
    vouchers: BTreeSet<Address>,
}

impl VoucherRegistry {
    pub fn new(vouchers: impl IntoIterator<Item = Address>) -> Self {
        Self { vouchers: vouchers.into_iter().collect() }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.vouchers.contains(address)
    }

    pub fn len(&self) -> usize {
        self.vouchers.len()
    }
}

/// Candidates that have won at least one round.
///
/// Survives round resets; only finalization writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchRecord {
    winners: BTreeSet<Address>,
}

impl VouchRecord {
    pub fn has_won(&self, candidate: &Address) -> bool {
        self.winners.contains(candidate)
    }

    pub(crate) fn mark_won(&mut self, candidate: Address) {
        self.winners.insert(candidate);
    }

    pub fn winners(&self) -> impl Iterator<Item = &Address> {
        self.winners.iter()
    }
}
