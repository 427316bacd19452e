//! Standard output values accepted by mixing sessions.
//!
//! Every tier is ten times the next one plus a small fixed remainder, so one tier
//! converts into ten of the next: `1 COIN + 1000 == (0.1 COIN + 100) * 10`.
//!
//! A set of outputs is summarised as a bitmask where bit `n` is set when tier `n`
//! (largest first) is present. Two participants are compatible when their masks
//! share at least one bit.

use crate::domain::tx::TxOut;
use crate::foundation::{Amount, MixError, COIN};
use rand::seq::SliceRandom;
use rand::Rng;

pub type DenominationMask = u32;

/// Catalog tiers, bit 0 first.
pub const STANDARD_DENOMINATIONS: [Amount; 4] = [100 * COIN + 100_000, 10 * COIN + 10_000, COIN + 1_000, COIN / 10 + 100];

const TIER_LABELS: [&str; 4] = ["100", "10", "1", "0.1"];

/// Upper bound on outputs of one tier produced when splitting an amount.
const MAX_OUTPUTS_PER_TIER: usize = 11;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenominationCatalog {
    tiers: Vec<Amount>,
}

impl Default for DenominationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl DenominationCatalog {
    pub fn standard() -> Self {
        Self { tiers: STANDARD_DENOMINATIONS.to_vec() }
    }

    pub fn tiers(&self) -> &[Amount] {
        &self.tiers
    }

    pub fn smallest(&self) -> Amount {
        self.tiers.last().copied().unwrap_or(0)
    }

    /// Encode the tiers present in `outputs`. Returns 0 if any output is not a denomination.
    pub fn encode(&self, outputs: &[TxOut]) -> DenominationMask {
        self.encode_values(outputs.iter().map(|out| out.value))
    }

    pub fn encode_values(&self, values: impl IntoIterator<Item = Amount>) -> DenominationMask {
        let mut used = vec![false; self.tiers.len()];
        for value in values {
            match self.tiers.iter().position(|tier| *tier == value) {
                Some(idx) => used[idx] = true,
                None => return 0,
            }
        }
        used.iter().enumerate().filter(|(_, used)| **used).fold(0, |mask, (idx, _)| mask | (1 << idx))
    }

    /// Like [`encode`](Self::encode) but reveals only one randomly chosen tier of those present.
    pub fn encode_single_random<R: Rng + ?Sized>(&self, outputs: &[TxOut], rng: &mut R) -> DenominationMask {
        let full = self.encode(outputs);
        let present: Vec<u32> = (0..self.tiers.len() as u32).filter(|bit| full & (1 << bit) != 0).collect();
        present.choose(rng).map(|bit| 1 << bit).unwrap_or(0)
    }

    pub fn decode(&self, mask: DenominationMask) -> String {
        (0..self.tiers.len())
            .filter(|idx| mask & (1 << idx) != 0)
            .map(|idx| TIER_LABELS.get(idx).map(|s| s.to_string()).unwrap_or_else(|| format_amount(self.tiers[idx])))
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn amount_to_denomination(&self, amount: Amount) -> Result<usize, MixError> {
        self.tiers.iter().position(|tier| *tier == amount).ok_or(MixError::UnknownDenomination { amount })
    }

    pub fn encode_amount(&self, tier: usize) -> Option<Amount> {
        self.tiers.get(tier).copied()
    }

    /// Greedy split of `amount` into tiers, smallest tier first, at most
    /// `MAX_OUTPUTS_PER_TIER` outputs per tier. `target` restricts the tiers used (0 = all).
    pub fn split_amount(&self, amount: Amount, target: DenominationMask) -> Vec<Amount> {
        let mut left = amount;
        let mut parts = Vec::new();
        for (idx, tier) in self.tiers.iter().enumerate().rev() {
            if target != 0 && target & (1 << idx) == 0 {
                continue;
            }
            let mut count = 0;
            while left >= *tier && count < MAX_OUTPUTS_PER_TIER {
                parts.push(*tier);
                left -= tier;
                count += 1;
            }
        }
        parts
    }

    pub fn denominations_by_amount(&self, amount: Amount, target: DenominationMask) -> DenominationMask {
        self.encode_values(self.split_amount(amount, target))
    }

    pub fn denominations_by_amounts(&self, amounts: &[Amount]) -> DenominationMask {
        self.encode_values(amounts.iter().copied())
    }
}

pub fn is_compatible(a: DenominationMask, b: DenominationMask) -> bool {
    a & b != 0
}

fn format_amount(amount: Amount) -> String {
    format!("{}.{:08}", amount / COIN, amount % COIN)
}
