use crate::domain::entry::Entry;
use crate::domain::pool::config::PoolConfig;
use crate::domain::pool::state::PoolState;
use crate::domain::tx::Transaction;
use log::{debug, info};
use rand::RngCore;

/// Decides which collaterals to burn after a failed or finished round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MisbehaviorPenalizer {
    charge_fees_percent: u32,
    random_fee_percent: u32,
    max_pool_transactions: usize,
}

impl MisbehaviorPenalizer {
    pub fn new(charge_fees_percent: u32, random_fee_percent: u32, max_pool_transactions: usize) -> Self {
        Self { charge_fees_percent, random_fee_percent, max_pool_transactions }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.charge_fees_percent, config.random_fee_percent, config.max_pool_transactions)
    }

    /// Collaterals of participants that stalled the round in `state`, one per offence.
    ///
    /// While accepting entries an offence is a join without an entry; while signing it is an unsigned input.
    pub fn offenders(state: PoolState, collaterals: &[Transaction], entries: &[Entry]) -> Vec<Transaction> {
        match state {
            PoolState::AcceptingEntries => collaterals
                .iter()
                .filter(|collateral| !entries.iter().any(|entry| entry.collateral() == *collateral))
                .cloned()
                .collect(),
            PoolState::Signing => entries
                .iter()
                .flat_map(|entry| std::iter::repeat(entry.collateral().clone()).take(entry.unsigned_inputs()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Pick at most one offender to charge.
    ///
    /// Charging is probabilistic, and is skipped entirely when (nearly) every participant offended.
    pub fn charge_fees(
        &self,
        state: PoolState,
        collaterals: &[Transaction],
        entries: &[Entry],
        rng: &mut (dyn RngCore + Send),
    ) -> Option<Transaction> {
        if roll(rng) > self.charge_fees_percent {
            return None;
        }
        let offenders = Self::offenders(state, collaterals, entries);
        if offenders.is_empty() {
            return None;
        }
        let offences = offenders.len();
        debug!("uncooperative participants found state={} offences={}", state, offences);

        if offences >= self.max_pool_transactions.saturating_sub(1) && roll(rng) > self.charge_fees_percent {
            return None;
        }
        if offences >= self.max_pool_transactions {
            return None;
        }
        let target = if offences > 1 { 50 } else { 0 };
        if roll(rng) > target {
            info!("charging uncooperative participant state={} offences={}", state, offences);
            return offenders.into_iter().next();
        }
        None
    }

    /// Burn each collateral with `random_fee_percent` chance, so penalty burns do not stand out.
    pub fn charge_random_fees(&self, collaterals: &[Transaction], rng: &mut (dyn RngCore + Send)) -> Vec<Transaction> {
        collaterals.iter().filter(|_| roll(rng) <= self.random_fee_percent).cloned().collect()
    }
}

fn roll(rng: &mut (dyn RngCore + Send)) -> u32 {
    rng.next_u32() % 100
}
