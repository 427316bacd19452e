//! Background participation: join advertised sessions with prepared plans from the tick loop.

use crate::domain::denomination::{DenominationCatalog, DenominationMask};
use crate::domain::pool::client::EntryPlan;
use crate::domain::pool::state::PoolState;
use crate::domain::ports::CoordinatorId;
use crate::domain::queue::QueueBook;
use crate::foundation::util::time::elapsed_exceeds;
use log::{debug, info};

/// A join the tick loop should attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoJoin {
    pub coordinator: CoordinatorId,
    pub denomination: DenominationMask,
    pub plan: EntryPlan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SkippedDenomination {
    mask: DenominationMask,
    skipped_at: u64,
}

/// Plans waiting to be mixed and the denominations that recently failed.
#[derive(Clone, Debug, Default)]
pub struct AutoDenominator {
    plans: Vec<EntryPlan>,
    skipped: Vec<SkippedDenomination>,
    joined: Option<AutoJoin>,
    skip_window_secs: u64,
}

impl AutoDenominator {
    /// A failed denomination is passed over for `skip_window_secs`.
    pub fn new(skip_window_secs: u64) -> Self {
        Self { skip_window_secs, ..Self::default() }
    }

    pub fn add_plan(&mut self, plan: EntryPlan) {
        self.plans.push(plan);
    }

    pub fn plans(&self) -> &[EntryPlan] {
        &self.plans
    }

    pub fn is_enabled(&self) -> bool {
        !self.plans.is_empty()
    }

    /// Denomination of the round we are taking part in, if any.
    pub fn joined(&self) -> Option<DenominationMask> {
        self.joined.as_ref().map(|join| join.denomination)
    }

    pub fn is_denom_skipped(&self, mask: DenominationMask, now: u64) -> bool {
        self.skipped.iter().any(|skipped| skipped.mask == mask && !elapsed_exceeds(now, skipped.skipped_at, self.skip_window_secs))
    }

    pub fn skip_denomination(&mut self, mask: DenominationMask, now: u64) {
        self.skipped.retain(|skipped| skipped.mask != mask);
        self.skipped.push(SkippedDenomination { mask, skipped_at: now });
    }

    pub fn clear_skipped_denominations(&mut self) {
        self.skipped.clear();
    }

    /// Follow the session after a join. A success consumes the plan; any other end of the round skips its denomination.
    pub fn observe(&mut self, state: PoolState, catalog: &DenominationCatalog, now: u64) {
        let Some(join) = self.joined.as_ref() else {
            return;
        };
        let mask = join.denomination;
        match state {
            PoolState::Success => {
                let used = join.plan.clone();
                self.plans.retain(|plan| *plan != used);
                self.joined = None;
                self.clear_skipped_denominations();
                info!("background round mixed denomination={} plans_left={}", catalog.decode(mask), self.plans.len());
            }
            PoolState::Error | PoolState::Idle => {
                self.joined = None;
                self.skip_denomination(mask, now);
                debug!("background round failed, skipping denomination={}", catalog.decode(mask));
            }
            _ => {}
        }
    }

    /// The first plan with a matching, non-skipped advertisement.
    pub fn next_join(&self, catalog: &DenominationCatalog, book: &QueueBook, now: u64) -> Option<AutoJoin> {
        if self.joined.is_some() {
            return None;
        }
        self.plans.iter().find_map(|plan| {
            let mask = catalog.encode(&plan.outputs);
            if mask == 0 || self.is_denom_skipped(mask, now) {
                return None;
            }
            let adv = book.pick(mask, now)?;
            Some(AutoJoin { coordinator: adv.coordinator, denomination: mask, plan: plan.clone() })
        })
    }

    pub fn mark_joined(&mut self, join: AutoJoin) {
        self.joined = Some(join);
    }
}
