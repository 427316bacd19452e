use crate::domain::tx::{OutPoint, Transaction, TxIn, TxOut};
use crate::foundation::util::time::elapsed_exceeds;
use crate::foundation::{Amount, QUEUE_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInput {
    pub txin: TxIn,
    pub has_signature: bool,
    pub times_relayed: u32,
}

impl PoolInput {
    pub fn new(txin: TxIn) -> Self {
        Self { txin, has_signature: false, times_relayed: 0 }
    }

    pub fn outpoint(&self) -> &OutPoint {
        &self.txin.previous_output
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOutput {
    pub txout: TxOut,
    pub times_relayed: u32,
}

impl PoolOutput {
    pub fn new(txout: TxOut) -> Self {
        Self { txout, times_relayed: 0 }
    }
}

/// One participant's contribution to a round.
///
/// `add` is one-shot: after it succeeds the input and output sets never change.
/// The only later mutation is attaching unlocking data, once per input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    is_finalized: bool,
    inputs: Vec<PoolInput>,
    outputs: Vec<PoolOutput>,
    amount: Amount,
    collateral: Transaction,
    supporting_tx: Transaction,
    added_at: u64,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, inputs: Vec<TxIn>, amount: Amount, collateral: Transaction, outputs: Vec<TxOut>, now: u64) -> bool {
        if self.is_finalized {
            return false;
        }
        self.supporting_tx = Transaction::new(inputs.clone(), outputs.clone());
        self.inputs = inputs.into_iter().map(PoolInput::new).collect();
        self.outputs = outputs.into_iter().map(PoolOutput::new).collect();
        self.amount = amount;
        self.collateral = collateral;
        self.added_at = now;
        self.is_finalized = true;
        true
    }

    /// Attach unlocking data to the input spending the same coin as `input`.
    ///
    /// Returns false when no such input exists, it is already signed, or `input` carries no data.
    pub fn add_signature(&mut self, input: &TxIn) -> bool {
        if input.script_sig.is_empty() {
            return false;
        }
        let Some(slot) = self.inputs.iter_mut().find(|slot| slot.txin.same_spend(input)) else {
            return false;
        };
        if slot.has_signature {
            return false;
        }
        slot.txin.script_sig = input.script_sig.clone();
        slot.has_signature = true;
        if let Some(idx) = self.supporting_tx.find_input(input) {
            self.supporting_tx.inputs[idx].script_sig = input.script_sig.clone();
        }
        true
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expired_after(now, QUEUE_TIMEOUT_SECS)
    }

    pub fn expired_after(&self, now: u64, window_secs: u64) -> bool {
        elapsed_exceeds(now, self.added_at, window_secs)
    }

    pub fn signatures_complete(&self) -> bool {
        self.inputs.iter().all(|input| input.has_signature)
    }

    pub fn unsigned_inputs(&self) -> usize {
        self.inputs.iter().filter(|input| !input.has_signature).count()
    }

    /// Count one more relay of this entry's inputs and outputs.
    pub fn mark_relayed(&mut self) {
        for input in &mut self.inputs {
            input.times_relayed = input.times_relayed.saturating_add(1);
        }
        for output in &mut self.outputs {
            output.times_relayed = output.times_relayed.saturating_add(1);
        }
    }

    pub fn times_relayed(&self) -> u32 {
        self.inputs.iter().map(|input| input.times_relayed).max().unwrap_or(0)
    }

    pub fn contains_outpoint(&self, outpoint: &OutPoint) -> bool {
        self.inputs.iter().any(|input| input.outpoint() == outpoint)
    }

    pub fn has_script_sig(&self, script_sig: &[u8]) -> bool {
        self.inputs.iter().any(|input| input.has_signature && input.txin.script_sig == script_sig)
    }

    pub fn is_finalized(&self) -> bool {
        self.is_finalized
    }

    pub fn inputs(&self) -> &[PoolInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PoolOutput] {
        &self.outputs
    }

    pub fn tx_inputs(&self) -> Vec<TxIn> {
        self.inputs.iter().map(|input| input.txin.clone()).collect()
    }

    pub fn tx_outputs(&self) -> Vec<TxOut> {
        self.outputs.iter().map(|output| output.txout.clone()).collect()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn collateral(&self) -> &Transaction {
        &self.collateral
    }

    pub fn supporting_tx(&self) -> &Transaction {
        &self.supporting_tx
    }

    pub fn added_at(&self) -> u64 {
        self.added_at
    }
}
