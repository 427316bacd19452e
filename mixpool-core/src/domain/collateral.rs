use crate::domain::ports::LedgerOracle;
use crate::domain::tx::Transaction;
use crate::foundation::Amount;
use log::debug;

/// A collateral must be a plain payment that burns at least `min_fee` and would be accepted by the ledger.
pub fn is_collateral_valid(ledger: &dyn LedgerOracle, tx: &Transaction, min_fee: Amount) -> bool {
    if tx.outputs.is_empty() || tx.inputs.is_empty() {
        debug!("collateral rejected reason=empty inputs={} outputs={}", tx.inputs.len(), tx.outputs.len());
        return false;
    }
    if tx.lock_time != 0 {
        debug!("collateral rejected reason=lock_time lock_time={}", tx.lock_time);
        return false;
    }
    if let Some(out) = tx.outputs.iter().find(|out| !out.script_pubkey.is_normal_payment_script()) {
        debug!("collateral rejected reason=script script_len={}", out.script_pubkey.len());
        return false;
    }

    let mut value_in: Amount = 0;
    for input in &tx.inputs {
        match ledger.spendable_output(&input.previous_output) {
            Some(prev) => value_in = value_in.saturating_add(prev.value),
            None => {
                debug!("collateral rejected reason=missing_input outpoint={}", input.previous_output);
                return false;
            }
        }
    }
    let value_out = tx.total_output_value();
    if value_in < value_out || value_in - value_out < min_fee {
        debug!("collateral rejected reason=fee value_in={} value_out={} min_fee={}", value_in, value_out, min_fee);
        return false;
    }
    if !ledger.validate(tx) {
        debug!("collateral rejected reason=ledger");
        return false;
    }
    true
}
