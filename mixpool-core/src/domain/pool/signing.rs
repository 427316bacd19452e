//! Client-side checks on the transaction a coordinator asks us to sign.

use crate::domain::entry::Entry;
use crate::domain::ports::InputSigner;
use crate::domain::tx::{Transaction, TxIn};
use crate::foundation::Result;

/// Positions of our inputs in `candidate`, or `None` if the candidate does not carry
/// every input and every output of `own` unmodified.
///
/// Outputs are matched as a multiset so duplicate outputs must appear as often as submitted.
pub fn match_own_entry(candidate: &Transaction, own: &Entry) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(own.inputs().len());
    for input in own.inputs() {
        positions.push(candidate.find_input(&input.txin)?);
    }

    let mut used = vec![false; candidate.outputs.len()];
    for output in own.outputs() {
        let slot = candidate.outputs.iter().enumerate().position(|(idx, out)| !used[idx] && *out == output.txout)?;
        used[slot] = true;
    }
    Some(positions)
}

/// Produce unlocking data for each of `positions` in `candidate`.
pub fn sign_inputs(candidate: &Transaction, positions: &[usize], signer: &dyn InputSigner) -> Result<Vec<TxIn>> {
    positions
        .iter()
        .map(|idx| {
            let mut input = candidate.inputs[*idx].clone();
            input.script_sig = signer.sign_input(candidate, *idx)?;
            Ok(input)
        })
        .collect()
}
