use crate::foundation::{Amount, Hash32, MixError, TxId, STANDARD_SCRIPT_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = 0x14;

/// Reference to a previous transaction output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: TxId, index: u32) -> Self {
        Self { txid, index }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_null() && self.index == u32::MAX
    }

    pub fn null() -> Self {
        Self { txid: TxId::default(), index: u32::MAX }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

impl FromStr for OutPoint {
    type Err = MixError;

    /// Parses `txid:index`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| MixError::EncodingError(format!("outpoint must be txid:index, got '{}'", s.trim())))?;
        let index = index.parse::<u32>().map_err(|err| MixError::EncodingError(format!("outpoint index: {}", err)))?;
        Ok(Self { txid: txid.parse()?, index })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(STANDARD_SCRIPT_LEN);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, PUSH_20]);
        bytes.extend_from_slice(pubkey_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self(bytes)
    }

    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(23);
        bytes.extend_from_slice(&[OP_HASH160, PUSH_20]);
        bytes.extend_from_slice(script_hash);
        bytes.push(OP_EQUAL);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_pay_to_pubkey_hash(&self) -> bool {
        let b = &self.0;
        b.len() == 25 && b[0] == OP_DUP && b[1] == OP_HASH160 && b[2] == PUSH_20 && b[23] == OP_EQUALVERIFY && b[24] == OP_CHECKSIG
    }

    pub fn is_pay_to_script_hash(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == PUSH_20 && b[22] == OP_EQUAL
    }

    pub fn is_normal_payment_script(&self) -> bool {
        self.is_pay_to_pubkey_hash() || self.is_pay_to_script_hash()
    }

    /// The 20-byte key hash of a pay-to-pubkey-hash script.
    pub fn pubkey_hash(&self) -> Option<[u8; 20]> {
        if !self.is_pay_to_pubkey_hash() {
            return None;
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[3..23]);
        Some(out)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(previous_output: OutPoint) -> Self {
        Self { previous_output, script_sig: Vec::new(), sequence: u32::MAX }
    }

    /// Two inputs spend the same coin under the same sequence.
    pub fn same_spend(&self, other: &TxIn) -> bool {
        self.previous_output == other.previous_output && self.sequence == other.sequence
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(value: Amount, script_pubkey: Script) -> Self {
        Self { value, script_pubkey }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self { version: 1, inputs: Vec::new(), outputs: Vec::new(), lock_time: 0 }
    }
}

impl Transaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self { version: 1, inputs, outputs, lock_time: 0 }
    }

    pub fn is_null(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    pub fn txid(&self) -> Result<TxId, MixError> {
        let bytes = bincode::serialize(self)?;
        Ok(TxId::new(*blake3::hash(&bytes).as_bytes()))
    }

    pub fn total_output_value(&self) -> Amount {
        self.outputs.iter().fold(0u64, |acc, out| acc.saturating_add(out.value))
    }

    /// Digest every input signs: the transaction with all unlocking data stripped, bound to the input index.
    pub fn signature_hash(&self, input_index: usize) -> Result<Hash32, MixError> {
        if input_index >= self.inputs.len() {
            return Err(MixError::Message(format!("input index {} out of range ({})", input_index, self.inputs.len())));
        }
        let mut stripped = self.clone();
        for input in &mut stripped.inputs {
            input.script_sig.clear();
        }
        let bytes = bincode::serialize(&stripped)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mixpool/sighash/v1");
        hasher.update(&bytes);
        hasher.update(&(input_index as u64).to_le_bytes());
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn find_input(&self, spend: &TxIn) -> Option<usize> {
        self.inputs.iter().position(|input| input.same_spend(spend))
    }
}
