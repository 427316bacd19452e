use crate::foundation::{MixError, Result};
use crate::infrastructure::transport::messages::MessageEnvelope;
use bincode::Options;

const WIRE_PROTOCOL_VERSION_V1: u16 = 1;

/// Upper bound on a decoded envelope.
pub const MAX_ENVELOPE_BYTES: u64 = 4 * 1024 * 1024;

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding().with_limit(MAX_ENVELOPE_BYTES)
}

pub fn encode_envelope(envelope: &MessageEnvelope) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&WIRE_PROTOCOL_VERSION_V1.to_le_bytes());
    let bytes = wire_options().serialize(envelope).map_err(|err| crate::serde_err!("bincode", err))?;
    out.extend_from_slice(&bytes);
    Ok(out)
}

pub fn decode_envelope(bytes: &[u8]) -> Result<MessageEnvelope> {
    if bytes.len() < 2 {
        return Err(MixError::transport("decode_envelope", "message too short"));
    }
    let version = u16::from_le_bytes([bytes[0], bytes[1]]);
    if version != WIRE_PROTOCOL_VERSION_V1 {
        return Err(MixError::transport(
            "decode_envelope",
            format!("wire protocol version mismatch: expected {WIRE_PROTOCOL_VERSION_V1}, got {version}"),
        ));
    }
    wire_options().deserialize(&bytes[2..]).map_err(|err| crate::serde_err!("bincode", err))
}
