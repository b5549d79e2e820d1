use crate::engine::errors::CodecError;
use crate::engine::types::ScalarValue;

/// Self-describing row payload stored under the composite key.
pub fn encode_row(row: &[ScalarValue]) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(row)?)
}

pub fn decode_row(bytes: &[u8]) -> Result<Vec<ScalarValue>, CodecError> {
    Ok(bincode::deserialize(bytes)?)
}
