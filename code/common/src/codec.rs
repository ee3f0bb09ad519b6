use serde_json::Value;
use thiserror::Error;

use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not JSON at all. Such frames are dropped without a reply.
    #[error("unparsable frame: {0}")]
    Unparsable(serde_json::Error),
    /// Valid JSON that is not a known command with the expected fields.
    #[error("unknown or malformed command: {0}")]
    Invalid(serde_json::Error),
}

/// Serialize a [`ServerMessage`] into a JSON text frame.
pub fn encode_server_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Deserialize a [`ClientMessage`] from a text frame delivered by the transport.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Unparsable)?;
    serde_json::from_value(value).map_err(DecodeError::Invalid)
}
