//! Envelope serialization.
//!
//! The server never hard-codes a format: it encodes and decodes through
//! something that implements [`Codec`]. [`JsonCodec`] is what browser
//! clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns envelopes into frame bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// `ProtocolError::Encode` when the value has no representation in
    /// this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// `ProtocolError::Decode` for anything that is not a complete value
    /// of type `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Whether encoded output is UTF-8 text and should travel in text
    /// frames rather than binary ones.
    fn is_textual(&self) -> bool {
        false
    }
}

/// JSON over `serde_json`, sent in text frames.
///
/// ```rust
/// use strikeball_protocol::{
///     ClientIntent, Codec, Envelope, JsonCodec, SessionId, SessionRequest,
/// };
///
/// let codec = JsonCodec;
/// let envelope = Envelope::inbound(ClientIntent::GetStatus(SessionRequest {
///     session_id: SessionId::new("abc"),
///     reconnect_token: None,
/// }));
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<ClientIntent> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn is_textual(&self) -> bool {
        true
    }
}
