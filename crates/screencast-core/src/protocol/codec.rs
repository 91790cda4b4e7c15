//! JSON codec for encoding and decoding envelopes.
//!
//! Wire format: one WebSocket text frame per envelope, holding a JSON object
//! whose `"type"` field names the kind.
//!
//! Decoding happens in two steps.  The text is first parsed into a generic
//! JSON value so the `"type"` field can be read on its own; only kinds this
//! crate knows are then decoded into an [`Envelope`].  That split is what lets
//! an unknown kind pass through as [`Decoded::Unrecognized`] instead of an
//! error, so a newer peer can add message kinds without breaking older ones.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::envelope::{Envelope, EnvelopeKind};

/// Errors that can occur while decoding an inbound text frame.
///
/// None of these are fatal to the connection: the caller drops the offending
/// frame, logs it, and keeps reading.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// The frame is valid JSON but not an object.
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// The object has no `"type"` field.
    #[error("envelope has no \"type\" field")]
    MissingKind,

    /// The `"type"` field is present but is not a string.
    #[error("envelope \"type\" field is not a string")]
    InvalidKind,

    /// The kind is known but its fields do not match that kind's shape.
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload {
        kind: EnvelopeKind,
        reason: String,
    },
}

/// Errors that can occur while encoding an outbound envelope.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    /// The envelope could not be serialized to JSON.
    #[error("failed to serialize envelope: {0}")]
    Serialize(String),
}

/// Outcome of a successful decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A message of a known kind.
    Envelope(Envelope),
    /// A well-formed message whose kind this version does not know.
    ///
    /// Callers accept it without error and do not dispatch it.
    Unrecognized {
        /// The unrecognized `"type"` value.
        kind: String,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`Envelope`] into the text of one WebSocket frame.
///
/// # Errors
///
/// Returns [`EncodeError`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use screencast_core::protocol::{decode, encode, Decoded, Envelope};
///
/// let msg = Envelope::chat("hello");
/// let text = encode(&msg).unwrap();
/// assert_eq!(decode(&text).unwrap(), Decoded::Envelope(msg));
/// ```
pub fn encode(envelope: &Envelope) -> Result<String, EncodeError> {
    serde_json::to_string(envelope).map_err(|e| EncodeError::Serialize(e.to_string()))
}

/// Decodes the text of one inbound WebSocket frame.
///
/// # Errors
///
/// Returns [`DecodeError`] if the text is not a JSON object with a string
/// `"type"` field, or if a known kind is missing required fields.
///
/// # Examples
///
/// ```rust
/// use screencast_core::protocol::{decode, Decoded};
///
/// let decoded = decode(r#"{"type":"unknown_future_type"}"#).unwrap();
/// assert!(matches!(decoded, Decoded::Unrecognized { .. }));
/// ```
pub fn decode(raw: &str) -> Result<Decoded, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind_name = match object.get("type") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(DecodeError::InvalidKind),
        None => return Err(DecodeError::MissingKind),
    };

    let Some(kind) = EnvelopeKind::from_wire(kind_name) else {
        return Ok(Decoded::Unrecognized {
            kind: kind_name.clone(),
        });
    };

    serde_json::from_value::<Envelope>(value)
        .map(Decoded::Envelope)
        .map_err(|e| DecodeError::InvalidPayload {
            kind,
            reason: e.to_string(),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
