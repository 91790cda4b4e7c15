//! Protocol module containing the envelope types and the JSON codec.

pub mod codec;
pub mod envelope;
pub mod sequence;

pub use codec::{decode, encode, DecodeError, Decoded, EncodeError};
pub use envelope::{EncodedBytes, Envelope, EnvelopeKind, PayloadError};
pub use sequence::SequenceCounter;
