use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Identity of a submitted record: its position in the input sequence.
pub type RecordId = usize;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to encode record: {reason}")]
pub struct EncodingError {
    reason: String,
}

impl EncodingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EncodingError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Serializes one record into a transport-ready payload.
///
/// Implementations must be pure: no I/O, and identical input must produce
/// byte-identical output. Retried batches are resent as-is, so a
/// non-deterministic encoder would break the at-least-once contract.
pub trait Encoder<T> {
    fn encode(&self, record: &T) -> Result<Bytes, EncodingError>;
}

/// Encodes any `Serialize` record as a compact JSON document.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEncoder;

impl<T: Serialize> Encoder<T> for JsonEncoder {
    fn encode(&self, record: &T) -> Result<Bytes, EncodingError> {
        serde_json::to_vec(record)
            .map(Bytes::from)
            .map_err(Into::into)
    }
}

/// An encoded record, paired with the identity needed to correlate its
/// outcome after batching.
#[derive(Clone, Debug)]
pub struct EncodedPayload {
    pub id: RecordId,
    pub bytes: Bytes,
}

impl EncodedPayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
