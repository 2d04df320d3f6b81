use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{EncodedPayload, RecordId};

// Sensible defaults for brokers that cap a single submission around the
// low megabytes; both limits are overridable per publisher.
pub const MAX_BYTES_DEFAULT: usize = 1_000_000;
pub const MAX_EVENTS_DEFAULT: usize = 500;

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
    #[error("`max_bytes` must be greater than zero")]
    InvalidMaxBytes,
    #[error("`max_events` must be greater than zero")]
    InvalidMaxEvents,
}

/// Configures how encoded payloads are grouped before a send.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// The maximum size of a batch, before it is flushed.
    #[serde(default, with = "humanize::bytes::serde_option")]
    pub max_bytes: Option<usize>,

    /// The maximum number of payloads in a batch, before it is flushed.
    #[serde(default)]
    pub max_events: Option<usize>,
}

impl BatchConfig {
    pub fn validate(self) -> Result<BatchSettings, BatchError> {
        match (self.max_bytes, self.max_events) {
            (Some(0), _) => Err(BatchError::InvalidMaxBytes),
            (_, Some(0)) => Err(BatchError::InvalidMaxEvents),
            (max_bytes, max_events) => Ok(BatchSettings {
                max_bytes: max_bytes.unwrap_or(MAX_BYTES_DEFAULT),
                max_events: max_events.unwrap_or(MAX_EVENTS_DEFAULT),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BatchSettings {
    pub max_bytes: usize,
    pub max_events: usize,
}

/// Result of offering a payload to the accumulator.
#[must_use]
#[derive(Debug)]
pub enum PushResult {
    /// Payload stored, with an indicator if the batch is now full.
    Accepted(bool),
    /// Appending would overflow a limit. The current accumulation must be
    /// flushed before the payload is offered again; since push takes
    /// ownership, it is handed back here.
    Full(EncodedPayload),
    /// The payload alone exceeds `max_bytes`; no batch can ever carry it.
    Oversized(EncodedPayload),
}

/// Collects encoded payloads into size and count bounded batches.
///
/// Invariant: a produced [`Batch`] never exceeds `max_bytes` total encoded
/// bytes nor `max_events` payloads.
#[derive(Debug)]
pub struct BatchAccumulator {
    settings: BatchSettings,
    items: Vec<EncodedPayload>,
    bytes: usize,
}

impl BatchAccumulator {
    pub const fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            items: Vec::new(),
            bytes: 0,
        }
    }

    pub fn push(&mut self, payload: EncodedPayload) -> PushResult {
        let size = payload.len();
        if size > self.settings.max_bytes {
            return PushResult::Oversized(payload);
        }

        if self.bytes + size > self.settings.max_bytes
            || self.items.len() == self.settings.max_events
        {
            return PushResult::Full(payload);
        }

        self.bytes += size;
        self.items.push(payload);

        let full =
            self.bytes == self.settings.max_bytes || self.items.len() == self.settings.max_events;
        PushResult::Accepted(full)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drains the current accumulation into an immutable batch and resets
    /// to empty.
    pub fn flush(&mut self) -> Batch {
        Batch {
            payloads: std::mem::take(&mut self.items),
            bytes: std::mem::take(&mut self.bytes),
        }
    }
}

/// An ordered, immutable group of payloads shipped in one transport call.
#[derive(Clone, Debug)]
pub struct Batch {
    payloads: Vec<EncodedPayload>,
    bytes: usize,
}

impl Batch {
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.payloads.iter().map(|payload| payload.id)
    }

    /// The payload frames for one send attempt. `Bytes` clones are cheap,
    /// so a retried batch resends the identical frames.
    pub fn frames(&self) -> Vec<Bytes> {
        self.payloads
            .iter()
            .map(|payload| payload.bytes.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub const fn byte_size(&self) -> usize {
        self.bytes
    }
}
