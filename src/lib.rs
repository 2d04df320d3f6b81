//! A reliable, at-least-once batching event publisher.
//!
//! Records are encoded into byte payloads, packed into size and count
//! bounded batches, shipped through an opaque [`Transport`], retried on
//! transient failures with capped exponential backoff, and reported with
//! exactly one [`Outcome`] per submitted record, in submission order.

pub mod batch;
pub mod config;
pub mod encoding;
pub mod publisher;
pub mod retries;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;

pub use batch::{BatchConfig, BatchError};
pub use cancel;
pub use config::{PublisherConfig, RequestConfig};
pub use encoding::{Encoder, EncodingError, JsonEncoder, RecordId};
pub use publisher::{FailReason, Outcome, Publisher, Status};
pub use transport::{ErrorClass, Transport, TransportError};

#[macro_use]
extern crate tracing;
