use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Classification of a transport failure; drives the retry decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to succeed if resent: timeout, throttling, the broker's
    /// 5xx-equivalent.
    Transient,
    /// Resending cannot help: rejected payload, authentication failure.
    Permanent,
}

/// A transport failure, classified by the concrete transport itself.
///
/// The classification is explicit rather than inferred here: the broker
/// client knows which of its errors are throttling signals and which are
/// rejections, so it picks the variant when constructing the error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transient transport failure: {0}")]
    Transient(String),

    #[error("permanent transport failure: {0}")]
    Permanent(String),
}

impl TransportError {
    pub const fn class(&self) -> ErrorClass {
        match self {
            TransportError::Transient(_) => ErrorClass::Transient,
            TransportError::Permanent(_) => ErrorClass::Permanent,
        }
    }
}

/// The external send capability; any broker client satisfying it is
/// interchangeable.
///
/// A batch send succeeds or fails as a whole per attempt. Transports with
/// partial-delivery semantics must surface partial results as an error of
/// their choosing; this crate never splits a batch across attempts.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &[Bytes]) -> Result<(), TransportError>;

    /// Release the underlying connection or session. Called once by
    /// [`Publisher::close`][crate::Publisher::close].
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, batch: &[Bytes]) -> Result<(), TransportError> {
        (**self).send(batch).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
