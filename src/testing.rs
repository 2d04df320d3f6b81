use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::transport::{Transport, TransportError};

/// A scripted transport: every send pops the next result off the script,
/// falling back to success once the script is exhausted, and records the
/// batch it was handed.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    sent: Mutex<Vec<Vec<Bytes>>>,
    closed: AtomicBool,
}

impl MockTransport {
    /// A transport that accepts everything.
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn scripted(results: impl IntoIterator<Item = Result<(), TransportError>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Every batch handed to `send` so far, in call order.
    pub fn sent(&self) -> Vec<Vec<Bytes>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, batch: &[Bytes]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(batch.to_vec());

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
