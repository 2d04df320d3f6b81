use cancel::Signal;
use futures::StreamExt;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::FuturesUnordered;
use tokio::time::{sleep, sleep_until, Instant};

use crate::batch::{Batch, BatchAccumulator, BatchError, BatchSettings, PushResult};
use crate::config::{PublisherConfig, RequestSettings};
use crate::encoding::{EncodedPayload, Encoder, RecordId};
use crate::retries::RetryAction;
use crate::transport::{Transport, TransportError};

/// Terminal status recorded for one input record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// The batch containing this record was delivered.
    Sent,
    Failed(FailReason),
}

/// Why a record was not delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailReason {
    /// The record could not be serialized.
    Encoding(String),
    /// The encoded payload alone exceeds the batch byte limit.
    TooLarge { size: usize, limit: usize },
    /// The transport rejected the batch with a permanent error.
    Permanent(String),
    /// Transient failures outlasted the attempt budget.
    Exhausted(String),
    /// Publishing was cancelled before this record's batch was sent.
    Cancelled,
}

/// The terminal report for one submitted record. Exactly one outcome is
/// produced per record, never a duplicate and never a silent drop, even
/// across retries and partial batch failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub id: RecordId,
    pub status: Status,
    /// Send attempts made for the record's batch; zero when the record
    /// never reached a send.
    pub attempts: usize,
}

/// A finished batch send, waiting to be folded into the outcome table.
struct BatchDone {
    ids: Vec<RecordId>,
    status: Status,
    attempts: usize,
}

/// Drives records through encode, accumulate and send, applying the retry
/// policy per batch and reporting one [`Outcome`] per record.
///
/// One publisher owns its transport for its whole lifetime; call
/// [`close`][Publisher::close] to release it. Publishers share nothing, so
/// independent inputs may run on independent publishers concurrently.
pub struct Publisher<T, E> {
    transport: T,
    encoder: E,
    batch: BatchSettings,
    request: RequestSettings,
    cancel: Signal,
}

impl<T, E> Publisher<T, E>
where
    T: Transport,
{
    pub fn new(config: &PublisherConfig, encoder: E, transport: T) -> Result<Self, BatchError> {
        Ok(Self {
            transport,
            encoder,
            batch: config.batch.validate()?,
            request: config.request.settings(),
            cancel: Signal::noop(),
        })
    }

    /// Attach a caller-supplied cancellation signal. It is checked before
    /// every new batch send and during retry waits; an attempt already on
    /// the wire always runs to its own completion.
    pub fn with_cancel(mut self, signal: Signal) -> Self {
        self.cancel = signal;
        self
    }

    /// Shut down the underlying transport.
    pub async fn close(self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}

impl<T, E> Publisher<T, E>
where
    T: Transport,
    E: Sync,
{
    /// Publish every record of the input, returning one outcome per record
    /// in submission order.
    ///
    /// No error escapes: per-record failures become `Failed` outcomes and
    /// per-batch transport errors are retried per the configured policy
    /// before they do.
    pub async fn publish<R>(&self, records: impl IntoIterator<Item = R>) -> Vec<Outcome>
    where
        E: Encoder<R>,
    {
        let mut outcomes: Vec<Option<Outcome>> = Vec::new();
        let mut accumulator = BatchAccumulator::new(self.batch);
        let mut inflight: FuturesUnordered<BoxFuture<'_, BatchDone>> = FuturesUnordered::new();
        let mut last_dispatch: Option<Instant> = None;

        for (id, record) in records.into_iter().enumerate() {
            outcomes.push(None);

            if self.cancel.is_cancelled() {
                outcomes[id] = Some(Outcome {
                    id,
                    status: Status::Failed(FailReason::Cancelled),
                    attempts: 0,
                });
                continue;
            }

            let bytes = match self.encoder.encode(&record) {
                Ok(bytes) => bytes,
                Err(err) => {
                    debug!(message = "Failed to encode record; dropping it", %err, id);

                    outcomes[id] = Some(Outcome {
                        id,
                        status: Status::Failed(FailReason::Encoding(err.to_string())),
                        attempts: 0,
                    });
                    continue;
                }
            };

            match accumulator.push(EncodedPayload { id, bytes }) {
                PushResult::Accepted(full) => {
                    if full {
                        self.dispatch(
                            accumulator.flush(),
                            &mut inflight,
                            &mut outcomes,
                            &mut last_dispatch,
                        )
                        .await;
                    }
                }
                PushResult::Oversized(payload) => {
                    error!(
                        message = "Encoded payload larger than batch max_bytes; dropping it",
                        length = payload.len(),
                        max_bytes = self.batch.max_bytes,
                        id = payload.id,
                    );

                    outcomes[payload.id] = Some(Outcome {
                        id: payload.id,
                        status: Status::Failed(FailReason::TooLarge {
                            size: payload.len(),
                            limit: self.batch.max_bytes,
                        }),
                        attempts: 0,
                    });
                }
                PushResult::Full(payload) => {
                    self.dispatch(
                        accumulator.flush(),
                        &mut inflight,
                        &mut outcomes,
                        &mut last_dispatch,
                    )
                    .await;

                    match accumulator.push(payload) {
                        PushResult::Accepted(full) => {
                            if full {
                                self.dispatch(
                                    accumulator.flush(),
                                    &mut inflight,
                                    &mut outcomes,
                                    &mut last_dispatch,
                                )
                                .await;
                            }
                        }
                        // checked against max_bytes above, and a drained
                        // accumulator has room for at least one payload
                        PushResult::Full(_) | PushResult::Oversized(_) => {
                            unreachable!("drained accumulator must accept an in-limit payload")
                        }
                    }
                }
            }
        }

        if !accumulator.is_empty() {
            self.dispatch(
                accumulator.flush(),
                &mut inflight,
                &mut outcomes,
                &mut last_dispatch,
            )
            .await;
        }

        while let Some(done) = inflight.next().await {
            Self::complete(&mut outcomes, done);
        }

        outcomes
            .into_iter()
            .map(|outcome| outcome.expect("every submitted record yields exactly one outcome"))
            .collect()
    }

    /// Hand a flushed batch to the transport, keeping at most the
    /// configured number of sends in flight and pacing dispatches when a
    /// throttle gap is set.
    async fn dispatch<'a>(
        &'a self,
        batch: Batch,
        inflight: &mut FuturesUnordered<BoxFuture<'a, BatchDone>>,
        outcomes: &mut [Option<Outcome>],
        last_dispatch: &mut Option<Instant>,
    ) {
        while inflight.len() >= self.request.concurrency {
            if let Some(done) = inflight.next().await {
                Self::complete(outcomes, done);
            }
        }

        if self.cancel.is_cancelled() {
            Self::complete(
                outcomes,
                BatchDone {
                    ids: batch.ids().collect(),
                    status: Status::Failed(FailReason::Cancelled),
                    attempts: 0,
                },
            );
            return;
        }

        if let (Some(gap), Some(previous)) = (self.request.throttle, *last_dispatch) {
            let mut cancel = self.cancel.clone();

            tokio::select! {
                _ = sleep_until(previous + gap) => {}
                _ = cancel.cancelled() => {
                    Self::complete(
                        outcomes,
                        BatchDone {
                            ids: batch.ids().collect(),
                            status: Status::Failed(FailReason::Cancelled),
                            attempts: 0,
                        },
                    );
                    return;
                }
            }
        }
        *last_dispatch = Some(Instant::now());

        inflight.push(self.try_send(batch).boxed());
    }

    /// One batch's pass through the sending state machine: send, classify
    /// failures, back off and resend until delivered, permanently failed
    /// or out of attempts.
    async fn try_send(&self, batch: Batch) -> BatchDone {
        let ids: Vec<RecordId> = batch.ids().collect();
        let frames = batch.frames();
        let mut policy = self.request.retry_policy();
        let mut cancel = self.cancel.clone();
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match self.transport.send(&frames).await {
                Ok(()) => {
                    trace!(
                        message = "Batch sent",
                        size = frames.len(),
                        byte_size = batch.byte_size(),
                        attempts,
                    );

                    return BatchDone {
                        ids,
                        status: Status::Sent,
                        attempts,
                    };
                }
                Err(err) => err,
            };

            match policy.decide(&err) {
                RetryAction::Retry(delay) => {
                    warn!(message = "Retrying batch send", %err, delay = ?delay, attempts);

                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            return BatchDone {
                                ids,
                                status: Status::Failed(FailReason::Cancelled),
                                attempts,
                            };
                        }
                    }
                }
                RetryAction::DontRetry => {
                    error!(message = "Batch send failed; not retriable", %err, attempts);

                    return BatchDone {
                        ids,
                        status: Status::Failed(FailReason::Permanent(err.to_string())),
                        attempts,
                    };
                }
                RetryAction::Exhausted => {
                    error!(message = "Retries exhausted; dropping batch", %err, attempts);

                    return BatchDone {
                        ids,
                        status: Status::Failed(FailReason::Exhausted(err.to_string())),
                        attempts,
                    };
                }
            }
        }
    }

    fn complete(outcomes: &mut [Option<Outcome>], done: BatchDone) {
        for id in done.ids {
            debug_assert!(outcomes[id].is_none());

            outcomes[id] = Some(Outcome {
                id,
                status: done.status.clone(),
                attempts: done.attempts,
            });
        }
    }
}
