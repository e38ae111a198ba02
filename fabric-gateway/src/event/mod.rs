/*
 * Copyright 2021 Cargill Incorporated
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 * -----------------------------------------------------------------------------
 */

//! Server-streamed event delivery.
//!
//! An [`EventStream`] drains a gRPC server stream on a background task and
//! hands individual events to a single consumer through a bounded channel.
//! The bound is what provides backpressure: a consumer that stops reading
//! blocks the decoder, it never loses events. Closing the stream cancels the
//! underlying RPC and ends the sequence: a receive after close observes the
//! end of the sequence even when events were still buffered. Closing twice
//! is a no-op.

pub mod block;
pub mod chaincode;
pub mod checkpoint;

pub use block::{BlockEventsBuilder, BlockEventsRequest};
pub use chaincode::{ChaincodeEvent, ChaincodeEventsBuilder, ChaincodeEventsRequest};
pub use checkpoint::{Checkpoint, InMemoryCheckpointer};

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

const CHANNEL_CAPACITY: usize = 16;

/// A finite-on-close sequence of events read from the gateway.
///
/// Dropping the stream closes it.
pub struct EventStream<T> {
    receiver: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> EventStream<T> {
    /// Spawns the decoder task draining `source`, fanning each response out
    /// into zero or more events.
    pub(crate) fn spawn<S, R, F>(source: S, mut decode: F) -> Self
    where
        S: Stream<Item = Result<R, Status>> + Send + Unpin + 'static,
        R: Send + 'static,
        F: FnMut(R) -> Vec<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut source = source;
            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => break,
                    next = source.next() => next,
                };
                match next {
                    Some(Ok(response)) => {
                        for event in decode(response) {
                            tokio::select! {
                                _ = token.cancelled() => return,
                                sent = sender.send(event) => {
                                    if sent.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    Some(Err(status)) => {
                        debug!("event stream ended by server: {}", status);
                        break;
                    }
                    None => break,
                }
            }
            // Dropping the source here tears down the RPC; dropping the
            // sender is the end-of-sequence signal to the consumer.
        });

        EventStream { receiver, cancel }
    }

    /// The next event, or `None` once the stream has ended or been closed.
    /// Events still buffered when the stream is closed are not delivered.
    pub async fn next(&mut self) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.receiver.recv() => event,
        }
    }

    /// Closes the stream: the RPC is cancelled and the sequence ends.
    /// Closing an already-closed stream has no effect.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
