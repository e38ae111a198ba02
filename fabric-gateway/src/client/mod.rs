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

//! The transport seam between the library and the Gateway service.
//!
//! [`GatewayService`] is the opaque stub over the gateway RPCs. Production
//! use goes through the tonic-backed implementation in [`grpc`]; tests and
//! embedders may supply their own.
//!
//! Every call is bounded by the per-stage deadlines configured at connect
//! time. A caller that wants a tighter bound, or cancellation, wraps the
//! returned future itself; dropping the future aborts the call.

pub(crate) mod grpc;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tonic::Status;

use crate::protos::common::Block;
use crate::protos::gateway::{
    ChaincodeEventsResponse, CommitStatusResponse, EndorseRequest, EndorseResponse,
    EvaluateRequest, EvaluateResponse, SignedBlockEventsRequest, SignedChaincodeEventsRequest,
    SignedCommitStatusRequest, SubmitRequest, SubmitResponse,
};

const DEFAULT_EVALUATE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ENDORSE_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_COMMIT_STATUS_TIMEOUT: Duration = Duration::from_secs(60);

/// A server stream of decoded response messages.
pub type ResponseStream<T> = BoxStream<'static, Result<T, Status>>;

/// The gateway RPCs, as consumed by this library.
///
/// Implementations perform no signing and no timeout handling; both are the
/// caller's concern.
#[async_trait]
pub trait GatewayService: Send + Sync {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, Status>;

    async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, Status>;

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Status>;

    async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
    ) -> Result<CommitStatusResponse, Status>;

    async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<ResponseStream<ChaincodeEventsResponse>, Status>;

    async fn block_events(
        &self,
        request: SignedBlockEventsRequest,
    ) -> Result<ResponseStream<Block>, Status>;
}

/// Per-stage deadlines applied when the caller does not bound a call itself.
///
/// A zero deadline for a unary stage fails immediately with
/// `DEADLINE_EXCEEDED`, before the stub is invoked. For the event-stream
/// stages a zero value means no deadline at all; an open-ended stream is the
/// normal case there.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timeouts {
    pub evaluate: Duration,
    pub endorse: Duration,
    pub submit: Duration,
    pub commit_status: Duration,
    pub chaincode_events: Duration,
    pub block_events: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            evaluate: DEFAULT_EVALUATE_TIMEOUT,
            endorse: DEFAULT_ENDORSE_TIMEOUT,
            submit: DEFAULT_SUBMIT_TIMEOUT,
            commit_status: DEFAULT_COMMIT_STATUS_TIMEOUT,
            chaincode_events: Duration::ZERO,
            block_events: Duration::ZERO,
        }
    }
}

/// Adapter over the stub that applies the configured per-stage deadlines.
pub(crate) struct GatewayClient {
    service: Box<dyn GatewayService>,
    timeouts: Timeouts,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    pub fn new(service: Box<dyn GatewayService>, timeouts: Timeouts) -> Self {
        GatewayClient { service, timeouts }
    }

    pub async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, Status> {
        deadline(self.timeouts.evaluate, self.service.evaluate(request)).await
    }

    pub async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, Status> {
        deadline(self.timeouts.endorse, self.service.endorse(request)).await
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Status> {
        deadline(self.timeouts.submit, self.service.submit(request)).await
    }

    pub async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
    ) -> Result<CommitStatusResponse, Status> {
        deadline(
            self.timeouts.commit_status,
            self.service.commit_status(request),
        )
        .await
    }

    pub async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<ResponseStream<ChaincodeEventsResponse>, Status> {
        open_ended(
            self.timeouts.chaincode_events,
            self.service.chaincode_events(request),
        )
        .await
    }

    pub async fn block_events(
        &self,
        request: SignedBlockEventsRequest,
    ) -> Result<ResponseStream<Block>, Status> {
        open_ended(self.timeouts.block_events, self.service.block_events(request)).await
    }
}

async fn deadline<T, F>(timeout: Duration, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    if timeout.is_zero() {
        return Err(Status::deadline_exceeded("deadline expired before call"));
    }
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(Status::deadline_exceeded(format!(
            "call exceeded deadline of {:?}",
            timeout
        ))),
    }
}

async fn open_ended<T, F>(timeout: Duration, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    if timeout.is_zero() {
        call.await
    } else {
        deadline(timeout, call).await
    }
}
