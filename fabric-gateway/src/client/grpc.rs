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

//! tonic-backed [`GatewayService`] over a client channel.
//!
//! Written in the shape tonic generates for a service client: a
//! [`tonic::client::Grpc`] wrapper dispatching on static method paths with a
//! prost codec. Method paths follow the published `gateway.Gateway` service.

use async_trait::async_trait;
use futures::StreamExt;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Request, Status};

use super::{GatewayService, ResponseStream};
use crate::protos::common::Block;
use crate::protos::gateway::{
    ChaincodeEventsResponse, CommitStatusResponse, EndorseRequest, EndorseResponse,
    EvaluateRequest, EvaluateResponse, SignedBlockEventsRequest, SignedChaincodeEventsRequest,
    SignedCommitStatusRequest, SubmitRequest, SubmitResponse,
};

#[derive(Clone)]
pub(crate) struct GrpcGateway {
    inner: Grpc<Channel>,
}

impl GrpcGateway {
    pub fn new(channel: Channel) -> Self {
        GrpcGateway {
            inner: Grpc::new(channel),
        }
    }

    async fn ready(&self) -> Result<Grpc<Channel>, Status> {
        let mut grpc = self.inner.clone();
        grpc.ready().await.map_err(|err| {
            Status::unknown(format!("gateway service was not ready: {}", err))
        })?;
        Ok(grpc)
    }
}

#[async_trait]
impl GatewayService for GrpcGateway {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/Evaluate");
        grpc.unary(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner())
    }

    async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/Endorse");
        grpc.unary(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner())
    }

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/Submit");
        grpc.unary(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner())
    }

    async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
    ) -> Result<CommitStatusResponse, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/CommitStatus");
        grpc.unary(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner())
    }

    async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<ResponseStream<ChaincodeEventsResponse>, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/ChaincodeEvents");
        grpc.server_streaming(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner().boxed())
    }

    async fn block_events(
        &self,
        request: SignedBlockEventsRequest,
    ) -> Result<ResponseStream<Block>, Status> {
        let mut grpc = self.ready().await?;
        let path = PathAndQuery::from_static("/gateway.Gateway/BlockEvents");
        grpc.server_streaming(Request::new(request), path, ProstCodec::default())
            .await
            .map(|response| response.into_inner().boxed())
    }
}
