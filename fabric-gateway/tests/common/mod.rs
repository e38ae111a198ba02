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

//! Shared scenario-test fixtures: a scripted gateway service that captures
//! requests and plays queued responses, plus helpers for building wire
//! messages a real gateway would return.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fabric_gateway::client::{GatewayService, ResponseStream};
use fabric_gateway::identity::{SigningError, X509Identity};
use fabric_gateway::protos;
use fabric_gateway::protos::common::{Block, Envelope, Header, Payload};
use fabric_gateway::protos::gateway::*;
use fabric_gateway::protos::peer::{
    ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ProposalResponsePayload,
    Response, TransactionAction, TxValidationCode,
};
use fabric_gateway::Gateway;
use futures::stream;
use tonic::{Code, Status};

pub const TEST_CHANNEL: &str = "network";
pub const TEST_CHAINCODE: &str = "chaincode";
pub const TEST_CERTIFICATE: &[u8] =
    b"-----BEGIN CERTIFICATE-----\nMIIBfakecert\n-----END CERTIFICATE-----\n";

pub fn test_identity() -> X509Identity {
    X509Identity::new("Org1MSP", TEST_CERTIFICATE.to_vec())
}

pub fn test_signer(digest: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut signature = b"SIGNED:".to_vec();
    signature.extend_from_slice(digest);
    Ok(signature)
}

/// A gateway connected to the mock service with the standard test identity
/// and signer.
pub fn test_gateway(mock: &MockGateway) -> Gateway {
    Gateway::builder()
        .with_identity(test_identity())
        .with_signer(test_signer)
        .with_service(mock.clone())
        .connect()
        .expect("connect")
}

#[derive(Default)]
struct MockState {
    latency: Option<Duration>,
    evaluate_responses: Mutex<VecDeque<Result<EvaluateResponse, Status>>>,
    endorse_responses: Mutex<VecDeque<Result<EndorseResponse, Status>>>,
    submit_responses: Mutex<VecDeque<Result<SubmitResponse, Status>>>,
    commit_status_responses: Mutex<VecDeque<Result<CommitStatusResponse, Status>>>,
    chaincode_events_open_error: Mutex<Option<Status>>,
    chaincode_events_responses: Mutex<Vec<Result<ChaincodeEventsResponse, Status>>>,
    block_events_open_error: Mutex<Option<Status>>,
    block_events_responses: Mutex<Vec<Result<Block, Status>>>,
    evaluate_requests: Mutex<Vec<EvaluateRequest>>,
    endorse_requests: Mutex<Vec<EndorseRequest>>,
    submit_requests: Mutex<Vec<SubmitRequest>>,
    commit_status_requests: Mutex<Vec<SignedCommitStatusRequest>>,
    chaincode_events_requests: Mutex<Vec<SignedChaincodeEventsRequest>>,
    block_events_requests: Mutex<Vec<SignedBlockEventsRequest>>,
}

/// Scripted [`GatewayService`]: responses are queued ahead of the test and
/// every request is captured for inspection. An RPC with nothing queued
/// fails with `UNIMPLEMENTED`.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway::default()
    }

    /// Delays every unary response, for deadline tests.
    pub fn with_latency(latency: Duration) -> Self {
        MockGateway {
            state: Arc::new(MockState {
                latency: Some(latency),
                ..Default::default()
            }),
        }
    }

    pub fn queue_evaluate(&self, response: Result<EvaluateResponse, Status>) {
        self.state
            .evaluate_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn queue_endorse(&self, response: Result<EndorseResponse, Status>) {
        self.state
            .endorse_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn queue_submit(&self, response: Result<SubmitResponse, Status>) {
        self.state
            .submit_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn queue_commit_status(&self, response: Result<CommitStatusResponse, Status>) {
        self.state
            .commit_status_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn fail_chaincode_events_open(&self, status: Status) {
        *self.state.chaincode_events_open_error.lock().unwrap() = Some(status);
    }

    pub fn queue_chaincode_events(&self, response: Result<ChaincodeEventsResponse, Status>) {
        self.state
            .chaincode_events_responses
            .lock()
            .unwrap()
            .push(response);
    }

    pub fn fail_block_events_open(&self, status: Status) {
        *self.state.block_events_open_error.lock().unwrap() = Some(status);
    }

    pub fn queue_block_events(&self, response: Result<Block, Status>) {
        self.state.block_events_responses.lock().unwrap().push(response);
    }

    pub fn evaluate_requests(&self) -> Vec<EvaluateRequest> {
        self.state.evaluate_requests.lock().unwrap().clone()
    }

    pub fn endorse_requests(&self) -> Vec<EndorseRequest> {
        self.state.endorse_requests.lock().unwrap().clone()
    }

    pub fn submit_requests(&self) -> Vec<SubmitRequest> {
        self.state.submit_requests.lock().unwrap().clone()
    }

    pub fn commit_status_requests(&self) -> Vec<SignedCommitStatusRequest> {
        self.state.commit_status_requests.lock().unwrap().clone()
    }

    pub fn chaincode_events_requests(&self) -> Vec<SignedChaincodeEventsRequest> {
        self.state.chaincode_events_requests.lock().unwrap().clone()
    }

    pub fn block_events_requests(&self) -> Vec<SignedBlockEventsRequest> {
        self.state.block_events_requests.lock().unwrap().clone()
    }

    async fn apply_latency(&self) {
        if let Some(latency) = self.state.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn next_response<T>(queue: &Mutex<VecDeque<Result<T, Status>>>, rpc: &str) -> Result<T, Status> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(Status::unimplemented(format!("no {} response queued", rpc))))
}

#[async_trait]
impl GatewayService for MockGateway {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, Status> {
        self.apply_latency().await;
        self.state.evaluate_requests.lock().unwrap().push(request);
        next_response(&self.state.evaluate_responses, "evaluate")
    }

    async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, Status> {
        self.apply_latency().await;
        self.state.endorse_requests.lock().unwrap().push(request);
        next_response(&self.state.endorse_responses, "endorse")
    }

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Status> {
        self.apply_latency().await;
        self.state.submit_requests.lock().unwrap().push(request);
        next_response(&self.state.submit_responses, "submit")
    }

    async fn commit_status(
        &self,
        request: SignedCommitStatusRequest,
    ) -> Result<CommitStatusResponse, Status> {
        self.apply_latency().await;
        self.state
            .commit_status_requests
            .lock()
            .unwrap()
            .push(request);
        next_response(&self.state.commit_status_responses, "commit status")
    }

    async fn chaincode_events(
        &self,
        request: SignedChaincodeEventsRequest,
    ) -> Result<ResponseStream<ChaincodeEventsResponse>, Status> {
        self.state
            .chaincode_events_requests
            .lock()
            .unwrap()
            .push(request);
        if let Some(status) = self.state.chaincode_events_open_error.lock().unwrap().take() {
            return Err(status);
        }
        let responses: Vec<_> = self
            .state
            .chaincode_events_responses
            .lock()
            .unwrap()
            .drain(..)
            .collect();
        Ok(Box::pin(stream::iter(responses)))
    }

    async fn block_events(
        &self,
        request: SignedBlockEventsRequest,
    ) -> Result<ResponseStream<Block>, Status> {
        self.state.block_events_requests.lock().unwrap().push(request);
        if let Some(status) = self.state.block_events_open_error.lock().unwrap().take() {
            return Err(status);
        }
        let responses: Vec<_> = self
            .state
            .block_events_responses
            .lock()
            .unwrap()
            .drain(..)
            .collect();
        Ok(Box::pin(stream::iter(responses)))
    }
}

/// An endorse response whose envelope carries the given transaction result,
/// nested the way a real gateway prepares it.
pub fn endorse_response(result: &str, channel_name: &str) -> EndorseResponse {
    endorse_response_for_transaction(result, channel_name, "")
}

/// As [`endorse_response`], with the transaction ID written into the
/// envelope's channel header the way the gateway echoes it back.
pub fn endorse_response_for_transaction(
    result: &str,
    channel_name: &str,
    transaction_id: &str,
) -> EndorseResponse {
    let chaincode_action = ChaincodeAction {
        response: Some(Response {
            status: 200,
            message: String::new(),
            payload: result.as_bytes().to_vec(),
        }),
        ..Default::default()
    };

    let response_payload = ProposalResponsePayload {
        proposal_hash: Vec::new(),
        extension: protos::marshal(&chaincode_action),
    };

    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: Vec::new(),
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: protos::marshal(&response_payload),
            endorsements: Vec::new(),
        }),
    };

    let transaction = protos::peer::Transaction {
        actions: vec![TransactionAction {
            header: Vec::new(),
            payload: protos::marshal(&action_payload),
        }],
    };

    let channel_header = protos::common::ChannelHeader {
        channel_id: channel_name.to_string(),
        tx_id: transaction_id.to_string(),
        ..Default::default()
    };

    let payload = Payload {
        header: Some(Header {
            channel_header: protos::marshal(&channel_header),
            signature_header: Vec::new(),
        }),
        data: protos::marshal(&transaction),
    };

    EndorseResponse {
        prepared_transaction: Some(Envelope {
            payload: protos::marshal(&payload),
            signature: Vec::new(),
        }),
    }
}

pub fn commit_status_response(code: TxValidationCode, block_number: u64) -> CommitStatusResponse {
    CommitStatusResponse {
        result: code as i32,
        block_number,
    }
}

/// A gRPC status carrying `gateway.ErrorDetail` entries in its detail
/// trailer, the way the gateway reports per-endorser failures.
pub fn status_with_error_details(
    code: Code,
    message: &str,
    details: Vec<ErrorDetail>,
) -> Status {
    let rpc_status = protos::rpc::Status {
        code: code as i32,
        message: message.to_string(),
        details: details
            .into_iter()
            .map(|detail| prost_types::Any {
                type_url: "type.googleapis.com/gateway.ErrorDetail".to_string(),
                value: protos::marshal(&detail),
            })
            .collect(),
    };

    Status::with_details(
        code,
        message,
        prost::bytes::Bytes::from(protos::marshal(&rpc_status)),
    )
}
