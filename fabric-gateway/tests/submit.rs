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

//! Submit lifecycle scenarios against a scripted gateway service.

mod common;

use std::time::Duration;

use common::*;
use fabric_gateway::error::GatewayError;
use fabric_gateway::identity::SigningError;
use fabric_gateway::protos;
use fabric_gateway::protos::common::Header;
use fabric_gateway::protos::gateway::ErrorDetail;
use fabric_gateway::protos::peer::{
    ChaincodeInvocationSpec, ChaincodeProposalPayload, SignedProposal, TxValidationCode,
};
use fabric_gateway::{Contract, Gateway};
use tonic::{Code, Status};

fn queue_happy_path(mock: &MockGateway) {
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    mock.queue_commit_status(Ok(commit_status_response(TxValidationCode::Valid, 1)));
}

fn test_contract(gateway: &Gateway) -> Contract {
    gateway.network(TEST_CHANNEL).contract(TEST_CHAINCODE)
}

fn channel_header_of(proposal: &SignedProposal) -> protos::common::ChannelHeader {
    let proposal: protos::peer::Proposal = protos::unmarshal(&proposal.proposal_bytes).unwrap();
    let header: Header = protos::unmarshal(&proposal.header).unwrap();
    protos::unmarshal(&header.channel_header).unwrap()
}

fn invocation_spec_of(proposal: &SignedProposal) -> ChaincodeInvocationSpec {
    let proposal: protos::peer::Proposal = protos::unmarshal(&proposal.proposal_bytes).unwrap();
    let payload: ChaincodeProposalPayload = protos::unmarshal(&proposal.payload).unwrap();
    protos::unmarshal(&payload.input).unwrap()
}

#[tokio::test]
async fn submit_returns_result_for_committed_transaction() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    let result = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    assert_eq!(result, b"TRANSACTION_RESULT");
}

#[tokio::test]
async fn commit_reports_status_and_block_number() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    mock.queue_commit_status(Ok(commit_status_response(TxValidationCode::Valid, 1)));
    let gateway = test_gateway(&mock);

    let (result, commit) = test_contract(&gateway)
        .submit_async("TRANSACTION_NAME", &[])
        .await
        .unwrap();
    let status = commit.status().await.unwrap();

    assert_eq!(result, b"TRANSACTION_RESULT");
    assert!(status.successful);
    assert_eq!(status.code, TxValidationCode::Valid);
    assert_eq!(status.block_number, 1);
}

#[tokio::test]
async fn invalid_commit_raises_commit_error_from_submit_transaction() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    mock.queue_commit_status(Ok(commit_status_response(
        TxValidationCode::MvccReadConflict,
        1,
    )));
    let gateway = test_gateway(&mock);

    let err = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .expect_err("an invalid commit must fail the checked submit");

    match err {
        GatewayError::Commit(commit_err) => {
            assert_eq!(commit_err.code, TxValidationCode::MvccReadConflict);
            assert_eq!(commit_err.block_number, 1);
            assert!(!commit_err.transaction_id.is_empty());
        }
        other => panic!("expected CommitError, got {}", other),
    }
}

#[tokio::test]
async fn invalid_commit_is_a_normal_status_result() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    mock.queue_commit_status(Ok(commit_status_response(
        TxValidationCode::MvccReadConflict,
        1,
    )));
    let gateway = test_gateway(&mock);

    let (_, commit) = test_contract(&gateway)
        .submit_async("TRANSACTION_NAME", &[])
        .await
        .unwrap();
    let status = commit.status().await.unwrap();

    assert!(!status.successful);
    assert_eq!(status.code, TxValidationCode::MvccReadConflict);
}

#[tokio::test]
async fn endorse_failure_carries_status_and_details() {
    let detail = ErrorDetail {
        address: "peer0:7051".into(),
        msp_id: "Org1MSP".into(),
        message: "MVCC_READ_CONFLICT".into(),
    };
    let mock = MockGateway::new();
    mock.queue_endorse(Err(status_with_error_details(
        Code::Aborted,
        "ENDORSE_ERROR",
        vec![detail.clone(), detail.clone()],
    )));
    let gateway = test_gateway(&mock);

    let proposal = test_contract(&gateway)
        .new_proposal("TRANSACTION_NAME")
        .build()
        .unwrap();
    let err = proposal
        .endorse()
        .await
        .expect_err("endorse must surface the gateway failure");

    match err {
        GatewayError::Endorse(endorse_err) => {
            assert_eq!(endorse_err.transaction_id, proposal.transaction_id());
            assert_eq!(endorse_err.status.code(), Code::Aborted);
            assert_eq!(endorse_err.details.len(), 2);
            assert_eq!(endorse_err.details[0], detail);
        }
        other => panic!("expected EndorseError, got {}", other),
    }
}

#[tokio::test]
async fn submit_failure_carries_status_and_transaction_id() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Err(Status::aborted("SUBMIT_ERROR")));
    let gateway = test_gateway(&mock);

    let proposal = test_contract(&gateway)
        .new_proposal("TRANSACTION_NAME")
        .build()
        .unwrap();
    let transaction = proposal.endorse().await.unwrap();
    let err = transaction
        .submit()
        .await
        .expect_err("submit must surface the gateway failure");

    match err {
        GatewayError::Submit(submit_err) => {
            assert_eq!(submit_err.transaction_id, proposal.transaction_id());
            assert_eq!(submit_err.status.code(), Code::Aborted);
        }
        other => panic!("expected SubmitError, got {}", other),
    }
}

#[tokio::test]
async fn commit_status_failure_carries_status_and_transaction_id() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    mock.queue_commit_status(Err(Status::aborted("COMMIT_STATUS_ERROR")));
    let gateway = test_gateway(&mock);

    let proposal = test_contract(&gateway)
        .new_proposal("TRANSACTION_NAME")
        .build()
        .unwrap();
    let commit = proposal.endorse().await.unwrap().submit().await.unwrap();
    let err = commit
        .status()
        .await
        .expect_err("commit status must surface the gateway failure");

    match err {
        GatewayError::CommitStatus(status_err) => {
            assert_eq!(status_err.transaction_id, proposal.transaction_id());
            assert_eq!(status_err.status.code(), Code::Aborted);
        }
        other => panic!("expected CommitStatusError, got {}", other),
    }
}

#[tokio::test]
async fn endorse_request_carries_channel_chaincode_and_transaction_name() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    let requests = mock.endorse_requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.channel_id, TEST_CHANNEL);

    let proposal = request.proposed_transaction.as_ref().unwrap();
    let channel_header = channel_header_of(proposal);
    assert_eq!(channel_header.channel_id, TEST_CHANNEL);

    let spec = invocation_spec_of(proposal).chaincode_spec.unwrap();
    assert_eq!(spec.chaincode_id.unwrap().name, TEST_CHAINCODE);
    assert_eq!(spec.input.unwrap().args[0], b"TRANSACTION_NAME");
}

#[tokio::test]
async fn named_contract_qualifies_transaction_name() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    gateway
        .network(TEST_CHANNEL)
        .contract_with_name(TEST_CHAINCODE, "CONTRACT_NAME")
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    let requests = mock.endorse_requests();
    let proposal = requests[0].proposed_transaction.as_ref().unwrap();
    let spec = invocation_spec_of(proposal).chaincode_spec.unwrap();
    assert_eq!(spec.input.unwrap().args[0], b"CONTRACT_NAME:TRANSACTION_NAME");
}

#[tokio::test]
async fn arguments_follow_transaction_name() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &["one", "two", "three"])
        .await
        .unwrap();

    let requests = mock.endorse_requests();
    let proposal = requests[0].proposed_transaction.as_ref().unwrap();
    let args = invocation_spec_of(proposal)
        .chaincode_spec
        .unwrap()
        .input
        .unwrap()
        .args;
    assert_eq!(args, vec![b"TRANSACTION_NAME".to_vec(), b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
}

#[tokio::test]
async fn transient_data_and_endorsing_organizations_reach_the_gateway() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    let proposal = test_contract(&gateway)
        .new_proposal("TRANSACTION_NAME")
        .with_transient([("price", b"3000".to_vec())])
        .with_endorsing_organizations(["MY_ORG"])
        .build()
        .unwrap();
    proposal.endorse().await.unwrap();

    let requests = mock.endorse_requests();
    let request = &requests[0];
    assert_eq!(request.endorsing_organizations, vec!["MY_ORG"]);

    let signed_proposal = request.proposed_transaction.as_ref().unwrap();
    let decoded: protos::peer::Proposal =
        protos::unmarshal(&signed_proposal.proposal_bytes).unwrap();
    let payload: ChaincodeProposalPayload = protos::unmarshal(&decoded.payload).unwrap();
    assert_eq!(payload.transient_map["price"], b"3000");
}

#[tokio::test]
async fn commit_status_request_carries_channel_transaction_and_identity() {
    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = test_gateway(&mock);

    test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    let endorse_requests = mock.endorse_requests();
    let expected_transaction_id = &endorse_requests[0].transaction_id;

    let requests = mock.commit_status_requests();
    assert_eq!(requests.len(), 1);
    let request: protos::gateway::CommitStatusRequest =
        protos::unmarshal(&requests[0].request).unwrap();
    assert_eq!(request.channel_id, TEST_CHANNEL);
    assert_eq!(&request.transaction_id, expected_transaction_id);

    let identity: protos::msp::SerializedIdentity =
        protos::unmarshal(&request.identity).unwrap();
    assert_eq!(identity.mspid, "Org1MSP");
    assert_eq!(identity.id_bytes, TEST_CERTIFICATE);
}

#[tokio::test]
async fn signer_output_appears_verbatim_in_each_stage() {
    fn fixed_signer(_digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        Ok(b"MY_SIGNATURE".to_vec())
    }

    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(fixed_signer)
        .with_service(mock.clone())
        .connect()
        .unwrap();

    test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    let endorse = &mock.endorse_requests()[0];
    assert_eq!(
        endorse.proposed_transaction.as_ref().unwrap().signature,
        b"MY_SIGNATURE"
    );

    let submit = &mock.submit_requests()[0];
    assert_eq!(
        submit.prepared_transaction.as_ref().unwrap().signature,
        b"MY_SIGNATURE"
    );

    let commit_status = &mock.commit_status_requests()[0];
    assert_eq!(commit_status.signature, b"MY_SIGNATURE");
}

#[tokio::test]
async fn injected_hash_supplies_every_signing_digest() {
    use std::sync::{Arc, Mutex};

    let digests: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&digests);
    let sign = move |digest: &[u8]| -> Result<Vec<u8>, SigningError> {
        captured.lock().unwrap().push(digest.to_vec());
        Ok(digest.to_vec())
    };
    let hash = |_message: &[u8]| -> Vec<u8> { b"MY_DIGEST".to_vec() };

    let mock = MockGateway::new();
    queue_happy_path(&mock);
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(sign)
        .with_hash(hash)
        .with_service(mock.clone())
        .connect()
        .unwrap();

    test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .unwrap();

    let expected: Vec<Vec<u8>> = vec![
        b"MY_DIGEST".to_vec(),
        b"MY_DIGEST".to_vec(),
        b"MY_DIGEST".to_vec(),
    ];
    assert_eq!(*digests.lock().unwrap(), expected);
}

#[tokio::test]
async fn zero_endorse_timeout_fails_with_deadline_exceeded() {
    let mock = MockGateway::with_latency(Duration::from_secs(1));
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(test_signer)
        .with_service(mock.clone())
        .with_endorse_timeout(Duration::ZERO)
        .connect()
        .unwrap();

    let err = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .expect_err("a zero endorse deadline must expire immediately");

    assert_eq!(err.code(), Some(Code::DeadlineExceeded), "{}", err);
    assert!(
        mock.endorse_requests().is_empty(),
        "the RPC must not be attempted once the deadline has expired"
    );
}

#[tokio::test]
async fn slow_endorse_exceeds_configured_deadline() {
    let mock = MockGateway::with_latency(Duration::from_secs(30));
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(test_signer)
        .with_service(mock.clone())
        .with_endorse_timeout(Duration::from_millis(20))
        .connect()
        .unwrap();

    let err = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .expect_err("a slow endorse must exceed its deadline");

    assert_eq!(err.code(), Some(Code::DeadlineExceeded), "{}", err);
}

#[tokio::test]
async fn zero_submit_timeout_fails_with_deadline_exceeded() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(test_signer)
        .with_service(mock.clone())
        .with_submit_timeout(Duration::ZERO)
        .connect()
        .unwrap();

    let err = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .expect_err("a zero submit deadline must expire immediately");

    assert_eq!(err.code(), Some(Code::DeadlineExceeded), "{}", err);
}

#[tokio::test]
async fn zero_commit_status_timeout_fails_with_deadline_exceeded() {
    let mock = MockGateway::new();
    mock.queue_endorse(Ok(endorse_response("TRANSACTION_RESULT", TEST_CHANNEL)));
    mock.queue_submit(Ok(Default::default()));
    let gateway = Gateway::builder()
        .with_identity(test_identity())
        .with_signer(test_signer)
        .with_service(mock.clone())
        .with_commit_status_timeout(Duration::ZERO)
        .connect()
        .unwrap();

    let err = test_contract(&gateway)
        .submit_transaction("TRANSACTION_NAME", &[])
        .await
        .expect_err("a zero commit status deadline must expire immediately");

    assert_eq!(err.code(), Some(Code::DeadlineExceeded), "{}", err);
}
