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

//! A contract deployed within a chaincode.

use std::sync::Arc;

use crate::client::GatewayClient;
use crate::error::{CommitError, GatewayError};
use crate::identity::SigningIdentity;
use crate::protocol::{Commit, ProposalBuilder};

/// A smart contract, addressed by chaincode name and, for chaincodes hosting
/// several contracts, a contract name.
#[derive(Clone)]
pub struct Contract {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    chaincode_name: String,
    contract_name: Option<String>,
}

impl Contract {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
        chaincode_name: String,
        contract_name: Option<String>,
    ) -> Self {
        Contract {
            client,
            signing_identity,
            channel_name,
            chaincode_name,
            contract_name,
        }
    }

    pub fn chaincode_name(&self) -> &str {
        &self.chaincode_name
    }

    /// The contract name within the chaincode, or `None` for the default
    /// contract.
    pub fn contract_name(&self) -> Option<&str> {
        self.contract_name.as_deref()
    }

    /// Starts a proposal for the named transaction function. Arguments,
    /// transient data and endorsing organizations are set on the returned
    /// builder. On a named contract the function name is written into the
    /// proposal as `"<contract>:<transaction>"`.
    pub fn new_proposal(&self, transaction_name: impl Into<String>) -> ProposalBuilder {
        ProposalBuilder::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.channel_name.clone(),
            self.chaincode_name.clone(),
            self.contract_name.clone(),
            transaction_name.into(),
        )
    }

    /// Evaluates a transaction with string arguments and returns its result.
    /// Nothing is committed to the ledger.
    pub async fn evaluate_transaction(
        &self,
        transaction_name: &str,
        arguments: &[&str],
    ) -> Result<Vec<u8>, GatewayError> {
        self.new_proposal(transaction_name)
            .with_arguments(arguments.iter().copied())
            .build()?
            .evaluate()
            .await
    }

    /// Submits a transaction with string arguments and waits for it to
    /// commit. A transaction that commits with any validation code other
    /// than `VALID` is reported as a [`CommitError`].
    pub async fn submit_transaction(
        &self,
        transaction_name: &str,
        arguments: &[&str],
    ) -> Result<Vec<u8>, GatewayError> {
        let (result, commit) = self.submit_async(transaction_name, arguments).await?;

        let status = commit.status().await?;
        if !status.successful {
            return Err(GatewayError::Commit(CommitError {
                transaction_id: commit.transaction_id().to_string(),
                code: status.code,
                block_number: status.block_number,
            }));
        }

        Ok(result)
    }

    /// Submits a transaction and returns its result together with the
    /// [`Commit`], without waiting for the commit status.
    pub async fn submit_async(
        &self,
        transaction_name: &str,
        arguments: &[&str],
    ) -> Result<(Vec<u8>, Commit), GatewayError> {
        let transaction = self
            .new_proposal(transaction_name)
            .with_arguments(arguments.iter().copied())
            .build()?
            .endorse()
            .await?;

        let result = transaction.result()?;
        let commit = transaction.submit().await?;

        Ok((result, commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::{GatewayService, Timeouts};
    use crate::identity::{Sha256Hash, X509Identity};
    use crate::protos::gateway::*;
    use crate::protos::common::Block;
    use async_trait::async_trait;
    use tonic::Status;

    struct UnreachableService;

    #[async_trait]
    impl GatewayService for UnreachableService {
        async fn evaluate(&self, _: EvaluateRequest) -> Result<EvaluateResponse, Status> {
            Err(Status::unavailable("unreachable"))
        }

        async fn endorse(&self, _: EndorseRequest) -> Result<EndorseResponse, Status> {
            Err(Status::unavailable("unreachable"))
        }

        async fn submit(&self, _: SubmitRequest) -> Result<SubmitResponse, Status> {
            Err(Status::unavailable("unreachable"))
        }

        async fn commit_status(
            &self,
            _: SignedCommitStatusRequest,
        ) -> Result<CommitStatusResponse, Status> {
            Err(Status::unavailable("unreachable"))
        }

        async fn chaincode_events(
            &self,
            _: SignedChaincodeEventsRequest,
        ) -> Result<crate::client::ResponseStream<ChaincodeEventsResponse>, Status> {
            Err(Status::unavailable("unreachable"))
        }

        async fn block_events(
            &self,
            _: SignedBlockEventsRequest,
        ) -> Result<crate::client::ResponseStream<Block>, Status> {
            Err(Status::unavailable("unreachable"))
        }
    }

    fn contract(contract_name: Option<&str>) -> Contract {
        let signing_identity = SigningIdentity::new(
            Box::new(X509Identity::new("Org1MSP", b"CERTIFICATE".to_vec())),
            None,
            Box::new(Sha256Hash),
        );
        Contract::new(
            Arc::new(GatewayClient::new(
                Box::new(UnreachableService),
                Timeouts::default(),
            )),
            Arc::new(signing_identity),
            "channel1".into(),
            "basic".into(),
            contract_name.map(Into::into),
        )
    }

    fn function_name_of(proposal: &crate::protocol::Proposal) -> Vec<u8> {
        use crate::protos;
        use crate::protos::peer::{ChaincodeInvocationSpec, ChaincodeProposalPayload};

        let proposed: crate::protos::gateway::ProposedTransaction =
            protos::unmarshal(&proposal.bytes()).unwrap();
        let decoded: protos::peer::Proposal =
            protos::unmarshal(&proposed.proposal.unwrap().proposal_bytes).unwrap();
        let payload: ChaincodeProposalPayload = protos::unmarshal(&decoded.payload).unwrap();
        let spec: ChaincodeInvocationSpec = protos::unmarshal(&payload.input).unwrap();
        spec.chaincode_spec.unwrap().input.unwrap().args.remove(0)
    }

    #[test]
    fn default_contract_uses_bare_transaction_name() {
        let proposal = contract(None).new_proposal("createAsset").build().unwrap();

        assert_eq!(function_name_of(&proposal), b"createAsset");
    }

    #[test]
    fn named_contract_prefixes_transaction_name() {
        let proposal = contract(Some("transfer"))
            .new_proposal("createAsset")
            .build()
            .unwrap();

        assert_eq!(function_name_of(&proposal), b"transfer:createAsset");
    }

    #[test]
    fn empty_transaction_name_is_rejected() {
        let err = contract(None)
            .new_proposal("")
            .build()
            .expect_err("an empty transaction name must be rejected");

        assert!(matches!(err, GatewayError::InvalidArgument(_)), "{}", err);
    }

    #[test]
    fn empty_transaction_name_is_rejected_for_named_contract() {
        let err = contract(Some("transfer"))
            .new_proposal("")
            .build()
            .expect_err("a named contract must also reject an empty transaction name");

        assert!(matches!(err, GatewayError::InvalidArgument(_)), "{}", err);
    }
}
