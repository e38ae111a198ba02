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

//! Transaction proposals.
//!
//! A proposal names a transaction function with its arguments and derives the
//! transaction ID that identifies the invocation for the rest of its life:
//! the lowercase hex of the digest over a fresh nonce concatenated with the
//! creator bytes. The nonce is written into the signature header and the ID
//! into the channel header, so a proposal rebuilt from its own bytes keeps
//! the same identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::client::GatewayClient;
use crate::error::{EndorseError, GatewayError};
use crate::identity::SigningIdentity;
use crate::protocol::transaction::Transaction;
use crate::protos;
use crate::protos::common::{Header, HeaderType, SignatureHeader};
use crate::protos::gateway::{EndorseRequest, EvaluateRequest, ProposedTransaction};
use crate::protos::peer::{
    ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChaincodeSpecType, SignedProposal,
};

const NONCE_LENGTH: usize = 24;

/// Assembles a [`Proposal`] for a transaction function.
pub struct ProposalBuilder {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    chaincode_name: String,
    contract_name: Option<String>,
    transaction_name: String,
    arguments: Vec<Vec<u8>>,
    transient: HashMap<String, Vec<u8>>,
    endorsing_organizations: Vec<String>,
}

impl ProposalBuilder {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
        chaincode_name: String,
        contract_name: Option<String>,
        transaction_name: String,
    ) -> Self {
        ProposalBuilder {
            client,
            signing_identity,
            channel_name,
            chaincode_name,
            contract_name,
            transaction_name,
            arguments: Vec::new(),
            transient: HashMap::new(),
            endorsing_organizations: Vec::new(),
        }
    }

    /// Arguments passed to the transaction function, after the function name
    /// itself. Accepts both string and byte arguments.
    pub fn with_arguments<I, A>(mut self, arguments: I) -> ProposalBuilder
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Private data passed to endorsing peers but excluded from the ledger
    /// transaction.
    pub fn with_transient<I, K, V>(mut self, transient: I) -> ProposalBuilder
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.transient = transient
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Restricts endorsement to the named organizations.
    pub fn with_endorsing_organizations<I, O>(mut self, organizations: I) -> ProposalBuilder
    where
        I: IntoIterator<Item = O>,
        O: Into<String>,
    {
        self.endorsing_organizations = organizations.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Proposal, GatewayError> {
        // Checked before qualification so a named contract rejects an empty
        // name too.
        if self.transaction_name.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "transaction name is required".into(),
            ));
        }
        let qualified_name = match self.contract_name {
            Some(contract_name) => format!("{}:{}", contract_name, self.transaction_name),
            None => self.transaction_name,
        };

        let mut nonce = vec![0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);

        let creator = self.signing_identity.creator().to_vec();

        let mut salted_creator = nonce.clone();
        salted_creator.extend_from_slice(&creator);
        let transaction_id = hex::encode(self.signing_identity.hash(&salted_creator));

        let channel_header = protos::common::ChannelHeader {
            r#type: HeaderType::EndorserTransaction as i32,
            version: 0,
            timestamp: Some(protos::timestamp_now()),
            channel_id: self.channel_name.clone(),
            tx_id: transaction_id.clone(),
            epoch: 0,
            extension: protos::marshal(&ChaincodeHeaderExtension {
                chaincode_id: Some(ChaincodeId {
                    name: self.chaincode_name.clone(),
                    ..Default::default()
                }),
            }),
            tls_cert_hash: Vec::new(),
        };

        let signature_header = SignatureHeader { creator, nonce };

        let header = Header {
            channel_header: protos::marshal(&channel_header),
            signature_header: protos::marshal(&signature_header),
        };

        let mut args = Vec::with_capacity(self.arguments.len() + 1);
        args.push(qualified_name.into_bytes());
        args.extend(self.arguments);

        let invocation_spec = ChaincodeInvocationSpec {
            chaincode_spec: Some(ChaincodeSpec {
                r#type: ChaincodeSpecType::Golang as i32,
                chaincode_id: Some(ChaincodeId {
                    name: self.chaincode_name,
                    ..Default::default()
                }),
                input: Some(ChaincodeInput {
                    args,
                    ..Default::default()
                }),
                timeout: 0,
            }),
        };

        let proposal_payload = ChaincodeProposalPayload {
            input: protos::marshal(&invocation_spec),
            transient_map: self.transient,
        };

        let proposal = protos::peer::Proposal {
            header: protos::marshal(&header),
            payload: protos::marshal(&proposal_payload),
            extension: Vec::new(),
        };

        let proposed_transaction = ProposedTransaction {
            transaction_id,
            proposal: Some(SignedProposal {
                proposal_bytes: protos::marshal(&proposal),
                signature: Vec::new(),
            }),
            endorsing_organizations: self.endorsing_organizations,
        };

        Ok(Proposal {
            client: self.client,
            signing_identity: self.signing_identity,
            channel_name: self.channel_name,
            proposed_transaction,
        })
    }
}

/// A built transaction proposal, ready to evaluate or endorse.
pub struct Proposal {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    proposed_transaction: ProposedTransaction,
}

impl Proposal {
    /// Rebuilds a proposal from bytes previously obtained with
    /// [`bytes`](Proposal::bytes), applying a signature computed over its
    /// [`digest`](Proposal::digest). The transaction ID, digest and
    /// endorsing organizations of the original proposal are preserved.
    pub(crate) fn from_signed_parts(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        let mut proposed_transaction: ProposedTransaction = protos::unmarshal(bytes)?;
        let proposal = proposed_transaction.proposal.get_or_insert_with(Default::default);
        proposal.signature = signature;

        let channel_header = super::channel_header_from_proposal(&proposal.proposal_bytes)?;

        Ok(Proposal {
            client,
            signing_identity,
            channel_name: channel_header.channel_id,
            proposed_transaction,
        })
    }

    /// The unique identity of this transaction invocation.
    pub fn transaction_id(&self) -> &str {
        &self.proposed_transaction.transaction_id
    }

    /// Serialized form of the proposal, for offline signing.
    pub fn bytes(&self) -> Vec<u8> {
        protos::marshal(&self.proposed_transaction)
    }

    /// The digest a signature must be computed over.
    pub fn digest(&self) -> Vec<u8> {
        self.signing_identity.hash(&self.signed_proposal_ref().proposal_bytes)
    }

    /// Evaluates the proposal on a suitable peer and returns the transaction
    /// result without committing anything to the ledger.
    pub async fn evaluate(&self) -> Result<Vec<u8>, GatewayError> {
        let request = EvaluateRequest {
            transaction_id: self.transaction_id().to_string(),
            channel_id: self.channel_name.clone(),
            proposed_transaction: Some(self.signed_proposal()?),
            target_organizations: self
                .proposed_transaction
                .endorsing_organizations
                .clone(),
        };

        let response = self
            .client
            .evaluate(request)
            .await
            .map_err(GatewayError::Rpc)?;

        Ok(response.result.unwrap_or_default().payload)
    }

    /// Sends the proposal for endorsement and returns the endorsed
    /// [`Transaction`].
    pub async fn endorse(&self) -> Result<Transaction, GatewayError> {
        let request = EndorseRequest {
            transaction_id: self.transaction_id().to_string(),
            channel_id: self.channel_name.clone(),
            proposed_transaction: Some(self.signed_proposal()?),
            endorsing_organizations: self
                .proposed_transaction
                .endorsing_organizations
                .clone(),
        };

        let response = self.client.endorse(request).await.map_err(|status| {
            GatewayError::Endorse(EndorseError::new(
                self.transaction_id().to_string(),
                status,
            ))
        })?;

        let envelope = response.prepared_transaction.ok_or_else(|| {
            GatewayError::Serialization(protos::ProtoConversionError::DeserializationError(
                "endorse response contained no prepared transaction".into(),
            ))
        })?;

        Ok(Transaction::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.channel_name.clone(),
            self.transaction_id().to_string(),
            envelope,
        ))
    }

    fn signed_proposal_ref(&self) -> &SignedProposal {
        // Both constructors populate the slot; the fallback keeps this total.
        static EMPTY: SignedProposal = SignedProposal {
            proposal_bytes: Vec::new(),
            signature: Vec::new(),
        };
        self.proposed_transaction.proposal.as_ref().unwrap_or(&EMPTY)
    }

    /// The proposal with its signature slot filled, signing now if the
    /// signature was not supplied out of process.
    fn signed_proposal(&self) -> Result<SignedProposal, GatewayError> {
        let mut proposal = self.signed_proposal_ref().clone();
        if proposal.signature.is_empty() {
            if !self.signing_identity.has_signer() {
                return Err(GatewayError::Unsupported(
                    "no signer configured and proposal carries no signature".into(),
                ));
            }
            proposal.signature = self.signing_identity.sign(&self.digest())?;
        }
        Ok(proposal)
    }
}

impl fmt::Debug for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let proposal = self.signed_proposal_ref();
        f.write_str("Proposal { ")?;
        write!(f, "transaction_id: {:?}, ", self.transaction_id())?;
        write!(f, "channel_name: {:?}, ", self.channel_name)?;
        write!(
            f,
            "proposal_bytes: <{} bytes>, ",
            proposal.proposal_bytes.len()
        )?;
        write!(f, "signature: <{} bytes>", proposal.signature.len())?;
        f.write_str(" }")
    }
}
