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

//! Endorsed transactions.
//!
//! An endorsed transaction wraps the envelope returned by the gateway. The
//! signing surface is the envelope payload; the transaction ID is the one
//! the originating proposal derived, carried inside the payload's channel
//! header.

use std::fmt;
use std::sync::Arc;

use crate::client::GatewayClient;
use crate::error::{GatewayError, SubmitError};
use crate::identity::SigningIdentity;
use crate::protocol::commit::Commit;
use crate::protos;
use crate::protos::common::{Envelope, Payload};
use crate::protos::gateway::SubmitRequest;
use crate::protos::peer::{
    ChaincodeAction, ChaincodeActionPayload, ProposalResponsePayload,
};

/// An endorsed transaction, ready to sign and submit for ordering.
pub struct Transaction {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    transaction_id: String,
    envelope: Envelope,
}

impl Transaction {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
        transaction_id: String,
        envelope: Envelope,
    ) -> Self {
        Transaction {
            client,
            signing_identity,
            channel_name,
            transaction_id,
            envelope,
        }
    }

    /// Rebuilds a transaction from bytes previously obtained with
    /// [`bytes`](Transaction::bytes), applying an externally computed
    /// signature. Channel name and transaction ID are read back out of the
    /// envelope payload.
    pub(crate) fn from_signed_parts(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        let mut envelope: Envelope = protos::unmarshal(bytes)?;
        envelope.signature = signature;

        let channel_header = super::channel_header_from_payload(&envelope.payload)?;

        Ok(Transaction {
            client,
            signing_identity,
            channel_name: channel_header.channel_id,
            transaction_id: channel_header.tx_id,
            envelope,
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Serialized form of the transaction envelope, for offline signing.
    pub fn bytes(&self) -> Vec<u8> {
        protos::marshal(&self.envelope)
    }

    /// The digest a signature must be computed over.
    pub fn digest(&self) -> Vec<u8> {
        self.signing_identity.hash(&self.envelope.payload)
    }

    /// The value returned by the transaction function, extracted from the
    /// endorsement embedded in the envelope.
    pub fn result(&self) -> Result<Vec<u8>, GatewayError> {
        let payload: Payload = protos::unmarshal(&self.envelope.payload)?;
        let transaction: protos::peer::Transaction = protos::unmarshal(&payload.data)?;

        let action = transaction.actions.first().ok_or_else(|| {
            GatewayError::Serialization(protos::ProtoConversionError::DeserializationError(
                "transaction contained no actions".into(),
            ))
        })?;

        let action_payload: ChaincodeActionPayload = protos::unmarshal(&action.payload)?;
        let endorsed_action = action_payload.action.unwrap_or_default();
        let response_payload: ProposalResponsePayload =
            protos::unmarshal(&endorsed_action.proposal_response_payload)?;
        let chaincode_action: ChaincodeAction = protos::unmarshal(&response_payload.extension)?;

        Ok(chaincode_action.response.unwrap_or_default().payload)
    }

    /// Submits the signed transaction to the ordering service and returns a
    /// [`Commit`] tracking its validation.
    pub async fn submit(&self) -> Result<Commit, GatewayError> {
        let request = SubmitRequest {
            transaction_id: self.transaction_id.clone(),
            channel_id: self.channel_name.clone(),
            prepared_transaction: Some(self.signed_envelope()?),
        };

        self.client.submit(request).await.map_err(|status| {
            GatewayError::Submit(SubmitError {
                transaction_id: self.transaction_id.clone(),
                status,
            })
        })?;

        Ok(Commit::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.channel_name.clone(),
            self.transaction_id.clone(),
        ))
    }

    fn signed_envelope(&self) -> Result<Envelope, GatewayError> {
        let mut envelope = self.envelope.clone();
        if envelope.signature.is_empty() {
            if !self.signing_identity.has_signer() {
                return Err(GatewayError::Unsupported(
                    "no signer configured and transaction carries no signature".into(),
                ));
            }
            envelope.signature = self.signing_identity.sign(&self.digest())?;
        }
        Ok(envelope)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Transaction { ")?;
        write!(f, "transaction_id: {:?}, ", self.transaction_id)?;
        write!(f, "channel_name: {:?}, ", self.channel_name)?;
        write!(f, "payload: <{} bytes>, ", self.envelope.payload.len())?;
        write!(f, "signature: <{} bytes>", self.envelope.signature.len())?;
        f.write_str(" }")
    }
}
