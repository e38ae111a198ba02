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

//! Chaincode event streams.

use std::fmt;
use std::sync::Arc;

use crate::client::GatewayClient;
use crate::error::GatewayError;
use crate::event::checkpoint::Checkpoint;
use crate::event::EventStream;
use crate::identity::SigningIdentity;
use crate::protos;
use crate::protos::gateway::{
    ChaincodeEventsRequest as ChaincodeEventsRequestProto, ChaincodeEventsResponse,
    SignedChaincodeEventsRequest,
};
use crate::protos::orderer::SeekPosition;

/// An event emitted by a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeEvent {
    /// Number of the block the emitting transaction committed in.
    pub block_number: u64,
    pub chaincode_name: String,
    pub transaction_id: String,
    pub event_name: String,
    pub payload: Vec<u8>,
}

/// Assembles a signable chaincode events request.
pub struct ChaincodeEventsBuilder {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    chaincode_name: String,
    start_block: Option<u64>,
    after_transaction_id: Option<String>,
}

impl ChaincodeEventsBuilder {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
        chaincode_name: String,
    ) -> Self {
        ChaincodeEventsBuilder {
            client,
            signing_identity,
            channel_name,
            chaincode_name,
            start_block: None,
            after_transaction_id: None,
        }
    }

    /// Reads events starting at the given block number instead of the next
    /// block the orderer emits.
    pub fn with_start_block(mut self, block_number: u64) -> ChaincodeEventsBuilder {
        self.start_block = Some(block_number);
        self
    }

    /// Resumes from a checkpointed position. A checkpoint that has recorded
    /// a position takes precedence over any start block; a fresh checkpoint
    /// leaves the builder unchanged.
    pub fn with_checkpoint(mut self, checkpoint: &dyn Checkpoint) -> ChaincodeEventsBuilder {
        let block_number = checkpoint.block_number();
        let transaction_id = checkpoint.transaction_id();
        if block_number == 0 && transaction_id.is_none() {
            return self;
        }
        self.start_block = Some(block_number);
        self.after_transaction_id = transaction_id;
        self
    }

    /// Builds the request without opening the stream, for offline signing.
    pub fn build(self) -> ChaincodeEventsRequest {
        let request = ChaincodeEventsRequestProto {
            channel_id: self.channel_name,
            chaincode_id: self.chaincode_name,
            identity: self.signing_identity.creator().to_vec(),
            start_position: Some(match self.start_block {
                Some(block_number) => SeekPosition::specified(block_number),
                None => SeekPosition::next_commit(),
            }),
            after_transaction_id: self.after_transaction_id.unwrap_or_default(),
        };

        ChaincodeEventsRequest {
            client: self.client,
            signing_identity: self.signing_identity,
            signed_request: SignedChaincodeEventsRequest {
                request: protos::marshal(&request),
                signature: Vec::new(),
            },
        }
    }

    /// Builds the request and opens the event stream.
    pub async fn events(self) -> Result<EventStream<ChaincodeEvent>, GatewayError> {
        self.build().events().await
    }
}

/// A signable request for a stream of chaincode events.
pub struct ChaincodeEventsRequest {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    signed_request: SignedChaincodeEventsRequest,
}

impl ChaincodeEventsRequest {
    pub(crate) fn from_signed_parts(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        let mut signed_request: SignedChaincodeEventsRequest = protos::unmarshal(bytes)?;
        signed_request.signature = signature;

        Ok(ChaincodeEventsRequest {
            client,
            signing_identity,
            signed_request,
        })
    }

    /// Serialized form of the request, for offline signing.
    pub fn bytes(&self) -> Vec<u8> {
        protos::marshal(&self.signed_request)
    }

    /// The digest a signature must be computed over.
    pub fn digest(&self) -> Vec<u8> {
        self.signing_identity.hash(&self.signed_request.request)
    }

    /// Opens the stream and delivers events in arrival order, each block's
    /// events in slice order.
    pub async fn events(&self) -> Result<EventStream<ChaincodeEvent>, GatewayError> {
        let source = self
            .client
            .chaincode_events(self.signed_request_with_signature()?)
            .await
            .map_err(GatewayError::Rpc)?;

        Ok(EventStream::spawn(source, decode_events))
    }

    fn signed_request_with_signature(
        &self,
    ) -> Result<SignedChaincodeEventsRequest, GatewayError> {
        let mut signed_request = self.signed_request.clone();
        if signed_request.signature.is_empty() {
            if !self.signing_identity.has_signer() {
                return Err(GatewayError::Unsupported(
                    "no signer configured and events request carries no signature".into(),
                ));
            }
            signed_request.signature = self.signing_identity.sign(&self.digest())?;
        }
        Ok(signed_request)
    }
}

impl fmt::Debug for ChaincodeEventsRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ChaincodeEventsRequest { ")?;
        write!(
            f,
            "request: <{} bytes>, ",
            self.signed_request.request.len()
        )?;
        write!(
            f,
            "signature: <{} bytes>",
            self.signed_request.signature.len()
        )?;
        f.write_str(" }")
    }
}

fn decode_events(response: ChaincodeEventsResponse) -> Vec<ChaincodeEvent> {
    let block_number = response.block_number;
    response
        .events
        .into_iter()
        .map(|event| ChaincodeEvent {
            block_number,
            chaincode_name: event.chaincode_id,
            transaction_id: event.tx_id,
            event_name: event.event_name,
            payload: event.payload,
        })
        .collect()
}
