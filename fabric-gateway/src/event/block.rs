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

//! Block event streams, delivering whole committed blocks.

use std::fmt;
use std::sync::Arc;

use crate::client::GatewayClient;
use crate::error::GatewayError;
use crate::event::checkpoint::Checkpoint;
use crate::event::EventStream;
use crate::identity::SigningIdentity;
use crate::protos;
use crate::protos::common::Block;
use crate::protos::gateway::{
    BlockEventsRequest as BlockEventsRequestProto, SignedBlockEventsRequest,
};
use crate::protos::orderer::SeekPosition;

/// Assembles a signable block events request.
pub struct BlockEventsBuilder {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    channel_name: String,
    start_block: Option<u64>,
}

impl BlockEventsBuilder {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
    ) -> Self {
        BlockEventsBuilder {
            client,
            signing_identity,
            channel_name,
            start_block: None,
        }
    }

    /// Reads blocks starting at the given block number instead of the next
    /// block the orderer emits.
    pub fn with_start_block(mut self, block_number: u64) -> BlockEventsBuilder {
        self.start_block = Some(block_number);
        self
    }

    /// Resumes from a checkpointed position; a fresh checkpoint leaves the
    /// builder unchanged.
    pub fn with_checkpoint(mut self, checkpoint: &dyn Checkpoint) -> BlockEventsBuilder {
        let block_number = checkpoint.block_number();
        if block_number == 0 && checkpoint.transaction_id().is_none() {
            return self;
        }
        self.start_block = Some(block_number);
        self
    }

    /// Builds the request without opening the stream, for offline signing.
    pub fn build(self) -> BlockEventsRequest {
        let request = BlockEventsRequestProto {
            channel_id: self.channel_name,
            identity: self.signing_identity.creator().to_vec(),
            start_position: Some(match self.start_block {
                Some(block_number) => SeekPosition::specified(block_number),
                None => SeekPosition::next_commit(),
            }),
        };

        BlockEventsRequest {
            client: self.client,
            signing_identity: self.signing_identity,
            signed_request: SignedBlockEventsRequest {
                request: protos::marshal(&request),
                signature: Vec::new(),
            },
        }
    }

    /// Builds the request and opens the block stream.
    pub async fn events(self) -> Result<EventStream<Block>, GatewayError> {
        self.build().events().await
    }
}

/// A signable request for a stream of committed blocks.
pub struct BlockEventsRequest {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    signed_request: SignedBlockEventsRequest,
}

impl BlockEventsRequest {
    pub(crate) fn from_signed_parts(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        let mut signed_request: SignedBlockEventsRequest = protos::unmarshal(bytes)?;
        signed_request.signature = signature;

        Ok(BlockEventsRequest {
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

    /// Opens the stream and delivers blocks in commit order.
    pub async fn events(&self) -> Result<EventStream<Block>, GatewayError> {
        let source = self
            .client
            .block_events(self.signed_request_with_signature()?)
            .await
            .map_err(GatewayError::Rpc)?;

        Ok(EventStream::spawn(source, |block| vec![block]))
    }

    fn signed_request_with_signature(&self) -> Result<SignedBlockEventsRequest, GatewayError> {
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

impl fmt::Debug for BlockEventsRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("BlockEventsRequest { ")?;
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
