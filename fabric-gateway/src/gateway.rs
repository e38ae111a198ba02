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

//! Connection to a Fabric Gateway.

use std::sync::Arc;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};

use crate::client::grpc::GrpcGateway;
use crate::client::{GatewayClient, GatewayService, Timeouts};
use crate::error::GatewayError;
use crate::event::{BlockEventsRequest, ChaincodeEventsRequest};
use crate::identity::{Hash, Identity, Sha256Hash, Signer, SigningIdentity};
use crate::network::Network;
use crate::protocol::{Commit, Proposal, Transaction};

/// A client connection to a Fabric Gateway, scoped to a single identity.
///
/// A gateway is cheap to share and thread-safe; all per-invocation state
/// lives in the artifacts it produces. Networks, contracts and artifacts
/// created from it remain usable independently of the `Gateway` value
/// itself.
#[derive(Debug)]
pub struct Gateway {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// The identity this gateway submits and signs as.
    pub fn identity(&self) -> &dyn Identity {
        self.signing_identity.identity()
    }

    /// The named channel on the connected network.
    pub fn network(&self, name: impl Into<String>) -> Network {
        Network::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            name.into(),
        )
    }

    /// Releases the gateway's handle on its connection. A channel supplied
    /// by the caller through [`GatewayBuilder::connection`] is only
    /// released, never shut down; the caller's own clone stays usable.
    pub fn close(self) {
        drop(self);
    }

    /// Recreates a proposal from export bytes and an externally computed
    /// signature over its digest.
    pub fn new_signed_proposal(
        &self,
        bytes: &[u8],
        signature: impl Into<Vec<u8>>,
    ) -> Result<Proposal, GatewayError> {
        Proposal::from_signed_parts(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            bytes,
            signature.into(),
        )
    }

    /// Recreates an endorsed transaction from export bytes and an externally
    /// computed signature over its digest.
    pub fn new_signed_transaction(
        &self,
        bytes: &[u8],
        signature: impl Into<Vec<u8>>,
    ) -> Result<Transaction, GatewayError> {
        Transaction::from_signed_parts(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            bytes,
            signature.into(),
        )
    }

    /// Recreates a commit from export bytes and an externally computed
    /// signature over its digest.
    pub fn new_signed_commit(
        &self,
        bytes: &[u8],
        signature: impl Into<Vec<u8>>,
    ) -> Result<Commit, GatewayError> {
        Commit::from_signed_parts(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            bytes,
            signature.into(),
        )
    }

    /// Recreates a chaincode events request from export bytes and an
    /// externally computed signature over its digest.
    pub fn new_signed_chaincode_events_request(
        &self,
        bytes: &[u8],
        signature: impl Into<Vec<u8>>,
    ) -> Result<ChaincodeEventsRequest, GatewayError> {
        ChaincodeEventsRequest::from_signed_parts(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            bytes,
            signature.into(),
        )
    }

    /// Recreates a block events request from export bytes and an externally
    /// computed signature over its digest.
    pub fn new_signed_block_events_request(
        &self,
        bytes: &[u8],
        signature: impl Into<Vec<u8>>,
    ) -> Result<BlockEventsRequest, GatewayError> {
        BlockEventsRequest::from_signed_parts(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            bytes,
            signature.into(),
        )
    }
}

enum Transport {
    Unset,
    Endpoint(String),
    Connection(Channel),
    Service(Box<dyn GatewayService>),
}

/// Configures and establishes a [`Gateway`] connection.
///
/// An identity and exactly one transport (endpoint, existing channel, or a
/// service implementation) are required; everything else has defaults.
/// Misconfiguration is reported by [`connect`](GatewayBuilder::connect).
pub struct GatewayBuilder {
    identity: Option<Box<dyn Identity>>,
    signer: Option<Box<dyn Signer>>,
    hash: Box<dyn Hash>,
    transport: Transport,
    timeouts: Timeouts,
}

impl GatewayBuilder {
    fn new() -> Self {
        GatewayBuilder {
            identity: None,
            signer: None,
            hash: Box::new(Sha256Hash),
            transport: Transport::Unset,
            timeouts: Timeouts::default(),
        }
    }

    /// The client identity to connect as. Required.
    pub fn with_identity(mut self, identity: impl Identity + 'static) -> GatewayBuilder {
        self.identity = Some(Box::new(identity));
        self
    }

    /// The signing capability for in-process signing. Without one, every
    /// artifact must be signed out of process and re-imported.
    pub fn with_signer(mut self, signer: impl Signer + 'static) -> GatewayBuilder {
        self.signer = Some(Box::new(signer));
        self
    }

    /// The digest applied before signing and for transaction ID derivation.
    /// Defaults to SHA-256.
    pub fn with_hash(mut self, hash: impl Hash + 'static) -> GatewayBuilder {
        self.hash = Box::new(hash);
        self
    }

    /// Target address of the gateway endpoint. A connection is established
    /// lazily on first use.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> GatewayBuilder {
        self.transport = Transport::Endpoint(endpoint.into());
        self
    }

    /// An established channel to use instead of opening one. The channel is
    /// shared: closing the gateway does not shut it down.
    pub fn with_connection(mut self, channel: Channel) -> GatewayBuilder {
        self.transport = Transport::Connection(channel);
        self
    }

    /// A caller-supplied implementation of the gateway RPCs, taking the
    /// place of a network connection.
    pub fn with_service(mut self, service: impl GatewayService + 'static) -> GatewayBuilder {
        self.transport = Transport::Service(Box::new(service));
        self
    }

    pub fn with_evaluate_timeout(mut self, timeout: Duration) -> GatewayBuilder {
        self.timeouts.evaluate = timeout;
        self
    }

    pub fn with_endorse_timeout(mut self, timeout: Duration) -> GatewayBuilder {
        self.timeouts.endorse = timeout;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> GatewayBuilder {
        self.timeouts.submit = timeout;
        self
    }

    pub fn with_commit_status_timeout(mut self, timeout: Duration) -> GatewayBuilder {
        self.timeouts.commit_status = timeout;
        self
    }

    /// Bounds establishment of chaincode event streams. Zero, the default,
    /// leaves streams unbounded.
    pub fn with_chaincode_events_timeout(
        mut self,
        timeout: Duration,
    ) -> GatewayBuilder {
        self.timeouts.chaincode_events = timeout;
        self
    }

    /// Bounds establishment of block event streams. Zero, the default,
    /// leaves streams unbounded.
    pub fn with_block_events_timeout(mut self, timeout: Duration) -> GatewayBuilder {
        self.timeouts.block_events = timeout;
        self
    }

    /// Validates the configuration and returns the connected gateway.
    pub fn connect(self) -> Result<Gateway, GatewayError> {
        let identity = self.identity.ok_or_else(|| {
            GatewayError::InvalidArgument("an identity is required to connect".into())
        })?;
        if identity.msp_id().is_empty() {
            return Err(GatewayError::InvalidArgument(
                "identity has no MSP id".into(),
            ));
        }

        let service: Box<dyn GatewayService> = match self.transport {
            Transport::Unset => {
                return Err(GatewayError::InvalidArgument(
                    "a gateway endpoint, connection or service is required".into(),
                ));
            }
            Transport::Endpoint(target) => {
                let channel = lazy_channel(&target)?;
                debug!("connecting lazily to gateway at {}", target);
                Box::new(GrpcGateway::new(channel))
            }
            Transport::Connection(channel) => Box::new(GrpcGateway::new(channel)),
            Transport::Service(service) => service,
        };

        let signing_identity = SigningIdentity::new(identity, self.signer, self.hash);

        Ok(Gateway {
            client: Arc::new(GatewayClient::new(service, self.timeouts)),
            signing_identity: Arc::new(signing_identity),
        })
    }
}

fn lazy_channel(target: &str) -> Result<Channel, GatewayError> {
    let uri = if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    };
    let endpoint = Endpoint::from_shared(uri)
        .map_err(|err| GatewayError::InvalidArgument(format!("invalid endpoint: {}", err)))?;
    Ok(endpoint.connect_lazy())
}
