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

//! A channel-scoped view of the ledger network.

use std::sync::Arc;

use crate::client::GatewayClient;
use crate::contract::Contract;
use crate::event::{BlockEventsBuilder, ChaincodeEventsBuilder};
use crate::identity::SigningIdentity;

/// A blockchain network of nodes hosting a shared ledger, identified by its
/// channel name.
#[derive(Clone)]
pub struct Network {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    name: String,
}

impl Network {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        name: String,
    ) -> Self {
        Network {
            client,
            signing_identity,
            name,
        }
    }

    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default contract of a chaincode deployed on this channel.
    pub fn contract(&self, chaincode_name: impl Into<String>) -> Contract {
        Contract::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.name.clone(),
            chaincode_name.into(),
            None,
        )
    }

    /// A named contract within a chaincode deployed on this channel.
    pub fn contract_with_name(
        &self,
        chaincode_name: impl Into<String>,
        contract_name: impl Into<String>,
    ) -> Contract {
        Contract::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.name.clone(),
            chaincode_name.into(),
            Some(contract_name.into()),
        )
    }

    /// Events emitted by transactions of a chaincode, from the requested
    /// start position onwards.
    pub fn chaincode_events(&self, chaincode_name: impl Into<String>) -> ChaincodeEventsBuilder {
        ChaincodeEventsBuilder::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.name.clone(),
            chaincode_name.into(),
        )
    }

    /// Committed blocks of this channel, from the requested start position
    /// onwards.
    pub fn block_events(&self) -> BlockEventsBuilder {
        BlockEventsBuilder::new(
            Arc::clone(&self.client),
            Arc::clone(&self.signing_identity),
            self.name.clone(),
        )
    }
}
