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

//! Client library for the Hyperledger Fabric Gateway.
//!
//! Applications connect to a single gateway endpoint, address a contract on
//! a channel, and drive the transaction lifecycle through it:
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use fabric_gateway::identity::{SigningError, X509Identity};
//! use fabric_gateway::Gateway;
//!
//! // Sign with the application's private key; the library never sees it.
//! fn sign(digest: &[u8]) -> Result<Vec<u8>, SigningError> {
//! #     let _ = digest;
//!     Ok(Vec::new())
//! }
//!
//! let identity = X509Identity::new("Org1MSP", std::fs::read("cert.pem")?);
//!
//! let gateway = Gateway::builder()
//!     .with_identity(identity)
//!     .with_signer(sign)
//!     .with_endpoint("gateway.example.org:7053")
//!     .connect()?;
//!
//! let network = gateway.network("channel1");
//! let contract = network.contract("basic");
//!
//! let result = contract
//!     .submit_transaction("createAsset", &["asset1", "blue"])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Every lifecycle artifact (proposal, endorsed transaction, commit, event
//! request) can instead be exported with `bytes`/`digest`, signed outside
//! the process, and re-imported with the gateway's `new_signed_*`
//! constructors without changing its transaction ID or digest.

#[macro_use]
extern crate log;

pub mod client;
pub mod error;
pub mod event;
pub mod identity;
pub mod protocol;
pub mod protos;

mod contract;
mod gateway;
mod network;

pub use contract::Contract;
pub use gateway::{Gateway, GatewayBuilder};
pub use network::Network;

pub use error::GatewayError;
pub use event::{ChaincodeEvent, EventStream};
pub use protocol::{Commit, CommitStatus, Proposal, ProposalBuilder, Transaction};
