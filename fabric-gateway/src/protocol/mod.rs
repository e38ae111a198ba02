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

//! The transaction lifecycle artifacts.
//!
//! A submission moves through three signed artifacts: a [`Proposal`] is
//! endorsed into a [`Transaction`], which is submitted for ordering and
//! tracked by a [`Commit`]. Each artifact exposes `bytes`/`digest` so its
//! signature can be produced outside the process, and each can be rebuilt
//! from those bytes without changing its transaction ID or digest.

pub mod commit;
pub mod proposal;
pub mod transaction;

pub use commit::{Commit, CommitStatus};
pub use proposal::{Proposal, ProposalBuilder};
pub use transaction::Transaction;

use crate::protos;
use crate::protos::common::{ChannelHeader, Header, Payload};
use crate::protos::ProtoConversionError;

/// Reads the channel header out of a serialized `peer.Proposal`.
pub(crate) fn channel_header_from_proposal(
    proposal_bytes: &[u8],
) -> Result<ChannelHeader, ProtoConversionError> {
    let proposal: protos::peer::Proposal = protos::unmarshal(proposal_bytes)?;
    let header: Header = protos::unmarshal(&proposal.header)?;
    protos::unmarshal(&header.channel_header)
}

/// Reads the channel header out of a serialized `common.Payload`.
pub(crate) fn channel_header_from_payload(
    payload_bytes: &[u8],
) -> Result<ChannelHeader, ProtoConversionError> {
    let payload: Payload = protos::unmarshal(payload_bytes)?;
    let header = payload.header.unwrap_or_default();
    protos::unmarshal(&header.channel_header)
}
