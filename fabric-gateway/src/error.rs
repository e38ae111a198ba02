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

//! Errors raised by gateway operations.
//!
//! A failure of a lifecycle stage is reported as the stage-specific type
//! ([`EndorseError`], [`SubmitError`], [`CommitStatusError`]), each carrying
//! the transaction ID and the gRPC status unchanged, so callers can
//! distinguish server rejections from cancellation or an expired deadline by
//! inspecting the preserved [`Code`].

use std::error::Error as StdError;
use std::fmt;

use tonic::{Code, Status};

use crate::identity::SigningError;
use crate::protos::gateway::ErrorDetail;
use crate::protos::peer::TxValidationCode;
use crate::protos::rpc;
use crate::protos::ProtoConversionError;

/// A failed endorsement, with whatever per-peer detail the gateway returned.
#[derive(Debug)]
pub struct EndorseError {
    pub transaction_id: String,
    pub status: Status,
    pub details: Vec<ErrorDetail>,
}

impl EndorseError {
    pub(crate) fn new(transaction_id: String, status: Status) -> Self {
        let details = decode_error_details(&status);
        EndorseError {
            transaction_id,
            status,
            details,
        }
    }
}

impl StdError for EndorseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.status)
    }
}

impl fmt::Display for EndorseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "endorse failed for transaction {}: {}",
            self.transaction_id,
            self.status.message()
        )
    }
}

/// A transaction the ordering service did not accept.
#[derive(Debug)]
pub struct SubmitError {
    pub transaction_id: String,
    pub status: Status,
}

impl StdError for SubmitError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.status)
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "submit failed for transaction {}: {}",
            self.transaction_id,
            self.status.message()
        )
    }
}

/// A commit-status query that did not reach a verdict.
#[derive(Debug)]
pub struct CommitStatusError {
    pub transaction_id: String,
    pub status: Status,
}

impl StdError for CommitStatusError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.status)
    }
}

impl fmt::Display for CommitStatusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "commit status failed for transaction {}: {}",
            self.transaction_id,
            self.status.message()
        )
    }
}

/// A transaction that committed with a validation code other than `VALID`.
#[derive(Debug)]
pub struct CommitError {
    pub transaction_id: String,
    pub code: TxValidationCode,
    pub block_number: u64,
}

impl StdError for CommitError {}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "transaction {} committed with status {:?} in block {}",
            self.transaction_id, self.code, self.block_number
        )
    }
}

/// Any failure of a gateway operation.
#[derive(Debug)]
pub enum GatewayError {
    /// A caller-supplied value was rejected before any request was sent.
    InvalidArgument(String),
    /// The operation needs a capability that was not configured, such as a
    /// terminal action on an unsigned artifact with no in-process signer.
    Unsupported(String),
    /// A wire message could not be decoded.
    Serialization(ProtoConversionError),
    /// The injected signer reported a failure.
    Signing(SigningError),
    /// An RPC outside the submit lifecycle failed; the status is preserved.
    Rpc(Status),
    Endorse(EndorseError),
    Submit(SubmitError),
    CommitStatus(CommitStatusError),
    Commit(CommitError),
}

impl GatewayError {
    /// The gRPC status code underlying this error, for errors that carry one.
    pub fn code(&self) -> Option<Code> {
        match self {
            GatewayError::Rpc(status) => Some(status.code()),
            GatewayError::Endorse(err) => Some(err.status.code()),
            GatewayError::Submit(err) => Some(err.status.code()),
            GatewayError::CommitStatus(err) => Some(err.status.code()),
            _ => None,
        }
    }

    /// The transaction the failed stage was processing, where one exists.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            GatewayError::Endorse(err) => Some(&err.transaction_id),
            GatewayError::Submit(err) => Some(&err.transaction_id),
            GatewayError::CommitStatus(err) => Some(&err.transaction_id),
            GatewayError::Commit(err) => Some(&err.transaction_id),
            _ => None,
        }
    }
}

impl StdError for GatewayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            GatewayError::InvalidArgument(_) | GatewayError::Unsupported(_) => None,
            GatewayError::Serialization(err) => Some(err),
            GatewayError::Signing(err) => Some(err),
            GatewayError::Rpc(status) => Some(status),
            GatewayError::Endorse(err) => Some(err),
            GatewayError::Submit(err) => Some(err),
            GatewayError::CommitStatus(err) => Some(err),
            GatewayError::Commit(err) => Some(err),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GatewayError::InvalidArgument(msg) => write!(f, "InvalidArgument: {}", msg),
            GatewayError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            GatewayError::Serialization(err) => write!(f, "{}", err),
            GatewayError::Signing(err) => write!(f, "{}", err),
            GatewayError::Rpc(status) => {
                write!(f, "rpc failed: {:?}: {}", status.code(), status.message())
            }
            GatewayError::Endorse(err) => write!(f, "{}", err),
            GatewayError::Submit(err) => write!(f, "{}", err),
            GatewayError::CommitStatus(err) => write!(f, "{}", err),
            GatewayError::Commit(err) => write!(f, "{}", err),
        }
    }
}

impl From<ProtoConversionError> for GatewayError {
    fn from(err: ProtoConversionError) -> Self {
        GatewayError::Serialization(err)
    }
}

impl From<SigningError> for GatewayError {
    fn from(err: SigningError) -> Self {
        GatewayError::Signing(err)
    }
}

/// Decodes `gateway.ErrorDetail` entries from the `google.rpc.Status`
/// carried in the status trailers. Absent or malformed details decode to an
/// empty list; the status itself is still reported.
fn decode_error_details(status: &Status) -> Vec<ErrorDetail> {
    let Ok(rpc_status) = crate::protos::unmarshal::<rpc::Status>(status.details()) else {
        return Vec::new();
    };

    rpc_status
        .details
        .iter()
        .filter(|any| any.type_url.ends_with("gateway.ErrorDetail"))
        .filter_map(|any| crate::protos::unmarshal::<ErrorDetail>(&any.value).ok())
        .collect()
}
