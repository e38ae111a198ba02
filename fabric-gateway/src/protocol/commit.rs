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

//! Commit tracking for submitted transactions.

use std::fmt;
use std::sync::Arc;

use crate::client::GatewayClient;
use crate::error::{CommitStatusError, GatewayError};
use crate::identity::SigningIdentity;
use crate::protos;
use crate::protos::gateway::{CommitStatusRequest, SignedCommitStatusRequest};
use crate::protos::peer::TxValidationCode;

/// The terminal validation verdict of a committed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitStatus {
    pub code: TxValidationCode,
    pub block_number: u64,
    /// Whether the transaction committed successfully, equivalent to
    /// `code == Valid`.
    pub successful: bool,
}

/// Tracks a submitted transaction to its commit on the ledger.
pub struct Commit {
    client: Arc<GatewayClient>,
    signing_identity: Arc<SigningIdentity>,
    transaction_id: String,
    signed_request: SignedCommitStatusRequest,
}

impl Commit {
    pub(crate) fn new(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        channel_name: String,
        transaction_id: String,
    ) -> Self {
        let request = CommitStatusRequest {
            transaction_id: transaction_id.clone(),
            channel_id: channel_name,
            identity: signing_identity.creator().to_vec(),
        };
        let signed_request = SignedCommitStatusRequest {
            request: protos::marshal(&request),
            signature: Vec::new(),
        };
        Commit {
            client,
            signing_identity,
            transaction_id,
            signed_request,
        }
    }

    /// Rebuilds a commit from bytes previously obtained with
    /// [`bytes`](Commit::bytes), applying an externally computed signature.
    /// The transaction ID is read back out of the embedded status request.
    pub(crate) fn from_signed_parts(
        client: Arc<GatewayClient>,
        signing_identity: Arc<SigningIdentity>,
        bytes: &[u8],
        signature: Vec<u8>,
    ) -> Result<Self, GatewayError> {
        let mut signed_request: SignedCommitStatusRequest = protos::unmarshal(bytes)?;
        signed_request.signature = signature;

        let request: CommitStatusRequest = protos::unmarshal(&signed_request.request)?;

        Ok(Commit {
            client,
            signing_identity,
            transaction_id: request.transaction_id,
            signed_request,
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Serialized form of the status request, for offline signing.
    pub fn bytes(&self) -> Vec<u8> {
        protos::marshal(&self.signed_request)
    }

    /// The digest a signature must be computed over.
    pub fn digest(&self) -> Vec<u8> {
        self.signing_identity.hash(&self.signed_request.request)
    }

    /// Waits for the transaction to commit and returns its validation
    /// verdict. An unsuccessful verdict is a normal return, not an error.
    pub async fn status(&self) -> Result<CommitStatus, GatewayError> {
        let response = self
            .client
            .commit_status(self.signed_request_with_signature()?)
            .await
            .map_err(|status| {
                GatewayError::CommitStatus(CommitStatusError {
                    transaction_id: self.transaction_id.clone(),
                    status,
                })
            })?;

        let code = TxValidationCode::try_from(response.result)
            .unwrap_or(TxValidationCode::InvalidOtherReason);

        Ok(CommitStatus {
            code,
            block_number: response.block_number,
            successful: code == TxValidationCode::Valid,
        })
    }

    fn signed_request_with_signature(&self) -> Result<SignedCommitStatusRequest, GatewayError> {
        let mut signed_request = self.signed_request.clone();
        if signed_request.signature.is_empty() {
            if !self.signing_identity.has_signer() {
                return Err(GatewayError::Unsupported(
                    "no signer configured and status request carries no signature".into(),
                ));
            }
            signed_request.signature = self.signing_identity.sign(&self.digest())?;
        }
        Ok(signed_request)
    }
}

impl fmt::Debug for Commit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Commit { ")?;
        write!(f, "transaction_id: {:?}, ", self.transaction_id)?;
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
