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

//! Client identity and the signing capabilities injected by the application.
//!
//! The library never touches private keys. An application provides an
//! [`Identity`] naming who it is, and optionally a [`Signer`] that produces a
//! signature over a digest. When no signer is configured, every artifact can
//! instead be exported with [`bytes`/`digest`](crate::protocol::Proposal::bytes)
//! and re-imported after the application has signed it out of process.

pub mod error;
pub mod hash;

use std::fmt;

pub use error::SigningError;
pub use hash::Sha256Hash;

use crate::protos;
use crate::protos::msp::SerializedIdentity;

/// A client identity as known to the membership service provider.
pub trait Identity: Send + Sync {
    /// Identifier of the organisation the identity belongs to.
    fn msp_id(&self) -> &str;

    /// Credential material, typically a PEM-encoded X.509 certificate.
    fn credentials(&self) -> &[u8];
}

/// Signs a pre-computed message digest.
pub trait Signer: Send + Sync {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError>;
}

impl<F> Signer for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, SigningError> + Send + Sync,
{
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        self(digest)
    }
}

/// Reduces a message to the digest presented to the [`Signer`].
pub trait Hash: Send + Sync {
    fn digest(&self, message: &[u8]) -> Vec<u8>;
}

impl<F> Hash for F
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    fn digest(&self, message: &[u8]) -> Vec<u8> {
        self(message)
    }
}

/// An identity backed by an X.509 certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct X509Identity {
    msp_id: String,
    credentials: Vec<u8>,
}

impl X509Identity {
    /// Creates an identity from an MSP id and a PEM-encoded certificate. The
    /// certificate is carried opaquely; it is not parsed or validated here.
    pub fn new(msp_id: impl Into<String>, certificate_pem: impl Into<Vec<u8>>) -> Self {
        X509Identity {
            msp_id: msp_id.into(),
            credentials: certificate_pem.into(),
        }
    }
}

impl Identity for X509Identity {
    fn msp_id(&self) -> &str {
        &self.msp_id
    }

    fn credentials(&self) -> &[u8] {
        &self.credentials
    }
}

impl fmt::Debug for X509Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("X509Identity")
            .field("msp_id", &self.msp_id)
            .field("credentials", &format!("<{} bytes>", self.credentials.len()))
            .finish()
    }
}

/// Binds an identity to its injected signing and digest capabilities.
///
/// Shared by every artifact a [`Gateway`](crate::Gateway) produces; the
/// identity and the creator bytes derived from it are fixed at connect time.
pub struct SigningIdentity {
    identity: Box<dyn Identity>,
    signer: Option<Box<dyn Signer>>,
    hash: Box<dyn Hash>,
    creator: Vec<u8>,
}

impl SigningIdentity {
    pub(crate) fn new(
        identity: Box<dyn Identity>,
        signer: Option<Box<dyn Signer>>,
        hash: Box<dyn Hash>,
    ) -> Self {
        let creator = protos::marshal(&SerializedIdentity {
            mspid: identity.msp_id().to_string(),
            id_bytes: identity.credentials().to_vec(),
        });
        SigningIdentity {
            identity,
            signer,
            hash,
            creator,
        }
    }

    pub(crate) fn identity(&self) -> &dyn Identity {
        self.identity.as_ref()
    }

    /// The serialized identity written as the creator of every request
    /// header.
    pub(crate) fn creator(&self) -> &[u8] {
        &self.creator
    }

    pub(crate) fn hash(&self, message: &[u8]) -> Vec<u8> {
        self.hash.digest(message)
    }

    pub(crate) fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Signs a digest with the configured signer, or fails when signing was
    /// left to the application.
    pub(crate) fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self.signer {
            Some(ref signer) => signer.sign(digest),
            None => Err(SigningError::SigningError(
                "no signer configured; sign externally and re-import the signed bytes".into(),
            )),
        }
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("msp_id", &self.identity.msp_id())
            .field("has_signer", &self.signer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protos::unmarshal;

    const CERTIFICATE: &[u8] = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn signing_identity(signer: Option<Box<dyn Signer>>) -> SigningIdentity {
        SigningIdentity::new(
            Box::new(X509Identity::new("Org1MSP", CERTIFICATE)),
            signer,
            Box::new(Sha256Hash),
        )
    }

    #[test]
    fn creator_is_serialized_identity() {
        let signing_identity = signing_identity(None);

        let creator: SerializedIdentity = unmarshal(signing_identity.creator()).unwrap();

        assert_eq!(creator.mspid, "Org1MSP");
        assert_eq!(creator.id_bytes, CERTIFICATE);
    }

    #[test]
    fn sign_without_signer_fails() {
        let signing_identity = signing_identity(None);

        let err = signing_identity
            .sign(b"DIGEST")
            .expect_err("signing must fail without a signer");

        assert!(err.to_string().contains("no signer"), "{}", err);
    }

    #[test]
    fn sign_uses_injected_closure() {
        let signing_identity = signing_identity(Some(Box::new(|digest: &[u8]| {
            let mut signature = b"SIGNED:".to_vec();
            signature.extend_from_slice(digest);
            Ok(signature)
        })));

        let signature = signing_identity.sign(b"DIGEST").unwrap();

        assert_eq!(signature, b"SIGNED:DIGEST");
    }
}
