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

//! Digest implementations for signing.

use sha2::{Digest, Sha256};

use super::Hash;

/// SHA-256 message digest, the default for ECDSA signing identities.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hash;

impl Hash for Sha256Hash {
    fn digest(&self, message: &[u8]) -> Vec<u8> {
        Sha256::digest(message).to_vec()
    }
}

/// Passes the message through unchanged, for signing schemes such as Ed25519
/// that digest internally.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpHash;

impl Hash for NoOpHash {
    fn digest(&self, message: &[u8]) -> Vec<u8> {
        message.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_of_empty_message() {
        let digest = Sha256Hash.digest(b"");

        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn no_op_hash_returns_message() {
        let message = b"MESSAGE".to_vec();
        assert_eq!(NoOpHash.digest(&message), message);
    }
}
