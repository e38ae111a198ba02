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

//! Protocol buffer messages exchanged with the Fabric Gateway.
//!
//! The message definitions are maintained by hand rather than generated at
//! build time, so the crate builds without a protoc toolchain. Field numbers
//! and types match the published Fabric protos; changing them breaks wire
//! compatibility.

pub mod common;
pub mod gateway;
pub mod msp;
pub mod orderer;
pub mod peer;
pub mod rpc;

use std::error::Error as StdError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;

#[derive(Debug)]
pub enum ProtoConversionError {
    DeserializationError(String),
}

impl StdError for ProtoConversionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ProtoConversionError::DeserializationError(_) => None,
        }
    }
}

impl fmt::Display for ProtoConversionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProtoConversionError::DeserializationError(ref s) => {
                write!(f, "DeserializationError: {}", s)
            }
        }
    }
}

/// Encodes a message to its canonical byte representation.
pub fn marshal<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decodes a message from bytes, reporting the expected message type on
/// failure.
pub fn unmarshal<M: Message + Default>(bytes: &[u8]) -> Result<M, ProtoConversionError> {
    M::decode(bytes).map_err(|err| {
        ProtoConversionError::DeserializationError(format!(
            "unable to get {} from bytes: {}",
            short_type_name::<M>(),
            err
        ))
    })
}

/// The current wall-clock time as a protobuf timestamp.
pub fn timestamp_now() -> prost_types::Timestamp {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    prost_types::Timestamp {
        seconds: now.as_secs() as i64,
        nanos: now.subsec_nanos() as i32,
    }
}

fn short_type_name<M>() -> &'static str {
    let name = std::any::type_name::<M>();
    name.rsplit("::").next().unwrap_or(name)
}
