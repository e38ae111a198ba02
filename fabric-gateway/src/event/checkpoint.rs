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

//! Checkpointing of event stream positions.
//!
//! Event streams do not reconnect on failure. A caller that wants to resume
//! after an interruption records its progress in a checkpointer and passes it
//! when opening the next stream.

use super::chaincode::ChaincodeEvent;

/// A resume position for an event stream.
pub trait Checkpoint {
    /// The block to resume from; zero with no transaction ID means no
    /// position has been recorded.
    fn block_number(&self) -> u64;

    /// The last transaction processed within the block, if any. Events at or
    /// before this transaction are not redelivered.
    fn transaction_id(&self) -> Option<String>;
}

/// Checkpointer holding its position in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCheckpointer {
    block_number: u64,
    transaction_id: Option<String>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        InMemoryCheckpointer::default()
    }

    /// Records that all of `block_number` has been processed; resumption
    /// starts with the following block.
    pub fn checkpoint_block(&mut self, block_number: u64) {
        self.block_number = block_number + 1;
        self.transaction_id = None;
    }

    /// Records a processed transaction within a block.
    pub fn checkpoint_transaction(
        &mut self,
        block_number: u64,
        transaction_id: impl Into<String>,
    ) {
        self.block_number = block_number;
        self.transaction_id = Some(transaction_id.into());
    }

    /// Records a processed chaincode event.
    pub fn checkpoint_chaincode_event(&mut self, event: &ChaincodeEvent) {
        self.checkpoint_transaction(event.block_number, event.transaction_id.clone());
    }
}

impl Checkpoint for InMemoryCheckpointer {
    fn block_number(&self) -> u64 {
        self.block_number
    }

    fn transaction_id(&self) -> Option<String> {
        self.transaction_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_checkpointer_reports_no_position() {
        let checkpointer = InMemoryCheckpointer::new();

        assert_eq!(checkpointer.block_number(), 0);
        assert_eq!(checkpointer.transaction_id(), None);
    }

    #[test]
    fn block_checkpoint_advances_to_next_block() {
        let mut checkpointer = InMemoryCheckpointer::new();

        checkpointer.checkpoint_block(418);

        assert_eq!(checkpointer.block_number(), 419);
        assert_eq!(checkpointer.transaction_id(), None);
    }

    #[test]
    fn transaction_checkpoint_stays_within_block() {
        let mut checkpointer = InMemoryCheckpointer::new();

        checkpointer.checkpoint_transaction(418, "TRANSACTION_ID");

        assert_eq!(checkpointer.block_number(), 418);
        assert_eq!(
            checkpointer.transaction_id(),
            Some("TRANSACTION_ID".to_string())
        );
    }

    #[test]
    fn chaincode_event_checkpoint_records_event_position() {
        let mut checkpointer = InMemoryCheckpointer::new();
        let event = ChaincodeEvent {
            block_number: 7,
            chaincode_name: "CHAINCODE".into(),
            transaction_id: "TRANSACTION_ID".into(),
            event_name: "EVENT".into(),
            payload: Vec::new(),
        };

        checkpointer.checkpoint_chaincode_event(&event);

        assert_eq!(checkpointer.block_number(), 7);
        assert_eq!(
            checkpointer.transaction_id(),
            Some("TRANSACTION_ID".to_string())
        );
    }
}
