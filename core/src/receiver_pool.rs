// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::receiver::{ReceiverEventEmitter, SharedReceiver};

/// A receiver connection together with the emitter its events go through.
#[derive(Clone)]
pub struct PooledReceiver {
    pub connection: SharedReceiver,
    pub events: ReceiverEventEmitter,
}

/// Active receiver instances keyed by device id.
///
/// Shared between the orchestrator and the status poller. Iteration always works on a snapshot,
/// so membership changes while a batch is running never invalidate the batch.
#[derive(Default)]
pub struct ReceiverPool {
    receivers: Mutex<HashMap<String, PooledReceiver>>,
}

impl ReceiverPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn receivers(&self) -> MutexGuard<'_, HashMap<String, PooledReceiver>> {
        self.receivers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, device_id: &str, receiver: PooledReceiver) {
        self.receivers().insert(device_id.to_string(), receiver);
    }

    pub fn get(&self, device_id: &str) -> Option<PooledReceiver> {
        self.receivers().get(device_id).cloned()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.receivers().contains_key(device_id)
    }

    pub fn remove(&self, device_id: &str) -> Option<PooledReceiver> {
        self.receivers().remove(device_id)
    }

    /// Removes and returns every receiver.
    pub fn drain(&self) -> Vec<PooledReceiver> {
        self.receivers().drain().map(|(_, receiver)| receiver).collect()
    }

    pub fn len(&self) -> usize {
        self.receivers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers().is_empty()
    }

    /// Connections of all receivers at the time of the call.
    pub fn snapshot(&self) -> Vec<SharedReceiver> {
        self.receivers().values().map(|r| r.connection.clone()).collect()
    }
}
