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

use log::{debug, warn};
use tokio::task::{JoinError, JoinSet};

use crate::receiver::{ReceiverEventEmitter, SharedReceiver};

/// Scheduler for fire-and-forget connect and disconnect operations.
///
/// Tasks submitted for the same receiver are not ordered against each other. The receiver
/// connection is expected to serialize its own state transitions, the last one to finish wins.
#[derive(Default)]
pub struct ConnectionTasks {
    tasks: JoinSet<()>,
}

impl ConnectionTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_connect(&mut self, receiver: SharedReceiver) {
        self.tasks.spawn(async move {
            debug!("[{}] Connecting", receiver.id());
            receiver.connect().await;
        });
    }

    pub fn spawn_disconnect(&mut self, receiver: SharedReceiver) {
        self.tasks.spawn(async move {
            debug!("[{}] Disconnecting", receiver.id());
            receiver.disconnect().await;
        });
    }

    /// Disconnects a receiver that is dropped from the driver and detaches its listener.
    pub fn spawn_remove(&mut self, receiver: SharedReceiver, events: ReceiverEventEmitter) {
        self.tasks.spawn(async move {
            debug!("[{}] Removing receiver", receiver.id());
            receiver.disconnect().await;
            events.remove_all_listeners();
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for the next task to finish. Pending forever while no task is running.
    pub async fn reap_next(&mut self) -> Result<(), JoinError> {
        match self.tasks.join_next().await {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    /// Waits for every submitted task.
    pub async fn wait_all(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!("Connection task failed: {}", e);
            }
        }
    }

    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingReceiver;

    #[tokio::test]
    async fn connect_and_disconnect_of_one_receiver_both_run() {
        let receiver = RecordingReceiver::new("a");
        let mut tasks = ConnectionTasks::new();
        tasks.spawn_connect(receiver.clone());
        tasks.spawn_disconnect(receiver.clone());
        assert_eq!(tasks.len(), 2);
        tasks.wait_all().await;

        // no ordering between the two, only that both reached the connection
        let mut calls = receiver.calls();
        calls.sort();
        assert_eq!(calls, vec!["connect", "disconnect"]);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn remove_detaches_listener_after_disconnect() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let receiver = RecordingReceiver::new("a");
        let events = ReceiverEventEmitter::new("a", tx);
        let mut tasks = ConnectionTasks::new();
        tasks.spawn_remove(receiver.clone(), events.clone());
        tasks.reap_next().await.unwrap();
        assert_eq!(receiver.calls(), vec!["disconnect"]);
        assert!(!events.has_listener());
    }
}
