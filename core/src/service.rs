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

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

/// Lets a background task observe a stop request.
pub struct StopHandle {
    shutdown_rx: oneshot::Receiver<()>,
}

impl StopHandle {
    fn new(shutdown_rx: oneshot::Receiver<()>) -> Self {
        Self { shutdown_rx }
    }

    /// Resolves once a stop was requested or the owning [`ServiceHandle`] was dropped.
    ///
    /// Meant to be used as a branch of `tokio::select!` in the service loop:
    ///
    /// ```rust
    /// use avr_driver_core::spawn_service;
    ///
    /// async fn run_service() {
    ///     let service_handle = spawn_service(move |mut stop_handle| async move {
    ///         stop_handle.signaled().await;
    ///     });
    ///     service_handle.shutdown().await.unwrap();
    /// }
    /// ```
    pub async fn signaled(&mut self) {
        (&mut self.shutdown_rx).await.unwrap_or_default();
    }
}

/// Handle of a background service task supporting cooperative shutdown and abort.
pub struct ServiceHandle {
    join: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServiceHandle {
    pub fn new(join: JoinHandle<()>, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self { join, shutdown_tx: Some(shutdown_tx) }
    }

    /// Sends the stop request without waiting for the task.
    pub fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task without sending a stop request.
    pub async fn await_join(self) -> Result<(), JoinError> {
        self.join.await
    }

    /// Requests a stop and waits for the task to finish.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        self.request_shutdown();
        self.await_join().await
    }

    pub fn abort(self) {
        self.join.abort();
    }
}

/// Spawns a background service on the Tokio runtime.
///
/// `f` receives the [`StopHandle`] it has to watch; the returned [`ServiceHandle`] stops or aborts it.
pub fn spawn_service<Fut, Func>(f: Func) -> ServiceHandle
where
    Fut: Future<Output = ()> + Send + 'static,
    Func: FnOnce(StopHandle) -> Fut + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let stop = StopHandle::new(shutdown_rx);
    let join = tokio::spawn(async move {
        f(stop).await;
    });
    ServiceHandle::new(join, shutdown_tx)
}

/// Several services stopped together.
#[derive(Default)]
pub struct MultiServiceHandle {
    handles: Vec<ServiceHandle>,
}

impl MultiServiceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { handles: Vec::with_capacity(cap) }
    }

    pub fn add(&mut self, handle: ServiceHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Requests a stop of every service first, then waits for all of them.
    /// Returns the first join error, if any.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        for h in &mut self.handles {
            h.request_shutdown();
        }
        let mut first_err: Option<JoinError> = None;
        for h in self.handles.into_iter() {
            if let Err(e) = h.await_join().await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
