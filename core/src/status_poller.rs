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

//! Periodic data refresh of receivers whose push channel is unhealthy.
//!
//! Changes made on the receiver by another source only arrive over the telnet channel. When that
//! channel is down the receiver data is refreshed by polling instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::select;
use tokio::time::Instant;

use crate::receiver_pool::ReceiverPool;
use crate::service::{spawn_service, ServiceHandle};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const MIN_POLL_DELAY: Duration = Duration::from_secs(1);

/// Delay until the next poll cycle, keeping a stable period: `interval - elapsed` clamped
/// to at least one second and at most `interval`.
pub fn next_poll_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_POLL_DELAY).min(interval)
}

/// Refreshes every active receiver with an unhealthy push channel, concurrently.
/// Returns the number of refreshed receivers.
pub async fn poll_unhealthy_receivers(receivers: &ReceiverPool) -> usize {
    let due: Vec<_> = receivers
        .snapshot()
        .into_iter()
        .filter(|r| r.is_active() && !r.is_healthy())
        .collect();
    if due.is_empty() {
        return 0;
    }

    let results = join_all(due.iter().map(|r| r.refresh())).await;
    for (receiver, status) in due.iter().zip(results) {
        if !status.is_ok() {
            warn!("[{}] Refreshing receiver data failed: {}", receiver.id(), status);
        }
    }
    due.len()
}

/// Starts the status poller. Cycles are skipped while `standby` is set.
pub fn run_status_poller(receivers: Arc<ReceiverPool>, standby: Arc<AtomicBool>, interval: Duration) -> ServiceHandle {
    spawn_service(move |mut stop| async move {
        info!("Status poller started, interval {:?}", interval);
        loop {
            let start = Instant::now();
            if !standby.load(Ordering::SeqCst) {
                let refreshed = poll_unhealthy_receivers(&receivers).await;
                if refreshed > 0 {
                    debug!("Refreshed {} receiver(s)", refreshed);
                }
            }
            let delay = next_poll_delay(interval, start.elapsed());
            select! {
                _ = stop.signaled() => {
                    info!("Status poller shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    })
}
