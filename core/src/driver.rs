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

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context, Error};
use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::mpsc;

use crate::config::DriverConfig;
use crate::definitions::StatusCode;
use crate::device_registry::DeviceRegistry;
use crate::hub::{HubClient, HubEvent};
use crate::media_player::CommandParams;
use crate::orchestrator::{DriverContext, Orchestrator};
use crate::receiver::ReceiverFactory;
use crate::service::MultiServiceHandle;
use crate::status_poller::run_status_poller;

/// Hub-facing entry points of the integration driver.
#[async_trait]
pub trait IntegrationDriver: Send + Sync {
    /// Queues a hub lifecycle event for the orchestrator.
    async fn handle_hub_event(&self, event: HubEvent) -> Result<(), Error>;

    /// Executes an entity command and returns its status for the hub.
    async fn entity_command(&self, entity_id: &str, cmd_id: &str, params: Option<&serde_json::Value>) -> StatusCode;

    fn available_entities(&self) -> Vec<String>;
    fn configured_entities(&self) -> Vec<String>;
}

/// In-process driver running the orchestrator and the status poller on the current runtime.
pub struct LocalDriver {
    context: DriverContext,
    poll_interval: Duration,
    hub_tx: mpsc::UnboundedSender<HubEvent>,
    hub_rx: Mutex<Option<mpsc::UnboundedReceiver<HubEvent>>>,
}

impl LocalDriver {
    pub fn new(context: DriverContext, poll_interval: Duration) -> Self {
        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        Self {
            context,
            poll_interval,
            hub_tx,
            hub_rx: Mutex::new(Some(hub_rx)),
        }
    }

    /// Creates a driver with the device registry stored in the configured directory.
    pub fn from_config(
        config: &DriverConfig,
        hub: Arc<dyn HubClient>,
        factory: Arc<dyn ReceiverFactory>,
    ) -> Result<Self, Error> {
        let registry = DeviceRegistry::load(&config.config_home)
            .with_context(|| format!("Failed to load device configuration from {}", config.config_home.display()))?;
        let context = DriverContext::new(Arc::new(registry), hub, factory);
        Ok(Self::new(context, config.poll_interval))
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        self.context.registry.clone()
    }

    /// Configures every registered device, then starts the orchestrator and the status poller.
    /// Can only be called once.
    pub async fn run(&self) -> Result<MultiServiceHandle, Error> {
        let hub_rx = self
            .hub_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| anyhow!("Driver is already running"))?;

        let mut orchestrator = Orchestrator::new(self.context.clone(), hub_rx);
        orchestrator.configure_registered_devices();
        info!("Configured {} device(s)", self.context.receivers.len());
        let orch_handle = orchestrator.run();

        let poller_handle = run_status_poller(
            self.context.receivers.clone(),
            self.context.standby.clone(),
            self.poll_interval,
        );

        let mut multi = MultiServiceHandle::with_capacity(2);
        multi.add(orch_handle);
        multi.add(poller_handle);
        Ok(multi)
    }
}

#[async_trait]
impl IntegrationDriver for LocalDriver {
    async fn handle_hub_event(&self, event: HubEvent) -> Result<(), Error> {
        self.hub_tx
            .send(event)
            .map_err(|e| anyhow!("Orchestrator is not running, dropped {:?}", e.0))
    }

    async fn entity_command(&self, entity_id: &str, cmd_id: &str, params: Option<&serde_json::Value>) -> StatusCode {
        let Some(entity) = self.context.entities.get_configured(entity_id) else {
            warn!("Command {} for unconfigured entity {}", cmd_id, entity_id);
            return StatusCode::NotFound;
        };
        let params = match CommandParams::from_json(params) {
            Ok(params) => params,
            Err(e) => {
                warn!("[{}] {}", entity_id, e);
                return StatusCode::BadRequest;
            }
        };
        entity.command(cmd_id, &params).await
    }

    fn available_entities(&self) -> Vec<String> {
        self.context.entities.available_ids()
    }

    fn configured_entities(&self) -> Vec<String> {
        self.context.entities.configured_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_registry::DeviceConfig;
    use crate::test_utils::{RecordingFactory, RecordingHub};
    use serde_json::json;
    use tokio::time::sleep;

    fn driver_with(devices: Vec<DeviceConfig>) -> (LocalDriver, Arc<RecordingFactory>) {
        let factory = RecordingFactory::new();
        let registry = Arc::new(DeviceRegistry::from_devices(devices));
        let context = DriverContext::new(registry, RecordingHub::new(), factory.clone());
        (LocalDriver::new(context, Duration::from_secs(10)), factory)
    }

    #[tokio::test(start_paused = true)]
    async fn commands_reach_configured_entities_only() {
        let (driver, factory) = driver_with(vec![DeviceConfig::new("a", "AVR", "10.0.0.1")]);
        let services = driver.run().await.unwrap();

        assert_eq!(driver.entity_command("media_player.a", "on", None).await, StatusCode::NotFound);

        driver
            .handle_hub_event(HubEvent::SubscribeEntities(vec!["media_player.a".into()]))
            .await
            .unwrap();
        // paused clock: returns after the orchestrator handled the event
        sleep(Duration::from_millis(20)).await;
        assert_eq!(driver.configured_entities(), vec!["media_player.a"]);

        let params = json!({"volume": 42});
        assert_eq!(driver.entity_command("media_player.a", "volume", Some(&params)).await, StatusCode::Ok);
        let bad = json!({"volume": "max"});
        assert_eq!(driver.entity_command("media_player.a", "volume", Some(&bad)).await, StatusCode::BadRequest);
        assert_eq!(factory.receiver("a").unwrap().calls(), vec!["set_volume_level(42)"]);

        services.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn driver_runs_once() {
        let (driver, _) = driver_with(vec![]);
        let services = driver.run().await.unwrap();
        assert!(driver.run().await.is_err());
        services.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn from_config_loads_registry() {
        let dir = tempfile::tempdir().unwrap();
        DeviceRegistry::load(dir.path())
            .unwrap()
            .add_or_update(DeviceConfig::new("a", "AVR", "10.0.0.1"))
            .unwrap();
        let config = DriverConfig { config_home: dir.path().to_path_buf(), ..Default::default() };
        let driver = LocalDriver::from_config(&config, RecordingHub::new(), RecordingFactory::new()).unwrap();
        let services = driver.run().await.unwrap();
        assert_eq!(driver.available_entities(), vec!["media_player.a", "remote.a"]);
        services.shutdown().await.unwrap();
    }
}
