// Minimal example of running LocalDriver with an in-memory receiver and a logging hub
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use avr_driver_core::attributes::EntityAttributes;
use avr_driver_core::definitions::{DeviceState, ReceiverState, StatusCode};
use avr_driver_core::receiver::{ReceiverStatus, ReceiverUpdate};
use avr_driver_core::{
    DeviceConfig, DeviceRegistry, HubClient, HubEvent, IntegrationDriver, LocalDriver, ReceiverConnection,
    ReceiverEvent, ReceiverEventEmitter, ReceiverFactory, SharedReceiver,
};
use avr_driver_core::orchestrator::DriverContext;
use log::info;
use serde_json::json;

struct DemoReceiver {
    id: String,
    events: ReceiverEventEmitter,
    active: AtomicBool,
    status: Mutex<ReceiverStatus>,
}

#[async_trait]
impl ReceiverConnection for DemoReceiver {
    fn id(&self) -> &str {
        &self.id
    }
    async fn connect(&self) {
        self.active.store(true, Ordering::SeqCst);
        self.events.emit(ReceiverEvent::Connected);
    }
    async fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.events.emit(ReceiverEvent::Disconnected);
    }
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
    fn is_healthy(&self) -> bool {
        true
    }
    fn status(&self) -> ReceiverStatus {
        self.status.lock().unwrap().clone()
    }
    async fn refresh(&self) -> StatusCode {
        self.events.emit(ReceiverEvent::Update(None));
        StatusCode::Ok
    }
    async fn power_on(&self) -> StatusCode {
        self.status.lock().unwrap().state = ReceiverState::On;
        self.events.emit(ReceiverEvent::Update(Some(ReceiverUpdate::with_state(ReceiverState::On))));
        StatusCode::Ok
    }
}

struct DemoFactory;

impl ReceiverFactory for DemoFactory {
    fn create_receiver(&self, device: &DeviceConfig, events: ReceiverEventEmitter) -> SharedReceiver {
        Arc::new(DemoReceiver {
            id: device.id.clone(),
            events,
            active: AtomicBool::new(false),
            status: Mutex::new(ReceiverStatus {
                state: ReceiverState::Off,
                volume: Some(35.0),
                source: "CD".into(),
                source_list: vec!["CD".into(), "TV Audio".into()],
                ..Default::default()
            }),
        })
    }
}

struct LoggingHub;

#[async_trait]
impl HubClient for LoggingHub {
    async fn set_device_state(&self, state: DeviceState) {
        info!("hub: device state {:?}", state);
    }
    async fn entity_attributes_changed(&self, entity_id: &str, attributes: &EntityAttributes) {
        info!("hub: {} {}", entity_id, serde_json::to_string(attributes).unwrap_or_default());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let registry = Arc::new(DeviceRegistry::from_devices(vec![DeviceConfig::new(
        "demo",
        "Living room AVR",
        "192.168.1.20",
    )]));
    let context = DriverContext::new(registry, Arc::new(LoggingHub), Arc::new(DemoFactory));
    let driver = LocalDriver::new(context, Duration::from_secs(10));

    // Start orchestrator and status poller
    let handle = driver.run().await?;

    driver.handle_hub_event(HubEvent::Connect).await?;
    driver
        .handle_hub_event(HubEvent::SubscribeEntities(vec!["media_player.demo".to_string()]))
        .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = driver.entity_command("media_player.demo", "on", None).await;
    info!("power on: {}", status);
    let status = driver
        .entity_command("media_player.demo", "volume", Some(&json!({"volume": 50})))
        .await;
    info!("set volume: {}", status);

    info!("Driver example is running. Press Ctrl+C to shut down.");
    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down services...");

    handle.shutdown().await?;
    info!("Services shut down. Exiting.");

    Ok(())
}
