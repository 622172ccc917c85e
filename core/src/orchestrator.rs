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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::select;
use tokio::sync::{broadcast, mpsc};

use crate::connection_tasks::ConnectionTasks;
use crate::definitions::{device_id_from_entity_id, entity_ids_for_device, DeviceState, ReceiverState};
use crate::device_registry::{DeviceConfig, DeviceEvent, DeviceRegistry};
use crate::entity_store::{Entity, EntityStore};
use crate::hub::{HubClient, HubEvent};
use crate::media_player::MediaPlayerEntity;
use crate::receiver::{ReceiverEvent, ReceiverEventEmitter, ReceiverFactory, ReceiverNotification, ReceiverUpdate};
use crate::receiver_pool::{PooledReceiver, ReceiverPool};
use crate::remote::RemoteEntity;
use crate::service::{spawn_service, ServiceHandle};

/// State shared between the orchestrator, the status poller and the driver front end.
#[derive(Clone)]
pub struct DriverContext {
    pub registry: Arc<DeviceRegistry>,
    pub receivers: Arc<ReceiverPool>,
    pub entities: Arc<EntityStore>,
    pub hub: Arc<dyn HubClient>,
    pub factory: Arc<dyn ReceiverFactory>,
    /// Process-wide standby flag. Suspends the status poller while set.
    pub standby: Arc<AtomicBool>,
}

impl DriverContext {
    pub fn new(registry: Arc<DeviceRegistry>, hub: Arc<dyn HubClient>, factory: Arc<dyn ReceiverFactory>) -> Self {
        Self {
            registry,
            receivers: Arc::new(ReceiverPool::new()),
            entities: Arc::new(EntityStore::new()),
            hub,
            factory,
            standby: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn in_standby(&self) -> bool {
        self.standby.load(Ordering::SeqCst)
    }
}

/// Wires hub lifecycle events, receiver events and registry changes together.
///
/// All events are handled sequentially on one task. Connect and disconnect requests that must
/// not block the loop are submitted to [`ConnectionTasks`] and reaped by the loop.
pub struct Orchestrator {
    context: DriverContext,
    hub_rx: mpsc::UnboundedReceiver<HubEvent>,
    receiver_tx: mpsc::UnboundedSender<ReceiverNotification>,
    receiver_rx: mpsc::UnboundedReceiver<ReceiverNotification>,
    registry_rx: broadcast::Receiver<DeviceEvent>,
    tasks: ConnectionTasks,
}

impl Orchestrator {
    pub fn new(context: DriverContext, hub_rx: mpsc::UnboundedReceiver<HubEvent>) -> Self {
        let (receiver_tx, receiver_rx) = mpsc::unbounded_channel();
        let registry_rx = context.registry.subscribe();
        Self {
            context,
            hub_rx,
            receiver_tx,
            receiver_rx,
            registry_rx,
            tasks: ConnectionTasks::new(),
        }
    }

    /// Creates receivers and entities for every registered device, without connecting.
    pub fn configure_registered_devices(&mut self) {
        for device in self.context.registry.all() {
            self.configure_device(&device, false);
        }
    }

    /// Spawn the orchestrator event loop in background and return a handle.
    pub fn run(mut self) -> ServiceHandle {
        spawn_service(move |mut stop| async move {
            loop {
                select! {
                    biased;
                    _ = stop.signaled() => {
                        info!("Orchestrator shutdown requested");
                        break;
                    }
                    hub_evt = self.hub_rx.recv() => {
                        match hub_evt {
                            Some(evt) => self.on_hub_event(evt).await,
                            None => {
                                info!("Hub event channel closed; stopping orchestrator");
                                break;
                            }
                        }
                    }
                    Some(notification) = self.receiver_rx.recv() => {
                        self.on_receiver_event(notification).await;
                    }
                    recv_res = self.registry_rx.recv() => {
                        match recv_res {
                            Ok(evt) => self.on_registry_event(evt).await,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("DeviceEvent lagged by {} messages; catching up", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Device registry closed; stopping orchestrator");
                                break;
                            }
                        }
                    }
                    res = self.tasks.reap_next() => {
                        if let Err(e) = res {
                            warn!("Connection task failed: {}", e);
                        }
                    }
                }
            }
            self.tasks.abort_all();
        })
    }

    async fn on_hub_event(&mut self, evt: HubEvent) {
        match evt {
            HubEvent::Connect => self.handle_hub_connect().await,
            HubEvent::Disconnect => self.handle_hub_disconnect(),
            HubEvent::EnterStandby => self.handle_enter_standby().await,
            HubEvent::ExitStandby => self.handle_exit_standby(),
            HubEvent::SubscribeEntities(entity_ids) => self.handle_subscribe_entities(entity_ids).await,
            HubEvent::UnsubscribeEntities(entity_ids) => self.handle_unsubscribe_entities(entity_ids).await,
        }
    }

    async fn on_receiver_event(&mut self, notification: ReceiverNotification) {
        let ReceiverNotification { receiver_id, event } = notification;
        match event {
            ReceiverEvent::Connecting => debug!("AVR connecting: {}", receiver_id),
            ReceiverEvent::Connected => self.handle_receiver_connected(&receiver_id).await,
            ReceiverEvent::Disconnected => {
                debug!("AVR disconnected: {}", receiver_id);
                self.set_entities_unavailable(&receiver_id).await;
            }
            ReceiverEvent::Error(message) => {
                error!("[{}] {}", receiver_id, message);
                self.set_entities_unavailable(&receiver_id).await;
            }
            ReceiverEvent::Update(update) => self.handle_receiver_update(&receiver_id, update).await,
            ReceiverEvent::AddressChanged(address) => self.handle_address_change(&receiver_id, &address),
        }
    }

    async fn on_registry_event(&mut self, evt: DeviceEvent) {
        match evt {
            DeviceEvent::Added(device) => {
                debug!("New device added: {}", device.id);
                self.context.hub.set_device_state(DeviceState::Connected).await;
                self.configure_device(&device, false);
            }
            DeviceEvent::Updated(device) => {
                debug!("Device configuration updated: {}", device.id);
            }
            DeviceEvent::Removed(device) => self.handle_device_removed(&device),
            DeviceEvent::Cleared => self.handle_registry_cleared(),
        }
    }

    // Hub events

    async fn handle_hub_connect(&mut self) {
        debug!("Hub connect command: connecting device(s)");
        self.context.hub.set_device_state(DeviceState::Connected).await;
        for receiver in self.context.receivers.snapshot() {
            self.tasks.spawn_connect(receiver);
        }
    }

    fn handle_hub_disconnect(&mut self) {
        debug!("Hub disconnect command: disconnecting device(s)");
        for receiver in self.context.receivers.snapshot() {
            self.tasks.spawn_disconnect(receiver);
        }
    }

    async fn handle_enter_standby(&mut self) {
        debug!("Enter standby event: disconnecting device(s)");
        self.context.standby.store(true, Ordering::SeqCst);
        for receiver in self.context.receivers.snapshot() {
            receiver.disconnect().await;
        }
    }

    fn handle_exit_standby(&mut self) {
        debug!("Exit standby event: connecting device(s)");
        self.context.standby.store(false, Ordering::SeqCst);
        for receiver in self.context.receivers.snapshot() {
            self.tasks.spawn_connect(receiver);
        }
    }

    async fn handle_subscribe_entities(&mut self, entity_ids: Vec<String>) {
        debug!("Subscribe entities event: {:?}", entity_ids);
        // a subscription means the hub is awake
        self.context.standby.store(false, Ordering::SeqCst);

        for entity_id in entity_ids {
            let Some(device_id) = device_id_from_entity_id(&entity_id).map(str::to_string) else {
                error!("Failed to subscribe entity {}: unknown entity type", entity_id);
                continue;
            };

            if let Some(receiver) = self.context.receivers.get(&device_id) {
                self.context.entities.configure(&entity_id);
                if !receiver.events.has_listener() {
                    debug!("[{}] Re-attaching listener", device_id);
                    receiver.events.attach(self.receiver_tx.clone());
                    self.tasks.spawn_connect(receiver.connection.clone());
                }
                let update = ReceiverUpdate::from(&receiver.connection.status());
                self.push_entity_update(&entity_id, &update).await;
                continue;
            }

            match self.context.registry.get(&device_id) {
                Some(device) => {
                    self.configure_device(&device, true);
                    self.context.entities.configure(&entity_id);
                }
                None => error!("Failed to subscribe entity {}: no AVR configuration found", entity_id),
            }
        }
    }

    async fn handle_unsubscribe_entities(&mut self, entity_ids: Vec<String>) {
        debug!("Unsubscribe entities event: {:?}", entity_ids);
        for entity_id in entity_ids {
            self.context.entities.unconfigure(&entity_id);
            let Some(device_id) = device_id_from_entity_id(&entity_id) else {
                continue;
            };
            // TODO: keep the receiver connected while another entity of the device is still subscribed
            if let Some(receiver) = self.context.receivers.get(device_id) {
                receiver.connection.disconnect().await;
                receiver.events.remove_all_listeners();
            }
        }
    }

    // Receiver events

    async fn handle_receiver_connected(&mut self, receiver_id: &str) {
        debug!("AVR connected: {}", receiver_id);
        if !self.context.receivers.contains(receiver_id) {
            warn!("AVR {} is not configured", receiver_id);
            return;
        }
        self.context.hub.set_device_state(DeviceState::Connected).await;
        self.push_receiver_update(receiver_id, &ReceiverUpdate::with_state(ReceiverState::Unknown))
            .await;
    }

    async fn set_entities_unavailable(&mut self, receiver_id: &str) {
        self.push_receiver_update(receiver_id, &ReceiverUpdate::with_state(ReceiverState::Unavailable))
            .await;
    }

    async fn handle_receiver_update(&mut self, receiver_id: &str, update: Option<ReceiverUpdate>) {
        let update = match update {
            Some(update) => {
                info!("[{}] AVR update: {:?}", receiver_id, update);
                update
            }
            None => match self.context.receivers.get(receiver_id) {
                Some(receiver) => ReceiverUpdate::from(&receiver.connection.status()),
                None => return,
            },
        };
        self.push_receiver_update(receiver_id, &update).await;
    }

    fn handle_address_change(&mut self, receiver_id: &str, address: &str) {
        let Some(mut device) = self.context.registry.get(receiver_id) else {
            return;
        };
        if device.address == address {
            return;
        }
        info!(
            "Updating IP address of configured AVR {}: {} -> {}",
            receiver_id, device.address, address
        );
        device.address = address.to_string();
        if let Err(e) = self.context.registry.update(device) {
            error!("Failed to persist address of AVR {}: {}", receiver_id, e);
        }
    }

    // Registry events

    fn handle_device_removed(&mut self, device: &DeviceConfig) {
        let Some(receiver) = self.context.receivers.remove(&device.id) else {
            return;
        };
        debug!("Disconnecting from removed AVR {}", device.id);
        self.tasks.spawn_remove(receiver.connection, receiver.events);
        for entity_id in entity_ids_for_device(&device.id) {
            self.context.entities.remove(&entity_id);
        }
    }

    fn handle_registry_cleared(&mut self) {
        debug!("Configuration cleared, disconnecting & removing all configured AVR instances");
        for receiver in self.context.receivers.drain() {
            self.tasks.spawn_remove(receiver.connection, receiver.events);
        }
        self.context.entities.clear();
    }

    // Helpers

    /// Creates the receiver of a device if needed and registers its entities as available.
    fn configure_device(&mut self, device: &DeviceConfig, connect: bool) {
        let receiver = match self.context.receivers.get(&device.id) {
            Some(existing) => {
                if !connect {
                    self.tasks.spawn_disconnect(existing.connection.clone());
                }
                existing.connection
            }
            None => {
                let events = ReceiverEventEmitter::new(device.id.clone(), self.receiver_tx.clone());
                let connection = self.context.factory.create_receiver(device, events.clone());
                self.context.receivers.insert(
                    &device.id,
                    PooledReceiver { connection: connection.clone(), events },
                );
                connection
            }
        };

        if connect {
            self.tasks.spawn_connect(receiver.clone());
        }

        let entities = &self.context.entities;
        entities.add_available(Entity::MediaPlayer(MediaPlayerEntity::new(device, Some(receiver.clone()))));
        entities.add_available(Entity::Remote(RemoteEntity::new(device, Some(receiver.clone()))));
        entities.set_receiver(&device.id, Some(receiver));
    }

    /// Runs an update through the synchronizer for every entity of a receiver and pushes the deltas.
    async fn push_receiver_update(&self, receiver_id: &str, update: &ReceiverUpdate) {
        for entity_id in entity_ids_for_device(receiver_id) {
            self.push_entity_update(&entity_id, update).await;
        }
    }

    async fn push_entity_update(&self, entity_id: &str, update: &ReceiverUpdate) {
        if let Some(delta) = self.context.entities.apply_receiver_update(entity_id, update) {
            self.context.hub.entity_attributes_changed(entity_id, &delta).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{EntityAttributes, MediaPlayerAttributes, RemoteAttributes};
    use crate::definitions::{MediaPlayerState, RemoteState};
    use crate::test_utils::{RecordingFactory, RecordingHub};
    use tokio::time::{sleep, Duration};

    struct Harness {
        context: DriverContext,
        hub: Arc<RecordingHub>,
        factory: Arc<RecordingFactory>,
        hub_tx: mpsc::UnboundedSender<HubEvent>,
        handle: ServiceHandle,
    }

    fn start(devices: Vec<DeviceConfig>) -> Harness {
        let hub = RecordingHub::new();
        let factory = RecordingFactory::new();
        let registry = Arc::new(DeviceRegistry::from_devices(devices));
        let context = DriverContext::new(registry, hub.clone(), factory.clone());
        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        let mut orchestrator = Orchestrator::new(context.clone(), hub_rx);
        orchestrator.configure_registered_devices();
        let handle = orchestrator.run();
        Harness { context, hub, factory, hub_tx, handle }
    }

    fn device(id: &str) -> DeviceConfig {
        DeviceConfig::new(id, format!("AVR {id}"), "192.168.1.50")
    }

    /// Tests run on a paused clock, so time only advances once every spawned task is idle.
    async fn short_wait() {
        sleep(Duration::from_millis(20)).await
    }

    fn media_player_state(state: MediaPlayerState) -> EntityAttributes {
        EntityAttributes::MediaPlayer(MediaPlayerAttributes { state: Some(state), ..Default::default() })
    }

    fn remote_state(state: RemoteState) -> EntityAttributes {
        EntityAttributes::Remote(RemoteAttributes { state: Some(state) })
    }

    async fn subscribe(h: &Harness, ids: &[&str]) {
        let ids = ids.iter().map(|s| s.to_string()).collect();
        h.hub_tx.send(HubEvent::SubscribeEntities(ids)).unwrap();
        short_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn startup_configures_without_connecting() {
        let h = start(vec![device("a"), device("b")]);
        short_wait().await;

        assert_eq!(h.factory.created_count(), 2);
        assert!(h.factory.receiver("a").unwrap().calls().is_empty());
        assert_eq!(
            h.context.entities.available_ids(),
            vec!["media_player.a", "media_player.b", "remote.a", "remote.b"]
        );
        assert!(h.context.entities.configured_ids().is_empty());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hub_connect_and_disconnect_reach_every_receiver() {
        let h = start(vec![device("a"), device("b")]);
        h.hub_tx.send(HubEvent::Connect).unwrap();
        short_wait().await;
        assert_eq!(h.hub.take_device_states(), vec![DeviceState::Connected]);
        for id in ["a", "b"] {
            assert_eq!(h.factory.receiver(id).unwrap().take_calls(), vec!["connect"]);
        }

        h.hub_tx.send(HubEvent::Disconnect).unwrap();
        short_wait().await;
        for id in ["a", "b"] {
            assert_eq!(h.factory.receiver(id).unwrap().take_calls(), vec!["disconnect"]);
        }
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn connected_event_resets_state_to_unknown_once() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["media_player.a", "remote.a"]).await;
        let receiver = h.factory.receiver("a").unwrap();
        receiver.update_status(|s| s.state = ReceiverState::Playing);
        receiver.emit(ReceiverEvent::Update(None));
        short_wait().await;
        h.hub.take_updates();
        h.hub.take_device_states();

        receiver.emit(ReceiverEvent::Connected);
        short_wait().await;
        assert_eq!(h.hub.take_device_states(), vec![DeviceState::Connected]);
        assert_eq!(
            h.hub.take_updates(),
            vec![
                ("media_player.a".to_string(), media_player_state(MediaPlayerState::Unknown)),
                ("remote.a".to_string(), remote_state(RemoteState::Unknown)),
            ]
        );

        receiver.emit(ReceiverEvent::Connected);
        short_wait().await;
        assert!(h.hub.take_updates().is_empty());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_and_error_mark_entities_unavailable_idempotently() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["media_player.a"]).await;
        let receiver = h.factory.receiver("a").unwrap();
        receiver.emit(ReceiverEvent::Connected);
        short_wait().await;
        h.hub.take_updates();

        receiver.emit(ReceiverEvent::Disconnected);
        short_wait().await;
        assert_eq!(
            h.hub.take_updates(),
            vec![("media_player.a".to_string(), media_player_state(MediaPlayerState::Unavailable))]
        );

        receiver.emit(ReceiverEvent::Error("connection lost".into()));
        short_wait().await;
        assert!(h.hub.take_updates().is_empty());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_pushes_current_receiver_state() {
        let h = start(vec![device("a")]);
        let receiver = h.factory.receiver("a").unwrap();
        receiver.update_status(|s| {
            s.state = ReceiverState::On;
            s.volume = Some(35.0);
            s.source = "TV".into();
        });

        subscribe(&h, &["media_player.a"]).await;
        let updates = h.hub.take_updates();
        assert_eq!(updates.len(), 1);
        let EntityAttributes::MediaPlayer(delta) = &updates[0].1 else {
            panic!("unexpected delta {:?}", updates[0].1);
        };
        assert_eq!(delta.state, Some(MediaPlayerState::On));
        assert_eq!(delta.volume, Some(35.0));
        assert_eq!(delta.source.as_deref(), Some("TV"));
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_creates_receiver_for_known_device_only() {
        let h = start(vec![]);
        h.context.registry.add_or_update(device("late")).unwrap();
        short_wait().await;
        // registry add creates the receiver without connecting
        assert_eq!(h.factory.created_count(), 1);
        assert!(h.factory.receiver("late").unwrap().calls().is_empty());

        subscribe(&h, &["media_player.ghost"]).await;
        assert_eq!(h.factory.created_count(), 1);
        assert!(!h.context.entities.is_configured("media_player.ghost"));
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_of_unconfigured_receiver_connects_it() {
        let h = start(vec![]);
        // the device is persisted but the driver never configured a receiver for it
        h.context.registry.add_or_update(device("x")).unwrap();
        short_wait().await;
        h.context.receivers.remove("x");

        subscribe(&h, &["media_player.x"]).await;
        let receiver = h.factory.receiver("x").unwrap();
        assert!(receiver.calls().contains(&"connect".to_string()));
        assert!(h.context.entities.is_configured("media_player.x"));
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_is_idempotent_and_resubscribe_reattaches() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["media_player.a"]).await;
        let receiver = h.factory.receiver("a").unwrap();
        receiver.take_calls();

        let unsubscribe = HubEvent::UnsubscribeEntities(vec!["media_player.a".into()]);
        h.hub_tx.send(unsubscribe.clone()).unwrap();
        h.hub_tx.send(unsubscribe).unwrap();
        short_wait().await;

        assert_eq!(receiver.take_calls(), vec!["disconnect", "disconnect"]);
        assert!(h.context.receivers.contains("a"));
        assert!(!h.context.entities.is_configured("media_player.a"));
        // listener removed, events no longer reach the driver
        assert!(!receiver.emit(ReceiverEvent::Connected));

        subscribe(&h, &["media_player.a"]).await;
        assert_eq!(receiver.take_calls(), vec!["connect"]);
        assert!(receiver.emit(ReceiverEvent::Disconnected));
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn standby_disconnects_and_wakes_up() {
        let h = start(vec![device("a")]);
        h.hub_tx.send(HubEvent::EnterStandby).unwrap();
        short_wait().await;
        assert!(h.context.in_standby());
        assert_eq!(h.factory.receiver("a").unwrap().take_calls(), vec!["disconnect"]);

        h.hub_tx.send(HubEvent::ExitStandby).unwrap();
        short_wait().await;
        assert!(!h.context.in_standby());
        assert_eq!(h.factory.receiver("a").unwrap().take_calls(), vec!["connect"]);

        h.hub_tx.send(HubEvent::EnterStandby).unwrap();
        short_wait().await;
        subscribe(&h, &["remote.a"]).await;
        assert!(!h.context.in_standby());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn update_events_push_only_changes() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["media_player.a"]).await;
        h.hub.take_updates();
        let receiver = h.factory.receiver("a").unwrap();

        let update = ReceiverUpdate { volume: Some(50.0), muted: Some(true), ..Default::default() };
        receiver.emit(ReceiverEvent::Update(Some(update.clone())));
        receiver.emit(ReceiverEvent::Update(Some(update)));
        short_wait().await;

        assert_eq!(
            h.hub.take_updates(),
            vec![(
                "media_player.a".to_string(),
                EntityAttributes::MediaPlayer(MediaPlayerAttributes {
                    volume: Some(50.0),
                    muted: Some(true),
                    ..Default::default()
                })
            )]
        );
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_media_player_does_not_block_remote_update() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["remote.a"]).await;
        h.hub.take_updates();
        let receiver = h.factory.receiver("a").unwrap();

        receiver.emit(ReceiverEvent::Update(Some(ReceiverUpdate::with_state(ReceiverState::Off))));
        short_wait().await;
        assert_eq!(h.hub.take_updates(), vec![("remote.a".to_string(), remote_state(RemoteState::Off))]);
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn address_change_is_persisted_once() {
        let h = start(vec![device("a")]);
        let mut registry_rx = h.context.registry.subscribe();
        let receiver = h.factory.receiver("a").unwrap();

        receiver.emit(ReceiverEvent::AddressChanged("192.168.1.50".into()));
        receiver.emit(ReceiverEvent::AddressChanged("192.168.1.77".into()));
        short_wait().await;

        assert_eq!(h.context.registry.get("a").unwrap().address, "192.168.1.77");
        let DeviceEvent::Updated(updated) = registry_rx.try_recv().unwrap() else {
            panic!("expected update event");
        };
        assert_eq!(updated.address, "192.168.1.77");
        assert!(registry_rx.try_recv().is_err());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn removed_device_is_disconnected_and_forgotten() {
        let h = start(vec![device("a"), device("b")]);
        subscribe(&h, &["media_player.a", "media_player.b"]).await;
        let a = h.factory.receiver("a").unwrap();
        a.take_calls();

        h.context.registry.remove("a").unwrap();
        short_wait().await;
        assert_eq!(a.take_calls(), vec!["disconnect"]);
        assert!(!h.context.receivers.contains("a"));
        assert!(!h.context.entities.contains_available("media_player.a"));
        assert!(!h.context.entities.is_configured("media_player.a"));
        assert!(h.context.entities.is_configured("media_player.b"));
        assert!(!a.emit(ReceiverEvent::Connected));

        h.context.registry.clear().unwrap();
        short_wait().await;
        assert!(h.context.receivers.is_empty());
        assert!(h.context.entities.available_ids().is_empty());
        let _ = h.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_resync_for_unknown_receiver_is_ignored() {
        let h = start(vec![device("a")]);
        subscribe(&h, &["media_player.a"]).await;
        h.hub.take_updates();
        let receiver = h.factory.receiver("a").unwrap();

        h.context.receivers.remove("a");
        receiver.update_status(|s| s.state = ReceiverState::On);
        receiver.emit(ReceiverEvent::Update(None));
        short_wait().await;
        assert!(h.hub.take_updates().is_empty());
        let _ = h.handle.shutdown().await;
    }
}
