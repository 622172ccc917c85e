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

//! Hub-side entity bookkeeping.
//!
//! The hub distinguishes *available* entities (everything the driver offers) from *configured*
//! entities (the ones the hub subscribed to). Attribute deltas are only computed and pushed for
//! configured entities.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::attributes::EntityAttributes;
use crate::definitions::{device_id_from_entity_id, StatusCode};
use crate::media_player::{CommandParams, MediaPlayerEntity};
use crate::receiver::{ReceiverUpdate, SharedReceiver};
use crate::remote::RemoteEntity;

#[derive(Debug, Clone)]
pub enum Entity {
    MediaPlayer(MediaPlayerEntity),
    Remote(RemoteEntity),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::MediaPlayer(entity) => entity.id(),
            Entity::Remote(entity) => entity.id(),
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        device_id_from_entity_id(self.id())
    }

    pub fn attributes(&self) -> EntityAttributes {
        match self {
            Entity::MediaPlayer(entity) => EntityAttributes::MediaPlayer(entity.attributes().clone()),
            Entity::Remote(entity) => EntityAttributes::Remote(entity.attributes().clone()),
        }
    }

    pub fn receiver(&self) -> Option<&SharedReceiver> {
        match self {
            Entity::MediaPlayer(entity) => entity.receiver(),
            Entity::Remote(entity) => entity.receiver(),
        }
    }

    pub fn set_receiver(&mut self, receiver: Option<SharedReceiver>) {
        match self {
            Entity::MediaPlayer(entity) => entity.set_receiver(receiver),
            Entity::Remote(entity) => entity.set_receiver(receiver),
        }
    }

    /// Computes the attribute delta for a receiver update.
    pub fn filter_changed_attributes(&self, update: &ReceiverUpdate) -> EntityAttributes {
        match self {
            Entity::MediaPlayer(entity) => EntityAttributes::MediaPlayer(entity.filter_changed_attributes(update)),
            Entity::Remote(entity) => EntityAttributes::Remote(entity.filter_changed_attributes(update)),
        }
    }

    /// Applies a delta to the recorded attributes.
    pub fn merge_attributes(&mut self, delta: &EntityAttributes) {
        match (self, delta) {
            (Entity::MediaPlayer(entity), EntityAttributes::MediaPlayer(delta)) => entity.attributes_mut().merge(delta),
            (Entity::Remote(entity), EntityAttributes::Remote(delta)) => entity.attributes_mut().merge(delta),
            _ => {}
        }
    }

    pub async fn command(&self, cmd_id: &str, params: &CommandParams) -> StatusCode {
        match self {
            Entity::MediaPlayer(entity) => entity.command(cmd_id, params).await,
            Entity::Remote(entity) => entity.command(cmd_id, params).await,
        }
    }
}

#[derive(Default)]
struct Entities {
    available: HashMap<String, Entity>,
    configured: HashMap<String, Entity>,
}

/// Available and configured entities, keyed by entity id.
#[derive(Default)]
pub struct EntityStore {
    entities: Mutex<Entities>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entities(&self) -> MutexGuard<'_, Entities> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers an entity to the hub. Replaces an available entity with the same id.
    pub fn add_available(&self, entity: Entity) {
        self.entities().available.insert(entity.id().to_string(), entity);
    }

    pub fn contains_available(&self, entity_id: &str) -> bool {
        self.entities().available.contains_key(entity_id)
    }

    pub fn available_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entities().available.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Marks an available entity as configured. Returns false if it is not available.
    pub fn configure(&self, entity_id: &str) -> bool {
        let mut entities = self.entities();
        let Some(entity) = entities.available.get(entity_id).cloned() else {
            return false;
        };
        entities.configured.entry(entity_id.to_string()).or_insert(entity);
        true
    }

    pub fn unconfigure(&self, entity_id: &str) -> Option<Entity> {
        self.entities().configured.remove(entity_id)
    }

    pub fn is_configured(&self, entity_id: &str) -> bool {
        self.entities().configured.contains_key(entity_id)
    }

    /// Snapshot of a configured entity.
    pub fn get_configured(&self, entity_id: &str) -> Option<Entity> {
        self.entities().configured.get(entity_id).cloned()
    }

    pub fn configured_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entities().configured.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Removes an entity from both the available and the configured list.
    pub fn remove(&self, entity_id: &str) {
        let mut entities = self.entities();
        entities.available.remove(entity_id);
        entities.configured.remove(entity_id);
    }

    pub fn clear(&self) {
        let mut entities = self.entities();
        entities.available.clear();
        entities.configured.clear();
    }

    /// Binds (or unbinds) a receiver to every entity of a device, available and configured.
    pub fn set_receiver(&self, device_id: &str, receiver: Option<SharedReceiver>) {
        let mut entities = self.entities();
        let Entities { available, configured } = &mut *entities;
        for entity in available.values_mut().chain(configured.values_mut()) {
            if entity.device_id() == Some(device_id) {
                entity.set_receiver(receiver.clone());
            }
        }
    }

    /// Runs a receiver update through the synchronizer for a configured entity.
    ///
    /// The delta is merged into the recorded attributes and returned if it is not empty.
    /// Returns `None` if the entity is not configured or nothing changed.
    pub fn apply_receiver_update(&self, entity_id: &str, update: &ReceiverUpdate) -> Option<EntityAttributes> {
        let mut entities = self.entities();
        let entity = entities.configured.get_mut(entity_id)?;
        let delta = entity.filter_changed_attributes(update);
        if delta.is_empty() {
            return None;
        }
        entity.merge_attributes(&delta);
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::MediaPlayerAttributes;
    use crate::definitions::{MediaPlayerState, ReceiverState, RemoteState};
    use crate::device_registry::DeviceConfig;
    use crate::test_utils::RecordingReceiver;

    fn store_with_device(device_id: &str) -> EntityStore {
        let device = DeviceConfig::new(device_id, "AVR", "10.0.0.1");
        let store = EntityStore::new();
        store.add_available(Entity::MediaPlayer(MediaPlayerEntity::new(&device, None)));
        store.add_available(Entity::Remote(RemoteEntity::new(&device, None)));
        store
    }

    #[test]
    fn only_available_entities_can_be_configured() {
        let store = store_with_device("a");
        assert!(store.configure("media_player.a"));
        assert!(!store.configure("media_player.b"));
        assert_eq!(store.configured_ids(), vec!["media_player.a"]);
        assert_eq!(store.available_ids(), vec!["media_player.a", "remote.a"]);
    }

    #[test]
    fn updates_apply_to_configured_entities_only() {
        let store = store_with_device("a");
        let update = ReceiverUpdate::with_state(ReceiverState::Playing);
        assert_eq!(store.apply_receiver_update("media_player.a", &update), None);

        store.configure("media_player.a");
        store.configure("remote.a");
        let delta = store.apply_receiver_update("media_player.a", &update).unwrap();
        assert_eq!(
            delta,
            EntityAttributes::MediaPlayer(MediaPlayerAttributes {
                state: Some(MediaPlayerState::Playing),
                ..Default::default()
            })
        );
        let delta = store.apply_receiver_update("remote.a", &update).unwrap();
        assert_eq!(delta, EntityAttributes::Remote(crate::attributes::RemoteAttributes { state: Some(RemoteState::On) }));

        // recorded attributes were merged, a repeat produces nothing
        assert_eq!(store.apply_receiver_update("media_player.a", &update), None);
    }

    #[test]
    fn receiver_binding_covers_both_lists() {
        let store = store_with_device("a");
        store.configure("remote.a");
        let receiver: SharedReceiver = RecordingReceiver::new("a");
        store.set_receiver("a", Some(receiver));
        assert!(store.get_configured("remote.a").unwrap().receiver().is_some());

        store.configure("media_player.a");
        assert!(store.get_configured("media_player.a").unwrap().receiver().is_some());

        store.set_receiver("a", None);
        assert!(store.get_configured("remote.a").unwrap().receiver().is_none());
    }

    #[test]
    fn remove_drops_both_lists() {
        let store = store_with_device("a");
        store.configure("media_player.a");
        store.remove("media_player.a");
        assert!(!store.contains_available("media_player.a"));
        assert!(!store.is_configured("media_player.a"));
        assert!(store.contains_available("remote.a"));

        store.clear();
        assert!(store.available_ids().is_empty());
    }
}
