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

//! Recording doubles of the external collaborators, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::attributes::EntityAttributes;
use crate::definitions::{DeviceState, StatusCode};
use crate::device_registry::DeviceConfig;
use crate::hub::HubClient;
use crate::receiver::{
    ReceiverConnection, ReceiverEvent, ReceiverEventEmitter, ReceiverFactory, ReceiverStatus, SharedReceiver,
};

pub(crate) struct RecordingReceiver {
    id: String,
    calls: Mutex<Vec<String>>,
    result: Mutex<StatusCode>,
    status: Mutex<ReceiverStatus>,
    active: AtomicBool,
    healthy: AtomicBool,
    events: Option<ReceiverEventEmitter>,
}

impl RecordingReceiver {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Self::build(id, None)
    }

    pub(crate) fn with_events(id: &str, events: ReceiverEventEmitter) -> Arc<Self> {
        Self::build(id, Some(events))
    }

    fn build(id: &str, events: Option<ReceiverEventEmitter>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: Mutex::new(Vec::new()),
            result: Mutex::new(StatusCode::Ok),
            status: Mutex::new(ReceiverStatus::default()),
            active: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            events,
        })
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut self.calls.lock().unwrap())
    }

    pub(crate) fn set_result(&self, result: StatusCode) {
        *self.result.lock().unwrap() = result;
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub(crate) fn update_status(&self, f: impl FnOnce(&mut ReceiverStatus)) {
        f(&mut self.status.lock().unwrap());
    }

    /// Emits an event as if it came from the receiver.
    pub(crate) fn emit(&self, event: ReceiverEvent) -> bool {
        self.events.as_ref().is_some_and(|events| events.emit(event))
    }

    fn record(&self, call: impl Into<String>) -> StatusCode {
        self.calls.lock().unwrap().push(call.into());
        *self.result.lock().unwrap()
    }
}

#[async_trait]
impl ReceiverConnection for RecordingReceiver {
    fn id(&self) -> &str {
        &self.id
    }
    async fn connect(&self) {
        self.record("connect");
        self.set_active(true);
    }
    async fn disconnect(&self) {
        self.record("disconnect");
        self.set_active(false);
    }
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
    fn status(&self) -> ReceiverStatus {
        self.status.lock().unwrap().clone()
    }
    async fn refresh(&self) -> StatusCode {
        self.record("refresh")
    }
    async fn power_on(&self) -> StatusCode {
        self.record("power_on")
    }
    async fn power_off(&self) -> StatusCode {
        self.record("power_off")
    }
    async fn power_toggle(&self) -> StatusCode {
        self.record("power_toggle")
    }
    async fn play_pause(&self) -> StatusCode {
        self.record("play_pause")
    }
    async fn stop(&self) -> StatusCode {
        self.record("stop")
    }
    async fn set_volume_level(&self, volume: f64) -> StatusCode {
        self.record(format!("set_volume_level({})", volume))
    }
    async fn volume_up(&self) -> StatusCode {
        self.record("volume_up")
    }
    async fn mute(&self, muted: bool) -> StatusCode {
        self.record(format!("mute({})", muted))
    }
    async fn select_source(&self, source: &str) -> StatusCode {
        self.record(format!("select_source({})", source))
    }
    async fn select_sound_mode(&self, sound_mode: &str) -> StatusCode {
        self.record(format!("select_sound_mode({})", sound_mode))
    }
    async fn cursor_up(&self) -> StatusCode {
        self.record("cursor_up")
    }
    async fn setup(&self) -> StatusCode {
        self.record("setup")
    }
    async fn options(&self) -> StatusCode {
        self.record("options")
    }
    async fn send_simple_command(&self, command: &str) -> StatusCode {
        self.record(format!("simple({})", command))
    }
}

/// Factory that keeps every receiver it created.
#[derive(Default)]
pub(crate) struct RecordingFactory {
    created: Mutex<HashMap<String, Arc<RecordingReceiver>>>,
}

impl RecordingFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn receiver(&self, device_id: &str) -> Option<Arc<RecordingReceiver>> {
        self.created.lock().unwrap().get(device_id).cloned()
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl ReceiverFactory for RecordingFactory {
    fn create_receiver(&self, device: &DeviceConfig, events: ReceiverEventEmitter) -> SharedReceiver {
        let receiver = RecordingReceiver::with_events(&device.id, events);
        self.created.lock().unwrap().insert(device.id.clone(), receiver.clone());
        receiver
    }
}

#[derive(Default)]
pub(crate) struct RecordingHub {
    device_states: Mutex<Vec<DeviceState>>,
    updates: Mutex<Vec<(String, EntityAttributes)>>,
}

impl RecordingHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn take_device_states(&self) -> Vec<DeviceState> {
        std::mem::take(&mut self.device_states.lock().unwrap())
    }

    pub(crate) fn take_updates(&self) -> Vec<(String, EntityAttributes)> {
        std::mem::take(&mut self.updates.lock().unwrap())
    }
}

#[async_trait]
impl HubClient for RecordingHub {
    async fn set_device_state(&self, state: DeviceState) {
        self.device_states.lock().unwrap().push(state);
    }

    async fn entity_attributes_changed(&self, entity_id: &str, attributes: &EntityAttributes) {
        self.updates.lock().unwrap().push((entity_id.to_string(), attributes.clone()));
    }
}
