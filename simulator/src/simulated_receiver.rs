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

//! In-memory receiver used in place of a networked AVR.
//!
//! Property changes are pushed as update events only while the simulated telnet channel is up.
//! With the channel down they are only picked up by the status poller through `refresh`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use avr_driver_core::definitions::{ReceiverState, StatusCode};
use avr_driver_core::receiver::{ReceiverStatus, ReceiverUpdate};
use avr_driver_core::{DeviceConfig, ReceiverConnection, ReceiverEvent, ReceiverEventEmitter, ReceiverFactory, SharedReceiver};
use log::{debug, info};

pub struct SimulatedReceiver {
    id: String,
    events: ReceiverEventEmitter,
    use_telnet: bool,
    volume_step: f64,
    active: AtomicBool,
    telnet_up: AtomicBool,
    status: Mutex<ReceiverStatus>,
}

impl SimulatedReceiver {
    pub fn new(device: &DeviceConfig, events: ReceiverEventEmitter, use_telnet: bool) -> Self {
        let sound_mode_list = if device.support_sound_mode {
            vec!["STEREO".to_string(), "DOLBY DIGITAL".to_string(), "MCH STEREO".to_string()]
        } else {
            Vec::new()
        };
        Self {
            id: device.id.clone(),
            events,
            use_telnet,
            volume_step: device.volume_step,
            active: AtomicBool::new(false),
            telnet_up: AtomicBool::new(false),
            status: Mutex::new(ReceiverStatus {
                state: ReceiverState::Off,
                volume: Some(30.0),
                muted: false,
                source: "CD".to_string(),
                source_list: vec!["CD".to_string(), "TV Audio".to_string(), "HEOS Music".to_string()],
                sound_mode: sound_mode_list.first().cloned().unwrap_or_default(),
                sound_mode_list,
                ..Default::default()
            }),
        }
    }

    fn status_lock(&self) -> MutexGuard<'_, ReceiverStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates loss or recovery of the telnet push channel.
    pub fn set_telnet(&self, up: bool) {
        let up = up && self.use_telnet && self.is_active();
        self.telnet_up.store(up, Ordering::SeqCst);
        info!("[{}] Telnet channel {}", self.id, if up { "up" } else { "down" });
    }

    /// Simulates the receiver showing up under a new address.
    pub fn change_address(&self, address: &str) {
        self.events.emit(ReceiverEvent::AddressChanged(address.to_string()));
    }

    /// Applies a state change made on the receiver itself.
    fn change(&self, f: impl FnOnce(&mut ReceiverStatus) -> ReceiverUpdate) -> StatusCode {
        if !self.is_active() {
            return StatusCode::ServiceUnavailable;
        }
        let update = f(&mut self.status_lock());
        if self.is_healthy() {
            self.events.emit(ReceiverEvent::Update(Some(update)));
        }
        StatusCode::Ok
    }

    fn set_state(&self, state: ReceiverState) -> StatusCode {
        self.change(|status| {
            status.state = state;
            ReceiverUpdate::with_state(state)
        })
    }

    fn set_volume(&self, f: impl FnOnce(f64) -> f64) -> StatusCode {
        self.change(|status| {
            let volume = f(status.volume.unwrap_or_default()).clamp(0.0, 100.0);
            status.volume = Some(volume);
            ReceiverUpdate { volume: Some(volume), ..Default::default() }
        })
    }

    fn skip_track(&self, label: &str) -> StatusCode {
        self.change(|status| {
            status.media_title = format!("{} track", label);
            ReceiverUpdate { media_title: Some(status.media_title.clone()), ..Default::default() }
        })
    }

    fn key(&self, key: &str) -> StatusCode {
        if !self.is_active() {
            return StatusCode::ServiceUnavailable;
        }
        debug!("[{}] Key {}", self.id, key);
        StatusCode::Ok
    }
}

#[async_trait]
impl ReceiverConnection for SimulatedReceiver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn connect(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.events.emit(ReceiverEvent::Connecting);
        self.telnet_up.store(self.use_telnet, Ordering::SeqCst);
        self.events.emit(ReceiverEvent::Connected);
        self.events.emit(ReceiverEvent::Update(None));
    }

    async fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.telnet_up.store(false, Ordering::SeqCst);
        self.events.emit(ReceiverEvent::Disconnected);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_healthy(&self) -> bool {
        self.telnet_up.load(Ordering::SeqCst)
    }

    fn status(&self) -> ReceiverStatus {
        self.status_lock().clone()
    }

    async fn refresh(&self) -> StatusCode {
        if !self.is_active() {
            return StatusCode::ServiceUnavailable;
        }
        self.events.emit(ReceiverEvent::Update(None));
        StatusCode::Ok
    }

    async fn power_on(&self) -> StatusCode {
        self.set_state(ReceiverState::On)
    }
    async fn power_off(&self) -> StatusCode {
        self.set_state(ReceiverState::Off)
    }
    async fn power_toggle(&self) -> StatusCode {
        let next = match self.status_lock().state {
            ReceiverState::Off => ReceiverState::On,
            _ => ReceiverState::Off,
        };
        self.set_state(next)
    }
    async fn play_pause(&self) -> StatusCode {
        let next = match self.status_lock().state {
            ReceiverState::Playing => ReceiverState::Paused,
            _ => ReceiverState::Playing,
        };
        self.set_state(next)
    }
    async fn stop(&self) -> StatusCode {
        self.set_state(ReceiverState::On)
    }
    async fn next(&self) -> StatusCode {
        self.skip_track("Next")
    }
    async fn previous(&self) -> StatusCode {
        self.skip_track("Previous")
    }
    async fn set_volume_level(&self, volume: f64) -> StatusCode {
        self.set_volume(|_| volume)
    }
    async fn volume_up(&self) -> StatusCode {
        let step = self.volume_step;
        self.set_volume(|v| v + step)
    }
    async fn volume_down(&self) -> StatusCode {
        let step = self.volume_step;
        self.set_volume(|v| v - step)
    }
    async fn mute(&self, muted: bool) -> StatusCode {
        self.change(|status| {
            status.muted = muted;
            ReceiverUpdate { muted: Some(muted), ..Default::default() }
        })
    }
    async fn select_source(&self, source: &str) -> StatusCode {
        if !self.status_lock().source_list.iter().any(|s| s == source) {
            return StatusCode::BadRequest;
        }
        self.change(|status| {
            status.source = source.to_string();
            ReceiverUpdate { source: Some(source.to_string()), ..Default::default() }
        })
    }
    async fn select_sound_mode(&self, sound_mode: &str) -> StatusCode {
        if !self.status_lock().sound_mode_list.iter().any(|m| m == sound_mode) {
            return StatusCode::BadRequest;
        }
        self.change(|status| {
            status.sound_mode = sound_mode.to_string();
            ReceiverUpdate { sound_mode: Some(sound_mode.to_string()), ..Default::default() }
        })
    }
    async fn cursor_up(&self) -> StatusCode {
        self.key("CURSOR_UP")
    }
    async fn cursor_down(&self) -> StatusCode {
        self.key("CURSOR_DOWN")
    }
    async fn cursor_left(&self) -> StatusCode {
        self.key("CURSOR_LEFT")
    }
    async fn cursor_right(&self) -> StatusCode {
        self.key("CURSOR_RIGHT")
    }
    async fn cursor_enter(&self) -> StatusCode {
        self.key("CURSOR_ENTER")
    }
    async fn back(&self) -> StatusCode {
        self.key("BACK")
    }
    async fn setup(&self) -> StatusCode {
        self.key("SETUP")
    }
    async fn options(&self) -> StatusCode {
        self.key("OPTIONS")
    }
    async fn info(&self) -> StatusCode {
        self.key("INFO")
    }
    async fn send_simple_command(&self, command: &str) -> StatusCode {
        self.key(command)
    }
}

/// Creates simulated receivers and keeps them reachable for the console.
pub struct SimulatedReceiverFactory {
    telnet: bool,
    receivers: Mutex<HashMap<String, Arc<SimulatedReceiver>>>,
}

impl SimulatedReceiverFactory {
    pub fn new(telnet: bool) -> Self {
        Self { telnet, receivers: Mutex::new(HashMap::new()) }
    }

    /// Most recently created receiver of a device.
    pub fn get(&self, device_id: &str) -> Option<Arc<SimulatedReceiver>> {
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned()
    }
}

impl ReceiverFactory for SimulatedReceiverFactory {
    fn create_receiver(&self, device: &DeviceConfig, events: ReceiverEventEmitter) -> SharedReceiver {
        debug!("[{}] Creating simulated receiver for {}", device.id, device.address);
        let receiver = Arc::new(SimulatedReceiver::new(device, events, self.telnet && device.use_telnet));
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.id.clone(), receiver.clone());
        receiver
    }
}
