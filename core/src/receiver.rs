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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::definitions::{ReceiverState, StatusCode};
use crate::device_registry::DeviceConfig;

/// Full state of a receiver as cached by its connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverStatus {
    pub state: ReceiverState,
    /// Volume level in range 0..100, `None` until the receiver reported it.
    pub volume: Option<f64>,
    pub muted: bool,
    pub source: String,
    pub source_list: Vec<String>,
    pub sound_mode: String,
    pub sound_mode_list: Vec<String>,
    pub media_title: String,
    pub media_artist: String,
    pub media_album: String,
    pub media_image_url: String,
}

/// Partial receiver state carried by an update event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverUpdate {
    pub state: Option<ReceiverState>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub source: Option<String>,
    pub source_list: Option<Vec<String>>,
    pub sound_mode: Option<String>,
    pub sound_mode_list: Option<Vec<String>>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
    pub media_album: Option<String>,
    pub media_image_url: Option<String>,
}

impl ReceiverUpdate {
    pub fn with_state(state: ReceiverState) -> Self {
        Self { state: Some(state), ..Default::default() }
    }
}

impl From<&ReceiverStatus> for ReceiverUpdate {
    fn from(status: &ReceiverStatus) -> Self {
        Self {
            state: Some(status.state),
            volume: status.volume,
            muted: Some(status.muted),
            source: Some(status.source.clone()),
            source_list: Some(status.source_list.clone()),
            sound_mode: Some(status.sound_mode.clone()),
            sound_mode_list: Some(status.sound_mode_list.clone()),
            media_title: Some(status.media_title.clone()),
            media_artist: Some(status.media_artist.clone()),
            media_album: Some(status.media_album.clone()),
            media_image_url: Some(status.media_image_url.clone()),
        }
    }
}

/// Lifecycle and property events emitted by a receiver connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    Connecting,
    Connected,
    Disconnected,
    Error(String),
    /// Changed properties, or `None` when the cached data was refreshed and a full resync is due.
    Update(Option<ReceiverUpdate>),
    AddressChanged(String),
}

/// A receiver event tagged with the receiver it originates from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverNotification {
    pub receiver_id: String,
    pub event: ReceiverEvent,
}

/// Per-receiver event emitter handed to a connection when it is created.
///
/// Delivery goes through an unbounded channel, so emitting never blocks the connection.
/// The listener can be removed and attached again.
#[derive(Debug, Clone)]
pub struct ReceiverEventEmitter {
    receiver_id: String,
    listener: Arc<Mutex<Option<mpsc::UnboundedSender<ReceiverNotification>>>>,
}

impl ReceiverEventEmitter {
    pub fn new(receiver_id: impl Into<String>, listener: mpsc::UnboundedSender<ReceiverNotification>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            listener: Arc::new(Mutex::new(Some(listener))),
        }
    }

    /// Emitter without a listener; every event is dropped until one is attached.
    pub fn detached(receiver_id: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    fn listener(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<ReceiverNotification>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends an event to the listener. Returns false if the event was dropped.
    pub fn emit(&self, event: ReceiverEvent) -> bool {
        let listener = self.listener();
        match listener.as_ref() {
            Some(tx) => tx
                .send(ReceiverNotification { receiver_id: self.receiver_id.clone(), event })
                .is_ok(),
            None => false,
        }
    }

    pub fn attach(&self, listener: mpsc::UnboundedSender<ReceiverNotification>) {
        *self.listener() = Some(listener);
    }

    pub fn remove_all_listeners(&self) {
        self.listener().take();
    }

    pub fn has_listener(&self) -> bool {
        self.listener().as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

/// Capability interface of a receiver connection.
///
/// Transport handling (telnet, HTTP, polling, discovery, reconnect backoff) lives behind this trait.
/// Command operations report their outcome as a [`StatusCode`]; network or protocol failures are
/// reported as `ServiceUnavailable`. Commands a connection does not provide default to
/// `NotImplemented`.
#[async_trait]
pub trait ReceiverConnection: Send + Sync {
    fn id(&self) -> &str;

    /// Establishes the connection. Idempotent while connected or connecting.
    async fn connect(&self);
    async fn disconnect(&self);

    /// True if the receiver should currently hold an established connection.
    fn is_active(&self) -> bool;
    /// Health of the low-level push channel (telnet). False for polled connections.
    fn is_healthy(&self) -> bool;

    /// Current cached receiver state.
    fn status(&self) -> ReceiverStatus;

    /// Fetches fresh data from the receiver, ending with an `Update(None)` event.
    async fn refresh(&self) -> StatusCode;

    async fn power_on(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn power_off(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn power_toggle(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn play_pause(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn stop(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn next(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn previous(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn set_volume_level(&self, _volume: f64) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn volume_up(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn volume_down(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn mute(&self, _muted: bool) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn select_source(&self, _source: &str) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn select_sound_mode(&self, _sound_mode: &str) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn cursor_up(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn cursor_down(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn cursor_left(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn cursor_right(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn cursor_enter(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn back(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    /// Opens or closes the setup menu.
    async fn setup(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    /// Opens the options (context) menu.
    async fn options(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn info(&self) -> StatusCode {
        StatusCode::NotImplemented
    }
    async fn send_simple_command(&self, _command: &str) -> StatusCode {
        StatusCode::NotImplemented
    }
}

pub type SharedReceiver = Arc<dyn ReceiverConnection>;

/// Creates receiver connections for configured devices.
pub trait ReceiverFactory: Send + Sync {
    fn create_receiver(&self, device: &DeviceConfig, events: ReceiverEventEmitter) -> SharedReceiver;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_from_status_supplies_every_field() {
        let status = ReceiverStatus {
            state: ReceiverState::Playing,
            volume: Some(45.0),
            muted: true,
            source: "TV".into(),
            source_list: vec!["TV".into(), "CD".into()],
            media_title: "Song".into(),
            ..Default::default()
        };
        let update = ReceiverUpdate::from(&status);
        assert_eq!(update.state, Some(ReceiverState::Playing));
        assert_eq!(update.volume, Some(45.0));
        assert_eq!(update.muted, Some(true));
        assert_eq!(update.source_list.as_ref().map(|l| l.len()), Some(2));
        assert_eq!(update.media_title.as_deref(), Some("Song"));
        assert_eq!(update.media_album.as_deref(), Some(""));
        assert_eq!(update.sound_mode.as_deref(), Some(""));
    }

    #[test]
    fn emitter_tags_events_with_receiver_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = ReceiverEventEmitter::new("avr-1", tx);
        assert!(emitter.emit(ReceiverEvent::Connected));
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.receiver_id, "avr-1");
        assert_eq!(notification.event, ReceiverEvent::Connected);
    }

    #[test]
    fn removed_listener_drops_events_until_reattached() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = ReceiverEventEmitter::new("avr-1", tx.clone());
        let clone = emitter.clone();

        emitter.remove_all_listeners();
        assert!(!clone.has_listener());
        assert!(!clone.emit(ReceiverEvent::Disconnected));
        assert!(rx.try_recv().is_err());

        emitter.attach(tx);
        assert!(clone.emit(ReceiverEvent::AddressChanged("10.0.0.2".into())));
        assert_eq!(
            rx.try_recv().unwrap().event,
            ReceiverEvent::AddressChanged("10.0.0.2".into())
        );
    }

    #[test]
    fn detached_emitter_drops_events() {
        let emitter = ReceiverEventEmitter::detached("avr-2");
        assert!(!emitter.has_listener());
        assert!(!emitter.emit(ReceiverEvent::Connecting));
    }
}
