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

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Coarse state reported by a receiver connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum ReceiverState {
    #[default]
    Unknown = 0,
    Unavailable = 1,
    Off = 2,
    On = 3,
    Playing = 4,
    Paused = 5,
}

impl ReceiverState {
    /// Decodes a raw state value. Values outside the defined set are `Unknown`.
    pub fn from_repr(value: u8) -> Self {
        match value {
            1 => ReceiverState::Unavailable,
            2 => ReceiverState::Off,
            3 => ReceiverState::On,
            4 => ReceiverState::Playing,
            5 => ReceiverState::Paused,
            _ => ReceiverState::Unknown,
        }
    }

    /// Maps the state string reported by the vendor library.
    pub fn from_vendor_state(state: Option<&str>) -> Self {
        match state {
            Some("on") => ReceiverState::On,
            Some("off") => ReceiverState::Off,
            Some("playing") => ReceiverState::Playing,
            Some("paused") => ReceiverState::Paused,
            _ => ReceiverState::Unknown,
        }
    }
}

/// State of a media-player entity as seen by the hub.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaPlayerState {
    On,
    Off,
    Paused,
    Playing,
    Unavailable,
    #[default]
    Unknown,
}

/// State of a remote entity as seen by the hub.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    On,
    Off,
    Unavailable,
    #[default]
    Unknown,
}

/// Integration device state reported to the hub.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// Result of an entity command, in the hub's vocabulary.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    Unauthorized = 401,
    NotFound = 404,
    ServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
}

impl StatusCode {
    pub fn is_ok(&self) -> bool {
        *self == StatusCode::Ok
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EntityType {
    MediaPlayer,
    Remote,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityType::MediaPlayer => "media_player",
            EntityType::Remote => "remote",
        }
    }
}

/// Builds the deterministic entity identifier for a device, e.g. `media_player.<deviceId>`.
pub fn create_entity_id(device_id: &str, entity_type: EntityType) -> String {
    format!("{}.{}", entity_type.prefix(), device_id)
}

/// Extracts the device identifier from an entity identifier created by [`create_entity_id`].
pub fn device_id_from_entity_id(entity_id: &str) -> Option<&str> {
    let (prefix, device_id) = entity_id.split_once('.')?;
    let known = [EntityType::MediaPlayer, EntityType::Remote]
        .iter()
        .any(|t| t.prefix() == prefix);
    if !known || device_id.is_empty() {
        return None;
    }
    Some(device_id)
}

/// All entity identifiers exposed for one receiver.
pub fn entity_ids_for_device(device_id: &str) -> [String; 2] {
    [
        create_entity_id(device_id, EntityType::MediaPlayer),
        create_entity_id(device_id, EntityType::Remote),
    ]
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct MediaPlayerFeatures: u32 {
        const ON_OFF = 1 << 0;
        const TOGGLE = 1 << 1;
        const VOLUME = 1 << 2;
        const VOLUME_UP_DOWN = 1 << 3;
        const MUTE_TOGGLE = 1 << 4;
        const MUTE = 1 << 5;
        const UNMUTE = 1 << 6;
        const PLAY_PAUSE = 1 << 7;
        const STOP = 1 << 8;
        const NEXT = 1 << 9;
        const PREVIOUS = 1 << 10;
        const MEDIA_TITLE = 1 << 11;
        const MEDIA_ARTIST = 1 << 12;
        const MEDIA_ALBUM = 1 << 13;
        const MEDIA_IMAGE_URL = 1 << 14;
        const MEDIA_TYPE = 1 << 15;
        const SELECT_SOURCE = 1 << 16;
        const SELECT_SOUND_MODE = 1 << 17;
        const DPAD = 1 << 18;
        const MENU = 1 << 19;
        const CONTEXT_MENU = 1 << 20;
        const INFO = 1 << 21;
    }
}
