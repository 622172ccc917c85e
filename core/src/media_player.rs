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

use std::fmt;

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::attributes::MediaPlayerAttributes;
use crate::definitions::{create_entity_id, EntityType, MediaPlayerFeatures, MediaPlayerState, StatusCode};
use crate::device_registry::DeviceConfig;
use crate::receiver::{ReceiverConnection, ReceiverUpdate, SharedReceiver};
use crate::simple_commands::simple_commands_for;
use crate::synchronizer::filter_changed_media_player_attributes;

/// Commands understood by the media-player entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPlayerCommand {
    On,
    Off,
    Toggle,
    PlayPause,
    Stop,
    Next,
    Previous,
    Volume,
    VolumeUp,
    VolumeDown,
    MuteToggle,
    Mute,
    Unmute,
    SelectSource,
    SelectSoundMode,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    CursorEnter,
    Back,
    Menu,
    ContextMenu,
    Info,
    /// Any other identifier; only executed if it is one of the device's simple commands.
    Simple(String),
}

impl MediaPlayerCommand {
    /// Parses a command identifier. Structured commands match their exact id,
    /// everything else is kept verbatim as a simple command.
    pub fn parse(cmd_id: &str) -> Self {
        match cmd_id {
            "on" => Self::On,
            "off" => Self::Off,
            "toggle" => Self::Toggle,
            "play_pause" => Self::PlayPause,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "previous" => Self::Previous,
            "volume" => Self::Volume,
            "volume_up" => Self::VolumeUp,
            "volume_down" => Self::VolumeDown,
            "mute_toggle" => Self::MuteToggle,
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "select_source" => Self::SelectSource,
            "select_sound_mode" => Self::SelectSoundMode,
            "cursor_up" => Self::CursorUp,
            "cursor_down" => Self::CursorDown,
            "cursor_left" => Self::CursorLeft,
            "cursor_right" => Self::CursorRight,
            "cursor_enter" => Self::CursorEnter,
            "back" => Self::Back,
            "menu" => Self::Menu,
            "context_menu" => Self::ContextMenu,
            "info" => Self::Info,
            _ => Self::Simple(cmd_id.to_string()),
        }
    }
}

impl fmt::Display for MediaPlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(cmd) => write!(f, "{}", cmd),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Error, Debug)]
pub enum CommandParamsError {
    #[error("Invalid command parameters: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Optional parameters of an entity command.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandParams {
    pub volume: Option<f64>,
    pub source: Option<String>,
    pub mode: Option<String>,
    pub command: Option<String>,
    pub sequence: Option<Vec<String>>,
    pub repeat: Option<u32>,
    /// Delay between repeated commands, in milliseconds.
    pub delay: Option<u64>,
}

impl CommandParams {
    pub fn from_json(value: Option<&serde_json::Value>) -> Result<Self, CommandParamsError> {
        match value {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}

/// Executes one command on a receiver.
///
/// `muted` is the locally cached mute state used by `MuteToggle`; an absent value toggles to muted.
pub(crate) async fn dispatch_command(
    receiver: &dyn ReceiverConnection,
    command: &MediaPlayerCommand,
    params: &CommandParams,
    simple_commands: &[String],
    muted: Option<bool>,
) -> StatusCode {
    match command {
        MediaPlayerCommand::On => receiver.power_on().await,
        MediaPlayerCommand::Off => receiver.power_off().await,
        MediaPlayerCommand::Toggle => receiver.power_toggle().await,
        MediaPlayerCommand::PlayPause => receiver.play_pause().await,
        MediaPlayerCommand::Stop => receiver.stop().await,
        MediaPlayerCommand::Next => receiver.next().await,
        MediaPlayerCommand::Previous => receiver.previous().await,
        MediaPlayerCommand::Volume => match params.volume {
            Some(volume) => receiver.set_volume_level(volume).await,
            None => StatusCode::BadRequest,
        },
        MediaPlayerCommand::VolumeUp => receiver.volume_up().await,
        MediaPlayerCommand::VolumeDown => receiver.volume_down().await,
        MediaPlayerCommand::MuteToggle => receiver.mute(!muted.unwrap_or(false)).await,
        MediaPlayerCommand::Mute => receiver.mute(true).await,
        MediaPlayerCommand::Unmute => receiver.mute(false).await,
        MediaPlayerCommand::SelectSource => match &params.source {
            Some(source) => receiver.select_source(source).await,
            None => StatusCode::BadRequest,
        },
        MediaPlayerCommand::SelectSoundMode => match &params.mode {
            Some(mode) => receiver.select_sound_mode(mode).await,
            None => StatusCode::BadRequest,
        },
        MediaPlayerCommand::CursorUp => receiver.cursor_up().await,
        MediaPlayerCommand::CursorDown => receiver.cursor_down().await,
        MediaPlayerCommand::CursorLeft => receiver.cursor_left().await,
        MediaPlayerCommand::CursorRight => receiver.cursor_right().await,
        MediaPlayerCommand::CursorEnter => receiver.cursor_enter().await,
        MediaPlayerCommand::Back => receiver.back().await,
        MediaPlayerCommand::Menu => receiver.setup().await,
        MediaPlayerCommand::ContextMenu => receiver.options().await,
        MediaPlayerCommand::Info => receiver.info().await,
        MediaPlayerCommand::Simple(cmd) if simple_commands.iter().any(|c| c == cmd) => {
            receiver.send_simple_command(cmd).await
        }
        MediaPlayerCommand::Simple(_) => StatusCode::NotImplemented,
    }
}

/// Media-player entity of one receiver.
#[derive(Clone)]
pub struct MediaPlayerEntity {
    id: String,
    name: String,
    features: MediaPlayerFeatures,
    simple_commands: Vec<String>,
    sound_mode_supported: bool,
    attributes: MediaPlayerAttributes,
    receiver: Option<SharedReceiver>,
}

impl MediaPlayerEntity {
    pub fn new(device: &DeviceConfig, receiver: Option<SharedReceiver>) -> Self {
        let mut features = MediaPlayerFeatures::ON_OFF
            | MediaPlayerFeatures::TOGGLE
            | MediaPlayerFeatures::VOLUME
            | MediaPlayerFeatures::VOLUME_UP_DOWN
            | MediaPlayerFeatures::MUTE_TOGGLE
            | MediaPlayerFeatures::MUTE
            | MediaPlayerFeatures::UNMUTE
            | MediaPlayerFeatures::PLAY_PAUSE
            | MediaPlayerFeatures::NEXT
            | MediaPlayerFeatures::PREVIOUS
            | MediaPlayerFeatures::MEDIA_TITLE
            | MediaPlayerFeatures::MEDIA_ARTIST
            | MediaPlayerFeatures::MEDIA_ALBUM
            | MediaPlayerFeatures::MEDIA_IMAGE_URL
            | MediaPlayerFeatures::MEDIA_TYPE
            | MediaPlayerFeatures::SELECT_SOURCE
            | MediaPlayerFeatures::DPAD
            | MediaPlayerFeatures::MENU
            | MediaPlayerFeatures::CONTEXT_MENU
            | MediaPlayerFeatures::INFO;

        let mut attributes = MediaPlayerAttributes {
            state: Some(MediaPlayerState::Unavailable),
            volume: Some(0.0),
            muted: Some(false),
            media_image_url: Some(String::new()),
            media_title: Some(String::new()),
            media_artist: Some(String::new()),
            media_album: Some(String::new()),
            source: Some(String::new()),
            source_list: Some(Vec::new()),
            ..Default::default()
        };

        // capability comes from the configuration, the receiver may not be connected yet
        if device.support_sound_mode {
            features |= MediaPlayerFeatures::SELECT_SOUND_MODE;
            attributes.sound_mode = Some(String::new());
            attributes.sound_mode_list = Some(Vec::new());
        }
        if device.is_denon {
            features |= MediaPlayerFeatures::STOP;
        }

        Self {
            id: create_entity_id(&device.id, EntityType::MediaPlayer),
            name: device.name.clone(),
            features,
            simple_commands: simple_commands_for(device.is_denon, device.use_telnet),
            sound_mode_supported: device.support_sound_mode,
            attributes,
            receiver,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> MediaPlayerFeatures {
        self.features
    }

    pub fn simple_commands(&self) -> &[String] {
        &self.simple_commands
    }

    pub fn sound_mode_supported(&self) -> bool {
        self.sound_mode_supported
    }

    pub fn attributes(&self) -> &MediaPlayerAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut MediaPlayerAttributes {
        &mut self.attributes
    }

    pub fn receiver(&self) -> Option<&SharedReceiver> {
        self.receiver.as_ref()
    }

    pub fn set_receiver(&mut self, receiver: Option<SharedReceiver>) {
        self.receiver = receiver;
    }

    /// Handles a command sent by the hub to this entity.
    pub async fn command(&self, cmd_id: &str, params: &CommandParams) -> StatusCode {
        info!("Got {} command request: {} {:?}", self.id, cmd_id, params);

        let Some(receiver) = &self.receiver else {
            warn!("No AVR instance for entity: {}", self.id);
            return StatusCode::ServiceUnavailable;
        };

        let command = MediaPlayerCommand::parse(cmd_id);
        dispatch_command(
            receiver.as_ref(),
            &command,
            params,
            &self.simple_commands,
            self.attributes.muted,
        )
        .await
    }

    /// Returns the attributes of `update` that differ from the current ones.
    pub fn filter_changed_attributes(&self, update: &ReceiverUpdate) -> MediaPlayerAttributes {
        filter_changed_media_player_attributes(&self.attributes, update, self.sound_mode_supported)
    }
}

impl fmt::Debug for MediaPlayerEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPlayerEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("features", &self.features)
            .field("attributes", &self.attributes)
            .field("has_receiver", &self.receiver.is_some())
            .finish()
    }
}
