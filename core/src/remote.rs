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
use std::time::Duration;

use log::{debug, info, warn};

use crate::attributes::RemoteAttributes;
use crate::definitions::{create_entity_id, EntityType, RemoteState, StatusCode};
use crate::device_registry::DeviceConfig;
use crate::media_player::{dispatch_command, CommandParams, MediaPlayerCommand};
use crate::receiver::{ReceiverUpdate, SharedReceiver};
use crate::simple_commands::simple_commands_for;
use crate::synchronizer::filter_changed_remote_attributes;

/// Remote entity of one receiver.
///
/// Offers power control and sending of single commands or command sequences, where each
/// command is either a media-player command name or one of the device's simple commands.
#[derive(Clone)]
pub struct RemoteEntity {
    id: String,
    name: String,
    simple_commands: Vec<String>,
    attributes: RemoteAttributes,
    receiver: Option<SharedReceiver>,
}

impl RemoteEntity {
    pub fn new(device: &DeviceConfig, receiver: Option<SharedReceiver>) -> Self {
        Self {
            id: create_entity_id(&device.id, EntityType::Remote),
            name: device.name.clone(),
            simple_commands: simple_commands_for(device.is_denon, device.use_telnet),
            attributes: RemoteAttributes { state: Some(RemoteState::Unavailable) },
            receiver,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_commands(&self) -> &[String] {
        &self.simple_commands
    }

    pub fn attributes(&self) -> &RemoteAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut RemoteAttributes {
        &mut self.attributes
    }

    pub fn receiver(&self) -> Option<&SharedReceiver> {
        self.receiver.as_ref()
    }

    pub fn set_receiver(&mut self, receiver: Option<SharedReceiver>) {
        self.receiver = receiver;
    }

    pub async fn command(&self, cmd_id: &str, params: &CommandParams) -> StatusCode {
        info!("Got {} command request: {} {:?}", self.id, cmd_id, params);

        let Some(receiver) = &self.receiver else {
            warn!("No AVR instance for entity: {}", self.id);
            return StatusCode::ServiceUnavailable;
        };

        match cmd_id {
            "on" => receiver.power_on().await,
            "off" => receiver.power_off().await,
            "toggle" => receiver.power_toggle().await,
            "send_cmd" => {
                let Some(command) = &params.command else {
                    return StatusCode::BadRequest;
                };
                self.send_repeated(receiver, std::slice::from_ref(command), params).await
            }
            "send_cmd_sequence" => {
                let Some(sequence) = &params.sequence else {
                    return StatusCode::BadRequest;
                };
                self.send_repeated(receiver, sequence, params).await
            }
            _ => StatusCode::NotImplemented,
        }
    }

    /// Sends `commands` `repeat` times, waiting `delay` between two consecutive commands.
    /// Stops at the first command that fails.
    async fn send_repeated(&self, receiver: &SharedReceiver, commands: &[String], params: &CommandParams) -> StatusCode {
        let repeat = params.repeat.unwrap_or(1).max(1);
        let delay = Duration::from_millis(params.delay.unwrap_or(0));
        let no_params = CommandParams::default();

        let mut first = true;
        for _ in 0..repeat {
            for command in commands {
                if !first && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                first = false;

                debug!("[{}] Sending command: {}", self.id, command);
                let parsed = self.parse_command(command);
                // the remote has no cached mute state, use the receiver's
                let muted = Some(receiver.status().muted);
                let res = dispatch_command(receiver.as_ref(), &parsed, &no_params, &self.simple_commands, muted).await;
                if !res.is_ok() {
                    warn!("[{}] Command {} failed: {}", self.id, command, res);
                    return res;
                }
            }
        }
        StatusCode::Ok
    }

    /// Remote commands name media-player commands case-insensitively. Simple commands keep their exact id.
    fn parse_command(&self, command: &str) -> MediaPlayerCommand {
        if self.simple_commands.iter().any(|c| c == command) {
            return MediaPlayerCommand::Simple(command.to_string());
        }
        match MediaPlayerCommand::parse(&command.to_ascii_lowercase()) {
            MediaPlayerCommand::Simple(_) => MediaPlayerCommand::Simple(command.to_string()),
            parsed => parsed,
        }
    }

    pub fn filter_changed_attributes(&self, update: &ReceiverUpdate) -> RemoteAttributes {
        filter_changed_remote_attributes(&self.attributes, update)
    }
}

impl fmt::Debug for RemoteEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("has_receiver", &self.receiver.is_some())
            .finish()
    }
}
