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

use anyhow::{anyhow, bail, Context};
use avr_driver_core::{DeviceConfig, HubEvent};
use serde_json::Value;

pub const HELP: &str = "\
commands:
  connect | disconnect | standby | wake
  subscribe <entity_id>... | unsubscribe <entity_id>...
  cmd <entity_id> <cmd_id> [json params]
  add <device_id> <address> [name] | remove <device_id> | clear
  list
  telnet <device_id> up|down
  address <device_id> <address>
  help | quit";

/// One line typed on the simulator console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Hub(HubEvent),
    EntityCommand {
        entity_id: String,
        cmd_id: String,
        params: Option<Value>,
    },
    AddDevice(DeviceConfig),
    RemoveDevice(String),
    ClearDevices,
    List,
    Telnet { device_id: String, up: bool },
    Address { device_id: String, address: String },
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses a console line. Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word.to_lowercase().as_str() {
            "" => return Ok(None),
            "connect" => Self::Hub(HubEvent::Connect),
            "disconnect" => Self::Hub(HubEvent::Disconnect),
            "standby" => Self::Hub(HubEvent::EnterStandby),
            "wake" => Self::Hub(HubEvent::ExitStandby),
            "subscribe" => Self::Hub(HubEvent::SubscribeEntities(owned(&args))),
            "unsubscribe" => Self::Hub(HubEvent::UnsubscribeEntities(owned(&args))),
            "cmd" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let entity_id = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| anyhow!("missing entity id"))?;
                let cmd_id = parts.next().ok_or_else(|| anyhow!("missing command id"))?;
                let params = match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
                    Some(json) => Some(serde_json::from_str(json).context("invalid json params")?),
                    None => None,
                };
                Self::EntityCommand { entity_id: entity_id.to_string(), cmd_id: cmd_id.to_string(), params }
            }
            "add" => match args.as_slice() {
                [id, address, name @ ..] => {
                    let name = if name.is_empty() { id.to_string() } else { name.join(" ") };
                    Self::AddDevice(DeviceConfig::new(*id, name, *address))
                }
                _ => bail!("usage: add <device_id> <address> [name]"),
            },
            "remove" => match args.as_slice() {
                [id] => Self::RemoveDevice(id.to_string()),
                _ => bail!("usage: remove <device_id>"),
            },
            "clear" => Self::ClearDevices,
            "list" => Self::List,
            "telnet" => match args.as_slice() {
                [id, "up"] => Self::Telnet { device_id: id.to_string(), up: true },
                [id, "down"] => Self::Telnet { device_id: id.to_string(), up: false },
                _ => bail!("usage: telnet <device_id> up|down"),
            },
            "address" => match args.as_slice() {
                [id, address] => Self::Address { device_id: id.to_string(), address: address.to_string() },
                _ => bail!("usage: address <device_id> <address>"),
            },
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command: {}", other),
        };
        Ok(Some(command))
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hub_events() {
        assert_eq!(ConsoleCommand::parse("  ").unwrap(), None);
        assert_eq!(ConsoleCommand::parse("Standby").unwrap(), Some(ConsoleCommand::Hub(HubEvent::EnterStandby)));
        assert_eq!(
            ConsoleCommand::parse("subscribe media_player.a remote.a").unwrap(),
            Some(ConsoleCommand::Hub(HubEvent::SubscribeEntities(vec![
                "media_player.a".into(),
                "remote.a".into()
            ])))
        );
    }

    #[test]
    fn parses_entity_command_with_json() {
        assert_eq!(
            ConsoleCommand::parse(r#"cmd media_player.a volume {"volume": 40}"#).unwrap(),
            Some(ConsoleCommand::EntityCommand {
                entity_id: "media_player.a".into(),
                cmd_id: "volume".into(),
                params: Some(json!({"volume": 40})),
            })
        );
        assert!(ConsoleCommand::parse("cmd media_player.a volume {oops").is_err());
        assert!(ConsoleCommand::parse("cmd").is_err());
    }

    #[test]
    fn parses_device_management() {
        let Some(ConsoleCommand::AddDevice(device)) =
            ConsoleCommand::parse("add a 10.0.0.5 Living room").unwrap()
        else {
            panic!("expected add");
        };
        assert_eq!(device.name, "Living room");
        assert_eq!(device.address, "10.0.0.5");
        assert!(ConsoleCommand::parse("telnet a sideways").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }
}
