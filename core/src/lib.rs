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

pub mod attributes;
pub mod config;
pub mod definitions;
pub mod device_registry;
pub mod driver;
pub mod entity_store;
pub mod hub;
pub mod media_player;
pub mod orchestrator;
pub mod receiver;
pub mod receiver_pool;
pub mod remote;
pub mod simple_commands;
pub mod status_poller;
pub mod synchronizer;

mod connection_tasks;
mod service;

#[cfg(test)]
mod test_utils;

pub use config::DriverConfig;
pub use device_registry::{DeviceConfig, DeviceRegistry};
pub use driver::{IntegrationDriver, LocalDriver};
pub use hub::{HubClient, HubEvent};
pub use receiver::{ReceiverConnection, ReceiverEvent, ReceiverEventEmitter, ReceiverFactory, SharedReceiver};
pub use service::{spawn_service, MultiServiceHandle, ServiceHandle, StopHandle};
