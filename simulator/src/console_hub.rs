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

use async_trait::async_trait;
use avr_driver_core::attributes::EntityAttributes;
use avr_driver_core::definitions::DeviceState;
use avr_driver_core::HubClient;
use log::{info, warn};

/// Hub stand-in that logs every message the driver sends as JSON.
pub struct ConsoleHub;

#[async_trait]
impl HubClient for ConsoleHub {
    async fn set_device_state(&self, state: DeviceState) {
        info!("-> hub: device_state {:?}", state);
    }

    async fn entity_attributes_changed(&self, entity_id: &str, attributes: &EntityAttributes) {
        match serde_json::to_string(attributes) {
            Ok(json) => info!("-> hub: entity_change {} {}", entity_id, json),
            Err(e) => warn!("Failed to serialize attributes of {}: {}", entity_id, e),
        }
    }
}
