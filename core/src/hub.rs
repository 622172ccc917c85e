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

use crate::attributes::EntityAttributes;
use crate::definitions::DeviceState;

/// Lifecycle events received from the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    SubscribeEntities(Vec<String>),
    UnsubscribeEntities(Vec<String>),
}

/// Hub connection as seen by the driver.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Reports the integration device state.
    async fn set_device_state(&self, state: DeviceState);

    /// Pushes changed attributes of a configured entity.
    async fn entity_attributes_changed(&self, entity_id: &str, attributes: &EntityAttributes);
}
