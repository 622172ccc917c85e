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

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// File name of the persisted device list inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

fn default_true() -> bool {
    true
}

fn default_timeout() -> u32 {
    2000
}

fn default_volume_step() -> f64 {
    0.5
}

/// Configuration record of one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique identifier, usually the receiver serial number.
    pub id: String,
    /// Friendly name shown on the hub.
    pub name: String,
    /// IP address or host name.
    pub address: String,
    #[serde(default = "default_true")]
    pub is_denon: bool,
    #[serde(default = "default_true")]
    pub use_telnet: bool,
    #[serde(default = "default_true")]
    pub support_sound_mode: bool,
    #[serde(default)]
    pub show_all_inputs: bool,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            is_denon: true,
            use_telnet: true,
            support_sound_mode: true,
            show_all_inputs: false,
            timeout: default_timeout(),
            volume_step: default_volume_step(),
        }
    }
}

/// Registry change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Added(DeviceConfig),
    Updated(DeviceConfig),
    Removed(DeviceConfig),
    /// All devices were removed.
    Cleared,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Device with ID {0} not found")]
    DeviceNotFound(String),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Known receiver configurations, persisted as JSON.
pub struct DeviceRegistry {
    devices: Mutex<Vec<DeviceConfig>>,
    /// `None` for registries that are never written to disk.
    config_file: Option<PathBuf>,
    event_sender: broadcast::Sender<DeviceEvent>,
}

impl DeviceRegistry {
    fn with_devices(devices: Vec<DeviceConfig>, config_file: Option<PathBuf>) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            devices: Mutex::new(devices),
            config_file,
            event_sender,
        }
    }

    /// Registry that lives in memory only.
    pub fn in_memory() -> Self {
        Self::with_devices(Vec::new(), None)
    }

    /// In-memory registry pre-populated with the given devices.
    pub fn from_devices(devices: Vec<DeviceConfig>) -> Self {
        Self::with_devices(devices, None)
    }

    /// Loads the registry from `config_dir`. A missing file yields an empty registry.
    pub fn load(config_dir: &Path) -> Result<Self, RegistryError> {
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        let devices = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            serde_json::from_str::<Vec<DeviceConfig>>(&content)?
        } else {
            debug!("No configuration file at {}", config_file.display());
            Vec::new()
        };
        info!("Loaded {} configured device(s)", devices.len());
        Ok(Self::with_devices(devices, Some(config_file)))
    }

    fn devices(&self) -> MutexGuard<'_, Vec<DeviceConfig>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, devices: &[DeviceConfig]) -> Result<(), RegistryError> {
        let Some(config_file) = &self.config_file else {
            return Ok(());
        };
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(devices)?;
        std::fs::write(config_file, json)?;
        Ok(())
    }

    pub fn all(&self) -> Vec<DeviceConfig> {
        self.devices().clone()
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceConfig> {
        self.devices().iter().find(|d| d.id == device_id).cloned()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices().iter().any(|d| d.id == device_id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices().is_empty()
    }

    /// Applies `change` to a copy of the device list, persists the copy and only then makes it current.
    /// On any error the registry is left untouched.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Vec<DeviceConfig>) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut devices = self.devices();
        let mut updated = devices.clone();
        let result = change(&mut updated)?;
        self.persist(&updated)?;
        *devices = updated;
        Ok(result)
    }

    /// Adds a new device or replaces the configuration of an existing one.
    pub fn add_or_update(&self, device: DeviceConfig) -> Result<(), RegistryError> {
        let event = self.commit(|devices| {
            Ok(match devices.iter_mut().find(|d| d.id == device.id) {
                Some(existing) => {
                    *existing = device.clone();
                    DeviceEvent::Updated(device)
                }
                None => {
                    devices.push(device.clone());
                    DeviceEvent::Added(device)
                }
            })
        })?;
        let _ = self.event_sender.send(event);
        Ok(())
    }

    /// Replaces the configuration of an existing device.
    pub fn update(&self, device: DeviceConfig) -> Result<(), RegistryError> {
        self.commit(|devices| {
            let existing = devices
                .iter_mut()
                .find(|d| d.id == device.id)
                .ok_or_else(|| RegistryError::DeviceNotFound(device.id.clone()))?;
            *existing = device.clone();
            Ok(())
        })?;
        let _ = self.event_sender.send(DeviceEvent::Updated(device));
        Ok(())
    }

    /// Removes a device. Returns the removed configuration, if any.
    pub fn remove(&self, device_id: &str) -> Result<Option<DeviceConfig>, RegistryError> {
        if !self.contains(device_id) {
            return Ok(None);
        }
        let removed = self.commit(|devices| {
            let index = devices.iter().position(|d| d.id == device_id);
            Ok(index.map(|index| devices.remove(index)))
        })?;
        if let Some(removed) = &removed {
            let _ = self.event_sender.send(DeviceEvent::Removed(removed.clone()));
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), RegistryError> {
        self.commit(|devices| {
            devices.clear();
            Ok(())
        })?;
        let _ = self.event_sender.send(DeviceEvent::Cleared);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_sender.subscribe()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}
