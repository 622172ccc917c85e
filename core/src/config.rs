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

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use log::LevelFilter;

use crate::status_poller::DEFAULT_POLL_INTERVAL;

pub const ENV_CONFIG_HOME: &str = "UC_CONFIG_HOME";
pub const ENV_LOG_LEVEL: &str = "UC_LOG_LEVEL";
/// Poll interval in seconds.
pub const ENV_POLL_INTERVAL: &str = "UC_POLL_INTERVAL";

/// Runtime settings of the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Directory holding the device registry file.
    pub config_home: PathBuf,
    pub log_level: LevelFilter,
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            config_home: PathBuf::from("."),
            log_level: LevelFilter::Debug,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(home) = lookup(ENV_CONFIG_HOME).filter(|v| !v.is_empty()) {
            config.config_home = PathBuf::from(home);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            config.log_level =
                LevelFilter::from_str(&level).map_err(|_| anyhow!("Invalid {} value: {}", ENV_LOG_LEVEL, level))?;
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL).filter(|v| !v.is_empty()) {
            let secs: f64 = interval
                .parse()
                .with_context(|| format!("Invalid {} value: {}", ENV_POLL_INTERVAL, interval))?;
            config.poll_interval = Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| anyhow!("{} must be a positive number of seconds", ENV_POLL_INTERVAL))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = DriverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DriverConfig::default());
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn values_from_environment() {
        let config = DriverConfig::from_lookup(lookup(&[
            (ENV_CONFIG_HOME, "/var/lib/avr"),
            (ENV_LOG_LEVEL, "INFO"),
            (ENV_POLL_INTERVAL, "2.5"),
        ]))
        .unwrap();
        assert_eq!(config.config_home, PathBuf::from("/var/lib/avr"));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.poll_interval, Duration::from_millis(2500));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(DriverConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).is_err());
        assert!(DriverConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "soon")])).is_err());
        assert!(DriverConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "0")])).is_err());
        assert!(DriverConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "-1")])).is_err());
    }
}
