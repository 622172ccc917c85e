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

use avr_driver_core::DriverConfig;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Command line options. Unset options fall back to the `UC_*` environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Directory holding the device configuration file
    #[arg(short, long)]
    pub config_home: Option<PathBuf>,

    /// Status poll interval in seconds
    #[arg(short, long)]
    pub poll_interval: Option<u64>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Simulated receivers report a broken telnet channel and are polled instead
    #[arg(long)]
    pub no_telnet: bool,
}

impl Cli {
    /// Applies the command line overrides on top of `config`.
    pub fn apply_to(&self, mut config: DriverConfig) -> DriverConfig {
        if let Some(level) = self.log_level {
            config.log_level = level.to_level_filter();
        }
        if let Some(home) = &self.config_home {
            config.config_home = home.clone();
        }
        if let Some(secs) = self.poll_interval.filter(|s| *s > 0) {
            config.poll_interval = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_environment() {
        let cli = Cli::parse_from(["avr_driver_simulator", "-l", "warn", "-p", "3", "-c", "/tmp/avr"]);
        let config = cli.apply_to(DriverConfig::default());
        assert_eq!(config.log_level, LevelFilter::Warn);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.config_home, PathBuf::from("/tmp/avr"));
    }

    #[test]
    fn unset_options_keep_config() {
        let cli = Cli::parse_from(["avr_driver_simulator"]);
        assert_eq!(cli.apply_to(DriverConfig::default()), DriverConfig::default());
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
    }
}
