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

mod cli;
mod console;
mod console_hub;
mod logger;
mod simulated_receiver;

use std::sync::Arc;

use anyhow::Result;
use avr_driver_core::{DriverConfig, IntegrationDriver, LocalDriver};
use clap::Parser;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;

use crate::cli::Cli;
use crate::console::{ConsoleCommand, HELP};
use crate::console_hub::ConsoleHub;
use crate::simulated_receiver::SimulatedReceiverFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.apply_to(DriverConfig::from_env()?);
    logger::init_logger(cli.log_file.clone(), config.log_level)?;
    info!("Using configuration directory {}", config.config_home.display());

    let factory = Arc::new(SimulatedReceiverFactory::new(!cli.no_telnet));
    let driver = LocalDriver::from_config(&config, Arc::new(ConsoleHub), factory.clone())?;
    let services = driver.run().await?;

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down services...");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        match ConsoleCommand::parse(&line) {
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&driver, &factory, command).await {
                    error!("{:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{:#}", e),
        }
    }

    services.shutdown().await?;
    info!("Services shut down. Exiting.");
    Ok(())
}

async fn execute(driver: &LocalDriver, factory: &SimulatedReceiverFactory, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Hub(event) => driver.handle_hub_event(event).await?,
        ConsoleCommand::EntityCommand { entity_id, cmd_id, params } => {
            let status = driver.entity_command(&entity_id, &cmd_id, params.as_ref()).await;
            info!("-> hub: {} {} result {} ({})", entity_id, cmd_id, status.code(), status);
        }
        ConsoleCommand::AddDevice(device) => driver.registry().add_or_update(device)?,
        ConsoleCommand::RemoveDevice(device_id) => {
            if driver.registry().remove(&device_id)?.is_none() {
                warn!("Device {} is not configured", device_id);
            }
        }
        ConsoleCommand::ClearDevices => driver.registry().clear()?,
        ConsoleCommand::List => {
            for device in driver.registry().all() {
                info!("device {} '{}' at {}", device.id, device.name, device.address);
            }
            info!("available entities: {:?}", driver.available_entities());
            info!("configured entities: {:?}", driver.configured_entities());
        }
        ConsoleCommand::Telnet { device_id, up } => match factory.get(&device_id) {
            Some(receiver) => receiver.set_telnet(up),
            None => warn!("No receiver for device {}", device_id),
        },
        ConsoleCommand::Address { device_id, address } => match factory.get(&device_id) {
            Some(receiver) => receiver.change_address(&address),
            None => warn!("No receiver for device {}", device_id),
        },
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
