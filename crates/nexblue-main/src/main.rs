// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NexBlue Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use nexblue_api::{Credentials, NexBlueClient};
use nexblue_core::{
    ChargerDataSource, ChargingSwitch, Coordinator, CurrentLimitNumber, DeviceInfo, EntityState,
    binary_sensor_states, sensor_states,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) = AppConfig::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.system.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    info!("🚀 Starting NexBlue Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration loaded from {}", source);
    info!("   Account: {}", config.account.username);
    info!("   API: {}", config.api.base_url);
    info!("   Scan interval: {}s", config.polling.scan_interval_secs);
    info!("   Instance id: {}", config.system.instance_id);

    let client = NexBlueClient::with_timeout(
        config.api.base_url.clone(),
        Credentials::new(
            config.account.username.clone(),
            config.account.password.clone(),
        ),
        config.timeout(),
    )?;
    let source: Arc<dyn ChargerDataSource> = Arc::new(client);

    let coordinator = match Coordinator::setup(source, config.scan_interval()).await {
        Ok(coordinator) => coordinator,
        Err(e) if e.is_auth_error() => {
            return Err(e).context("NexBlue rejected the account credentials");
        }
        Err(e) => return Err(e).context("NexBlue integration is not ready"),
    };

    let instance_id = config.system.instance_id.as_str();
    match cli.command_or_default() {
        Commands::Run => run(&coordinator, instance_id).await,
        Commands::Status => {
            print_status(&coordinator, instance_id);
            Ok(())
        }
        Commands::Start { serial } => {
            let switch = ChargingSwitch::new(coordinator.clone(), instance_id, serial);
            switch
                .turn_on()
                .await
                .with_context(|| format!("Failed to start charging on {serial}"))?;
            report_after_command(&coordinator, instance_id, serial).await;
            Ok(())
        }
        Commands::Stop { serial } => {
            let switch = ChargingSwitch::new(coordinator.clone(), instance_id, serial);
            switch
                .turn_off()
                .await
                .with_context(|| format!("Failed to stop charging on {serial}"))?;
            report_after_command(&coordinator, instance_id, serial).await;
            Ok(())
        }
        Commands::SetCurrent { serial, amps } => {
            let number = CurrentLimitNumber::new(coordinator.clone(), instance_id, serial);
            number
                .set_value(f64::from(*amps))
                .await
                .with_context(|| format!("Failed to set current limit on {serial}"))?;
            report_after_command(&coordinator, instance_id, serial).await;
            Ok(())
        }
    }
}

/// Entities of one charger, kept alive across updates so the switch keeps its intent window
struct ChargerEntities {
    switch: ChargingSwitch,
    number: CurrentLimitNumber,
}

impl ChargerEntities {
    fn new(coordinator: &Arc<Coordinator>, instance_id: &str, serial: &str) -> Self {
        Self {
            switch: ChargingSwitch::new(coordinator.clone(), instance_id, serial),
            number: CurrentLimitNumber::new(coordinator.clone(), instance_id, serial),
        }
    }

    fn states(
        &self,
        coordinator: &Coordinator,
        instance_id: &str,
        serial: &str,
    ) -> Vec<EntityState> {
        let data = coordinator.data();
        let mut states = sensor_states(data.as_deref(), instance_id, serial);
        states.extend(binary_sensor_states(data.as_deref(), instance_id, serial));
        states.push(self.switch.state());
        states.push(self.number.state());
        states
    }
}

async fn run(coordinator: &Arc<Coordinator>, instance_id: &str) -> Result<()> {
    let handle = Coordinator::spawn(coordinator);
    let mut updates = coordinator.subscribe();
    let mut entities: BTreeMap<String, ChargerEntities> = BTreeMap::new();

    log_entities(coordinator, instance_id, &mut entities);

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("🛑 Shutdown signal received");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("⚠️ Coordinator stopped publishing updates");
                    break;
                }
                log_entities(coordinator, instance_id, &mut entities);
            }
        }
    }

    coordinator.shutdown();
    handle.await.context("Polling task failed")?;
    info!("👋 NexBlue Bridge stopped");
    Ok(())
}

fn log_entities(
    coordinator: &Arc<Coordinator>,
    instance_id: &str,
    entities: &mut BTreeMap<String, ChargerEntities>,
) {
    let Some(data) = coordinator.data() else {
        return;
    };

    for (serial, snapshot) in &data.chargers {
        let charger = entities
            .entry(serial.clone())
            .or_insert_with(|| ChargerEntities::new(coordinator, instance_id, serial));

        let state = snapshot
            .status
            .charging_state()
            .map_or("unknown", |s| s.display_name());
        info!(
            "🔋 {} [{}] power={} kW, limit={} A, updated {}",
            serial,
            state,
            snapshot
                .status
                .power
                .map_or_else(|| "-".to_owned(), |p| p.to_string()),
            snapshot
                .status
                .current_limit
                .map_or_else(|| "-".to_owned(), |c| c.to_string()),
            snapshot.fetched_at.format("%H:%M:%S")
        );

        for entity in charger.states(coordinator, instance_id, serial) {
            debug!("   {} = {}", entity.unique_id, format_value(&entity));
        }
    }

    if !coordinator.last_update_success() {
        warn!("⚠️ Last update was incomplete, some chargers show their previous state");
    }
}

fn print_status(coordinator: &Arc<Coordinator>, instance_id: &str) {
    let Some(data) = coordinator.data() else {
        println!("No charger data available");
        return;
    };

    if data.chargers.is_empty() {
        println!("No chargers found on this account");
        return;
    }

    for (serial, snapshot) in &data.chargers {
        let device = DeviceInfo::from_snapshot(snapshot);
        println!(
            "{} ({} {}, firmware {})",
            device.name,
            device.manufacturer,
            device.model,
            device.sw_version.as_deref().unwrap_or("unknown")
        );

        let entities = ChargerEntities::new(coordinator, instance_id, serial);
        for entity in entities.states(coordinator, instance_id, serial) {
            println!("  {:<44} {}", entity.name, format_value(&entity));
        }
        println!();
    }
}

async fn report_after_command(coordinator: &Arc<Coordinator>, instance_id: &str, serial: &str) {
    info!("✅ Command accepted by {}", serial);
    coordinator.refresh().await;

    let entities = ChargerEntities::new(coordinator, instance_id, serial);
    for entity in entities.states(coordinator, instance_id, serial) {
        println!("  {:<44} {}", entity.name, format_value(&entity));
    }
}

fn format_value(entity: &EntityState) -> String {
    if !entity.available {
        return "unavailable".to_owned();
    }
    match (&entity.value, entity.unit) {
        (Some(value), Some(unit)) => format!("{value} {unit}"),
        (Some(value), None) => value.to_string(),
        (None, _) => "unknown".to_owned(),
    }
}
