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

//! Writable entities: the charging switch and the current-limit number

use crate::coordinator::Coordinator;
use crate::entities::{
    EntityKind, EntityState, EntityValue, StateAttributes, entity_name, unique_id,
};
use crate::errors::CoordinatorResult;
use nexblue_api::{
    ChargerSnapshot, ChargingState, MAX_CURRENT_LIMIT_AMPS, MIN_CURRENT_LIMIT_AMPS, NexBlueError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// How long a switch command overrides the reported charging state
pub const INTENT_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct Intent {
    on: bool,
    at: Instant,
}

/// Start/stop charging switch for one charger.
///
/// The charger passes through transitional states after a command, so for
/// [`INTENT_WINDOW`] after an accepted command the commanded state wins:
/// after turn-on anything but Idle or Error reads on, after turn-off
/// anything but Charging reads off.
#[derive(Debug)]
pub struct ChargingSwitch {
    coordinator: Arc<Coordinator>,
    serial: String,
    unique_id: String,
    name: String,
    intent: Mutex<Option<Intent>>,
}

impl ChargingSwitch {
    pub const KEY: &'static str = "charging";
    pub const ICON: &'static str = "mdi:ev-station";

    pub fn new(coordinator: Arc<Coordinator>, instance_id: &str, serial: &str) -> Self {
        Self {
            coordinator,
            serial: serial.to_owned(),
            unique_id: unique_id(instance_id, serial, Self::KEY),
            name: entity_name(serial, "Charging"),
            intent: Mutex::new(None),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn snapshot(&self) -> Option<ChargerSnapshot> {
        self.coordinator
            .data()
            .and_then(|data| data.charger(&self.serial).cloned())
    }

    pub fn available(&self) -> bool {
        self.snapshot().is_some()
    }

    /// `None` while the charger has no snapshot or no charging state
    pub fn is_on(&self) -> Option<bool> {
        let state = self.snapshot()?.status.charging_state()?;

        let intent = *self.intent.lock();
        if let Some(intent) = intent
            && intent.at.elapsed() < INTENT_WINDOW
        {
            return Some(if intent.on {
                !matches!(state, ChargingState::Idle | ChargingState::Error)
            } else {
                state == ChargingState::Charging
            });
        }
        Some(state.is_charging_active())
    }

    pub async fn turn_on(&self) -> CoordinatorResult<()> {
        self.switch(true).await
    }

    pub async fn turn_off(&self) -> CoordinatorResult<()> {
        self.switch(false).await
    }

    async fn switch(&self, on: bool) -> CoordinatorResult<()> {
        let sent_at = Instant::now();
        self.coordinator.set_charging(&self.serial, on).await?;
        *self.intent.lock() = Some(Intent { on, at: sent_at });
        info!(
            "🔌 [SWITCH] Charging turned {} for {}",
            if on { "on" } else { "off" },
            self.serial
        );
        Ok(())
    }

    pub fn state(&self) -> EntityState {
        let on = self.is_on();
        EntityState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::Switch,
            unit: None,
            device_class: None,
            state_class: None,
            entity_category: None,
            icon: Some(Self::ICON),
            available: self.available(),
            value: on.map(EntityValue::Bool),
            attributes: StateAttributes::default(),
        }
    }
}

/// Charging current limit in whole amps
#[derive(Debug)]
pub struct CurrentLimitNumber {
    coordinator: Arc<Coordinator>,
    serial: String,
    unique_id: String,
    name: String,
}

impl CurrentLimitNumber {
    pub const KEY: &'static str = "current_limit";
    pub const UNIT: &'static str = "A";
    pub const ICON: &'static str = "mdi:current-ac";
    pub const STEP: f64 = 1.0;

    pub fn new(coordinator: Arc<Coordinator>, instance_id: &str, serial: &str) -> Self {
        Self {
            coordinator,
            serial: serial.to_owned(),
            unique_id: unique_id(instance_id, serial, Self::KEY),
            name: entity_name(serial, "Current Limit"),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn min_value(&self) -> f64 {
        f64::from(MIN_CURRENT_LIMIT_AMPS)
    }

    pub fn max_value(&self) -> f64 {
        f64::from(MAX_CURRENT_LIMIT_AMPS)
    }

    pub fn value(&self) -> Option<f64> {
        self.coordinator
            .data()
            .and_then(|data| data.charger(&self.serial).and_then(|s| s.status.current_limit))
    }

    /// Set a new limit. Values outside the charger's range never reach the API.
    pub async fn set_value(&self, value: f64) -> CoordinatorResult<()> {
        let amps = to_amps(value)?;
        self.coordinator
            .set_current_limit(&self.serial, amps)
            .await?;
        info!("⚡ [NUMBER] Current limit for {} set to {}A", self.serial, amps);
        Ok(())
    }

    pub fn state(&self) -> EntityState {
        let available = self
            .coordinator
            .data()
            .is_some_and(|data| data.charger(&self.serial).is_some());
        EntityState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: EntityKind::Number,
            unit: Some(Self::UNIT),
            device_class: None,
            state_class: None,
            entity_category: None,
            icon: Some(Self::ICON),
            available,
            value: self.value().map(EntityValue::Number),
            attributes: StateAttributes::default(),
        }
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_amps(value: f64) -> Result<u32, NexBlueError> {
    let min = f64::from(MIN_CURRENT_LIMIT_AMPS);
    let max = f64::from(MAX_CURRENT_LIMIT_AMPS);
    if !value.is_finite() || value < min || value > max {
        return Err(NexBlueError::Validation(format!(
            "current limit {value}A outside {MIN_CURRENT_LIMIT_AMPS}..={MAX_CURRENT_LIMIT_AMPS}A"
        )));
    }
    Ok(value.round() as u32)
}
