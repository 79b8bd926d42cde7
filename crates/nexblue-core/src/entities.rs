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

//! Read-only entities derived from the coordinator data
//!
//! Every entity is a pure function of one charger snapshot. Nothing here
//! talks to the API.

use crate::coordinator::CoordinatorData;
use nexblue_api::{ChargerSnapshot, ChargingState};
use serde::Serialize;
use std::fmt;

pub const MANUFACTURER: &str = "NexBlue";
pub const DEFAULT_MODEL: &str = "EV Charger";
pub const DEFAULT_INSTANCE_ID: &str = "nexblue_hass";
pub const ATTRIBUTION: &str = "Data provided by NexBlue API";
pub const INTEGRATION: &str = "nexblue_hass";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(true) => write!(f, "on"),
            Self::Bool(false) => write!(f, "off"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    BinarySensor,
    Switch,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Power,
    Energy,
    Current,
    Connectivity,
    BatteryCharging,
    Plug,
    Problem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
}

/// Extra attributes attached to every entity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateAttributes {
    pub attribution: &'static str,
    pub integration: &'static str,
}

impl Default for StateAttributes {
    fn default() -> Self {
        Self {
            attribution: ATTRIBUTION,
            integration: INTEGRATION,
        }
    }
}

/// Device the entities of one charger are grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    pub fn from_snapshot(snapshot: &ChargerSnapshot) -> Self {
        let detail = &snapshot.detail;
        Self {
            identifier: snapshot.serial_number.clone(),
            name: format!("{MANUFACTURER} {}", snapshot.serial_number),
            manufacturer: MANUFACTURER.to_owned(),
            model: detail
                .model
                .clone()
                .or_else(|| detail.product_name.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            sw_version: detail.firmware_version.clone(),
        }
    }
}

/// Current value of one entity as a host would display it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub entity_category: Option<EntityCategory>,
    pub icon: Option<&'static str>,
    pub available: bool,
    pub value: Option<EntityValue>,
    pub attributes: StateAttributes,
}

pub fn unique_id(instance_id: &str, serial: &str, key: &str) -> String {
    format!("{instance_id}_{serial}_{key}")
}

pub fn entity_name(serial: &str, name: &str) -> String {
    format!("{MANUFACTURER} {serial} {name}")
}

// ============= Sensors =============

#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub entity_category: Option<EntityCategory>,
    pub icon: Option<&'static str>,
    pub value: fn(&ChargerSnapshot) -> Option<EntityValue>,
}

fn charging_state_text(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot
        .status
        .charging_state()
        .map(|state| EntityValue::Text(state.display_name().to_owned()))
}

fn power(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot.status.power.map(EntityValue::Number)
}

fn energy_session(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot.status.energy.map(EntityValue::Number)
}

fn energy_total(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot.status.lifetime_energy.map(EntityValue::Number)
}

fn current_limit(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot.status.current_limit.map(EntityValue::Number)
}

fn cable_current_limit(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot.status.cable_current_limit.map(EntityValue::Number)
}

fn network_status_text(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot
        .status
        .network_status()
        .map(|status| EntityValue::Text(status.display_name().to_owned()))
}

fn cable_lock_mode_text(snapshot: &ChargerSnapshot) -> Option<EntityValue> {
    snapshot
        .status
        .cable_lock_mode()
        .map(|mode| EntityValue::Text(mode.as_str().to_owned()))
}

pub const SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "charging_state",
        name: "Charging State",
        unit: None,
        device_class: None,
        state_class: None,
        entity_category: None,
        icon: Some("mdi:ev-station"),
        value: charging_state_text,
    },
    SensorDescription {
        key: "power",
        name: "Power",
        unit: Some("kW"),
        device_class: Some(DeviceClass::Power),
        state_class: Some(StateClass::Measurement),
        entity_category: None,
        icon: Some("mdi:flash"),
        value: power,
    },
    SensorDescription {
        key: "energy_session",
        name: "Energy (Session)",
        unit: Some("kWh"),
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
        entity_category: None,
        icon: Some("mdi:lightning-bolt"),
        value: energy_session,
    },
    SensorDescription {
        key: "energy_total",
        name: "Energy (Total)",
        unit: Some("kWh"),
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
        entity_category: None,
        icon: Some("mdi:lightning-bolt-circle"),
        value: energy_total,
    },
    SensorDescription {
        key: "current_limit",
        name: "Current Limit",
        unit: Some("A"),
        device_class: Some(DeviceClass::Current),
        state_class: Some(StateClass::Measurement),
        entity_category: Some(EntityCategory::Diagnostic),
        icon: Some("mdi:current-ac"),
        value: current_limit,
    },
    SensorDescription {
        key: "cable_current_limit",
        name: "Cable Current Limit",
        unit: Some("A"),
        device_class: Some(DeviceClass::Current),
        state_class: Some(StateClass::Measurement),
        entity_category: Some(EntityCategory::Diagnostic),
        icon: Some("mdi:current-ac"),
        value: cable_current_limit,
    },
    SensorDescription {
        key: "network_status",
        name: "Network Status",
        unit: None,
        device_class: None,
        state_class: None,
        entity_category: Some(EntityCategory::Diagnostic),
        icon: Some("mdi:wifi"),
        value: network_status_text,
    },
    SensorDescription {
        key: "cable_lock_mode",
        name: "Cable Lock Mode",
        unit: None,
        device_class: None,
        state_class: None,
        entity_category: Some(EntityCategory::Diagnostic),
        icon: Some("mdi:lock"),
        value: cable_lock_mode_text,
    },
];

// ============= Binary sensors =============

#[derive(Debug, Clone, Copy)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: Option<DeviceClass>,
    pub entity_category: Option<EntityCategory>,
    pub value: fn(&ChargerSnapshot) -> Option<bool>,
}

fn online(snapshot: &ChargerSnapshot) -> Option<bool> {
    snapshot.detail.online
}

fn charging(snapshot: &ChargerSnapshot) -> Option<bool> {
    snapshot
        .status
        .charging_state()
        .map(|state| state == ChargingState::Charging)
}

fn vehicle_connected(snapshot: &ChargerSnapshot) -> Option<bool> {
    snapshot
        .status
        .charging_state()
        .map(|state| state.is_vehicle_connected())
}

fn charger_error(snapshot: &ChargerSnapshot) -> Option<bool> {
    snapshot
        .status
        .charging_state()
        .map(|state| state == ChargingState::Error)
}

pub const BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: "online",
        name: "Online",
        device_class: Some(DeviceClass::Connectivity),
        entity_category: Some(EntityCategory::Diagnostic),
        value: online,
    },
    BinarySensorDescription {
        key: "charging",
        name: "Charging",
        device_class: Some(DeviceClass::BatteryCharging),
        entity_category: None,
        value: charging,
    },
    BinarySensorDescription {
        key: "vehicle_connected",
        name: "Vehicle Connected",
        device_class: Some(DeviceClass::Plug),
        entity_category: None,
        value: vehicle_connected,
    },
    BinarySensorDescription {
        key: "error",
        name: "Error",
        device_class: Some(DeviceClass::Problem),
        entity_category: Some(EntityCategory::Diagnostic),
        value: charger_error,
    },
];

fn lookup<'a>(data: Option<&'a CoordinatorData>, serial: &str) -> Option<&'a ChargerSnapshot> {
    data.and_then(|d| d.charger(serial))
}

/// Sensor states for one charger, all unavailable if the charger has no snapshot
pub fn sensor_states(
    data: Option<&CoordinatorData>,
    instance_id: &str,
    serial: &str,
) -> Vec<EntityState> {
    let snapshot = lookup(data, serial);
    SENSORS
        .iter()
        .map(|desc| EntityState {
            unique_id: unique_id(instance_id, serial, desc.key),
            name: entity_name(serial, desc.name),
            kind: EntityKind::Sensor,
            unit: desc.unit,
            device_class: desc.device_class,
            state_class: desc.state_class,
            entity_category: desc.entity_category,
            icon: desc.icon,
            available: snapshot.is_some(),
            value: snapshot.and_then(desc.value),
            attributes: StateAttributes::default(),
        })
        .collect()
}

pub fn binary_sensor_states(
    data: Option<&CoordinatorData>,
    instance_id: &str,
    serial: &str,
) -> Vec<EntityState> {
    let snapshot = lookup(data, serial);
    BINARY_SENSORS
        .iter()
        .map(|desc| EntityState {
            unique_id: unique_id(instance_id, serial, desc.key),
            name: entity_name(serial, desc.name),
            kind: EntityKind::BinarySensor,
            unit: None,
            device_class: desc.device_class,
            state_class: None,
            entity_category: desc.entity_category,
            icon: None,
            available: snapshot.is_some(),
            value: snapshot.and_then(desc.value).map(EntityValue::Bool),
            attributes: StateAttributes::default(),
        })
        .collect()
}
