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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============= Account =============

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub account_type: u8,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body returned by both the login and the refresh endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

// ============= Chargers =============

/// Envelope of `GET /chargers`. The list lives under `data`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChargerListResponse {
    pub data: Option<Vec<ChargerSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargerSummary {
    pub serial_number: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Charger detail record (`GET /chargers/{serial}`)
///
/// Only the fields the bridge reads are typed; everything else the API
/// returns is kept in `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargerDetail {
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Charger status record (`GET /chargers/{serial}/cmd/status`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargerStatus {
    #[serde(default)]
    pub charging_state: Option<i64>,
    /// Instantaneous power in kW
    #[serde(default)]
    pub power: Option<f64>,
    /// Energy delivered in the current session (kWh)
    #[serde(default)]
    pub energy: Option<f64>,
    /// Energy delivered over the charger's lifetime (kWh)
    #[serde(default)]
    pub lifetime_energy: Option<f64>,
    /// Configured current limit (A)
    #[serde(default)]
    pub current_limit: Option<f64>,
    /// Current rating of the attached cable (A)
    #[serde(default)]
    pub cable_current_limit: Option<f64>,
    #[serde(default)]
    pub network_status: Option<i64>,
    /// Cable lock setting. `true` keeps the cable locked at all times.
    #[serde(default)]
    pub is_always_lock: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChargerStatus {
    pub fn charging_state(&self) -> Option<ChargingState> {
        self.charging_state.map(ChargingState::from_code)
    }

    pub fn network_status(&self) -> Option<NetworkStatus> {
        self.network_status.map(NetworkStatus::from_code)
    }

    pub fn cable_lock_mode(&self) -> Option<CableLockMode> {
        self.is_always_lock.map(CableLockMode::from_always_lock)
    }
}

/// Response of every `cmd/*` control endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommandResponse {
    pub result: Option<i64>,
}

/// Latest known state of one charger, replaced wholesale on each successful fetch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargerSnapshot {
    pub serial_number: String,
    pub detail: ChargerDetail,
    pub status: ChargerStatus,
    pub fetched_at: DateTime<Utc>,
}

// ============= Decoded status codes =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargingState {
    Idle,
    Connected,
    Charging,
    Finished,
    Error,
    LoadBalancing,
    Delayed,
    EvWaiting,
    Unknown(i64),
}

impl ChargingState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Connected,
            2 => Self::Charging,
            3 => Self::Finished,
            4 => Self::Error,
            5 => Self::LoadBalancing,
            6 => Self::Delayed,
            7 => Self::EvWaiting,
            other => Self::Unknown(other),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connected => "Connected",
            Self::Charging => "Charging",
            Self::Finished => "Finished",
            Self::Error => "Error",
            Self::LoadBalancing => "Load Balancing",
            Self::Delayed => "Delayed",
            Self::EvWaiting => "EV Waiting",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// A vehicle is plugged in. Idle and Error are the only unplugged states.
    pub fn is_vehicle_connected(&self) -> bool {
        matches!(
            self,
            Self::Connected
                | Self::Charging
                | Self::Finished
                | Self::LoadBalancing
                | Self::Delayed
                | Self::EvWaiting
        )
    }

    /// Charging or in a state that leads into charging on its own
    pub fn is_charging_active(&self) -> bool {
        matches!(
            self,
            Self::Charging | Self::LoadBalancing | Self::Delayed | Self::EvWaiting
        )
    }
}

impl fmt::Display for ChargingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkStatus {
    None,
    Wifi,
    Lte,
    Unknown(i64),
}

impl NetworkStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Wifi,
            2 => Self::Lte,
            other => Self::Unknown(other),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Wifi => "WiFi",
            Self::Lte => "LTE",
            Self::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableLockMode {
    AlwaysLocked,
    LockWhileCharging,
}

impl CableLockMode {
    pub fn from_always_lock(is_always_lock: bool) -> Self {
        if is_always_lock {
            Self::AlwaysLocked
        } else {
            Self::LockWhileCharging
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlwaysLocked => "always_locked",
            Self::LockWhileCharging => "lock_while_charging",
        }
    }
}
