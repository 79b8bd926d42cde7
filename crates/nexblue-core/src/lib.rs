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

//! Polling coordinator and entity model for NexBlue chargers

pub mod controls;
pub mod coordinator;
pub mod entities;
pub mod errors;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use controls::{ChargingSwitch, CurrentLimitNumber, INTENT_WINDOW};
pub use coordinator::{
    Coordinator, CoordinatorData, DEFAULT_COMMAND_REFRESH_DELAY, DEFAULT_UPDATE_INTERVAL,
    MIN_UPDATE_INTERVAL, SharedData,
};
pub use entities::{
    BINARY_SENSORS, DEFAULT_INSTANCE_ID, DeviceClass, DeviceInfo, EntityCategory, EntityKind,
    EntityState, EntityValue, SENSORS, StateAttributes, StateClass, binary_sensor_states,
    sensor_states,
};
pub use errors::{CoordinatorError, CoordinatorResult};
pub use traits::ChargerDataSource;
