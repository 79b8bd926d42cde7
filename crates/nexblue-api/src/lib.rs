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

//! NexBlue cloud API client
//!
//! Authenticates with account credentials, reads charger detail and status
//! records, and issues charging control commands.

pub mod client;
pub mod errors;
pub mod session;
pub mod types;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, MAX_CURRENT_LIMIT_AMPS, MIN_CURRENT_LIMIT_AMPS,
    NexBlueClient, validate_current_limit,
};
pub use errors::{NexBlueError, NexBlueResult};
pub use session::{Credentials, Session};
pub use types::{
    CableLockMode, ChargerDetail, ChargerSnapshot, ChargerStatus, ChargingState, NetworkStatus,
    TokenResponse,
};
