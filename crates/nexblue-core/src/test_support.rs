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

//! In-memory charger source for unit tests

use crate::traits::ChargerDataSource;
use async_trait::async_trait;
use chrono::Utc;
use nexblue_api::{ChargerDetail, ChargerSnapshot, ChargerStatus, NexBlueError, NexBlueResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
struct FakeState {
    reject_auth: bool,
    fail_listing: bool,
    fail_commands: bool,
    chargers: BTreeMap<String, ChargerStatus>,
    failing: HashSet<String>,
    list_calls: usize,
    fetch_calls: usize,
    commands: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeSource {
    state: Mutex<FakeState>,
}

impl FakeSource {
    pub fn with_charger(serial: &str, status: ChargerStatus) -> Self {
        let source = Self::default();
        source.set_status(serial, status);
        source
    }

    pub fn set_status(&self, serial: &str, status: ChargerStatus) {
        self.state.lock().chargers.insert(serial.to_owned(), status);
    }

    pub fn set_failing(&self, serial: &str, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(serial.to_owned());
        } else {
            state.failing.remove(serial);
        }
    }

    pub fn reject_auth(&self) {
        self.state.lock().reject_auth = true;
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.state.lock().fail_listing = fail;
    }

    pub fn set_fail_commands(&self, fail: bool) {
        self.state.lock().fail_commands = fail;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().fetch_calls
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }
}

pub(crate) fn status_with_state(charging_state: i64) -> ChargerStatus {
    ChargerStatus {
        charging_state: Some(charging_state),
        ..ChargerStatus::default()
    }
}

pub(crate) fn snapshot(serial: &str, status: ChargerStatus) -> ChargerSnapshot {
    ChargerSnapshot {
        serial_number: serial.to_owned(),
        detail: ChargerDetail {
            serial_number: serial.to_owned(),
            online: Some(true),
            ..ChargerDetail::default()
        },
        status,
        fetched_at: Utc::now(),
    }
}

fn server_error() -> NexBlueError {
    NexBlueError::ApiError {
        status: 500,
        message: "internal error".to_owned(),
    }
}

#[async_trait]
impl ChargerDataSource for FakeSource {
    async fn authenticate(&self) -> NexBlueResult<()> {
        if self.state.lock().reject_auth {
            Err(NexBlueError::AuthenticationFailed)
        } else {
            Ok(())
        }
    }

    async fn list_chargers(&self) -> NexBlueResult<Vec<String>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(server_error());
        }
        Ok(state.chargers.keys().cloned().collect())
    }

    async fn fetch_status(&self, serial: &str) -> NexBlueResult<ChargerSnapshot> {
        let mut state = self.state.lock();
        state.fetch_calls += 1;
        if state.failing.contains(serial) {
            return Err(server_error());
        }
        let status = state.chargers.get(serial).cloned().ok_or_else(server_error)?;
        Ok(snapshot(serial, status))
    }

    async fn set_charging(&self, serial: &str, enabled: bool) -> NexBlueResult<()> {
        let mut state = self.state.lock();
        if state.fail_commands {
            return Err(server_error());
        }
        state.commands.push(format!("set_charging:{serial}:{enabled}"));
        Ok(())
    }

    async fn set_current_limit(&self, serial: &str, amps: u32) -> NexBlueResult<()> {
        nexblue_api::validate_current_limit(amps)?;
        let mut state = self.state.lock();
        if state.fail_commands {
            return Err(server_error());
        }
        state.commands.push(format!("set_current_limit:{serial}:{amps}"));
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
