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

use async_trait::async_trait;
use nexblue_api::{ChargerSnapshot, NexBlueClient, NexBlueResult};

/// Source of charger state and sink for charger commands
///
/// The coordinator only talks to chargers through this trait, so it can be
/// driven by the cloud client in production and by fakes in tests.
#[async_trait]
pub trait ChargerDataSource: Send + Sync {
    /// Verify the account credentials
    async fn authenticate(&self) -> NexBlueResult<()>;

    /// Serial numbers of the chargers on the account
    async fn list_chargers(&self) -> NexBlueResult<Vec<String>>;

    /// Read the full state of one charger
    async fn fetch_status(&self, serial: &str) -> NexBlueResult<ChargerSnapshot>;

    /// Start (`true`) or stop (`false`) charging
    async fn set_charging(&self, serial: &str, enabled: bool) -> NexBlueResult<()>;

    /// Set the charging current limit in amps
    async fn set_current_limit(&self, serial: &str, amps: u32) -> NexBlueResult<()>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

#[async_trait]
impl ChargerDataSource for NexBlueClient {
    async fn authenticate(&self) -> NexBlueResult<()> {
        self.login().await
    }

    async fn list_chargers(&self) -> NexBlueResult<Vec<String>> {
        NexBlueClient::list_chargers(self).await
    }

    async fn fetch_status(&self, serial: &str) -> NexBlueResult<ChargerSnapshot> {
        NexBlueClient::fetch_status(self, serial).await
    }

    async fn set_charging(&self, serial: &str, enabled: bool) -> NexBlueResult<()> {
        NexBlueClient::set_charging(self, serial, enabled).await
    }

    async fn set_current_limit(&self, serial: &str, amps: u32) -> NexBlueResult<()> {
        NexBlueClient::set_current_limit(self, serial, amps).await
    }

    fn name(&self) -> &str {
        "NexBlue Cloud"
    }
}
