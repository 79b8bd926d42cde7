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

//! Polling coordinator
//!
//! Refreshes every charger on a fixed interval and publishes the result to
//! subscribers. A failed fetch never clears data: the charger keeps its last
//! good snapshot until a later poll succeeds.

use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::traits::ChargerDataSource;
use chrono::{DateTime, Utc};
use nexblue_api::ChargerSnapshot;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Shorter intervals passed to [`Coordinator::new`] are raised to this
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Wait between an accepted command and the refresh it triggers, giving the
/// charger time to start its state transition
pub const DEFAULT_COMMAND_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Everything the coordinator knows after a poll
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorData {
    pub chargers: BTreeMap<String, ChargerSnapshot>,
    pub last_updated: DateTime<Utc>,
}

impl CoordinatorData {
    pub fn charger(&self, serial: &str) -> Option<&ChargerSnapshot> {
        self.chargers.get(serial)
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.chargers.keys().map(String::as_str)
    }
}

/// Latest published data; `None` until the first poll succeeds
pub type SharedData = Option<Arc<CoordinatorData>>;

pub struct Coordinator {
    source: Arc<dyn ChargerDataSource>,
    update_interval: Duration,
    command_refresh_delay: Duration,
    data: watch::Sender<SharedData>,
    last_update_success: AtomicBool,
    refresh_requested: Notify,
    shutdown: Notify,
}

impl Coordinator {
    pub fn new(source: Arc<dyn ChargerDataSource>, update_interval: Duration) -> Self {
        if update_interval < MIN_UPDATE_INTERVAL {
            warn!(
                "⚠️ [COORDINATOR] Update interval {:?} too short, using {:?}",
                update_interval, MIN_UPDATE_INTERVAL
            );
        }

        let (data, _) = watch::channel(None);
        Self {
            source,
            update_interval: update_interval.max(MIN_UPDATE_INTERVAL),
            command_refresh_delay: DEFAULT_COMMAND_REFRESH_DELAY,
            data,
            last_update_success: AtomicBool::new(false),
            refresh_requested: Notify::new(),
            shutdown: Notify::new(),
        }
    }

    pub fn with_command_refresh_delay(mut self, delay: Duration) -> Self {
        self.command_refresh_delay = delay;
        self
    }

    /// Authenticate and run the first refresh.
    ///
    /// Bad credentials fail with an authentication error before any charger is
    /// fetched. A first refresh that yields no data fails with `NotReady`.
    pub async fn setup(
        source: Arc<dyn ChargerDataSource>,
        update_interval: Duration,
    ) -> CoordinatorResult<Arc<Self>> {
        Self::setup_with(Self::new(source, update_interval)).await
    }

    /// Same as [`Coordinator::setup`] for a coordinator that was already configured
    pub async fn setup_with(coordinator: Self) -> CoordinatorResult<Arc<Self>> {
        info!(
            "🔌 [COORDINATOR] Setting up with data source: {}",
            coordinator.source.name()
        );

        if let Err(e) = coordinator.source.authenticate().await {
            error!("❌ [COORDINATOR] Authentication failed: {}", e);
            return Err(e.into());
        }

        let coordinator = Arc::new(coordinator);
        if !coordinator.refresh().await && coordinator.data().is_none() {
            error!("❌ [COORDINATOR] First refresh produced no data");
            return Err(CoordinatorError::NotReady(
                "no charger data received from the first refresh".to_owned(),
            ));
        }

        Ok(coordinator)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Current data, cheap to clone
    pub fn data(&self) -> SharedData {
        self.data.borrow().clone()
    }

    /// Whether the most recent poll fetched every charger
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Receiver that is marked changed on every published update
    pub fn subscribe(&self) -> watch::Receiver<SharedData> {
        self.data.subscribe()
    }

    /// Poll every charger once. Returns true when every fetch succeeded.
    pub async fn refresh(&self) -> bool {
        debug!("🔄 [COORDINATOR] Refreshing from {}", self.source.name());

        let serials = match self.source.list_chargers().await {
            Ok(serials) => serials,
            Err(e) => {
                error!("❌ [COORDINATOR] Failed to list chargers: {}", e);
                self.last_update_success.store(false, Ordering::SeqCst);
                return false;
            }
        };

        let previous = self.data();
        let mut chargers = BTreeMap::new();
        let mut fetched = 0_usize;
        let mut failed = 0_usize;

        for serial in serials {
            match self.source.fetch_status(&serial).await {
                Ok(snapshot) => {
                    fetched += 1;
                    chargers.insert(serial, snapshot);
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        "⚠️ [COORDINATOR] Fetch failed for {}: {} (keeping last snapshot)",
                        serial, e
                    );
                    if let Some(last) = previous.as_ref().and_then(|d| d.chargers.get(&serial)) {
                        chargers.insert(serial, last.clone());
                    }
                }
            }
        }

        if fetched == 0 && failed > 0 {
            error!(
                "❌ [COORDINATOR] All {} charger fetches failed, data left unchanged",
                failed
            );
            self.last_update_success.store(false, Ordering::SeqCst);
            return false;
        }

        let success = failed == 0;
        self.data.send_replace(Some(Arc::new(CoordinatorData {
            chargers,
            last_updated: Utc::now(),
        })));
        self.last_update_success.store(success, Ordering::SeqCst);

        if success {
            debug!("✅ [COORDINATOR] Refreshed {} charger(s)", fetched);
        } else {
            warn!(
                "⚠️ [COORDINATOR] Refreshed {}/{} charger(s)",
                fetched,
                fetched + failed
            );
        }
        success
    }

    /// Ask the polling loop for an immediate refresh
    pub fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }

    /// Stop the polling loop after its current iteration
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Polling loop. Ends when [`Coordinator::shutdown`] is called.
    pub async fn run(self: Arc<Self>) {
        info!(
            "⏱️ [COORDINATOR] Polling every {}s",
            self.update_interval.as_secs()
        );

        // setup already ran the first refresh
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.update_interval, self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.notified() => {
                    info!("🛑 [COORDINATOR] Polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                () = self.refresh_requested.notified() => {
                    debug!("🔄 [COORDINATOR] Refresh requested");
                    self.refresh().await;
                    ticker.reset();
                }
            }
        }
    }

    /// Start [`Coordinator::run`] on the tokio runtime
    pub fn spawn(coordinator: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(coordinator).run())
    }

    // ============= Commands =============

    /// Start or stop charging. Local data is left alone; a refresh picks up the result.
    pub async fn set_charging(&self, serial: &str, enabled: bool) -> CoordinatorResult<()> {
        self.ensure_known(serial)?;
        self.source.set_charging(serial, enabled).await?;
        self.refresh_after_command().await;
        Ok(())
    }

    pub async fn set_current_limit(&self, serial: &str, amps: u32) -> CoordinatorResult<()> {
        self.ensure_known(serial)?;
        self.source.set_current_limit(serial, amps).await?;
        self.refresh_after_command().await;
        Ok(())
    }

    async fn refresh_after_command(&self) {
        if !self.command_refresh_delay.is_zero() {
            tokio::time::sleep(self.command_refresh_delay).await;
        }
        self.request_refresh();
    }

    fn ensure_known(&self, serial: &str) -> CoordinatorResult<()> {
        if let Some(data) = self.data()
            && !data.chargers.contains_key(serial)
        {
            return Err(CoordinatorError::ChargerNotFound(serial.to_owned()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("source", &self.source.name())
            .field("update_interval", &self.update_interval)
            .field("last_update_success", &self.last_update_success())
            .finish_non_exhaustive()
    }
}
