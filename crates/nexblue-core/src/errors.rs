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

use nexblue_api::NexBlueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Api(#[from] NexBlueError),

    #[error("Initial refresh failed: {0}")]
    NotReady(String),

    #[error("Charger not found: {0}")]
    ChargerNotFound(String),
}

impl CoordinatorError {
    /// True when setup or a command failed because the credentials were rejected
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth_error())
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
