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

//! Account credentials and the bearer-token session derived from them

use crate::errors::{NexBlueError, NexBlueResult};
use crate::types::TokenResponse;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// Token lifetime assumed when the API omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens are treated as expired this long before the server says so
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Upper bound applied to a server-supplied `expires_in`
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 2_147_483_647;

/// NexBlue account credentials, fixed for the lifetime of a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated session returned by login or token refresh
#[derive(Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a token response.
    ///
    /// A refresh response may omit `refresh_token`; the previous one is kept in that case.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> NexBlueResult<Self> {
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                NexBlueError::InvalidResponse("token response has no access_token".to_owned())
            })?;

        let expires_in = response
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .clamp(0, MAX_TOKEN_LIFETIME_SECS);
        let lifetime = TimeDelta::try_seconds(expires_in - TOKEN_EXPIRY_MARGIN_SECS)
            .ok_or_else(|| invalid_lifetime(expires_in))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| invalid_lifetime(expires_in))?;

        Ok(Self {
            access_token,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

fn invalid_lifetime(expires_in: i64) -> NexBlueError {
    NexBlueError::InvalidResponse(format!("token lifetime of {expires_in}s is out of range"))
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
