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

use crate::errors::{NexBlueError, NexBlueResult};
use crate::session::{Credentials, Session};
use crate::types::{
    ChargerDetail, ChargerListResponse, ChargerSnapshot, ChargerStatus, CommandResponse,
    LoginRequest, RefreshTokenRequest, TokenResponse,
};
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// NexBlue third-party cloud API
pub const DEFAULT_BASE_URL: &str = "https://api.nexblue.com/third_party/openapi";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const MIN_CURRENT_LIMIT_AMPS: u32 = 6;
pub const MAX_CURRENT_LIMIT_AMPS: u32 = 32;

// Result codes the control endpoints return when a command is accepted
const START_CHARGING_ACCEPTED: i64 = 1;
const STOP_CHARGING_ACCEPTED: i64 = 0;
const SET_CURRENT_LIMIT_ACCEPTED: i64 = 0;

/// NexBlue cloud REST API client
///
/// Cloning is cheap and clones share the authenticated session.
#[derive(Clone)]
pub struct NexBlueClient {
    base_url: String,
    credentials: Credentials,
    client: Client,
    session: Arc<RwLock<Option<Session>>>,
}

impl NexBlueClient {
    /// Create a client against `base_url` with the default request timeout
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> NexBlueResult<Self> {
        Self::with_timeout(base_url, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a client for the public NexBlue cloud endpoint
    pub fn from_credentials(credentials: Credentials) -> NexBlueResult<Self> {
        Self::new(DEFAULT_BASE_URL, credentials)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> NexBlueResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            NexBlueError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;

        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
            client,
            session: Arc::new(RwLock::new(None)),
        })
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True once a login has succeeded and no auth error has cleared it since
    pub fn has_session(&self) -> bool {
        self.session.read().is_some()
    }

    // ============= Authentication =============

    /// Log in with the account credentials and store the resulting session
    pub async fn login(&self) -> NexBlueResult<()> {
        let url = self.url("/account/login");
        info!(
            "🔐 [NEXBLUE AUTH] Logging in as {}",
            self.credentials.username()
        );
        debug!("   URL: {}", url);

        let body = LoginRequest {
            username: self.credentials.username(),
            password: self.credentials.password(),
            account_type: 0,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "❌ [NEXBLUE AUTH] Login rejected (status {}): {}",
                    status, error_text
                );
                self.clear_session();
                return Err(NexBlueError::AuthenticationFailed);
            }
            status if !status.is_success() => {
                let error_text = response.text().await.unwrap_or_default();
                error!("❌ [NEXBLUE AUTH] Status {}: {}", status, error_text);
                return Err(NexBlueError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }
            _ => {}
        }

        let token: TokenResponse = parse_body(response).await?;
        let session = Session::from_response(token, None, Utc::now()).map_err(|e| {
            error!("❌ [NEXBLUE AUTH] Login response unusable: {}", e);
            NexBlueError::AuthenticationFailed
        })?;

        debug!("   Token valid until {}", session.expires_at);
        *self.session.write() = Some(session);
        info!("✅ [NEXBLUE AUTH] Logged in");
        Ok(())
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Falls back to a full login when there is no refresh token or the refresh fails.
    pub async fn refresh_token(&self) -> NexBlueResult<()> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone());

        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token available, logging in again");
            return self.login().await;
        };

        let url = self.url("/account/refresh_token");
        debug!("🔄 [NEXBLUE AUTH] Refreshing access token");

        match self.request_refresh(&url, &refresh_token).await {
            Ok(session) => {
                debug!("   Token valid until {}", session.expires_at);
                *self.session.write() = Some(session);
                info!("✅ [NEXBLUE AUTH] Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(
                    "⚠️ [NEXBLUE AUTH] Token refresh failed ({}), logging in again",
                    e
                );
                self.login().await
            }
        }
    }

    async fn request_refresh(&self, url: &str, refresh_token: &str) -> NexBlueResult<Session> {
        let response = self
            .client
            .post(url)
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NexBlueError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = parse_body(response).await?;
        Session::from_response(token, Some(refresh_token.to_owned()), Utc::now())
    }

    /// Return a usable access token, logging in or refreshing first when needed
    pub async fn ensure_token_valid(&self) -> NexBlueResult<String> {
        let current = self
            .session
            .read()
            .as_ref()
            .map(|s| (s.is_expired(Utc::now()), s.access_token.clone()));

        match current {
            Some((false, token)) => return Ok(token),
            Some((true, _)) => self.refresh_token().await?,
            None => self.login().await?,
        }

        self.session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(NexBlueError::AuthenticationFailed)
    }

    fn clear_session(&self) {
        *self.session.write() = None;
    }

    // ============= Charger state =============

    /// Serial numbers of all chargers visible to the account
    pub async fn list_chargers(&self) -> NexBlueResult<Vec<String>> {
        debug!("🔍 [NEXBLUE QUERY] Listing chargers");
        let response: ChargerListResponse = self.get_json("/chargers").await?;

        let Some(chargers) = response.data else {
            error!("❌ [NEXBLUE ERROR] Charger list response has no 'data' key");
            return Err(NexBlueError::InvalidResponse(
                "charger list response has no 'data' key".to_owned(),
            ));
        };

        let serials: Vec<String> = chargers
            .into_iter()
            .filter_map(|c| {
                if c.serial_number.is_none() {
                    trace!("Skipping charger entry without serial_number: {:?}", c.extra);
                }
                c.serial_number
            })
            .collect();

        debug!("✅ [NEXBLUE RESULT] {} charger(s): {:?}", serials.len(), serials);
        Ok(serials)
    }

    pub async fn get_charger_detail(&self, serial: &str) -> NexBlueResult<ChargerDetail> {
        debug!("🔍 [NEXBLUE QUERY] Detail for charger {}", serial);
        let detail: ChargerDetail = self
            .get_json(&format!("/chargers/{}", urlencoding::encode(serial)))
            .await?;
        trace!("   Detail: {:?}", detail);
        Ok(detail)
    }

    pub async fn get_charger_status(&self, serial: &str) -> NexBlueResult<ChargerStatus> {
        debug!("🔍 [NEXBLUE QUERY] Status for charger {}", serial);
        let status: ChargerStatus = self
            .get_json(&format!("/chargers/{}/cmd/status", urlencoding::encode(serial)))
            .await?;
        trace!("   Status: {:?}", status);
        Ok(status)
    }

    /// Fetch detail and status of one charger as a single snapshot.
    ///
    /// Both requests must succeed; a half-fetched charger is an error.
    pub async fn fetch_status(&self, serial: &str) -> NexBlueResult<ChargerSnapshot> {
        let detail = self.get_charger_detail(serial).await?;
        let status = self.get_charger_status(serial).await?;

        debug!(
            "✅ [NEXBLUE RESULT] Charger {}: online={:?} charging_state={:?}",
            serial, detail.online, status.charging_state
        );

        Ok(ChargerSnapshot {
            serial_number: serial.to_owned(),
            detail,
            status,
            fetched_at: Utc::now(),
        })
    }

    // ============= Commands =============

    pub async fn start_charging(&self, serial: &str) -> NexBlueResult<()> {
        self.send_command(serial, "start_charging", json!({}), START_CHARGING_ACCEPTED)
            .await
    }

    pub async fn stop_charging(&self, serial: &str) -> NexBlueResult<()> {
        self.send_command(serial, "stop_charging", json!({}), STOP_CHARGING_ACCEPTED)
            .await
    }

    pub async fn set_charging(&self, serial: &str, enabled: bool) -> NexBlueResult<()> {
        if enabled {
            self.start_charging(serial).await
        } else {
            self.stop_charging(serial).await
        }
    }

    /// Set the charger's current limit. Out-of-range values never reach the network.
    pub async fn set_current_limit(&self, serial: &str, amps: u32) -> NexBlueResult<()> {
        validate_current_limit(amps)?;
        self.send_command(
            serial,
            "set_current_limit",
            json!({ "current_limit": amps }),
            SET_CURRENT_LIMIT_ACCEPTED,
        )
        .await
    }

    async fn send_command(
        &self,
        serial: &str,
        command: &str,
        body: Value,
        accepted: i64,
    ) -> NexBlueResult<()> {
        info!("📞 [NEXBLUE COMMAND] {} on charger {}", command, serial);
        debug!("   Data: {}", body);

        let path = format!("/chargers/{}/cmd/{}", urlencoding::encode(serial), command);
        let response: CommandResponse = self.post_json(&path, &body).await?;

        match response.result {
            Some(code) if code == accepted => {
                info!("✅ [NEXBLUE COMMAND] {} accepted by {}", command, serial);
                Ok(())
            }
            Some(code) => {
                error!(
                    "❌ [NEXBLUE COMMAND] {} rejected by {} (result {})",
                    command, serial, code
                );
                Err(NexBlueError::CommandRejected {
                    command: command.to_owned(),
                    result: code,
                })
            }
            None => Err(NexBlueError::InvalidResponse(format!(
                "{} response has no result code",
                command
            ))),
        }
    }

    // ============= HTTP plumbing =============

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> NexBlueResult<T> {
        let token = self.ensure_token_valid().await?;
        let url = self.url(path);
        debug!("   GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(request_error)?;

        self.read_json(response, &url).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> NexBlueResult<T> {
        let token = self.ensure_token_valid().await?;
        let url = self.url(path);
        debug!("   POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        self.read_json(response, &url).await
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        url: &str,
    ) -> NexBlueResult<T> {
        let status = response.status();
        debug!("   Response status: {}", status);

        match status {
            status if status.is_success() => parse_body(response).await,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [NEXBLUE ERROR] Authentication failed for {}", url);
                self.clear_session();
                Err(NexBlueError::AuthenticationFailed)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!("❌ [NEXBLUE ERROR] Status {} from {}: {}", status, url, error_text);
                Err(NexBlueError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }
}

impl std::fmt::Debug for NexBlueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexBlueClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("has_session", &self.has_session())
            .finish_non_exhaustive()
    }
}

/// Reject current limits the charger cannot apply
pub fn validate_current_limit(amps: u32) -> NexBlueResult<()> {
    if (MIN_CURRENT_LIMIT_AMPS..=MAX_CURRENT_LIMIT_AMPS).contains(&amps) {
        Ok(())
    } else {
        warn!(
            "⚠️ Rejecting current limit {}A (allowed {}-{}A)",
            amps, MIN_CURRENT_LIMIT_AMPS, MAX_CURRENT_LIMIT_AMPS
        );
        Err(NexBlueError::Validation(format!(
            "current limit {}A outside {}-{}A",
            amps, MIN_CURRENT_LIMIT_AMPS, MAX_CURRENT_LIMIT_AMPS
        )))
    }
}

fn request_error(e: reqwest::Error) -> NexBlueError {
    if e.is_timeout() {
        NexBlueError::Timeout
    } else {
        NexBlueError::HttpError(e)
    }
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> NexBlueResult<T> {
    let body = response.text().await.map_err(request_error)?;
    trace!("   Body: {}", body);
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, Server, ServerGuard};

    const SERIAL: &str = "NB123456";

    fn credentials() -> Credentials {
        Credentials::new("test@example.com", "test_password")
    }

    async fn mock_login(server: &mut ServerGuard, token: &str, expires_in: i64) -> Mock {
        server
            .mock("POST", "/account/login")
            .match_body(Matcher::Json(json!({
                "username": "test@example.com",
                "password": "test_password",
                "account_type": 0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": token,
                    "refresh_token": "test_refresh_token",
                    "expires_in": expires_in
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    async fn logged_in_client(server: &mut ServerGuard) -> NexBlueClient {
        let _login = mock_login(server, "test_token", 3600).await;
        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        client.login().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut server = Server::new_async().await;
        let mock = mock_login(&mut server, "test_token", 3600).await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        assert!(!client.has_session());

        client.login().await.unwrap();

        assert!(client.has_session());
        assert_eq!(client.ensure_token_valid().await.unwrap(), "test_token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/account/login")
            .with_status(401)
            .with_body(json!({"error": "invalid_credentials"}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        let result = client.login().await;

        assert!(matches!(result, Err(NexBlueError::AuthenticationFailed)));
        assert!(!client.has_session());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_without_token_is_auth_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/account/login")
            .with_status(200)
            .with_body(json!({"message": "ok"}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        let result = client.login().await;

        assert!(matches!(result, Err(NexBlueError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_first_call_logs_in() {
        let mut server = Server::new_async().await;
        let login = mock_login(&mut server, "test_token", 3600).await;
        let list = server
            .mock("GET", "/chargers")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_body(json!({"data": [{"serial_number": SERIAL, "role": 0}]}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        let serials = client.list_chargers().await.unwrap();

        assert_eq!(serials, vec![SERIAL.to_owned()]);
        login.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let mut server = Server::new_async().await;
        // expires_in below the safety margin: the session is stale immediately
        let _login = mock_login(&mut server, "stale_token", 30).await;
        let refresh = server
            .mock("POST", "/account/refresh_token")
            .match_body(Matcher::Json(json!({"refresh_token": "test_refresh_token"})))
            .with_status(200)
            .with_body(json!({"access_token": "fresh_token", "expires_in": 3600}).to_string())
            .create_async()
            .await;
        let list = server
            .mock("GET", "/chargers")
            .match_header("authorization", "Bearer fresh_token")
            .with_status(200)
            .with_body(json!({"data": []}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        client.login().await.unwrap();
        let serials = client.list_chargers().await.unwrap();

        assert!(serials.is_empty());
        refresh.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_login() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/account/login")
            .with_status(200)
            .with_body(
                json!({
                    "access_token": "login_token",
                    "refresh_token": "test_refresh_token",
                    "expires_in": 30
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/account/refresh_token")
            .with_status(401)
            .create_async()
            .await;
        let list = server
            .mock("GET", "/chargers")
            .match_header("authorization", "Bearer login_token")
            .with_status(200)
            .with_body(json!({"data": []}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        client.login().await.unwrap();
        client.list_chargers().await.unwrap();

        login.assert_async().await;
        refresh.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_chargers_requires_data_key() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let _mock = server
            .mock("GET", "/chargers")
            .with_status(200)
            .with_body(json!({"chargers": []}).to_string())
            .create_async()
            .await;

        let result = client.list_chargers().await;
        assert!(matches!(result, Err(NexBlueError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_fetch_status_combines_detail_and_status() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let detail = server
            .mock("GET", "/chargers/NB123456")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_body(
                json!({
                    "serial_number": SERIAL,
                    "online": true,
                    "product_name": "NexBlue Point (UK)",
                    "place_data": {"address": "Home", "country": "GB"}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let status = server
            .mock("GET", "/chargers/NB123456/cmd/status")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_body(
                json!({
                    "charging_state": 2,
                    "power": 7.2,
                    "energy": 12.5,
                    "lifetime_energy": 1543.2,
                    "current_limit": 16.0,
                    "cable_current_limit": 32.0,
                    "network_status": 1,
                    "is_always_lock": true
                })
                .to_string(),
            )
            .create_async()
            .await;

        let snapshot = client.fetch_status(SERIAL).await.unwrap();

        assert_eq!(snapshot.serial_number, SERIAL);
        assert_eq!(snapshot.detail.online, Some(true));
        assert_eq!(
            snapshot.detail.product_name.as_deref(),
            Some("NexBlue Point (UK)")
        );
        assert_eq!(
            snapshot.detail.extra["place_data"]["address"],
            json!("Home")
        );
        assert_eq!(snapshot.status.charging_state, Some(2));
        assert_eq!(snapshot.status.lifetime_energy, Some(1543.2));
        assert_eq!(snapshot.status.cable_current_limit, Some(32.0));
        assert_eq!(snapshot.status.is_always_lock, Some(true));
        detail.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_status_fails_when_status_fails() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let _detail = server
            .mock("GET", "/chargers/NB123456")
            .with_status(200)
            .with_body(json!({"serial_number": SERIAL}).to_string())
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/chargers/NB123456/cmd/status")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let result = client.fetch_status(SERIAL).await;
        let Err(NexBlueError::ApiError { status, message }) = result else {
            panic!("expected ApiError, got {result:?}");
        };
        assert_eq!(status, 500);
        assert_eq!(message, "internal error");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let _mock = server
            .mock("GET", "/chargers")
            .with_status(401)
            .create_async()
            .await;

        let result = client.list_chargers().await;

        assert!(matches!(result, Err(NexBlueError::AuthenticationFailed)));
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_forbidden_clears_session() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        assert!(client.has_session());
        let mock = server
            .mock("GET", "/chargers")
            .with_status(403)
            .with_body(json!({"error": "forbidden"}).to_string())
            .create_async()
            .await;

        let result = client.list_chargers().await;

        assert!(matches!(result, Err(NexBlueError::AuthenticationFailed)));
        assert!(!client.has_session());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_bad_request_is_auth_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/account/login")
            .with_status(400)
            .with_body(json!({"error": "invalid_request"}).to_string())
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        let result = client.login().await;

        assert!(matches!(result, Err(NexBlueError::AuthenticationFailed)));
        assert!(!client.has_session());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_with_huge_lifetime_does_not_panic() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/account/login")
            .with_status(200)
            .with_body(
                json!({"access_token": "t", "expires_in": 9_000_000_000_000_000_i64}).to_string(),
            )
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();
        client.login().await.unwrap();

        assert_eq!(client.ensure_token_valid().await.unwrap(), "t");
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = NexBlueClient::with_timeout(
            format!("http://{addr}"),
            credentials(),
            Duration::from_millis(100),
        )
        .unwrap();
        let result = client.login().await;

        assert!(matches!(result, Err(NexBlueError::Timeout)));
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_start_charging_accepted() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let mock = server
            .mock("POST", "/chargers/NB123456/cmd/start_charging")
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_body(json!({"result": 1}).to_string())
            .create_async()
            .await;

        client.set_charging(SERIAL, true).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_charging_rejected() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let _mock = server
            .mock("POST", "/chargers/NB123456/cmd/start_charging")
            .with_status(200)
            .with_body(json!({"result": 0}).to_string())
            .create_async()
            .await;

        let result = client.start_charging(SERIAL).await;
        assert!(matches!(
            result,
            Err(NexBlueError::CommandRejected { result: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_charging_accepted() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let mock = server
            .mock("POST", "/chargers/NB123456/cmd/stop_charging")
            .with_status(200)
            .with_body(json!({"result": 0}).to_string())
            .create_async()
            .await;

        client.set_charging(SERIAL, false).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_command_api_error() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let _mock = server
            .mock("POST", "/chargers/NB123456/cmd/stop_charging")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let result = client.stop_charging(SERIAL).await;
        assert!(matches!(
            result,
            Err(NexBlueError::ApiError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_set_current_limit_sends_amps() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        let mock = server
            .mock("POST", "/chargers/NB123456/cmd/set_current_limit")
            .match_body(Matcher::Json(json!({"current_limit": 20})))
            .with_status(200)
            .with_body(json!({"result": 0}).to_string())
            .create_async()
            .await;

        client.set_current_limit(SERIAL, 20).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_current_limit_out_of_range_never_sent() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/account/login")
            .expect(0)
            .create_async()
            .await;
        let command = server
            .mock("POST", "/chargers/NB123456/cmd/set_current_limit")
            .expect(0)
            .create_async()
            .await;

        let client = NexBlueClient::new(server.url(), credentials()).unwrap();

        for amps in [0, 5, 33, 100] {
            let result = client.set_current_limit(SERIAL, amps).await;
            assert!(matches!(result, Err(NexBlueError::Validation(_))));
        }

        login.assert_async().await;
        command.assert_async().await;
    }

    #[test]
    fn test_current_limit_bounds() {
        assert!(validate_current_limit(6).is_ok());
        assert!(validate_current_limit(32).is_ok());
        assert!(validate_current_limit(5).is_err());
        assert!(validate_current_limit(33).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = NexBlueClient::new("http://localhost:8080/", credentials()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/chargers"), "http://localhost:8080/chargers");
    }
}
