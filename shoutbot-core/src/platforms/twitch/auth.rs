// File: shoutbot-core/src/platforms/twitch/auth.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::{debug, error};

use twitch_oauth2::{AccessToken, ClientId};

use shoutbot_common::models::{DeviceCodeGrant, TokenSet, ValidatedToken};
use shoutbot_common::traits::auth_traits::TokenProvider;

use crate::Error;

const ID_BASE_URL: &str = "https://id.twitch.tv/oauth2";

#[derive(Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// For /validate
#[derive(Deserialize)]
struct TwitchValidateResponse {
    client_id: String,
    login: String,
    user_id: String,
    #[serde(default)]
    scopes: Vec<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TwitchDeviceResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: i64,
    #[serde(default = "default_device_interval")]
    interval: i64,
}

fn default_device_interval() -> i64 {
    5
}

#[derive(Deserialize)]
struct TwitchAuthErrorBody {
    #[serde(default)]
    message: String,
}

/// Talks to `id.twitch.tv` for every token operation the bot needs.
pub struct TwitchAuthenticator {
    client_id: String,
    client_secret: String,
    http: ReqwestClient,
}

impl TwitchAuthenticator {
    pub fn new(client_id: &str, client_secret: &str, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http: ReqwestClient::builder().timeout(timeout).build()?,
        })
    }

    async fn token_request(&self, params: &[(&str, &str)], what: &str) -> Result<TokenSet, Error> {
        let resp = self
            .http
            .post(format!("{ID_BASE_URL}/token"))
            .form(params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error {what}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("Twitch token endpoint error {what}: {e}")))?
            .json::<TwitchTokenResponse>()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on token JSON: {e}")))?;

        Ok(TokenSet::from_expires_in(
            resp.access_token,
            resp.refresh_token.unwrap_or_default(),
            resp.expires_in,
        ))
    }
}

#[async_trait]
impl TokenProvider for TwitchAuthenticator {
    fn authorize_url(&self, redirect_uri: &str, scopes: &[&'static str], state: &str) -> String {
        format!(
            "{ID_BASE_URL}/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, Error> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        self.token_request(&params, "exchanging code").await
    }

    async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error> {
        let response = self
            .http
            .get(format!("{ID_BASE_URL}/validate"))
            .header("Authorization", format!("OAuth {}", access_token))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Error calling /validate: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "Failed to validate token: HTTP {}",
                response.status()
            )));
        }

        let v: TwitchValidateResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Error parsing /validate response: {e}")))?;

        debug!("TwitchAuthenticator /validate returned login={} user_id={}", v.login, v.user_id);
        Ok(ValidatedToken {
            user_id: v.user_id,
            login: v.login,
            client_id: v.client_id,
            scopes: v.scopes,
            expires_in: v.expires_in,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        if refresh_token.is_empty() {
            return Err(Error::Auth("No refresh token available.".into()));
        }
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let mut tokens = self.token_request(&params, "refreshing token").await?;
        // Twitch may omit the refresh token when it does not rotate it.
        if tokens.refresh_token.is_empty() {
            tokens.refresh_token = refresh_token.to_string();
        }
        Ok(tokens)
    }

    async fn revoke(&self, access_token: &str) -> Result<(), Error> {
        let token = AccessToken::new(access_token.to_string());
        let cid = ClientId::new(self.client_id.clone());
        match token.revoke_token(&self.http, &cid).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to revoke => {e}");
                Err(Error::Auth(format!("Failed to revoke Twitch token: {e}")))
            }
        }
    }

    async fn start_device_flow(&self, scopes: &[&'static str]) -> Result<DeviceCodeGrant, Error> {
        let scope_str = scopes.join(" ");
        let params = [("client_id", self.client_id.as_str()), ("scopes", scope_str.as_str())];
        let resp = self
            .http
            .post(format!("{ID_BASE_URL}/device"))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error starting device flow: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("Twitch device endpoint error: {e}")))?
            .json::<TwitchDeviceResponse>()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on device JSON: {e}")))?;

        Ok(DeviceCodeGrant {
            device_code: resp.device_code,
            user_code: resp.user_code,
            verification_uri: resp.verification_uri,
            expires_in: resp.expires_in,
            interval: resp.interval,
        })
    }

    async fn poll_device_token(
        &self,
        device_code: &str,
        scopes: &[&'static str],
    ) -> Result<Option<TokenSet>, Error> {
        let scope_str = scopes.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scopes", scope_str.as_str()),
            ("device_code", device_code),
            ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
        ];
        let resp = self
            .http
            .post(format!("{ID_BASE_URL}/token"))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error polling device token: {e}")))?;

        if resp.status().is_success() {
            let body: TwitchTokenResponse = resp
                .json()
                .await
                .map_err(|e| Error::Auth(format!("Parse error on token JSON: {e}")))?;
            return Ok(Some(TokenSet::from_expires_in(
                body.access_token,
                body.refresh_token.unwrap_or_default(),
                body.expires_in,
            )));
        }

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TwitchAuthErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or_default();
        if message == "authorization_pending" || message == "slow_down" {
            return Ok(None);
        }
        Err(Error::Auth(format!("Device token poll failed: HTTP {status} => {text}")))
    }
}
