use async_trait::async_trait;

use crate::error::Error;
use crate::models::{DeviceCodeGrant, TokenSet, ValidatedToken};

/// The identity provider's token operations.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn authorize_url(&self, redirect_uri: &str, scopes: &[&'static str], state: &str) -> String;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, Error>;
    async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error>;
    async fn revoke(&self, access_token: &str) -> Result<(), Error>;

    async fn start_device_flow(&self, scopes: &[&'static str]) -> Result<DeviceCodeGrant, Error>;

    /// `Ok(None)` while the user has not yet approved the device.
    async fn poll_device_token(
        &self,
        device_code: &str,
        scopes: &[&'static str],
    ) -> Result<Option<TokenSet>, Error>;
}
