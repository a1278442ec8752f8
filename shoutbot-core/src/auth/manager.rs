// shoutbot-core/src/auth/manager.rs
//
// Startup authentication for the bot account. Loads the token file, falls
// back to the device-code flow when there is none, refreshes a token that is
// about to expire and validates the result before any chat connection opens.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use shoutbot_common::models::{TokenSet, ValidatedToken};
use shoutbot_common::traits::auth_traits::TokenProvider;

use crate::auth::{BotSession, TokenFileStore, BOT_SCOPES};
use crate::config::BotConfig;
use crate::Error;

pub struct AuthManager {
    provider: Arc<dyn TokenProvider>,
    store: TokenFileStore,
}

impl AuthManager {
    pub fn new(provider: Arc<dyn TokenProvider>, store: TokenFileStore) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &TokenFileStore {
        &self.store
    }

    /// Produces a validated `BotSession`. Any error here is fatal for startup.
    pub async fn establish_bot_session(&self, config: &BotConfig) -> Result<BotSession, Error> {
        let mut tokens = match self.store.load().await? {
            Some(t) => t,
            None => {
                info!("No bot token at {}, starting device authorization.", self.store.path().display());
                let t = self.device_flow().await?;
                self.store.save(&t).await?;
                t
            }
        };

        let lead = chrono::Duration::from_std(config.refresh.lead)
            .map_err(|e| Error::Config(format!("refresh lead out of range: {e}")))?;
        if tokens.expires_within(lead, Utc::now()) {
            info!("Bot token expires at {}, refreshing before connecting.", tokens.expires_at);
            tokens = self.refresh_and_save(&tokens).await?;
        }

        let validated = match self.provider.validate(&tokens.access_token).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Bot token failed validation ({e}), trying one refresh.");
                tokens = self.refresh_and_save(&tokens).await?;
                self.provider.validate(&tokens.access_token).await?
            }
        };

        check_identity(&validated, config);
        info!(
            "Authenticated as '{}' (user_id={}), {} scopes.",
            validated.login,
            validated.user_id,
            validated.scopes.len()
        );

        Ok(BotSession::new(&config.client_id, &validated.user_id, &validated.login, tokens))
    }

    async fn refresh_and_save(&self, tokens: &TokenSet) -> Result<TokenSet, Error> {
        let fresh = self.provider.refresh(&tokens.refresh_token).await?;
        self.store.save(&fresh).await?;
        Ok(fresh)
    }

    async fn device_flow(&self) -> Result<TokenSet, Error> {
        let grant = self.provider.start_device_flow(BOT_SCOPES).await?;
        info!(
            "Authorize the bot at {} with code {}",
            grant.verification_uri, grant.user_code
        );

        let interval = Duration::from_secs(grant.interval.max(1) as u64);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(grant.expires_in.max(0) as u64);

        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(interval).await;
            if let Some(tokens) = self
                .provider
                .poll_device_token(&grant.device_code, BOT_SCOPES)
                .await?
            {
                info!("Device authorization complete.");
                return Ok(tokens);
            }
        }
        Err(Error::Auth("device authorization expired before approval".into()))
    }
}

fn check_identity(validated: &ValidatedToken, config: &BotConfig) {
    if !validated.login.eq_ignore_ascii_case(&config.bot_username) {
        warn!(
            "Token belongs to '{}' but TWITCH_BOT_USERNAME is '{}'; chat will use the token's account.",
            validated.login, config.bot_username
        );
    }
    if validated.client_id != config.client_id {
        warn!("Token was issued for a different client id than TWITCH_CLIENT_ID.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use shoutbot_common::models::DeviceCodeGrant;

    mock! {
        Provider {}
        #[async_trait]
        impl TokenProvider for Provider {
            fn authorize_url(&self, redirect_uri: &str, scopes: &[&'static str], state: &str) -> String;
            async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, Error>;
            async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error>;
            async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error>;
            async fn revoke(&self, access_token: &str) -> Result<(), Error>;
            async fn start_device_flow(&self, scopes: &[&'static str]) -> Result<DeviceCodeGrant, Error>;
            async fn poll_device_token(&self, device_code: &str, scopes: &[&'static str]) -> Result<Option<TokenSet>, Error>;
        }
    }

    fn config() -> BotConfig {
        BotConfig::from_lookup(|k| match k {
            "TWITCH_CLIENT_ID" => Some("cid".into()),
            "TWITCH_CLIENT_SECRET" => Some("secret".into()),
            "TWITCH_BOT_USERNAME" => Some("shoutbot".into()),
            "TWITCH_CHANNEL" => Some("home".into()),
            _ => None,
        })
        .unwrap()
    }

    fn validated() -> ValidatedToken {
        ValidatedToken {
            user_id: "99".into(),
            login: "shoutbot".into(),
            client_id: "cid".into(),
            scopes: vec!["chat:read".into()],
            expires_in: 3600,
        }
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenFileStore::new(dir.path().join("token.json"));
        store
            .save(&TokenSet {
                access_token: "old".into(),
                refresh_token: "r-old".into(),
                expires_at: Utc::now() + chrono::Duration::seconds(30),
            })
            .await
            .unwrap();

        let mut provider = MockProvider::new();
        provider
            .expect_refresh()
            .withf(|r| r == "r-old")
            .times(1)
            .returning(|_| Ok(TokenSet::from_expires_in("new".into(), "r-new".into(), 14_000)));
        provider
            .expect_validate()
            .withf(|t| t == "new")
            .times(1)
            .returning(|_| Ok(validated()));

        let manager = AuthManager::new(Arc::new(provider), store.clone());
        let session = manager.establish_bot_session(&config()).await.unwrap();

        assert_eq!(session.bot_user_id(), "99");
        assert_eq!(session.access_token(), "new");
        assert_eq!(store.load().await.unwrap().unwrap().refresh_token, "r-new");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_file_runs_device_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenFileStore::new(dir.path().join("token.json"));

        let mut provider = MockProvider::new();
        provider.expect_start_device_flow().times(1).returning(|_| {
            Ok(DeviceCodeGrant {
                device_code: "dev".into(),
                user_code: "ABCD".into(),
                verification_uri: "https://www.twitch.tv/activate".into(),
                expires_in: 1800,
                interval: 5,
            })
        });
        let mut polls = 0;
        provider.expect_poll_device_token().returning(move |_, _| {
            polls += 1;
            if polls < 3 {
                Ok(None)
            } else {
                Ok(Some(TokenSet::from_expires_in("a".into(), "r".into(), 14_000)))
            }
        });
        provider.expect_validate().returning(|_| Ok(validated()));

        let manager = AuthManager::new(Arc::new(provider), store.clone());
        let session = manager.establish_bot_session(&config()).await.unwrap();
        assert_eq!(session.access_token(), "a");
        assert!(store.load().await.unwrap().is_some());
    }
}
