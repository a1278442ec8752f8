// shoutbot-core/src/tasks/token_refresh.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use shoutbot_common::models::TokenSet;
use shoutbot_common::traits::auth_traits::TokenProvider;

use crate::auth::{BotSession, TokenFileStore};
use crate::config::RefreshSettings;
use crate::repositories::Repositories;
use crate::services::user_service::UserService;
use crate::Error;

/// Floor for the pause between checks, so a short-lived token cannot spin the loop.
const MIN_PAUSE: Duration = Duration::from_secs(1);

/// Published after every successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRefreshed {
    pub user_id: String,
    pub access_token: String,
}

/// Keeps one account's token pair fresh. The bot account additionally
/// updates the shared session and the token file.
pub struct TokenRefresher {
    provider: Arc<dyn TokenProvider>,
    repos: Repositories,
    users: Arc<UserService>,
    session: Arc<BotSession>,
    token_store: TokenFileStore,
    notify: broadcast::Sender<TokenRefreshed>,
    settings: RefreshSettings,
}

impl TokenRefresher {
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        repos: Repositories,
        users: Arc<UserService>,
        session: Arc<BotSession>,
        token_store: TokenFileStore,
        settings: RefreshSettings,
    ) -> Self {
        let (notify, _) = broadcast::channel(16);
        Self {
            provider,
            repos,
            users,
            session,
            token_store,
            notify,
            settings,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TokenRefreshed> {
        self.notify.subscribe()
    }

    fn is_bot(&self, user_id: &str) -> bool {
        user_id == self.session.bot_user_id()
    }

    async fn current_tokens(&self, user_id: &str) -> Result<TokenSet, Error> {
        if self.is_bot(user_id) {
            return Ok(self.session.tokens());
        }
        let user = self
            .repos
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {user_id}")))?;
        match (user.access_token, user.refresh_token) {
            (Some(access_token), Some(refresh_token)) if !refresh_token.is_empty() => Ok(TokenSet {
                access_token,
                refresh_token,
                expires_at: user.token_expiry.unwrap_or_else(Utc::now),
            }),
            _ => Err(Error::Auth(format!("user {user_id} has no refresh token"))),
        }
    }

    fn lead(&self) -> ChronoDuration {
        ChronoDuration::from_std(self.settings.lead).unwrap_or_else(|_| ChronoDuration::minutes(5))
    }

    /// Refreshes when the token expires within the lead window. Returns
    /// whether a refresh happened.
    pub async fn refresh_if_due(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        Ok(self.check(user_id, now).await?.0)
    }

    /// Same as `refresh_if_due`, also returning the expiry of the token now in use.
    async fn check(&self, user_id: &str, now: DateTime<Utc>) -> Result<(bool, DateTime<Utc>), Error> {
        let current = self.current_tokens(user_id).await?;
        if !current.expires_within(self.lead(), now) {
            debug!("Token for {} valid until {}", user_id, current.expires_at);
            return Ok((false, current.expires_at));
        }

        let fresh = self.provider.refresh(&current.refresh_token).await?;

        if self.is_bot(user_id) {
            self.session.set_tokens(fresh.clone());
            // best-effort, like the database write below
            if let Err(e) = self.token_store.save(&fresh).await {
                warn!("Bot token refreshed but not written to the token file: {}", e);
            }
            if let Err(e) = self.repos.users.update_tokens(user_id, &fresh).await {
                warn!("Bot token refreshed but not stored in the database: {}", e);
            }
        } else {
            self.repos.users.update_tokens(user_id, &fresh).await?;
        }

        info!("Refreshed token for {}; expires at {}", user_id, fresh.expires_at);
        // nobody listening is fine
        let _ = self.notify.send(TokenRefreshed {
            user_id: user_id.to_string(),
            access_token: fresh.access_token,
        });
        Ok((true, fresh.expires_at))
    }

    /// Time until the next check: the poll interval, or less when the token
    /// enters the lead window sooner.
    pub fn next_pause(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let due_in = (expires_at - self.lead() - now).to_std().unwrap_or_default();
        due_in.min(self.settings.poll_interval).max(MIN_PAUSE)
    }

    async fn sync_moderation(&self, user_id: &str) {
        let token = match self.current_tokens(user_id).await {
            Ok(t) => t.access_token,
            Err(e) => {
                warn!("Skipping moderator sync for {}: {}", user_id, e);
                return;
            }
        };
        if let Err(e) = self.users.sync_moderated_channels(user_id, &token).await {
            warn!("Moderator sync for {} failed: {}", user_id, e);
        }
    }

    /// One loop for one account. Sleeps until the token is due or
    /// `poll_interval` passes, whichever is sooner, and `retry_backoff` after
    /// a failure.
    pub fn spawn_loop(self: &Arc<Self>, user_id: String, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.sync_moderation(&user_id).await;
            loop {
                let pause = match this.check(&user_id, Utc::now()).await {
                    Ok((_, expires_at)) => this.next_pause(expires_at, Utc::now()),
                    Err(e) => {
                        error!("Token refresh for {} failed: {}", user_id, e);
                        this.settings.retry_backoff
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            debug!("Token refresh loop for {} stopped", user_id);
        })
    }

    /// Starts a loop for the bot and for every stored account that can be refreshed.
    pub async fn spawn_all(self: &Arc<Self>, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>, Error> {
        let mut ids = vec![self.session.bot_user_id().to_string()];
        for user in self.repos.users.list_users_with_refresh_token().await? {
            if !ids.contains(&user.id) {
                ids.push(user.id);
            }
        }
        info!("Starting {} token refresh loops", ids.len());
        Ok(ids
            .into_iter()
            .map(|id| self.spawn_loop(id, cancel.child_token()))
            .collect())
    }
}
