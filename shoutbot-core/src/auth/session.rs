// shoutbot-core/src/auth/session.rs

use parking_lot::RwLock;
use shoutbot_common::models::TokenSet;

/// The bot's own identity and its current token pair.
///
/// One instance is created at startup and shared by `Arc`. The token is
/// replaced in place whenever the refresh loop rotates it, so readers always
/// see the latest value without holding on to a stale copy.
#[derive(Debug)]
pub struct BotSession {
    client_id: String,
    bot_user_id: String,
    bot_login: String,
    tokens: RwLock<TokenSet>,
}

impl BotSession {
    pub fn new(client_id: &str, bot_user_id: &str, bot_login: &str, tokens: TokenSet) -> Self {
        Self {
            client_id: client_id.to_string(),
            bot_user_id: bot_user_id.to_string(),
            bot_login: bot_login.to_lowercase(),
            tokens: RwLock::new(tokens),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    pub fn bot_login(&self) -> &str {
        &self.bot_login
    }

    pub fn access_token(&self) -> String {
        self.tokens.read().access_token.clone()
    }

    pub fn tokens(&self) -> TokenSet {
        self.tokens.read().clone()
    }

    pub fn set_tokens(&self, tokens: TokenSet) {
        *self.tokens.write() = tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn set_tokens_replaces_access_token() {
        let session = BotSession::new(
            "cid",
            "42",
            "ShoutBot",
            TokenSet {
                access_token: "old".into(),
                refresh_token: "r1".into(),
                expires_at: Utc::now(),
            },
        );
        assert_eq!(session.bot_login(), "shoutbot");

        session.set_tokens(TokenSet {
            access_token: "new".into(),
            refresh_token: "r2".into(),
            expires_at: Utc::now(),
        });
        assert_eq!(session.access_token(), "new");
        assert_eq!(session.tokens().refresh_token, "r2");
    }
}
