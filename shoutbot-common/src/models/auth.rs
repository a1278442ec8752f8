use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh pair with an absolute expiry. This is also the on-disk
/// shape of the bot's token file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn from_expires_in(access_token: String, refresh_token: String, expires_in_secs: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    pub fn expires_within(&self, lead: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= lead
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ValidatedToken {
    pub user_id: String,
    pub login: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeviceCodeGrant {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: i64,
    pub interval: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_lead() {
        let now = Utc::now();
        let t = TokenSet {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now + Duration::minutes(4),
        };
        assert!(t.expires_within(Duration::minutes(5), now));
        assert!(!t.expires_within(Duration::minutes(3), now));
    }
}
