use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry from the pronouns catalog, e.g. `{ name: "hehim", subject: "He",
/// object: "Him", singular: true }`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Pronoun {
    pub name: String,
    pub subject: String,
    pub object: String,
    pub singular: bool,
}

impl Pronoun {
    pub fn they_them() -> Self {
        Self {
            name: "theythem".to_string(),
            subject: "They".to_string(),
            object: "Them".to_string(),
            singular: false,
        }
    }

    /// Grammatical number used for the copula. A pronoun counts as singular
    /// when flagged so or when its subject is he/she/it.
    pub fn is_singular(&self) -> bool {
        self.singular
            || matches!(
                self.subject.to_lowercase().as_str(),
                "he" | "she" | "it"
            )
    }
}

/// A Twitch account known to the bot. Credential fields are only set for
/// accounts that authenticated with the bot (broadcasters, the bot itself).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TwitchUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub offline_image_url: Option<String>,
    pub broadcaster_type: Option<String>,
    pub color: Option<String>,
    pub timezone: Option<String>,
    pub is_live: bool,
    pub enabled: bool,
    pub pronoun: Option<Pronoun>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TwitchUser {
    pub fn new(id: &str, username: &str, display_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            username: username.to_lowercase(),
            display_name: display_name.to_string(),
            description: None,
            profile_image_url: None,
            offline_image_url: None,
            broadcaster_type: None,
            color: None,
            timezone: None,
            is_live: false,
            enabled: true,
            pronoun: None,
            access_token: None,
            refresh_token: None,
            token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link(&self) -> String {
        format!("https://www.twitch.tv/{}", self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_from_subject() {
        let she = Pronoun {
            name: "sheher".into(),
            subject: "She".into(),
            object: "Her".into(),
            singular: false,
        };
        assert!(she.is_singular());
        assert!(!Pronoun::they_them().is_singular());
    }
}
