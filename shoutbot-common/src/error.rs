// ================================================================
// File: shoutbot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    /// Non-success response from Helix. `message` is the `message` field of
    /// the error body when one was present.
    #[error("Twitch API error ({status}): {message}")]
    TwitchApi { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat connection error: {0}")]
    Chat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Uuid error: {0}")]
    Uuid(#[from] uuid::Error),
}

impl Error {
    /// Human-readable message for replying in chat. Helix errors surface
    /// only the message Twitch returned.
    pub fn chat_message(&self) -> String {
        match self {
            Error::TwitchApi { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_uses_twitch_text_only() {
        let err = Error::TwitchApi {
            status: 400,
            message: "The broadcaster is not streaming live".into(),
        };
        assert_eq!(err.chat_message(), "The broadcaster is not streaming live");

        let err = Error::Validation("bad input".into());
        assert_eq!(err.chat_message(), "Validation error: bad input");
    }
}
