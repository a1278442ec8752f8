// File: shoutbot-core/src/platforms/pronouns.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;

use shoutbot_common::models::Pronoun;
use shoutbot_common::traits::api::PronounApi;

use crate::Error;

pub const PRONOUNS_BASE_URL: &str = "https://api.pronouns.alejo.io/v1";

#[derive(Debug, Deserialize)]
struct PronounEntry {
    name: String,
    subject: String,
    object: String,
    #[serde(default)]
    singular: bool,
}

impl From<PronounEntry> for Pronoun {
    fn from(p: PronounEntry) -> Self {
        Pronoun {
            name: p.name,
            subject: p.subject,
            object: p.object,
            singular: p.singular,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserPronounResponse {
    #[serde(default)]
    pronoun_id: String,
}

/// Client for the public pronouns catalog used by Twitch chat extensions.
pub struct AlejoPronounClient {
    http: ReqwestClient,
    base_url: String,
}

impl AlejoPronounClient {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            http: ReqwestClient::builder().timeout(timeout).build()?,
            base_url: PRONOUNS_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl PronounApi for AlejoPronounClient {
    async fn list_pronouns(&self) -> Result<Vec<Pronoun>, Error> {
        let resp = self
            .http
            .get(format!("{}/pronouns", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let body: HashMap<String, PronounEntry> = resp.json().await?;
        Ok(body.into_values().map(Pronoun::from).collect())
    }

    async fn user_pronoun_id(&self, login: &str) -> Result<Option<String>, Error> {
        let resp = self
            .http
            .get(format!("{}/users/{}", self.base_url, urlencoding::encode(&login.to_lowercase())))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: UserPronounResponse = resp.error_for_status()?.json().await?;
        Ok(Some(body.pronoun_id).filter(|id| !id.is_empty()))
    }
}
