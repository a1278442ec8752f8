// File: shoutbot-core/src/services/pronoun_service.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use shoutbot_common::models::Pronoun;
use shoutbot_common::traits::api::PronounApi;
use shoutbot_common::traits::repository_traits::PronounRepository;

use crate::Error;

/// Pronoun lookups. Anything that goes wrong degrades to `None`, which the
/// template engine renders as they/them.
pub struct PronounService {
    api: Arc<dyn PronounApi>,
    repo: Arc<dyn PronounRepository>,
}

impl PronounService {
    pub fn new(api: Arc<dyn PronounApi>, repo: Arc<dyn PronounRepository>) -> Self {
        Self { api, repo }
    }

    /// Fetches the catalog and stores every entry. Returns how many were stored.
    pub async fn load_pronouns(&self) -> Result<usize, Error> {
        let catalog = self.api.list_pronouns().await?;
        for p in &catalog {
            self.repo.upsert_pronoun(p).await?;
        }
        info!("Loaded {} pronouns", catalog.len());
        Ok(catalog.len())
    }

    pub async fn user_pronoun(&self, login: &str) -> Option<Pronoun> {
        let id = match self.api.user_pronoun_id(login).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("No pronoun set for {}", login);
                return None;
            }
            Err(e) => {
                warn!("Pronoun lookup for {} failed: {}", login, e);
                return None;
            }
        };
        match self.repo.get_pronoun(&id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Reading pronoun '{}' failed: {}", id, e);
                None
            }
        }
    }
}
