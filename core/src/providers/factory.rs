//! Builds the configured provider session for each role.

use std::sync::Arc;

use tracing::debug;

use super::{GeminiSession, OpenAiCompatSession};
use crate::config::{Credentials, DialectaConfig, Provider};
use crate::debate::roles::Role;
use crate::session::{GenerationSession, SessionError, SessionFactory};

/// [`SessionFactory`] backed by [`DialectaConfig`] and [`Credentials`].
///
/// All sessions share one `reqwest::Client` connection pool.
pub struct ProviderSessionFactory {
    config: DialectaConfig,
    credentials: Credentials,
    client: reqwest::Client,
}

impl ProviderSessionFactory {
    pub fn new(config: DialectaConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            client: reqwest::Client::new(),
        }
    }
}

impl SessionFactory for ProviderSessionFactory {
    fn create(&self, role: Role) -> Result<Arc<dyn GenerationSession>, SessionError> {
        let role_config = self.config.role(role);
        role_config
            .validate()
            .map_err(SessionError::Configuration)?;

        let provider = role_config.provider;
        let key = self
            .credentials
            .get(provider)
            .ok_or_else(|| SessionError::MissingCredential {
                provider: provider.to_string(),
                hint: provider.key_env_vars().join(" or "),
            })?;

        debug!(role = %role, provider = %provider, model = role_config.effective_model(), "creating session");
        let session: Arc<dyn GenerationSession> = match provider {
            Provider::DeepSeek | Provider::DashScope => Arc::new(
                OpenAiCompatSession::new(provider, key, role_config)
                    .with_client(self.client.clone()),
            ),
            Provider::Gemini => {
                Arc::new(GeminiSession::new(key, role_config).with_client(self.client.clone()))
            }
        };
        Ok(session)
    }
}
