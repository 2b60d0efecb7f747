//! Provider selection from configuration.

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use std::sync::Arc;
use std::time::Duration;
use warden_config::{AppConfig, ProviderKind};
use warden_core::error::ProviderError;
use warden_core::provider::Provider;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(&config.provider_url, timeout)?),
        ProviderKind::OpenaiCompat => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("openai_compat requires api_key or WARDEN_API_KEY".into())
            })?;
            Arc::new(OpenAiCompatProvider::new(
                "openai_compat",
                &config.provider_url,
                api_key,
                timeout,
            )?)
        }
    };

    tracing::debug!(provider = provider.name(), url = %config.provider_url, "Provider configured");
    Ok(provider)
}
