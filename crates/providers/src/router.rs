//! Provider router: selects the correct completion provider based on config.

use std::collections::HashMap;
use std::sync::Arc;

use huddle_config::AppConfig;
use huddle_core::error::ProviderError;
use huddle_core::provider::CompletionProvider;

use crate::openai_compat::{GEMINI_BASE_URL, OpenAiCompatProvider};

/// Holds the configured completion providers.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn CompletionProvider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn CompletionProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for name in config.providers.keys() {
        router.register(name.clone(), build_provider(config, name));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        router.register(
            config.default_provider.clone(),
            build_provider(config, &config.default_provider),
        );
    }

    router
}

/// The default provider, failing when it needs a key and none is configured.
pub fn default_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    if requires_api_key(&config.default_provider)
        && config.api_key_for(&config.default_provider).is_none()
    {
        return Err(ProviderError::NotConfigured(format!(
            "no API key for '{}' (set HUDDLE_API_KEY or providers.{}.api_key)",
            config.default_provider, config.default_provider
        )));
    }

    build_from_config(config)
        .default()
        .ok_or_else(|| ProviderError::NotConfigured(config.default_provider.clone()))
}

fn build_provider(config: &AppConfig, name: &str) -> Arc<dyn CompletionProvider> {
    let api_key = config.api_key_for(name).unwrap_or_default();
    let base_url = config
        .providers
        .get(name)
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let provider = OpenAiCompatProvider::new(name, base_url, api_key, config.model_for(name))
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    Arc::new(provider)
}

fn requires_api_key(provider_name: &str) -> bool {
    provider_name != "ollama"
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" => GEMINI_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        let provider = Arc::new(OpenAiCompatProvider::openrouter("sk-test", "m"));
        router.register("openrouter", provider);

        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("gemini").contains("generativelanguage"));
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_url: Some("http://gpu-box:11434/v1".into()),
                ..ProviderConfig::default()
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["gemini", "ollama"]);
    }

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        let err = default_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(default_from_config(&config).is_ok());
    }
}
