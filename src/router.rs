//! # Model router
//!
//! Maps a provider name (`openai`, `ollama`, `gemini`) to its [`Gateway`].
//! Which providers exist depends on the configuration: Ollama is always
//! registered, the hosted providers only when their API key is present.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::AmberConfig,
    gateway::{
        Gateway, GeminiGateway, OllamaGateway, OpenAiGateway, gemini::GEMINI_MODELS,
        openai::OPENAI_MODELS,
    },
};

/// A named model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Ollama,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Ollama, Provider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!(
                "unknown provider '{other}' (expected openai, ollama or gemini)"
            )),
        }
    }
}

/// Registry of the gateways available in this run.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    models: HashMap<Provider, Gateway>,
    default_provider: Provider,
}

impl ModelRouter {
    /// Build the registry from configuration.
    ///
    /// The default provider comes from `config.default_provider`; an
    /// unrecognized name falls back to Ollama. The Ollama gateway starts out on
    /// `config.default_model`.
    pub fn new(config: &AmberConfig) -> Self {
        let mut models = HashMap::new();

        match config.openai_api_key() {
            Some(key) => {
                models.insert(
                    Provider::OpenAi,
                    Gateway::OpenAi(OpenAiGateway::new(
                        key,
                        &config.openai_api_base,
                        config.openai_model.clone(),
                    )),
                );
            }
            None => warn!("Failed to initialize OpenAI model: OpenAI API key is not set"),
        }

        models.insert(
            Provider::Ollama,
            Gateway::Ollama(
                OllamaGateway::new(config.ollama_base_url.clone())
                    .with_model(config.default_model.clone()),
            ),
        );

        match config.gemini_api_key() {
            Some(key) => {
                models.insert(
                    Provider::Gemini,
                    Gateway::Gemini(GeminiGateway::new(
                        key,
                        &config.gemini_api_base,
                        config.gemini_model.clone(),
                    )),
                );
            }
            None => warn!("Failed to initialize Gemini model: Gemini API key is not set"),
        }

        let default_provider = config.default_provider.parse().unwrap_or_else(|err| {
            warn!("{}; defaulting to ollama", err);
            Provider::Ollama
        });

        info!(
            "Providers available: {:?}",
            models.keys().map(Provider::as_str).collect::<Vec<_>>()
        );

        Self {
            models,
            default_provider,
        }
    }

    /// Build a registry from explicit gateways (default provider Ollama).
    pub fn from_gateways(gateways: impl IntoIterator<Item = (Provider, Gateway)>) -> Self {
        Self {
            models: gateways.into_iter().collect(),
            default_provider: Provider::Ollama,
        }
    }

    /// Look a gateway up by provider name, case-insensitively.
    pub fn get_model(&self, name: &str) -> Option<&Gateway> {
        self.gateway(name.parse().ok()?)
    }

    pub fn get_model_mut(&mut self, name: &str) -> Option<&mut Gateway> {
        self.gateway_mut(name.parse().ok()?)
    }

    pub fn gateway(&self, provider: Provider) -> Option<&Gateway> {
        self.models.get(&provider)
    }

    pub fn gateway_mut(&mut self, provider: Provider) -> Option<&mut Gateway> {
        self.models.get_mut(&provider)
    }

    pub fn default_provider(&self) -> Provider {
        self.default_provider
    }

    /// Registered providers in a stable order.
    pub fn list_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.models.contains_key(provider))
            .collect()
    }

    /// Selectable models per registered provider. Ollama is asked for its
    /// installed models; the hosted providers have fixed lists.
    pub async fn available_models(&self) -> BTreeMap<Provider, Vec<String>> {
        let mut available = BTreeMap::new();

        for provider in self.list_providers() {
            let models = match self.models.get(&provider) {
                Some(Gateway::Ollama(gateway)) => gateway.list_models().await,
                Some(Gateway::OpenAi(_)) => OPENAI_MODELS.iter().map(|m| m.to_string()).collect(),
                Some(Gateway::Gemini(_)) => GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
                None => continue,
            };
            available.insert(provider, models);
        }

        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ModelGateway;

    fn config_with_keys(openai: Option<&str>, gemini: Option<&str>) -> AmberConfig {
        AmberConfig {
            openai_api_key: openai.map(str::to_string),
            gemini_api_key: gemini.map(str::to_string),
            ollama_base_url: "http://127.0.0.1:9".to_string(),
            ..AmberConfig::default()
        }
    }

    #[test]
    fn test_provider_parsing_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" ollama ".parse::<Provider>().unwrap(), Provider::Ollama);
        assert_eq!("GEMINI".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("claude".parse::<Provider>().is_err());
        assert_eq!(Provider::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_only_ollama_without_keys() {
        let router = ModelRouter::new(&config_with_keys(None, Some("")));
        assert_eq!(router.list_providers(), vec![Provider::Ollama]);
        assert!(router.get_model("openai").is_none());
        assert!(router.get_model("gemini").is_none());
        assert!(router.get_model("Ollama").is_some());
        assert_eq!(router.default_provider(), Provider::Ollama);
    }

    #[test]
    fn test_keys_enable_hosted_providers() {
        let router = ModelRouter::new(&config_with_keys(Some("sk"), Some("g")));
        assert_eq!(
            router.list_providers(),
            vec![Provider::OpenAi, Provider::Ollama, Provider::Gemini]
        );
        assert_eq!(
            router.get_model("openai").and_then(|g| g.model_name()),
            Some("gpt-3.5-turbo")
        );
        assert!(router.get_model("unknown").is_none());
    }

    #[test]
    fn test_default_provider_from_config() {
        let config = AmberConfig {
            default_provider: "gemini".to_string(),
            ..config_with_keys(None, Some("g"))
        };
        assert_eq!(ModelRouter::new(&config).default_provider(), Provider::Gemini);

        let config = AmberConfig {
            default_provider: "nonsense".to_string(),
            ..config_with_keys(None, None)
        };
        assert_eq!(ModelRouter::new(&config).default_provider(), Provider::Ollama);
    }

    #[test]
    fn test_get_model_mut_switches_model() {
        let mut router = ModelRouter::new(&config_with_keys(None, None));
        router.get_model_mut("ollama").unwrap().set_model("mistral");
        assert_eq!(
            router.gateway(Provider::Ollama).and_then(|g| g.model_name()),
            Some("mistral")
        );

        router.gateway_mut(Provider::Ollama).unwrap().set_model("phi3");
        assert_eq!(
            router.get_model("OLLAMA").and_then(|g| g.model_name()),
            Some("phi3")
        );
        assert!(router.gateway_mut(Provider::OpenAi).is_none());
    }

    #[tokio::test]
    async fn test_available_models() {
        let router = ModelRouter::new(&config_with_keys(Some("sk"), Some("g")));
        let available = router.available_models().await;

        assert_eq!(available[&Provider::OpenAi], vec!["gpt-3.5-turbo", "gpt-4"]);
        assert_eq!(
            available[&Provider::Gemini],
            vec!["gemini-pro", "gemini-2.0-flash-exp"]
        );
        assert!(available[&Provider::Ollama].is_empty());
    }
}
