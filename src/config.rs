use serde::Deserialize;

/// Placeholder shipped in sample `.env` files; treated as "no key configured"
const PLACEHOLDER_OPENAI_KEY: &str = "your_openai_api_key_here";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Steam Web API key. Library and profile endpoints answer 503 without it.
    #[serde(default)]
    pub steam_api_key: Option<String>,

    /// Steam Web API base URL
    #[serde(default = "default_steam_api_url")]
    pub steam_api_url: String,

    /// Steam OpenID 2.0 provider endpoint
    #[serde(default = "default_steam_openid_url")]
    pub steam_openid_url: String,

    /// Steam storefront base URL (price lookups)
    #[serde(default = "default_steam_store_url")]
    pub steam_store_url: String,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Model used for library recommendations
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Fine-tuned model override for the chat assistant
    #[serde(default)]
    pub openai_chat_model: Option<String>,

    /// Timeout for language model calls, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Timeout for Steam API and OpenID calls, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Redis connection URL. In-memory storage and no price cache when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Externally visible base URL used for the OpenID realm and return_to
    #[serde(default)]
    pub public_url: Option<String>,

    /// Number of games whose store price is looked up for value estimates
    #[serde(default = "default_price_lookup_limit")]
    pub price_lookup_limit: usize,

    /// Maximum in-flight store price lookups
    #[serde(default = "default_price_lookup_concurrency")]
    pub price_lookup_concurrency: usize,

    /// Per-lookup timeout, in milliseconds
    #[serde(default = "default_price_lookup_timeout_ms")]
    pub price_lookup_timeout_ms: u64,

    /// Fixed seed for fallback recommendation picks
    #[serde(default)]
    pub recommendation_seed: Option<u64>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_steam_api_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_steam_openid_url() -> String {
    "https://steamcommunity.com/openid/login".to_string()
}

fn default_steam_store_url() -> String {
    "https://store.steampowered.com".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_upstream_timeout_secs() -> u64 {
    15
}

fn default_price_lookup_limit() -> usize {
    50
}

fn default_price_lookup_concurrency() -> usize {
    10
}

fn default_price_lookup_timeout_ms() -> u64 {
    5000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steam_api_key: None,
            steam_api_url: default_steam_api_url(),
            steam_openid_url: default_steam_openid_url(),
            steam_store_url: default_steam_store_url(),
            openai_api_key: None,
            openai_api_url: default_openai_api_url(),
            openai_model: default_openai_model(),
            openai_chat_model: None,
            llm_timeout_secs: default_llm_timeout_secs(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            redis_url: None,
            public_url: None,
            price_lookup_limit: default_price_lookup_limit(),
            price_lookup_concurrency: default_price_lookup_concurrency(),
            price_lookup_timeout_ms: default_price_lookup_timeout_ms(),
            recommendation_seed: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// The Steam Web API key, if one is actually configured
    pub fn steam_key(&self) -> Option<&str> {
        non_blank(self.steam_api_key.as_deref())
    }

    /// The OpenAI key, ignoring blanks and the sample placeholder
    pub fn openai_key(&self) -> Option<&str> {
        non_blank(self.openai_api_key.as_deref()).filter(|key| *key != PLACEHOLDER_OPENAI_KEY)
    }

    pub fn chat_model(&self) -> String {
        non_blank(self.openai_chat_model.as_deref())
            .map(str::to_string)
            .unwrap_or_else(default_chat_model)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_placeholder_is_not_a_key() {
        let config = Config {
            openai_api_key: Some(PLACEHOLDER_OPENAI_KEY.to_string()),
            ..Config::default()
        };
        assert_eq!(config.openai_key(), None);
    }

    #[test]
    fn test_blank_steam_key_is_not_a_key() {
        let config = Config {
            steam_api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.steam_key(), None);
    }

    #[test]
    fn test_chat_model_prefers_fine_tuned_override() {
        let mut config = Config::default();
        assert_eq!(config.chat_model(), "gpt-4o-mini");

        config.openai_chat_model = Some("ft:gpt-4o-mini:steam".to_string());
        assert_eq!(config.chat_model(), "ft:gpt-4o-mini:steam");
    }
}
