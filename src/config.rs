//! Environment-driven configuration
//!
//! All configuration comes from the process environment and is validated
//! once at startup. Every missing required variable is reported together
//! in a single fatal error rather than surfacing one at a time at first use.

use std::fmt;

use crate::error::Error;
use crate::Result;

/// Default OAuth redirect URI when `REDIRECT_URI` is not set.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8501/";

/// Default base URL of the user memory service.
pub const DEFAULT_MEMORY_API_URL: &str = "https://api.getzep.com/api/v2";

/// Maximum LLM/tool steps per turn.
const DEFAULT_MAX_STEPS: usize = 20;

/// LLM provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Groq,
}

impl Provider {
    /// Parse a provider name as it appears in `AMITY_LLM_PROVIDER`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            other => Err(Error::Config(format!(
                "Unknown LLM provider: {other} (available: {})",
                Provider::available().join(", ")
            ))),
        }
    }

    /// Default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-sonnet-20240229",
            Provider::OpenAi => "gpt-4",
            Provider::Groq => "llama3-70b-8192",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["anthropic", "openai", "groq"]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
        };
        write!(f, "{name}")
    }
}

/// Deployment environment. Only `dev` triggers test-address scoping for
/// the memory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value {
            "dev" => Environment::Dev,
            _ => Environment::Prod,
        }
    }
}

/// OAuth client settings for the identity provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Memory service settings.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub api_url: String,
    pub api_key: String,
}

/// Main configuration structure, resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cookie/session signing secret.
    pub cookie_secret: String,

    pub oauth: OAuthConfig,

    /// Selected LLM provider.
    pub provider: Provider,

    /// API key for the selected provider.
    pub llm_api_key: String,

    /// Model to use (provider default unless `AMITY_MODEL` is set).
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Exa API key for the agent's web tools.
    pub exa_api_key: String,

    pub memory: MemoryConfig,

    pub environment: Environment,

    /// Maximum LLM/tool steps per turn.
    pub max_steps: usize,
}

impl Config {
    /// Build configuration from the process environment.
    ///
    /// Fails fast: all missing required variables are reported at once.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match get("AMITY_LLM_PROVIDER") {
            Some(name) => Provider::parse(&name)?,
            None => Provider::Anthropic,
        };

        let required = [
            "AMITY_COOKIE_SECRET",
            "GOOGLE_CLIENT_ID",
            "GOOGLE_CLIENT_SECRET",
            "EXA_API_KEY",
            "MEMORY_API_KEY",
            provider.key_var(),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|name| get(name).map_or(true, |v| v.is_empty()))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let model = get("AMITY_MODEL")
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            cookie_secret: get("AMITY_COOKIE_SECRET").unwrap_or_default(),
            oauth: OAuthConfig {
                client_id: get("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: get("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: get("REDIRECT_URI")
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            },
            provider,
            llm_api_key: get(provider.key_var()).unwrap_or_default(),
            model,
            temperature: 0.7,
            exa_api_key: get("EXA_API_KEY").unwrap_or_default(),
            memory: MemoryConfig {
                api_url: get("MEMORY_API_URL")
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| DEFAULT_MEMORY_API_URL.to_string()),
                api_key: get("MEMORY_API_KEY").unwrap_or_default(),
            },
            environment: get("APP_ENVIRONMENT")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Dev),
            max_steps: DEFAULT_MAX_STEPS,
        })
    }
}

/// Get the config directory path
pub fn config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".amity")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AMITY_COOKIE_SECRET", "s3cret"),
            ("GOOGLE_CLIENT_ID", "client-id"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
            ("EXA_API_KEY", "exa-key"),
            ("MEMORY_API_KEY", "memory-key"),
            ("ANTHROPIC_API_KEY", "anthropic-key"),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| env.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_full_env_resolves() {
        let env = full_env();
        let config = Config::from_lookup(lookup(&env)).unwrap();

        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.model, "claude-3-sonnet-20240229");
        assert_eq!(config.oauth.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.llm_api_key, "anthropic-key");
    }

    #[test]
    fn test_missing_vars_reported_together() {
        let mut env = full_env();
        env.remove("GOOGLE_CLIENT_ID");
        env.remove("MEMORY_API_KEY");

        let err = Config::from_lookup(lookup(&env)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("GOOGLE_CLIENT_ID"));
        assert!(msg.contains("MEMORY_API_KEY"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("EXA_API_KEY", "");

        let err = Config::from_lookup(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("EXA_API_KEY"));
    }

    #[test]
    fn test_provider_key_required_for_selected_provider() {
        let mut env = full_env();
        env.insert("AMITY_LLM_PROVIDER", "openai");

        // ANTHROPIC_API_KEY is present but irrelevant; OPENAI_API_KEY is missing.
        let err = Config::from_lookup(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        env.insert("OPENAI_API_KEY", "openai-key");
        let config = Config::from_lookup(lookup(&env)).unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.model, "gpt-4");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut env = full_env();
        env.insert("AMITY_LLM_PROVIDER", "mistral");

        let err = Config::from_lookup(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_overrides() {
        let mut env = full_env();
        env.insert("REDIRECT_URI", "http://localhost:9000/oauth");
        env.insert("AMITY_MODEL", "claude-3-opus-20240229");
        env.insert("APP_ENVIRONMENT", "production");

        let config = Config::from_lookup(lookup(&env)).unwrap();
        assert_eq!(config.oauth.redirect_uri, "http://localhost:9000/oauth");
        assert_eq!(config.model, "claude-3-opus-20240229");
        assert_eq!(config.environment, Environment::Prod);
    }
}
