use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Ollama `/api/generate` endpoint settings.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Personal access token sent as `Authorization: token ...`
    #[serde(default)]
    pub token: Option<String>,
    /// Account that owns the repositories the bot touches
    #[serde(default)]
    pub owner: String,
    /// No timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_email_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_api_url")]
    pub api_url: String,
    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_llm_api_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_llm_model() -> String {
    "phi".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_email_port() -> u16 {
    587
}

fn default_search_api_url() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".to_string()
}

fn default_search_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_api_url(),
            bot_token: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token: None,
            owner: String::new(),
            timeout_secs: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_email_port(),
            user: None,
            password: None,
            timeout_secs: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: default_search_api_url(),
            wikipedia_url: default_wikipedia_url(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the TOML file at `path` (all defaults when it does not exist),
    /// then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override settings from environment-style variables. `lookup` returns
    /// the value of a variable, if set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("OLLAMA_API_URL") {
            self.llm.api_url = v;
        }
        if let Some(v) = var("OLLAMA_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = var("SEARCH_API_URL") {
            self.search.api_url = v;
        }
        if let Some(v) = var("TELEGRAM_API_URL") {
            self.telegram.api_url = v;
        }
        if let Some(v) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = var("GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Some(v) = var("GITHUB_PAT") {
            self.github.token = Some(v);
        }
        if let Some(v) = var("GITHUB_USERNAME") {
            self.github.owner = v;
        }
        if let Some(v) = var("EMAIL_HOST") {
            self.email.host = Some(v);
        }
        if let Some(v) = var("EMAIL_PORT") {
            self.email.port = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid EMAIL_PORT: {}", v))?;
        }
        if let Some(v) = var("EMAIL_USER") {
            self.email.user = Some(v);
        }
        if let Some(v) = var("EMAIL_PASSWORD") {
            self.email.password = Some(v);
        }
        if let Some(v) = var("RELAYBOT_BIND") {
            self.server.bind = v;
        }

        Ok(())
    }
}
