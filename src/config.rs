use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_CONFIG: &str = r#"# NutriPlan default configuration
# The API key is never stored here: it is read from the environment variable
# named by `api_key_env` (a .env.local or .env file in the working directory
# is loaded first).
[server]
host = "127.0.0.1"
port = 3000

[llm]
provider = "gemini"
api_base = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-2.0-flash"
api_key_env = "GEMINI_API_KEY"
temperature = 0.7
max_output_tokens = 4096
timeout_secs = 120
"#;

pub const CONFIG_ENV_VAR: &str = "NUTRIPLAN_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google `generateContent` API.
    #[default]
    Gemini,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.7,
            max_output_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Key from the configured environment variable. Blank counts as unset.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn api_host(&self) -> Option<String> {
        Url::parse(&self.api_base)
            .ok()
            .and_then(|u| u.host_str().map(|s| s.to_string()))
    }
}

/// Loads `.env.local` then `.env` from the working directory, if present.
/// Variables already set in the environment win.
pub fn load_env_files() {
    for name in [".env.local", ".env"] {
        if let Ok(path) = dotenvy::from_filename(name) {
            tracing::debug!("Loaded environment from {}", path.display());
        }
    }
}

impl Config {
    /// Resolution order: explicit path, `NUTRIPLAN_CONFIG`, then
    /// `~/.config/nutriplan/config.toml` (created with defaults if missing).
    pub fn load_auto(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load(&path);
            } else {
                tracing::warn!(
                    "{} points to non-existent file: {}",
                    CONFIG_ENV_VAR,
                    path.display()
                );
            }
        }

        Self::load_from_user_config()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let cfg = Self::from_toml(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content).context("Failed to parse TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let llm = &self.llm;
        Url::parse(&llm.api_base)
            .with_context(|| format!("llm.api_base is not a valid URL: {}", llm.api_base))?;
        if llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if llm.api_key_env.trim().is_empty() {
            bail!("llm.api_key_env must name an environment variable");
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            bail!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                llm.temperature
            );
        }
        if llm.max_output_tokens == 0 {
            bail!("llm.max_output_tokens must be greater than zero");
        }
        if llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    fn user_config_path() -> Result<PathBuf> {
        let home = env::var("HOME").context("HOME env var not set")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("nutriplan")
            .join("config.toml"))
    }

    fn ensure_user_config_exists() -> Result<PathBuf> {
        let path = Self::user_config_path()?;
        Self::write_default_if_missing(&path)?;
        Ok(path)
    }

    pub(crate) fn write_default_if_missing(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
            }
        }
        if !path.exists() {
            fs::write(path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
            tracing::info!("Wrote default config to {}", path.display());
        }
        Ok(())
    }

    pub fn load_from_user_config() -> Result<Self> {
        let path = Self::ensure_user_config_exists()?;
        Self::load(&path)
    }
}
