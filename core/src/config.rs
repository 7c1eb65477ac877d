//! Per-role backend configuration and credentials.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Command-line overrides ([`RoleOverride`] built by the binary)
//! 2. Values from a TOML file (`--config path.toml`)
//! 3. Built-in defaults
//!
//! ## Defaults
//!
//! | Role  | Provider  | Model            | Temperature | Max tokens |
//! |-------|-----------|------------------|-------------|------------|
//! | pro   | deepseek  | deepseek-chat    | 0.8         | 4096       |
//! | con   | dashscope | qwen-plus        | 0.8         | 4096       |
//! | judge | gemini    | gemini-2.0-flash | 0.1         | 8192       |
//!
//! ## File format
//!
//! ```toml
//! output = "headlines"        # batch | headlines | raw_chunks
//! report_dir = "reports"
//!
//! [judge]
//! provider = "deepseek"
//! temperature = 0.2
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debate::errors::ErrorClass;
use crate::debate::roles::Role;

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_REPORT_DIR: &str = "reports";

/// Error raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown provider '{0}' (expected deepseek, dashscope or gemini)")]
    UnknownProvider(String),

    #[error("invalid {role} config: {reason}")]
    Invalid { role: Role, reason: String },
}

impl ConfigError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

// ── Provider ────────────────────────────────────────────────────────────────

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    DeepSeek,
    #[serde(alias = "qwen")]
    DashScope,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::DeepSeek, Provider::DashScope, Provider::Gemini];

    pub fn default_model(self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek-chat",
            Self::DashScope => "qwen-plus",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::DeepSeek => DEEPSEEK_BASE_URL,
            Self::DashScope => DASHSCOPE_BASE_URL,
            Self::Gemini => GEMINI_BASE_URL,
        }
    }

    /// Environment variables consulted for the API key, in priority order.
    pub fn key_env_vars(self) -> &'static [&'static str] {
        match self {
            Self::DeepSeek => &["DEEPSEEK_API_KEY"],
            Self::DashScope => &["DASHSCOPE_API_KEY"],
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::DashScope => write!(f, "dashscope"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "dashscope" | "qwen" => Ok(Self::DashScope),
            "gemini" => Ok(Self::Gemini),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

// ── Output mode ─────────────────────────────────────────────────────────────

/// How role output is obtained and surfaced while a run is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Blocking calls; headlines are raised once the full text is in.
    Batch,
    /// Streaming calls; headlines are raised as soon as they are parsed.
    #[default]
    Headlines,
    /// Streaming calls; every chunk is forwarded and no headline is raised.
    RawChunks,
}

impl OutputMode {
    pub fn is_streaming(self) -> bool {
        !matches!(self, Self::Batch)
    }
}

// ── Role config ─────────────────────────────────────────────────────────────

/// Backend settings for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub provider: Provider,
    /// Empty means the provider's default model.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Overrides the provider's default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl RoleConfig {
    pub fn new(provider: Provider, temperature: f64, max_tokens: u32) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            temperature,
            max_tokens,
            base_url: None,
        }
    }

    pub fn defaults_for(role: Role) -> Self {
        match role {
            Role::Pro => Self::new(Provider::DeepSeek, 0.8, 4096),
            Role::Con => Self::new(Provider::DashScope, 0.8, 4096),
            Role::Judge => Self::new(Provider::Gemini, 0.1, 8192),
        }
    }

    pub fn effective_model(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }
        Ok(())
    }
}

/// Partial role settings layered over a [`RoleConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleOverride {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
}

impl RoleOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply onto `target`. Switching provider without naming a model resets
    /// the model to the new provider's default.
    pub fn apply(&self, target: &mut RoleConfig) {
        if let Some(provider) = self.provider {
            if provider != target.provider && self.model.is_none() {
                target.model = provider.default_model().to_string();
            }
            target.provider = provider;
        }
        if let Some(model) = &self.model {
            target.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            target.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            target.max_tokens = max_tokens;
        }
        if let Some(base_url) = &self.base_url {
            target.base_url = Some(base_url.clone());
        }
    }
}

// ── Top-level config ────────────────────────────────────────────────────────

/// Complete configuration of a debate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectaConfig {
    pub pro: RoleConfig,
    pub con: RoleConfig,
    pub judge: RoleConfig,
    pub output: OutputMode,
    /// `None` disables report persistence.
    pub report_dir: Option<PathBuf>,
}

impl Default for DialectaConfig {
    fn default() -> Self {
        Self {
            pro: RoleConfig::defaults_for(Role::Pro),
            con: RoleConfig::defaults_for(Role::Con),
            judge: RoleConfig::defaults_for(Role::Judge),
            output: OutputMode::default(),
            report_dir: Some(PathBuf::from(DEFAULT_REPORT_DIR)),
        }
    }
}

/// On-disk shape: every field optional, layered over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    pro: RoleOverride,
    con: RoleOverride,
    judge: RoleOverride,
    output: Option<OutputMode>,
    report_dir: Option<PathBuf>,
}

impl DialectaConfig {
    /// Parse a TOML document layered over the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::default();
        config.apply(Role::Pro, &file.pro);
        config.apply(Role::Con, &file.con);
        config.apply(Role::Judge, &file.judge);
        if let Some(output) = file.output {
            config.output = output;
        }
        if let Some(dir) = file.report_dir {
            config.report_dir = Some(dir);
        }
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn role(&self, role: Role) -> &RoleConfig {
        match role {
            Role::Pro => &self.pro,
            Role::Con => &self.con,
            Role::Judge => &self.judge,
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleConfig {
        match role {
            Role::Pro => &mut self.pro,
            Role::Con => &mut self.con,
            Role::Judge => &mut self.judge,
        }
    }

    pub fn apply(&mut self, role: Role, overrides: &RoleOverride) {
        overrides.apply(self.role_mut(role));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in Role::ALL {
            self.role(role)
                .validate()
                .map_err(|reason| ConfigError::Invalid { role, reason })?;
        }
        Ok(())
    }
}

// ── Credentials ─────────────────────────────────────────────────────────────

/// API keys by provider. Never read from the environment by this crate; the
/// caller supplies a lookup.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<Provider, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<String> = self.keys.keys().map(ToString::to_string).collect();
        providers.sort();
        f.debug_struct("Credentials")
            .field("providers", &providers)
            .finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every provider's key through `lookup` (e.g. `std::env::var`).
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::new();
        for provider in Provider::ALL {
            let key = provider
                .key_env_vars()
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty());
            if let Some(key) = key {
                credentials.insert(provider, key);
            }
        }
        credentials
    }

    pub fn with(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.insert(provider, key);
        self
    }

    pub fn insert(&mut self, provider: Provider, key: impl Into<String>) {
        self.keys.insert(provider, key.into());
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Providers used by `config` that have no key, in role order, deduplicated.
    pub fn missing_for(&self, config: &DialectaConfig) -> Vec<Provider> {
        let mut missing = Vec::new();
        for role in Role::ALL {
            let provider = config.role(role).provider;
            if self.get(provider).is_none() && !missing.contains(&provider) {
                missing.push(provider);
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = DialectaConfig::default();
        config.validate().expect("defaults should be valid");
        assert_eq!(config.pro.provider, Provider::DeepSeek);
        assert_eq!(config.con.effective_model(), "qwen-plus");
        assert_eq!(config.judge.max_tokens, 8192);
    }

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("qwen".parse::<Provider>().unwrap(), Provider::DashScope);
        assert_eq!(" Gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!(matches!(
            "openai".parse::<Provider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn toml_layers_over_defaults() {
        let config = DialectaConfig::from_toml_str(
            r#"
            output = "raw_chunks"

            [judge]
            provider = "deepseek"
            temperature = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.output, OutputMode::RawChunks);
        assert_eq!(config.judge.provider, Provider::DeepSeek);
        assert_eq!(config.judge.model, "deepseek-chat");
        assert_eq!(config.judge.max_tokens, 8192);
        assert_eq!(config.pro, RoleConfig::defaults_for(Role::Pro));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(matches!(
            DialectaConfig::from_toml_str("verbose = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn override_keeps_explicit_model() {
        let mut role = RoleConfig::defaults_for(Role::Pro);
        RoleOverride {
            provider: Some(Provider::DashScope),
            model: Some("qwen-max".into()),
            ..Default::default()
        }
        .apply(&mut role);
        assert_eq!(role.effective_model(), "qwen-max");
        assert_eq!(role.effective_base_url(), DASHSCOPE_BASE_URL);
    }

    #[test]
    fn empty_model_falls_back_to_provider_default() {
        let mut role = RoleConfig::defaults_for(Role::Judge);
        role.model = String::new();
        assert_eq!(role.effective_model(), "gemini-2.0-flash");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = DialectaConfig::default();
        config.con.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { role: Role::Con, .. }));
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let mut config = DialectaConfig::default();
        config.judge.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_from_lookup_honours_fallback_var() {
        let credentials = Credentials::from_lookup(|name| match name {
            "GOOGLE_API_KEY" => Some("g-key".to_string()),
            "DEEPSEEK_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(credentials.get(Provider::Gemini), Some("g-key"));
        assert_eq!(credentials.get(Provider::DeepSeek), None);
    }

    #[test]
    fn missing_for_lists_each_provider_once() {
        let mut config = DialectaConfig::default();
        config.con.provider = Provider::DeepSeek;
        let credentials = Credentials::new().with(Provider::Gemini, "k");
        assert_eq!(credentials.missing_for(&config), vec![Provider::DeepSeek]);
    }

    #[test]
    fn credentials_debug_hides_keys() {
        let credentials = Credentials::new().with(Provider::DeepSeek, "sk-secret");
        assert!(!format!("{credentials:?}").contains("sk-secret"));
    }
}
