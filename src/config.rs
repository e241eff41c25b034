use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Runtime configuration.
///
/// Sources, lowest priority first:
/// - built-in defaults
/// - `INKPOST_*` environment variables (e.g. `INKPOST_LISTEN_ADDR`)
/// - plain `GEMINI_API_KEY`, as usually found in the project's `.env`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,

    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Url,
    pub proxy: Option<Url>,
    pub moderation_timeout_secs: u64,
    pub moderation_rate_per_minute: u32,
    pub moderation_retries: usize,

    pub admin_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            database_url: "sqlite:inkpost.db".to_string(),
            loglevel: "info".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: Url::parse("https://generativelanguage.googleapis.com/v1beta/")
                .expect("default Gemini base url is valid"),
            proxy: None,
            moderation_timeout_secs: 10,
            moderation_rate_per_minute: 60,
            moderation_retries: 2,
            admin_key: None,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("INKPOST_"))
            .merge(Env::raw().only(&["gemini_api_key"]))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Configured API key, ignoring blank values left in `.env` templates.
    pub fn gemini_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// `{base}models/{model}:generateContent`
    pub fn gemini_generate_url(&self) -> Result<Url, url::ParseError> {
        self.gemini_base_url
            .join(&format!("models/{}:generateContent", self.gemini_model))
    }

    pub fn moderation_timeout(&self) -> Duration {
        Duration::from_secs(self.moderation_timeout_secs.max(1))
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid inkpost configuration"));
