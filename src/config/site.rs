//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::content::WordSplit;

/// Environment variable overriding `api.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `api.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,
    pub date_format: String,
    pub logo: String,

    // URL
    pub root: String,

    // Directory
    pub public_dir: String,

    // Content repository
    #[serde(default)]
    pub api: ApiConfig,

    // Post metadata
    #[serde(default)]
    pub reading: ReadingConfig,

    // Generation
    #[serde(default)]
    pub build: BuildConfig,

    // Interface text
    #[serde(default)]
    pub labels: LabelsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "UTC".to_string(),
            date_format: "dd MMM yyyy".to_string(),
            logo: "/logo.svg".to_string(),

            root: "/".to_string(),

            public_dir: "public".to_string(),

            api: ApiConfig::default(),
            reading: ReadingConfig::default(),
            build: BuildConfig::default(),
            labels: LabelsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using API endpoint from {}", ENDPOINT_ENV);
            self.api.endpoint = endpoint;
        }
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            self.api.access_token = Some(token);
        }
    }

    /// Reject settings the generator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            anyhow::bail!(
                "api.endpoint is empty; set it in _config.yml or {}",
                ENDPOINT_ENV
            );
        }
        if self.reading.words_per_minute == 0 {
            anyhow::bail!("reading.words_per_minute must be greater than zero");
        }
        if self.build.concurrency == 0 {
            anyhow::bail!("build.concurrency must be greater than zero");
        }
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be greater than zero");
        }
        Ok(())
    }
}

/// Content repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Repository API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 20,
            timeout_secs: 30,
        }
    }
}

/// Reading time configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
    pub word_split: WordSplit,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            word_split: WordSplit::Whitespace,
        }
    }
}

/// How the server answers a post path that was not pre-built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Hold the request until the page is built
    #[default]
    Blocking,
    /// Answer with the loading page and build in the background
    Loading,
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Post details fetched at the same time
    pub concurrency: usize,
    pub fallback: FallbackMode,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fallback: FallbackMode::Blocking,
        }
    }
}

/// Text shown in the rendered pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub load_more: String,
    pub loading: String,
    pub minutes: String,
    pub not_found: String,
    pub load_failed: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            load_more: "Carregar mais posts".to_string(),
            loading: "Carregando...".to_string(),
            minutes: "min".to_string(),
            not_found: "Post não encontrado".to_string(),
            load_failed: "Não foi possível carregar mais posts".to_string(),
        }
    }
}
