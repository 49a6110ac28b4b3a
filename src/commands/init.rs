//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Default `_config.yml` written by `init`
const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
language: pt-BR
timezone: UTC
date_format: dd MMM yyyy
logo: /logo.svg

# URL
root: /

# Directory
public_dir: public

# Content repository (PRISMIC_API_ENDPOINT / PRISMIC_ACCESS_TOKEN override these)
api:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  page_size: 20
  timeout_secs: 30

# Reading time
reading:
  words_per_minute: 200
  # whitespace | single_space
  word_split: whitespace

# Generation
build:
  concurrency: 4
  # blocking | loading
  fallback: blocking

# Interface text
labels:
  load_more: Carregar mais posts
  loading: Carregando...
  minutes: min
  not_found: Post não encontrado
  load_failed: Não foi possível carregar mais posts
"#;

const DEFAULT_LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26"><text x="0" y="20" font-family="sans-serif" font-size="22" fill="#ffffff">spacetraveling<tspan fill="#ff57b2">.</tspan></text></svg>
"##;

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("File already exists: {:?}", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("source"))?;

    fs::write(&config_path, DEFAULT_CONFIG)?;

    let logo_path = target_dir.join("source/logo.svg");
    if !logo_path.exists() {
        fs::write(&logo_path, DEFAULT_LOGO)?;
    }

    Ok(())
}
