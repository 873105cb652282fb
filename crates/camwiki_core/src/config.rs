use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::preprocess::{self, ContentPreprocessor};

pub const DEFAULT_INDEX_SLUG: &str = "WikiIndex";

/// Slugs are CamelCase words of two or more capitalized segments, and
/// slash-chained slugs must keep that shape on every component.
pub const DEFAULT_SLUG_PATTERN: &str = r"((([A-Z]+[a-z]+){2,})(/([A-Z]+[a-z]+){2,})*)";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiConfig {
    #[serde(default)]
    pub wiki: WikiSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiSection {
    pub default_index: Option<String>,
    pub slug_pattern: Option<String>,
}

impl WikiConfig {
    /// Resolve the home page slug: env CAMWIKI_DEFAULT_INDEX > config > default.
    pub fn default_index(&self) -> String {
        env_override("CAMWIKI_DEFAULT_INDEX")
            .or_else(|| self.wiki.default_index.clone())
            .unwrap_or_else(|| DEFAULT_INDEX_SLUG.to_string())
    }

    /// Resolve the slug pattern source: env CAMWIKI_SLUG_PATTERN > config > default.
    pub fn slug_pattern(&self) -> String {
        env_override("CAMWIKI_SLUG_PATTERN")
            .or_else(|| self.wiki.slug_pattern.clone())
            .unwrap_or_else(|| DEFAULT_SLUG_PATTERN.to_string())
    }

    /// Compile the settings value handed to the workflow, with the default
    /// content preprocessor.
    pub fn settings(&self) -> Result<WikiSettings> {
        WikiSettings::compile(
            &self.default_index(),
            &self.slug_pattern(),
            preprocess::paragraphs_and_links,
        )
    }
}

fn env_override(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Load and parse a WikiConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<WikiConfig> {
    if !config_path.exists() {
        return Ok(WikiConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: WikiConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Compiled runtime configuration injected into the workflow: the index
/// slug, the slug pattern in two compiled forms (anchored for validation,
/// word-bounded for scanning), and the content preprocessor.
#[derive(Debug, Clone)]
pub struct WikiSettings {
    pub default_index_slug: String,
    slug_regex: Regex,
    word_regex: Regex,
    pub preprocessor: ContentPreprocessor,
}

impl WikiSettings {
    pub fn compile(
        default_index_slug: &str,
        slug_pattern: &str,
        preprocessor: ContentPreprocessor,
    ) -> Result<Self> {
        let slug_regex = Regex::new(&format!("^(?:{slug_pattern})$"))
            .with_context(|| format!("invalid slug pattern: {slug_pattern}"))?;
        let word_regex = Regex::new(&format!(r"\b(?:{slug_pattern})\b"))
            .with_context(|| format!("invalid slug pattern: {slug_pattern}"))?;
        Ok(Self {
            default_index_slug: default_index_slug.to_string(),
            slug_regex,
            word_regex,
            preprocessor,
        })
    }

    pub fn is_valid_slug(&self, slug: &str) -> bool {
        self.slug_regex.is_match(slug)
    }

    /// Word-boundary wrapped pattern used by the WikiWord linker.
    pub fn word_regex(&self) -> &Regex {
        &self.word_regex
    }
}
