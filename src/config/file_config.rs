//! TOML file configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw TOML configuration. Every field is optional; resolution against CLI
/// arguments and defaults happens in [`super::AppConfig::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub retrieval: Option<RetrievalConfig>,
    pub generation: Option<GenerationConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file {:?}", path))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrievalConfig {
    /// Per-retriever result cap.
    pub top_k: Option<usize>,
    /// Combination policy: "concatenate" or "ranked".
    pub combine: Option<String>,
    /// For the "ranked" policy: source whose documents are kept.
    pub content_source: Option<String>,
    /// For the "ranked" policy: source whose order is authoritative.
    pub ranking_source: Option<String>,
    pub serp: Option<SerpConfig>,
    pub exa: Option<ExaConfig>,
    pub vector: Option<VectorConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SerpConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExaConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    /// LLM backend: "openai", "groq" or "ollama".
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub embedding_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    /// Override the built-in prompt template. Must contain `{documents}`
    /// and `{query}` substitution points.
    pub prompt_template: Option<String>,
}
