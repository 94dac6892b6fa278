mod file_config;

pub use file_config::{
    ExaConfig, FileConfig, GenerationConfig, RetrievalConfig, SerpConfig, VectorConfig,
};

use anyhow::{bail, Result};

use crate::retrieval::CombinePolicy;

const DEFAULT_SERP_BASE_URL: &str = "https://serpapi.com";
const DEFAULT_EXA_BASE_URL: &str = "https://api.exa.ai";
const DEFAULT_VECTOR_BASE_URL: &str = "http://localhost:6333";
const DEFAULT_VECTOR_COLLECTION: &str = "text_collection";

/// CLI arguments that can be used for config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);

        let retrieval_file = file.retrieval.unwrap_or_default();
        let retrieval_defaults = RetrievalSettings::default();

        let combine = match retrieval_file.combine.as_deref() {
            None => retrieval_defaults.combine.clone(),
            Some("concatenate") => CombinePolicy::Concatenate,
            Some("ranked") => CombinePolicy::RankedBy {
                content: retrieval_file
                    .content_source
                    .clone()
                    .unwrap_or_else(|| "exa".to_string()),
                ranking: retrieval_file
                    .ranking_source
                    .clone()
                    .unwrap_or_else(|| "serp".to_string()),
            },
            Some(other) => bail!("unknown combine policy: {}", other),
        };

        let serp = retrieval_file.serp.and_then(|s| {
            if !s.enabled.unwrap_or(true) {
                return None;
            }
            let api_key = s.api_key?;
            Some(SerpSettings {
                base_url: s
                    .base_url
                    .unwrap_or_else(|| DEFAULT_SERP_BASE_URL.to_string()),
                api_key,
            })
        });

        let exa = retrieval_file.exa.and_then(|e| {
            if !e.enabled.unwrap_or(true) {
                return None;
            }
            let api_key = e.api_key?;
            Some(ExaSettings {
                base_url: e
                    .base_url
                    .unwrap_or_else(|| DEFAULT_EXA_BASE_URL.to_string()),
                api_key,
            })
        });

        let vector = retrieval_file.vector.and_then(|v| {
            if !v.enabled.unwrap_or(false) {
                return None;
            }
            Some(VectorSettings {
                base_url: v
                    .base_url
                    .unwrap_or_else(|| DEFAULT_VECTOR_BASE_URL.to_string()),
                collection: v
                    .collection
                    .unwrap_or_else(|| DEFAULT_VECTOR_COLLECTION.to_string()),
            })
        });

        let retrieval = RetrievalSettings {
            top_k: retrieval_file.top_k.unwrap_or(retrieval_defaults.top_k),
            combine,
            serp,
            exa,
            vector,
        };

        let generation_file = file.generation.unwrap_or_default();
        let generation_defaults = GenerationSettings::default();
        let generation = GenerationSettings {
            provider: generation_file
                .provider
                .unwrap_or(generation_defaults.provider),
            base_url: generation_file
                .base_url
                .unwrap_or(generation_defaults.base_url),
            model: generation_file.model.unwrap_or(generation_defaults.model),
            api_key: generation_file.api_key,
            embedding_model: generation_file
                .embedding_model
                .unwrap_or(generation_defaults.embedding_model),
            temperature: generation_file
                .temperature
                .unwrap_or(generation_defaults.temperature),
            max_tokens: generation_file
                .max_tokens
                .or(generation_defaults.max_tokens),
            timeout_secs: generation_file
                .timeout_secs
                .unwrap_or(generation_defaults.timeout_secs),
            prompt_template: generation_file.prompt_template,
        };

        match generation.provider.as_str() {
            "openai" | "groq" | "ollama" => {}
            other => bail!("unsupported provider: {}", other),
        }

        Ok(Self {
            port,
            retrieval,
            generation,
        })
    }
}

/// Settings for the retrieval subsystem.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Per-retriever result cap.
    pub top_k: usize,
    pub combine: CombinePolicy,
    pub serp: Option<SerpSettings>,
    pub exa: Option<ExaSettings>,
    pub vector: Option<VectorSettings>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            combine: CombinePolicy::Concatenate,
            serp: None,
            exa: None,
            vector: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerpSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct ExaSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct VectorSettings {
    pub base_url: String,
    pub collection: String,
}

/// Settings for the generation backend.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub prompt_template: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            api_key: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: 0.0,
            max_tokens: Some(600),
            timeout_secs: 120,
            prompt_template: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig { port: 3001 };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.combine, CombinePolicy::Concatenate);
        assert!(config.retrieval.serp.is_none());
        assert_eq!(config.generation.provider, "openai");
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            port = 4000

            [generation]
            provider = "ollama"
            base_url = "http://localhost:11434"
            model = "llama3.1:8b"
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.generation.provider, "ollama");
        assert_eq!(config.generation.model, "llama3.1:8b");
        // Defaults used where TOML doesn't specify.
        assert_eq!(config.generation.timeout_secs, 120);
    }

    #[test]
    fn test_resolve_ranked_combine_policy() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [retrieval]
            combine = "ranked"
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(
            config.retrieval.combine,
            CombinePolicy::RankedBy {
                content: "exa".to_string(),
                ranking: "serp".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_unknown_combine_policy_errors() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [retrieval]
            combine = "interleave"
            "#,
        )
        .unwrap();

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown combine policy"));
    }

    #[test]
    fn test_resolve_unsupported_provider_errors() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [generation]
            provider = "parrot"
            "#,
        )
        .unwrap();

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unsupported provider"));
    }

    #[test]
    fn test_serp_requires_api_key() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [retrieval.serp]
            enabled = true
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(config.retrieval.serp.is_none());
    }

    #[test]
    fn test_serp_defaults_base_url() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [retrieval.serp]
            api_key = "key"
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        let serp = config.retrieval.serp.unwrap();
        assert_eq!(serp.base_url, "https://serpapi.com");
        assert_eq!(serp.api_key, "key");
    }

    #[test]
    fn test_vector_disabled_by_default() {
        let cli = CliConfig { port: 3001 };
        let file_config: FileConfig = toml::from_str(
            r#"
            [retrieval.vector]
            collection = "notes"
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(config.retrieval.vector.is_none());
    }
}
