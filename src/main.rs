use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import modules from the library crate
use answer_server::config::{self, AppConfig, CliConfig};
use answer_server::document::Corpus;
use answer_server::generation::llm::{
    CompletionOptions, LlmProvider, OllamaProvider, OpenAiProvider,
};
use answer_server::generation::{Answerer, Generator, PromptTemplate};
use answer_server::retrieval::{
    ExaClient, ExaRetriever, Retriever, SerpClient, SerpRetriever, VectorRetriever,
    VectorStoreClient,
};
use answer_server::server::{run_server, ServerState};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>> {
    let generation = &config.generation;
    let api_key = generation
        .api_key
        .clone()
        .or_else(|| std::env::var("LLM_API_KEY").ok())
        .unwrap_or_default();

    let provider: Arc<dyn LlmProvider> = match generation.provider.as_str() {
        // Groq speaks the OpenAI API; only the base URL differs.
        "openai" | "groq" => Arc::new(OpenAiProvider::new(
            generation.base_url.clone(),
            api_key,
            generation.model.clone(),
            generation.embedding_model.clone(),
        )),
        "ollama" => Arc::new(OllamaProvider::new(
            generation.base_url.clone(),
            generation.model.clone(),
            generation.embedding_model.clone(),
        )),
        other => bail!("unsupported provider: {}", other),
    };
    Ok(provider)
}

fn build_retriever_registry(
    config: &AppConfig,
    provider: Arc<dyn LlmProvider>,
) -> HashMap<Corpus, Vec<Arc<dyn Retriever>>> {
    let mut registry: HashMap<Corpus, Vec<Arc<dyn Retriever>>> = HashMap::new();

    let mut web: Vec<Arc<dyn Retriever>> = Vec::new();
    if let Some(exa) = &config.retrieval.exa {
        web.push(Arc::new(ExaRetriever::new(ExaClient::new(
            exa.base_url.clone(),
            exa.api_key.clone(),
        ))));
    }
    if let Some(serp) = &config.retrieval.serp {
        web.push(Arc::new(SerpRetriever::new(SerpClient::new(
            serp.base_url.clone(),
            serp.api_key.clone(),
        ))));
    }
    if !web.is_empty() {
        registry.insert(Corpus::Web, web);
    }

    if let Some(vector) = &config.retrieval.vector {
        registry.insert(
            Corpus::Personal,
            vec![Arc::new(VectorRetriever::new(
                VectorStoreClient::new(vector.base_url.clone(), vector.collection.clone()),
                provider,
            ))],
        );
    }

    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config = CliConfig {
        port: cli_args.port,
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  port: {}", app_config.port);
    info!(
        "  provider: {} ({})",
        app_config.generation.provider, app_config.generation.model
    );

    let provider = build_provider(&app_config)?;

    let prompt = app_config
        .generation
        .prompt_template
        .as_deref()
        .map(PromptTemplate::new)
        .unwrap_or_default();
    let options = CompletionOptions {
        temperature: app_config.generation.temperature,
        max_tokens: app_config.generation.max_tokens,
        timeout: Duration::from_secs(app_config.generation.timeout_secs),
    };
    let generator: Arc<dyn Generator> =
        Arc::new(Answerer::new(provider.clone(), prompt, options));

    let registry = build_retriever_registry(&app_config, provider);
    if registry.is_empty() {
        bail!("no retrievers configured; enable at least one source in the config file");
    }
    for (corpus, retrievers) in &registry {
        let names: Vec<&str> = retrievers.iter().map(|r| r.name()).collect();
        info!("Registered corpus '{}' with retrievers {:?}", corpus, names);
    }

    let state = ServerState {
        retrievers_by_corpus: Arc::new(registry),
        generator,
        top_k: app_config.retrieval.top_k,
        combine: app_config.retrieval.combine.clone(),
    };

    info!("Ready to serve at port {}!", app_config.port);

    tokio::select! {
        result = run_server(state, app_config.port) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
