//! blogcrew HTTP server binary.
//!
//! Wires the completion service, knowledge base, tools and crew definition
//! from the environment and serves the axum API.
//!
//! # Environment Variables
//!
//! - `PORT` : HTTP port (default: 8000)
//! - `LLM_API_KEY` / `GROQ_API_KEY` : Completion service key
//! - `PINECONE_API_KEY`, `PINECONE_INDEX_HOST` : Vector index; an in-memory
//!   store is used when unset
//! - `CREW_CONFIG_DIR` : Directory holding `agents.yaml` and `tasks.yaml`
//! - `RUST_LOG` : Tracing filter (default: "info,blogcrew=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;

use blogcrew::auth::SupabaseAuth;
use blogcrew::chat::{Assistant, QueryRouter};
use blogcrew::llms::{BaseLLM, LLMConfig, OpenAICompletion};
use blogcrew::pipeline::ContentPipeline;
use blogcrew::project::CrewDefinition;
use blogcrew::rag::embeddings::google::GoogleEmbeddingConfig;
use blogcrew::rag::embeddings::GoogleEmbedding;
use blogcrew::rag::{InMemoryVectorStore, KnowledgeBase, PineconeClient, VectorStore};
use blogcrew::server::{app_router, cors_layer, create_limiter, spawn_pruning, AppState, DEFAULT_PRUNE_INTERVAL};
use blogcrew::settings::Settings;
use blogcrew::tools::{GoogleTrendsClient, RagTool, ToolRegistry, TrendsTool, WebSearchTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,blogcrew=debug".into()),
        )
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let llm: Arc<dyn BaseLLM> = Arc::new(OpenAICompletion::new(
        settings.llm_api_key.clone(),
        settings.llm_base_url.clone(),
        settings.llm_timeout,
    ));
    let llm_config = LLMConfig::new(settings.llm_model.clone());

    let store: Arc<dyn VectorStore> = match (&settings.pinecone_index_host, &settings.pinecone_api_key) {
        (Some(host), Some(key)) => Arc::new(PineconeClient::new(host.clone(), key.clone())),
        _ => {
            tracing::warn!("Pinecone is not configured; using an empty in-memory vector store");
            Arc::new(InMemoryVectorStore::new())
        }
    };
    let embedder = Arc::new(GoogleEmbedding::new(GoogleEmbeddingConfig {
        api_key: settings.google_api_key.clone(),
        model_name: settings.embedding_model.clone(),
        ..GoogleEmbeddingConfig::default()
    }));
    let knowledge_base = Arc::new(KnowledgeBase::new(embedder, store));

    let tools = ToolRegistry::new()
        .with(Arc::new(RagTool::new(knowledge_base.clone()).with_top_k(settings.rag_top_k)))
        .with(Arc::new(WebSearchTool::duckduckgo()))
        .with(Arc::new(TrendsTool::new(Arc::new(GoogleTrendsClient::default()))));

    let definition = CrewDefinition::load_or_empty(&settings.crew_config_dir);
    let pipeline = ContentPipeline::from_definition(&definition, &tools, llm.clone(), llm_config.clone());

    let limiter = create_limiter(settings.rate_limit_per_minute);
    spawn_pruning(limiter.clone(), DEFAULT_PRUNE_INTERVAL);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        router: Arc::new(QueryRouter::new(llm.clone(), llm_config.clone().with_temperature(0.0))),
        assistant: Arc::new(
            Assistant::new(llm, llm_config.with_temperature(0.5))
                .with_knowledge_base(knowledge_base, settings.rag_top_k),
        ),
        identity: Arc::new(SupabaseAuth::new(
            settings.supabase_url.clone(),
            settings.supabase_key.clone(),
        )),
        limiter,
    };

    let app = app_router(state)
        .layer(cors_layer(&settings.cors_origins))
        .layer(TraceLayer::new_for_http());

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("blogcrew server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health   : liveness probe");
    tracing::info!("  POST /chat     : routed content generation or chat");
    tracing::info!("  POST /generate : content generation");
    tracing::info!("  POST /auth/*   : signup, login, logout");

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server failed")?;
    Ok(())
}
