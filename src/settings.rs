//! Process settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::rag::knowledge_base::DEFAULT_TOP_K;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 5;

/// Failure to load settings or crew definitions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Runtime configuration of the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    /// Completion service key; `None` leaves the pipeline unable to run.
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    /// OpenAI-compatible base URL; provider default when unset.
    pub llm_base_url: Option<String>,
    pub llm_timeout: Duration,
    pub google_api_key: Option<String>,
    pub embedding_model: String,
    pub pinecone_api_key: Option<String>,
    pub pinecone_index_host: Option<String>,
    pub rag_top_k: usize,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    /// Directory holding `agents.yaml` and `tasks.yaml`.
    pub crew_config_dir: PathBuf,
    pub rate_limit_per_minute: u32,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: None,
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            google_api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            pinecone_api_key: None,
            pinecone_index_host: None,
            rag_top_k: DEFAULT_TOP_K,
            supabase_url: None,
            supabase_key: None,
            crew_config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            cors_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Load from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::info!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            llm_api_key: get("LLM_API_KEY").or_else(|| get("GROQ_API_KEY")),
            llm_model: get("LLM_MODEL")
                .or_else(|| get("GROQ_MODEL"))
                .unwrap_or(defaults.llm_model),
            llm_base_url: get("LLM_BASE_URL"),
            llm_timeout: parse(&get, "LLM_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            google_api_key: get("GOOGLE_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            pinecone_api_key: get("PINECONE_API_KEY"),
            pinecone_index_host: get("PINECONE_INDEX_HOST"),
            rag_top_k: parse(&get, "RAG_TOP_K")?.unwrap_or(defaults.rag_top_k),
            supabase_url: get("SUPABASE_URL"),
            supabase_key: get("SUPABASE_KEY"),
            crew_config_dir: get("CREW_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.crew_config_dir),
            rate_limit_per_minute: parse(&get, "RATE_LIMIT_PER_MINUTE")?
                .unwrap_or(defaults.rate_limit_per_minute),
            cors_origins: get("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Whether Pinecone can be used as the vector index.
    pub fn pinecone_configured(&self) -> bool {
        self.pinecone_api_key.is_some() && self.pinecone_index_host.is_some()
    }
}

fn parse<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}
