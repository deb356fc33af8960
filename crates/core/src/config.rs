//! Configuration management for MedAssist.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - YAML config file (`MEDASSIST_CONFIG`, or `medassist.yaml` in the working directory)
//! - Environment variables
//! - Command-line flags (applied by the binary through [`AppConfig::with_overrides`])
//!
//! Secrets (`GROQ_API_KEY`, `PINECONE_API_KEY`) are only ever read from the
//! environment, never from the YAML file.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Completion providers the server knows how to build.
pub const LLM_PROVIDERS: &[&str] = &["groq", "ollama"];

/// Embedding providers the server knows how to build.
pub const EMBEDDING_PROVIDERS: &[&str] = &["ollama", "fastembed", "mock"];

/// Vector index backends the server knows how to build.
pub const VECTOR_PROVIDERS: &[&str] = &["pinecone", "memory"];

/// Default config file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "medassist.yaml";

/// A secret value that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Completion service settings
    pub llm: LlmSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Vector index settings
    pub vector: VectorSettings,

    /// Passages retrieved per question unless the request overrides it
    pub top_k: usize,

    /// Timeout applied by every outbound HTTP client
    pub request_timeout_secs: u64,

    /// Directory with prompt overrides (`<id>.yml`)
    pub prompts_dir: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Disable colored output
    pub no_color: bool,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// "groq" or "ollama"
    pub provider: String,
    pub model: String,
    /// Custom endpoint; provider default when `None`
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// "ollama", "fastembed" or "mock"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VectorSettings {
    /// "pinecone" or "memory"
    pub provider: String,
    pub index_name: String,
    pub namespace: String,
    /// Metadata field holding the passage text
    pub text_key: String,
    /// Pinecone control plane; public API when `None`
    pub control_plane_url: Option<String>,
    pub api_key: Option<SecretString>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    server: Option<ServerSection>,
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    vector: Option<VectorSection>,
    retrieval: Option<RetrievalSection>,
    request_timeout_secs: Option<u64>,
    prompts_dir: Option<String>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSection {
    bind_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorSection {
    provider: Option<String>,
    index_name: Option<String>,
    namespace: Option<String>,
    text_key: Option<String>,
    control_plane_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            bind_addr: "0.0.0.0:5000".to_string(),
            llm: LlmSettings {
                provider: "groq".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                endpoint: None,
                api_key: None,
            },
            embedding: EmbeddingSettings {
                provider: "ollama".to_string(),
                model: "all-minilm".to_string(),
                dimensions: 384,
                endpoint: None,
            },
            vector: VectorSettings {
                provider: "pinecone".to_string(),
                index_name: "medical-chatbot".to_string(),
                namespace: String::new(),
                text_key: "text".to_string(),
                control_plane_url: None,
                api_key: None,
            },
            top_k: 10,
            request_timeout_secs: 60,
            prompts_dir: None,
            log_level: None,
            log_json: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and defaults.
    ///
    /// Environment variables:
    /// - `MEDASSIST_CONFIG`: Path to a YAML config file
    /// - `MEDASSIST_BIND_ADDR`: Server bind address
    /// - `MEDASSIST_LLM_PROVIDER` / `MEDASSIST_LLM_MODEL` / `MEDASSIST_LLM_ENDPOINT`
    /// - `MEDASSIST_EMBEDDING_PROVIDER` / `MEDASSIST_EMBEDDING_MODEL` /
    ///   `MEDASSIST_EMBEDDING_DIM` / `MEDASSIST_EMBEDDING_ENDPOINT`
    /// - `MEDASSIST_VECTOR_PROVIDER` / `MEDASSIST_INDEX_NAME` /
    ///   `MEDASSIST_INDEX_NAMESPACE` / `MEDASSIST_TEXT_KEY` / `PINECONE_CONTROLLER_URL`
    /// - `MEDASSIST_TOP_K`, `MEDASSIST_REQUEST_TIMEOUT_SECS`, `MEDASSIST_PROMPTS_DIR`
    /// - `GROQ_API_KEY`, `PINECONE_API_KEY`: service secrets
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load() -> AppResult<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_from<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit_file = lookup("MEDASSIST_CONFIG").map(PathBuf::from);
        let config_path = match explicit_file {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Some(path)
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_path {
            config.merge_yaml(&path)?;
        }

        // Environment variables override YAML config
        if let Some(addr) = lookup("MEDASSIST_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(provider) = lookup("MEDASSIST_LLM_PROVIDER") {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("MEDASSIST_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(endpoint) = lookup("MEDASSIST_LLM_ENDPOINT") {
            config.llm.endpoint = Some(endpoint);
        }
        config.llm.api_key = non_empty(lookup("GROQ_API_KEY")).map(SecretString::new);

        if let Some(provider) = lookup("MEDASSIST_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("MEDASSIST_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(dim) = lookup("MEDASSIST_EMBEDDING_DIM") {
            config.embedding.dimensions = parse_var("MEDASSIST_EMBEDDING_DIM", &dim)?;
        }
        if let Some(endpoint) = lookup("MEDASSIST_EMBEDDING_ENDPOINT") {
            config.embedding.endpoint = Some(endpoint);
        }

        if let Some(provider) = lookup("MEDASSIST_VECTOR_PROVIDER") {
            config.vector.provider = provider.to_lowercase();
        }
        if let Some(name) = lookup("MEDASSIST_INDEX_NAME") {
            config.vector.index_name = name;
        }
        if let Some(namespace) = lookup("MEDASSIST_INDEX_NAMESPACE") {
            config.vector.namespace = namespace;
        }
        if let Some(text_key) = lookup("MEDASSIST_TEXT_KEY") {
            config.vector.text_key = text_key;
        }
        if let Some(url) = lookup("PINECONE_CONTROLLER_URL") {
            config.vector.control_plane_url = Some(url);
        }
        config.vector.api_key = non_empty(lookup("PINECONE_API_KEY")).map(SecretString::new);

        if let Some(top_k) = lookup("MEDASSIST_TOP_K") {
            config.top_k = parse_var("MEDASSIST_TOP_K", &top_k)?;
        }
        if let Some(timeout) = lookup("MEDASSIST_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_var("MEDASSIST_REQUEST_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(dir) = lookup("MEDASSIST_PROMPTS_DIR") {
            config.prompts_dir = Some(PathBuf::from(dir));
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        self.config_file = Some(path.to_path_buf());

        if let Some(bind_addr) = file.server.and_then(|s| s.bind_addr) {
            self.bind_addr = bind_addr;
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider.to_lowercase();
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if llm.endpoint.is_some() {
                self.llm.endpoint = llm.endpoint;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider.to_lowercase();
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                self.embedding.endpoint = embedding.endpoint;
            }
        }

        if let Some(vector) = file.vector {
            if let Some(provider) = vector.provider {
                self.vector.provider = provider.to_lowercase();
            }
            if let Some(index_name) = vector.index_name {
                self.vector.index_name = index_name;
            }
            if let Some(namespace) = vector.namespace {
                self.vector.namespace = namespace;
            }
            if let Some(text_key) = vector.text_key {
                self.vector.text_key = text_key;
            }
            if vector.control_plane_url.is_some() {
                self.vector.control_plane_url = vector.control_plane_url;
            }
        }

        if let Some(top_k) = file.retrieval.and_then(|r| r.top_k) {
            self.top_k = top_k;
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(dir) = file.prompts_dir {
            self.prompts_dir = Some(PathBuf::from(dir));
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the file and the environment.
    pub fn with_overrides(
        mut self,
        bind_addr: Option<String>,
        top_k: Option<usize>,
        log_level: Option<String>,
        log_json: bool,
        no_color: bool,
    ) -> Self {
        if let Some(bind_addr) = bind_addr {
            self.bind_addr = bind_addr;
        }

        if let Some(top_k) = top_k {
            self.top_k = top_k;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if log_json {
            self.log_json = true;
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the configuration before any client is built.
    ///
    /// A missing secret for a selected hosted provider is fatal.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, LLM_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embedding.provider,
            EMBEDDING_PROVIDERS,
        )?;
        check_known("vector provider", &self.vector.provider, VECTOR_PROVIDERS)?;

        if self.llm.provider == "groq" && self.llm.api_key.is_none() {
            return Err(AppError::Config(
                "GROQ_API_KEY not found in environment".to_string(),
            ));
        }

        if self.vector.provider == "pinecone" {
            if self.vector.api_key.is_none() {
                return Err(AppError::Config(
                    "PINECONE_API_KEY not found in environment".to_string(),
                ));
            }
            if self.vector.index_name.trim().is_empty() {
                return Err(AppError::Config("Index name cannot be empty".to_string()));
            }
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("LLM model cannot be empty".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.top_k == 0 {
            return Err(AppError::Config(
                "Top-K must be a positive integer".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::Config(format!("Invalid value for {}: {:?} ({})", name, value, e))
    })
}
