//! Configuration loading, validation, and management for shopbot.
//!
//! Loads configuration from `~/.shopbot/config.toml` with environment
//! variable overrides. Validates all settings at startup; missing
//! credentials are a fatal startup error, never a request-time one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Instruction block used when a caller supplies none.
pub const DEFAULT_CHAT_INSTRUCTION: &str = "Bạn là Chuyên viên tư vấn bán hàng tận tâm của cửa hàng. \
Hãy trả lời các câu hỏi về sản phẩm, thông tin cửa hàng một cách thân thiện và hữu ích. \
Chỉ dùng tiếng Việt. Trả lời ngắn gọn, lịch sự, tự nhiên như bạn bè, không cần quá khách sáo. \
Trả lời ngắn gọn 1-2 câu dựa trên Context, mỗi câu tầm 10 chữ, xuống dòng cho mỗi câu. \
Nếu không có thông tin trong context, hãy nói rõ và hẹn gửi lại khi có thông tin. \
Thiếu thông tin thì hỏi khách một cách khéo léo để thu thập đủ. \
Ngôn ngữ đời thường (Dạ, vâng, ạ, nhé, nha). \
Gợi ý sản phẩm phù hợp nếu khách do dự. \
Nếu khách hỏi ảnh hãy trả về url của ảnh. \
Cấm bịa thông tin không có trong Context; chưa chắc chắn thì báo khách chờ để kiểm tra lại. \
Nếu khách muốn đặt hàng: kiểm tra đủ 5 thông tin Tên, ID sản phẩm, Số lượng, Địa chỉ, Số điện thoại.";

/// The root configuration structure.
///
/// Maps directly to `~/.shopbot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text generator (classification + replies)
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Embedding generator
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index
    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Output language guardrail
    #[serde(default)]
    pub guardrail: GuardrailConfig,

    /// Human support channel named in apology replies
    #[serde(default)]
    pub support: SupportConfig,

    /// Record store
    #[serde(default)]
    pub records: RecordsConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// "gemini" or any OpenAI-compatible provider name
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_generator_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generator_provider() -> String {
    "gemini".into()
}
fn default_generator_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            api_key: None,
            model: default_generator_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" (text only) or "vertex" (multimodal text + image)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "openai".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimension() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: None,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// "pinecone" or "memory"
    #[serde(default = "default_index_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Data-plane host of the index (e.g. `products-abc123.svc.pinecone.io`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Namespace of a tenant is `{namespace_prefix}{business_id}`
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
}

fn default_index_backend() -> String {
    "pinecone".into()
}
fn default_namespace_prefix() -> String {
    "business_".into()
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            api_key: None,
            host: None,
            dimension: default_dimension(),
            namespace_prefix: default_namespace_prefix(),
        }
    }
}

impl std::fmt::Debug for VectorIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexConfig")
            .field("backend", &self.backend)
            .field("api_key", &redact(&self.api_key))
            .field("host", &self.host)
            .field("dimension", &self.dimension)
            .field("namespace_prefix", &self.namespace_prefix)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// History messages shown to the intent classifier
    #[serde(default = "default_classifier_turns")]
    pub classifier_history_turns: usize,

    /// History messages included in the reply prompt
    #[serde(default = "default_generation_turns")]
    pub generation_history_turns: usize,

    /// Temperature for reply generation (classification is always 0)
    #[serde(default)]
    pub temperature: f32,

    /// Raw hits requested per modality
    #[serde(default = "default_top_k")]
    pub search_top_k: usize,

    /// Distinct entities kept after merge/rank
    #[serde(default = "default_top_n")]
    pub search_top_n: usize,

    /// Modalities queried by text product search
    #[serde(default = "default_text_modalities")]
    pub text_search_modalities: Vec<String>,

    /// Static tenant context TTL; 0 disables caching
    #[serde(default)]
    pub context_cache_ttl_secs: u64,

    #[serde(default = "default_true")]
    pub prompt_cache_enabled: bool,

    #[serde(default = "default_prompt_cache_ttl")]
    pub prompt_cache_ttl_secs: u64,

    /// Overrides [`DEFAULT_CHAT_INSTRUCTION`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

fn default_classifier_turns() -> usize {
    2
}
fn default_generation_turns() -> usize {
    6
}
fn default_top_k() -> usize {
    10
}
fn default_top_n() -> usize {
    5
}
fn default_text_modalities() -> Vec<String> {
    vec!["text".into()]
}
fn default_prompt_cache_ttl() -> u64 {
    3600
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_history_turns: default_classifier_turns(),
            generation_history_turns: default_generation_turns(),
            temperature: 0.0,
            search_top_k: default_top_k(),
            search_top_n: default_top_n(),
            text_search_modalities: default_text_modalities(),
            context_cache_ttl_secs: 0,
            prompt_cache_enabled: true,
            prompt_cache_ttl_secs: default_prompt_cache_ttl(),
            instruction: None,
        }
    }
}

impl PipelineConfig {
    /// The instruction block in effect.
    pub fn instruction(&self) -> &str {
        self.instruction.as_deref().unwrap_or(DEFAULT_CHAT_INSTRUCTION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// A reply must contain at least one of these (case-insensitive)
    #[serde(default = "default_expected_chars")]
    pub expected_chars: String,

    /// Substituted when a reply fails the check
    #[serde(default = "default_holding_reply")]
    pub holding_reply: String,
}

fn default_expected_chars() -> String {
    "ăâđêôơưáàảãạéèẻẽẹíìỉĩịóòỏõọúùủũụýỳỷỹỵ".into()
}
fn default_holding_reply() -> String {
    "Dạ bạn chờ shop một chút nhé, mình sẽ hỗ trợ bạn ngay ạ 😊".into()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            expected_chars: default_expected_chars(),
            holding_reply: default_holding_reply(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportConfig {
    #[serde(default = "default_support_phone")]
    pub phone: String,
}

fn default_support_phone() -> String {
    "0985006914".into()
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            phone: default_support_phone(),
        }
    }
}

impl SupportConfig {
    /// The fixed apology returned when generation fails on every path.
    pub fn apology(&self) -> String {
        format!(
            "Xin lỗi, hệ thống đang gặp sự cố. Bạn vui lòng liên hệ số {} để được hỗ trợ nhanh hơn nhé ạ.",
            self.phone
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// JSON file holding tenants, catalog and intents
    #[serde(default = "default_records_path")]
    pub path: PathBuf,
}

fn default_records_path() -> PathBuf {
    AppConfig::config_dir().join("records.json")
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            path: default_records_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.shopbot/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (highest priority) through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            if self.generator.provider == "gemini" {
                self.generator.api_key = Some(key);
            }
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            if self.generator.provider == "gemini" {
                self.generator.model = model;
            }
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            if self.embedding.provider == "openai" {
                self.embedding.api_key = Some(key.clone());
            }
            if self.generator.provider == "openai" {
                self.generator.api_key = Some(key);
            }
        }
        if let Some(token) = lookup("VERTEX_ACCESS_TOKEN") {
            if self.embedding.provider == "vertex" {
                self.embedding.api_key = Some(token);
            }
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dim) = lookup("EMBEDDING_DIMENSION") {
            self.embedding.dimension = parse_env_number("EMBEDDING_DIMENSION", &dim)?;
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.vector_index.api_key = Some(key);
        }
        if let Some(host) = lookup("PINECONE_HOST") {
            self.vector_index.host = Some(host);
        }
        if let Some(dim) = lookup("PINECONE_DIMENSION") {
            self.vector_index.dimension = parse_env_number("PINECONE_DIMENSION", &dim)?;
        }
        if let Some(path) = lookup("SHOPBOT_RECORDS_PATH") {
            self.records.path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shopbot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        for (key, secs) in [
            ("context_cache_ttl_secs", p.context_cache_ttl_secs),
            ("prompt_cache_ttl_secs", p.prompt_cache_ttl_secs),
        ] {
            if secs > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "pipeline.{key} ({secs}) must be <= {MAX_CACHE_TTL_SECS}"
                )));
            }
        }
        if p.temperature < 0.0 || p.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "pipeline.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if p.search_top_n == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.search_top_n must be > 0".into(),
            ));
        }
        if p.search_top_k < p.search_top_n {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.search_top_k ({}) must be >= search_top_n ({})",
                p.search_top_k, p.search_top_n
            )));
        }
        for modality in &p.text_search_modalities {
            if modality != "text" && modality != "image" {
                return Err(ConfigError::ValidationError(format!(
                    "unknown modality in pipeline.text_search_modalities: {modality}"
                )));
            }
        }
        if self.guardrail.expected_chars.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "guardrail.expected_chars must not be empty".into(),
            ));
        }
        if self.vector_index.backend == "pinecone"
            && self.vector_index.dimension != self.embedding.dimension
        {
            return Err(ConfigError::ValidationError(format!(
                "vector_index.dimension ({}) must match embedding.dimension ({})",
                self.vector_index.dimension, self.embedding.dimension
            )));
        }
        Ok(())
    }

    /// Every credential the configured collaborators need, checked at once.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.generator.api_key.is_none() {
            missing.push(match self.generator.provider.as_str() {
                "gemini" => "GEMINI_API_KEY".to_string(),
                other => format!("generator.api_key ({other})"),
            });
        }
        if self.embedding.api_key.is_none() {
            missing.push(match self.embedding.provider.as_str() {
                "vertex" => "VERTEX_ACCESS_TOKEN".to_string(),
                _ => "OPENAI_API_KEY".to_string(),
            });
        }
        if self.embedding.provider == "vertex" && self.embedding.base_url.is_none() {
            missing.push("embedding.base_url (vertex predict endpoint)".into());
        }
        if self.vector_index.backend == "pinecone" {
            if self.vector_index.api_key.is_none() {
                missing.push("PINECONE_API_KEY".into());
            }
            if self.vector_index.host.is_none() {
                missing.push("PINECONE_HOST".into());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials(missing))
        }
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env_number(key: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} must be a number, got '{raw}'")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Upper bound for both cache TTLs (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator.provider, "gemini");
        assert_eq!(config.pipeline.classifier_history_turns, 2);
        assert_eq!(config.pipeline.generation_history_turns, 6);
        assert_eq!(config.pipeline.context_cache_ttl_secs, 0);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.generator.model, config.generator.model);
        assert_eq!(parsed.vector_index.namespace_prefix, "business_");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[pipeline]
context_cache_ttl_secs = 300
text_search_modalities = ["text", "image"]

[support]
phone = "0900000000"
"#,
        )
        .unwrap();
        assert_eq!(parsed.pipeline.context_cache_ttl_secs, 300);
        assert_eq!(parsed.pipeline.search_top_n, 5);
        assert!(parsed.support.apology().contains("0900000000"));
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut config = AppConfig::default();
        config.vector_index.dimension = 1408;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("1408"));
    }

    #[test]
    fn top_k_below_top_n_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.search_top_k = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cache_ttl_above_one_year_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.prompt_cache_ttl_secs = u64::MAX;
        assert!(config.validate().unwrap_err().to_string().contains("prompt_cache_ttl_secs"));

        let mut config = AppConfig::default();
        config.pipeline.context_cache_ttl_secs = MAX_CACHE_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config.pipeline.context_cache_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_modality_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.text_search_modalities = vec!["audio".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply_to_matching_providers() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("GEMINI_API_KEY", "g-key"),
                ("OPENAI_API_KEY", "o-key"),
                ("PINECONE_HOST", "idx.svc.pinecone.io"),
                ("EMBEDDING_DIMENSION", "768"),
            ]))
            .unwrap();
        assert_eq!(config.generator.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("o-key"));
        assert_eq!(config.vector_index.host.as_deref(), Some("idx.svc.pinecone.io"));
        assert_eq!(config.embedding.dimension, 768);
    }

    #[test]
    fn non_numeric_dimension_env_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(env(&[("PINECONE_DIMENSION", "wide")]));
        assert!(result.is_err());
    }

    #[test]
    fn missing_credentials_listed_together() {
        let config = AppConfig::default();
        match config.require_credentials() {
            Err(ConfigError::MissingCredentials(keys)) => {
                assert!(keys.contains(&"GEMINI_API_KEY".to_string()));
                assert!(keys.contains(&"OPENAI_API_KEY".to_string()));
                assert!(keys.contains(&"PINECONE_API_KEY".to_string()));
                assert!(keys.contains(&"PINECONE_HOST".to_string()));
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn memory_index_needs_no_pinecone_credentials() {
        let mut config = AppConfig::default();
        config.vector_index.backend = "memory".into();
        config.generator.api_key = Some("g".into());
        config.embedding.api_key = Some("o".into());
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from(&dir.path().join("absent.toml"));
        assert!(result.is_ok());
    }

    #[test]
    fn malformed_config_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline\nbroken").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn instruction_override() {
        let mut p = PipelineConfig::default();
        assert_eq!(p.instruction(), DEFAULT_CHAT_INSTRUCTION);
        p.instruction = Some("Custom".into());
        assert_eq!(p.instruction(), "Custom");
    }
}
