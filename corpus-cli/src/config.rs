use serde::{Deserialize, Serialize};

/// Layered runtime configuration: defaults < TOML file < `CORPUS_*` env vars
/// < CLI flags, mirroring the teacher's `llmspell-config` precedence order.
///
/// Storage is in-memory only (`corpus_storage::memory::InMemoryStore`); there
/// is no `storage_path`/backend-selection field because `ServerState` does
/// not currently accept an alternate backend (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm_model: String,
    pub llm_endpoint: String,
    pub llm_timeout_secs: u64,
    pub embedding_model: String,
    pub embedding_endpoint: String,
    pub embedding_dimensions: usize,
    pub default_conflict_threshold: f32,
    pub default_authority_level: u8,
    pub max_extract_concurrency: Option<usize>,
    pub use_mock_providers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            llm_model: "gpt-4o-mini".to_string(),
            llm_endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            llm_timeout_secs: 30,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_endpoint: "http://localhost:11434/v1/embeddings".to_string(),
            embedding_dimensions: 16,
            default_conflict_threshold: 0.7,
            default_authority_level: 5,
            max_extract_concurrency: None,
            use_mock_providers: false,
        }
    }
}

impl Config {
    /// Builds the layered configuration: defaults, an optional TOML file at
    /// `path`, then `CORPUS_*` environment variables. CLI flags are applied
    /// on top by the caller, since `clap` owns their precedence already.
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("CORPUS").separator("_"));

        let settings = builder.build()?;
        let config = settings.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_open_question_resolution() {
        let config = Config::default();
        assert_eq!(config.default_conflict_threshold, 0.7);
        assert_eq!(config.default_authority_level, 5);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let config = Config::load(None).expect("defaults-only config loads");
        assert_eq!(config.llm_model, Config::default().llm_model);
    }

    #[test]
    fn load_from_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus.toml");
        std::fs::write(&path, "llm_model = \"local-llama\"\ndefault_conflict_threshold = 0.5\n")
            .expect("write config file");

        let config = Config::load(Some(&path)).expect("config loads from file");
        assert_eq!(config.llm_model, "local-llama");
        assert_eq!(config.default_conflict_threshold, 0.5);
    }
}
