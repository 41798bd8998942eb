use std::time::Duration;

/// Connection settings for an HTTP-backed provider, loaded from environment
/// variables prefixed `CORPUS_{NAME}_*`, mirroring the teacher's
/// `LLMSPELL_{NAME}_API_KEY`/`_ENDPOINT`/`_MODEL` convention.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderConfig {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// Loads overrides from `CORPUS_{NAME}_API_KEY`, `_ENDPOINT`, `_MODEL`,
    /// `_TIMEOUT_SECS`, `_MAX_RETRIES`, falling back to the value already
    /// set on `self` when a variable is absent or unparseable.
    pub fn from_env(mut self) -> Self {
        let prefix = format!("CORPUS_{}", self.name.to_uppercase());
        if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var(format!("{prefix}_ENDPOINT")) {
            self.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var(format!("{prefix}_MODEL")) {
            self.model = model;
        }
        if let Ok(timeout) = std::env::var(format!("{prefix}_TIMEOUT_SECS")) {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(retries) = std::env::var(format!("{prefix}_MAX_RETRIES")) {
            if let Ok(n) = retries.parse::<u32>() {
                self.max_retries = n;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_through_without_env() {
        let config = ProviderConfig::new("embed_test_unset", "http://localhost", "local-model");
        let loaded = config.clone().from_env();
        assert_eq!(loaded.model, config.model);
        assert_eq!(loaded.endpoint, config.endpoint);
    }
}
