use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Model used when `MODEL_NAME` is not set.
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

pub const MODEL_NAME_VAR: &str = "MODEL_NAME";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// Provider settings loaded before any graph is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub model_name: String,
    pub openai_api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get(OPENAI_API_KEY_VAR).ok_or_else(|| {
            FlowError::Config(format!("{OPENAI_API_KEY_VAR} environment variable is required"))
        })?;

        Ok(Self {
            model_name: get(MODEL_NAME_VAR).unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            openai_api_key,
            tavily_api_key: get(TAVILY_API_KEY_VAR),
        })
    }

    /// The Tavily key, or a configuration error naming the missing variable.
    pub fn require_tavily_key(&self) -> Result<&str> {
        self.tavily_api_key.as_deref().ok_or_else(|| {
            FlowError::Config(format!("{TAVILY_API_KEY_VAR} environment variable is required"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_model_name() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(settings.model_name, "gpt-4o-mini");
        assert_eq!(settings.openai_api_key, "sk-test");
        assert!(settings.tavily_api_key.is_none());
        assert!(settings.require_tavily_key().is_err());
    }

    #[test]
    fn reads_all_variables() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MODEL_NAME", "gpt-4.1-mini"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap();
        assert_eq!(settings.model_name, "gpt-4.1-mini");
        assert_eq!(settings.require_tavily_key().unwrap(), "tvly-test");
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
