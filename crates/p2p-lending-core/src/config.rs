use serde::{Deserialize, Serialize};

/// Platform-wide settings for the lifecycle engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Prefix for agreement reference URLs (`<base>/agreement/{id}/view`).
    pub agreement_base_url: String,

    /// Symbol printed in front of amounts in generated documents.
    pub currency_symbol: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            agreement_base_url: "http://localhost:8080".to_string(),
            currency_symbol: "Rp".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PlatformConfig =
            serde_json::from_str(r#"{"agreement_base_url": "https://lend.example"}"#).unwrap();
        assert_eq!(config.agreement_base_url, "https://lend.example");
        assert_eq!(config.currency_symbol, "Rp");
    }
}
