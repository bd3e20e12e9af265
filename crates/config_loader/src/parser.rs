//! Configuration parsing.
//!
//! Supports TOML (primary) and JSON (secondary) formats.

use contracts::{ContractError, ObservationBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (preferred)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration content
pub fn parse_toml(content: &str) -> Result<ObservationBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration content
pub fn parse_json(content: &str) -> Result<ObservationBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration content in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<ObservationBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[observation]
id = "obs"
sample_rate = 1000
period_samples = 128
max_network_delay_samples = 32
subbands_per_pset = 1
pset_count = 1
workers_per_pset = 1

[[inputs]]
stream = "rsp0"
beam = 0
subbands = 1
samples_per_frame = 16
[inputs.source]
kind = "udp"
listen = "0.0.0.0:4346"

[[beams]]
id = 0
base_delay_seconds = 0.001

[[workers]]
pset = 0
[workers.link]
kind = "tcp"
addr = "10.0.0.2:5000"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.observation.sample_rate, 1000);
        assert_eq!(bp.inputs.len(), 1);
        assert_eq!(bp.beams[0].base_delay_seconds, 0.001);
        // defaults fill in
        assert!(!bp.observation.realtime);
        assert_eq!(bp.observation.max_flag_ranges, 16);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "observation": {
                "id": "obs",
                "sample_rate": 1000,
                "period_samples": 128,
                "max_network_delay_samples": 32,
                "subbands_per_pset": 1,
                "pset_count": 1,
                "workers_per_pset": 1
            },
            "inputs": [{
                "stream": "rsp0",
                "beam": 0,
                "subbands": 1,
                "samples_per_frame": 16,
                "source": { "kind": "generator", "seed": 3 }
            }],
            "beams": [{ "id": 0 }],
            "workers": [{ "pset": 0, "link": { "kind": "record" } }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
