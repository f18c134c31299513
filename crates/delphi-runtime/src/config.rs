//! Runtime configuration: panel composition, protocol mode, backend.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::orchestrator::EngineError;
use crate::providers::{ollama::DEFAULT_OLLAMA_HOST, CompletionConfig};

/// Panel composition as supplied by a caller.
///
/// Validated into a [`Panel`] before any round runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Round cap per item
    pub n_max: u32,

    /// One synthetic identity per seat
    pub expert_seeds: Vec<i64>,

    /// Seat names; `expert_1..expert_k` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_ids: Option<Vec<String>>,
}

impl PanelConfig {
    pub fn new(n_max: u32, expert_seeds: Vec<i64>) -> Self {
        Self {
            n_max,
            expert_seeds,
            expert_ids: None,
        }
    }

    pub fn with_expert_ids(mut self, expert_ids: Vec<String>) -> Self {
        self.expert_ids = Some(expert_ids);
        self
    }

    /// Check the panel contract and pair ids with seeds.
    pub fn panel(&self) -> Result<Panel, EngineError> {
        if self.n_max == 0 {
            return Err(EngineError::InvalidInput(
                "n_max must be a positive integer".to_string(),
            ));
        }
        if self.expert_seeds.is_empty() {
            return Err(EngineError::InvalidInput(
                "expert_seeds must not be empty".to_string(),
            ));
        }

        let ids: Vec<String> = match &self.expert_ids {
            Some(ids) if ids.len() != self.expert_seeds.len() => {
                return Err(EngineError::InvalidInput(format!(
                    "expert_ids has {} entries but expert_seeds has {}",
                    ids.len(),
                    self.expert_seeds.len()
                )));
            }
            Some(ids) => ids.clone(),
            None => (1..=self.expert_seeds.len())
                .map(|i| format!("expert_{i}"))
                .collect(),
        };

        let seats = ids
            .into_iter()
            .zip(self.expert_seeds.iter().copied())
            .map(|(expert_id, seed)| PanelSeat { expert_id, seed })
            .collect();

        Ok(Panel {
            n_max: self.n_max,
            seats,
        })
    }
}

/// One seat on the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSeat {
    pub expert_id: String,
    pub seed: i64,
}

/// A validated panel: at least one seat and a positive round cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    n_max: u32,
    seats: Vec<PanelSeat>,
}

impl Panel {
    pub fn n_max(&self) -> u32 {
        self.n_max
    }

    /// Seats in configuration order.
    pub fn seats(&self) -> &[PanelSeat] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// Which per-expert protocol a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMode {
    /// Expert rates directly.
    #[default]
    Standard,
    /// Expert asks a question, the facilitator answers, the expert rates.
    Recursive,
}

/// LLM backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registered provider type, e.g. "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    pub model: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout, e.g. "120s" or "2m"
    #[serde(default = "default_timeout", with = "duration_human")]
    pub timeout: Duration,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_host() -> String {
    DEFAULT_OLLAMA_HOST.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl BackendConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: default_provider(),
            model: model.into(),
            host: default_host(),
            temperature: default_temperature(),
            timeout: default_timeout(),
        }
    }

    /// Settings block handed to the provider factory.
    pub fn provider_settings(&self) -> JsonValue {
        serde_json::json!({ "host": self.host })
    }

    /// Completion settings shared by every expert and the facilitator.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_autogenerates_ids() {
        let panel = PanelConfig::new(3, vec![11, 22, 33]).panel().unwrap();
        let ids: Vec<&str> = panel.seats().iter().map(|s| s.expert_id.as_str()).collect();
        assert_eq!(ids, vec!["expert_1", "expert_2", "expert_3"]);
        assert_eq!(panel.seats()[1].seed, 22);
        assert_eq!(panel.n_max(), 3);
    }

    #[test]
    fn test_panel_uses_supplied_ids() {
        let panel = PanelConfig::new(1, vec![1, 2])
            .with_expert_ids(vec!["alice".to_string(), "bob".to_string()])
            .panel()
            .unwrap();
        assert_eq!(
            panel.seats()[1],
            PanelSeat {
                expert_id: "bob".to_string(),
                seed: 2
            }
        );
    }

    #[test]
    fn test_panel_rejects_mismatched_ids() {
        let result = PanelConfig::new(1, vec![1, 2])
            .with_expert_ids(vec!["alice".to_string()])
            .panel();
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_panel_rejects_empty_seeds() {
        assert!(PanelConfig::new(1, vec![]).panel().is_err());
    }

    #[test]
    fn test_panel_rejects_zero_rounds() {
        assert!(PanelConfig::new(0, vec![1]).panel().is_err());
    }

    #[test]
    fn test_protocol_mode_serde() {
        let mode: ProtocolMode = serde_json::from_str("\"recursive\"").unwrap();
        assert_eq!(mode, ProtocolMode::Recursive);
        assert_eq!(serde_json::to_string(&ProtocolMode::Standard).unwrap(), "\"standard\"");
    }

    #[test]
    fn test_backend_defaults() {
        let backend: BackendConfig = serde_json::from_value(serde_json::json!({
            "model": "qwen3:4b"
        }))
        .unwrap();
        assert_eq!(backend, BackendConfig::new("qwen3:4b"));
        assert_eq!(backend.timeout, Duration::from_secs(120));
        assert_eq!(backend.provider, "ollama");
    }

    #[test]
    fn test_backend_human_timeout() {
        let backend: BackendConfig = serde_json::from_value(serde_json::json!({
            "model": "llama3.2",
            "timeout": "2m 30s",
            "temperature": 0.0
        }))
        .unwrap();
        assert_eq!(backend.timeout, Duration::from_secs(150));

        let config = backend.completion_config();
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout, Duration::from_secs(150));
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_backend_rejects_bad_timeout() {
        let result: Result<BackendConfig, _> = serde_json::from_value(serde_json::json!({
            "model": "llama3.2",
            "timeout": "soon"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_settings_carry_host() {
        let mut backend = BackendConfig::new("m");
        backend.host = "http://ollama:11434".to_string();
        assert_eq!(backend.provider_settings()["host"], "http://ollama:11434");
    }
}
