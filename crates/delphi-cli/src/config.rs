//! Experiment configuration and item loading.

use anyhow::{bail, Context, Result};
use delphi_core::Item;
use delphi_runtime::{BackendConfig, PanelConfig, ProtocolMode};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level experiment file.
///
/// ```yaml
/// dataset:
///   items_path: items.yaml
/// panel:
///   n_max: 3
///   expert_seeds: [11, 22, 33, 44, 55]
/// mode: recursive
/// backend:
///   model: qwen3:4b
///   timeout: 90s
/// output:
///   run_dir: runs
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub dataset: DatasetSection,
    pub panel: PanelConfig,
    #[serde(default)]
    pub mode: ProtocolMode,
    pub backend: BackendConfig,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSection {
    pub items_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
        }
    }
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("runs")
}

impl ExperimentConfig {
    /// Load a config file. Relative paths inside it are resolved against
    /// the file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: ExperimentConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.dataset.items_path = resolve(base, &config.dataset.items_path);
        config.output.run_dir = resolve(base, &config.output.run_dir);
        Ok(config)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Read items from a `.json` file, or YAML otherwise.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read items: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let items = if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid items JSON: {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid items YAML: {}", path.display()))?
    };
    Ok(items)
}

/// Items must be non-empty with unique, non-blank ids.
pub fn validate_items(items: &[Item]) -> Result<()> {
    if items.is_empty() {
        bail!("Dataset has no items");
    }
    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        if item.item_id.trim().is_empty() {
            bail!("Item at position {} has an empty item_id", index + 1);
        }
        if !seen.insert(item.item_id.as_str()) {
            bail!("Duplicate item_id: {}", item.item_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
dataset:
  items_path: data/items.yaml
panel:
  n_max: 3
  expert_seeds: [11, 22, 33]
mode: recursive
backend:
  model: qwen3:4b
  timeout: 90s
"#;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "experiment.yaml", CONFIG);

        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.dataset.items_path, dir.path().join("data/items.yaml"));
        assert_eq!(config.output.run_dir, dir.path().join("runs"));
        assert_eq!(config.mode, ProtocolMode::Recursive);
        assert_eq!(config.panel.expert_seeds, vec![11, 22, 33]);
        assert_eq!(config.backend.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_mode_defaults_to_standard() {
        let dir = TempDir::new().unwrap();
        let body = CONFIG.replace("mode: recursive\n", "");
        let path = write(&dir, "experiment.yaml", &body);
        assert_eq!(ExperimentConfig::load(&path).unwrap().mode, ProtocolMode::Standard);
    }

    #[test]
    fn test_missing_config_message() {
        let err = ExperimentConfig::load(Path::new("/nonexistent/experiment.yaml")).unwrap_err();
        assert_eq!(err.to_string(), "Config file not found: /nonexistent/experiment.yaml");
    }

    #[test]
    fn test_load_items_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = write(
            &dir,
            "items.yaml",
            "- item_id: Q1\n  item_text: Record vitals\n\
             - item_id: Q2\n  item_text: Check allergies\n",
        );
        let json = write(
            &dir,
            "items.json",
            r#"[{"item_id": "Q1", "item_text": "Record vitals"}]"#,
        );

        let from_yaml = load_items(&yaml).unwrap();
        assert_eq!(from_yaml.len(), 2);
        assert_eq!(from_yaml[1], Item::new("Q2", "Check allergies"));
        assert_eq!(load_items(&json).unwrap(), vec![Item::new("Q1", "Record vitals")]);
    }

    #[test]
    fn test_validate_items() {
        assert!(validate_items(&[]).is_err());
        assert!(validate_items(&[Item::new(" ", "x")]).is_err());

        let err = validate_items(&[Item::new("Q1", "a"), Item::new("Q1", "b")]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate item_id: Q1");

        assert!(validate_items(&[Item::new("Q1", "a"), Item::new("Q2", "b")]).is_ok());
    }
}
