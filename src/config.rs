// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Run configuration: data-file locations and whole-cell constants.
//!
//! Follows the usual loading order: TOML file (base values), then
//! environment variable overrides. Every field has a default matching the
//! published Purkinje dataset layout, so `ModelConfig::default()` is a
//! usable configuration when the data files sit in the working directory.

use crate::types::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub data: DataConfig,
    pub cell: CellConfig,
}

/// Input data file locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory every data file path is resolved against
    pub data_dir: PathBuf,
    /// Dendritic section names, one per line
    pub dendrite_names: String,
    /// Per-dendrite proximal/distal coordinates and diameters
    pub coordinates: String,
    /// Dendritic tree edges (child, 0, parent, 1)
    pub connections: String,
    /// Dendrite-index to subset-id classification
    pub subsets: String,
    /// Subset-id to membrane-capacitance table
    pub subset_cm: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            dendrite_names: "PC_dendnames.dlist".to_string(),
            coordinates: "coordinate.csv".to_string(),
            connections: "connections.csv".to_string(),
            subsets: "ModelViewParmSubset.txt".to_string(),
            subset_cm: "ModelViewParmSubset_cm.txt".to_string(),
        }
    }
}

impl DataConfig {
    /// Resolve a data file name against the configured data directory
    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

/// Whole-cell electrical constants
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CellConfig {
    pub label: String,
    /// Axial resistance, a single scalar for the entire cell (ohm·cm)
    pub axial_resistance: f64,
    /// The per-subset capacitance table is rescaled by
    /// `cm_ratio_numerator / cm_ratio_denominator` before use.
    pub cm_ratio_numerator: f64,
    pub cm_ratio_denominator: f64,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            label: "PurkinjeNeuron".to_string(),
            axial_resistance: 122.0,
            cm_ratio_numerator: 0.77,
            cm_ratio_denominator: 1.64,
        }
    }
}

impl CellConfig {
    /// The capacitance rescale ratio applied to subset cm values
    pub fn cm_ratio(&self) -> f64 {
        self.cm_ratio_numerator / self.cm_ratio_denominator
    }
}

/// Find the model configuration file
///
/// Search order:
/// 1. `PURKINJE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./purkinje.toml`
/// 3. Parent directory: `../purkinje.toml`
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("PURKINJE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "config file specified by PURKINJE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join("purkinje.toml"));
        if let Some(parent) = cwd.parent() {
            search_paths.push(parent.join("purkinje.toml"));
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'purkinje.toml' not found in any of these locations:\n{}",
        search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to the config file. If `None`, the file
///   is discovered via [`find_config_file`].
///
/// # Errors
///
/// Returns an error if the file is missing or contains invalid TOML
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<ModelConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file).map_err(|source| ConfigError::Io {
        path: config_file.clone(),
        source,
    })?;

    let mut config: ModelConfig = toml::from_str(&content).map_err(|e| ConfigError::InvalidToml {
        path: config_file.clone(),
        detail: e.to_string(),
    })?;

    apply_environment_overrides(&mut config);

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PURKINJE_DATA_DIR` -> `data.data_dir`
pub fn apply_environment_overrides(config: &mut ModelConfig) {
    if let Ok(value) = env::var("PURKINJE_DATA_DIR") {
        config.data.data_dir = PathBuf::from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.cell.axial_resistance, 122.0);
        assert_eq!(config.data.dendrite_names, "PC_dendnames.dlist");
        assert!((config.cell.cm_ratio() - 0.77 / 1.64).abs() < 1e-15);
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("purkinje.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[data]").unwrap();
        writeln!(file, "data_dir = \"/srv/purkinje\"").unwrap();
        writeln!(file, "[cell]").unwrap();
        writeln!(file, "axial_resistance = 150.0").unwrap();

        let config = load_config(Some(&config_path)).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("/srv/purkinje"));
        assert_eq!(config.cell.axial_resistance, 150.0);
        // untouched sections keep their defaults
        assert_eq!(config.cell.label, "PurkinjeNeuron");
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("PURKINJE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("PURKINJE_CONFIG_PATH");

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ModelConfig::default();

        env::set_var("PURKINJE_DATA_DIR", "/data/cells");
        apply_environment_overrides(&mut config);
        env::remove_var("PURKINJE_DATA_DIR");

        assert_eq!(config.data.data_dir, PathBuf::from("/data/cells"));
    }

    #[test]
    fn test_invalid_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("purkinje.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[cell").unwrap();

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::InvalidToml { .. })));
    }
}
