//! Run configuration via TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults for the punks collection.
//!
//! ```toml
//! [data]
//! size = 10000
//! held_out = 1000
//! seed = 42
//!
//! [model]
//! hidden_size = 128
//! latent_size = 64
//! output_activation = "sigmoid"
//!
//! [training]
//! epochs = 5
//! batch_size = 32
//! learning_rate = 0.001
//! device = "cpu"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::{CPUNKS_SIZE, PUNK_HEIGHT, PUNK_WIDTH, RGBA_CHANNELS};
use crate::neural::AutoencoderConfig;
use crate::training::TrainingConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Dataset section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Number of images in the collection
    pub size: usize,
    /// Images held out for testing
    pub held_out: usize,
    /// Seed for the train/test permutation
    pub seed: u64,
    /// Image dimensions (channels, height, width)
    pub image_shape: (usize, usize, usize),
    /// Where to write the extracted palette, if anywhere
    pub palette_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            size: CPUNKS_SIZE,
            held_out: CPUNKS_SIZE / 10,
            seed: 42,
            image_shape: (RGBA_CHANNELS, PUNK_HEIGHT, PUNK_WIDTH),
            palette_path: None,
        }
    }
}

/// Complete run configuration.
///
/// # Examples
///
/// ```
/// use pallets_core::PalletsConfig;
///
/// let config: PalletsConfig = "[training]\nepochs = 2".parse().unwrap();
/// assert_eq!(config.training.epochs, 2);
/// assert_eq!(config.data.size, 10_000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalletsConfig {
    pub data: DataConfig,
    pub model: AutoencoderConfig,
    pub training: TrainingConfig,
}

impl PalletsConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.held_out > self.data.size {
            return Err(ConfigError::Invalid(format!(
                "data.held_out ({}) exceeds data.size ({})",
                self.data.held_out, self.data.size
            )));
        }
        let (c, h, w) = self.data.image_shape;
        if c == 0 || h == 0 || w == 0 {
            return Err(ConfigError::Invalid(format!(
                "data.image_shape {:?} has an empty dimension",
                self.data.image_shape
            )));
        }
        if self.model.input_shape != self.data.image_shape {
            return Err(ConfigError::Invalid(format!(
                "model.input_shape {:?} does not match data.image_shape {:?}",
                self.model.input_shape, self.data.image_shape
            )));
        }
        if self.model.hidden_size == 0 || self.model.latent_size == 0 {
            return Err(ConfigError::Invalid(
                "model.hidden_size and model.latent_size must be > 0".into(),
            ));
        }
        self.training
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

impl FromStr for PalletsConfig {
    type Err = ConfigError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: PalletsConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Device, OutputActivation};

    #[test]
    fn empty_document_gives_defaults() {
        let config: PalletsConfig = "".parse().unwrap();
        assert_eq!(config.data.size, 10_000);
        assert_eq!(config.data.held_out, 1_000);
        assert_eq!(config.model.hidden_size, 128);
        assert_eq!(config.training.log_every, 100);
        assert_eq!(config.training.device, Device::Cpu);
    }

    #[test]
    fn parses_custom_values() {
        let toml = r#"
            [data]
            size = 100
            held_out = 20
            image_shape = [3, 8, 8]

            [model]
            input_shape = [3, 8, 8]
            latent_size = 16
            output_activation = "identity"

            [training]
            epochs = 7
            learning_rate = 0.01
            log_path = "logs/run.jsonl"
        "#;
        let config: PalletsConfig = toml.parse().unwrap();

        assert_eq!(config.data.image_shape, (3, 8, 8));
        assert_eq!(config.model.latent_size, 16);
        assert_eq!(config.model.output_activation, OutputActivation::Identity);
        assert_eq!(config.training.epochs, 7);
        assert_eq!(
            config.training.log_path.as_deref(),
            Some(Path::new("logs/run.jsonl"))
        );
    }

    #[test]
    fn rejects_held_out_above_size() {
        let err = "[data]\nsize = 5\nheld_out = 6"
            .parse::<PalletsConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_device() {
        let err = "[training]\ndevice = \"tpu\"".parse::<PalletsConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_epochs() {
        let err = "[training]\nepochs = 0".parse::<PalletsConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pallets.toml");
        fs::write(&path, "[training]\nbatch_size = 64").unwrap();

        let config = PalletsConfig::load_from_file(&path).unwrap();
        assert_eq!(config.training.batch_size, 64);
        assert!(PalletsConfig::load_from_file(dir.path().join("missing.toml")).is_err());
    }
}
