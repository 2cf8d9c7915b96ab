//! # Pallets Core
//!
//! Color palette extraction and autoencoder training for small pixel-art
//! image collections such as the 10,000 24x24 RGBA punks.
//!
//! Images are `[channels, height, width]` arrays of intensities in `[0, 1]`.
//! A palette is the set of distinct per-pixel color vectors across one or
//! more images; it drives one-hot encoding of images for palette-indexed
//! models. The training loop fits any [`Model`] that reconstructs its input,
//! recording one train and one test loss per epoch.
//!
//! ## Quick Start
//!
//! ```rust
//! use pallets_core::{unique_colors_many, Image, ImageSource, SyntheticConfig, SyntheticSource};
//!
//! let source = SyntheticSource::new(SyntheticConfig {
//!     size: 8,
//!     shape: (4, 6, 6),
//!     ..Default::default()
//! })
//! .unwrap();
//! let images: Vec<Image> = (0..source.size())
//!     .map(|id| source.get(id))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! let palette = unique_colors_many(&images).unwrap();
//! assert_eq!(palette.channels(), 4);
//! assert!(!palette.is_empty());
//! ```
//!
//! ## Core Modules
//!
//! - [`image`] - Image values and image sources
//! - [`palette`] - Unique color extraction and one-hot encoding
//! - [`data`] - Train/test partitioning, datasets and batch loaders
//! - [`neural`] - Model, criterion and optimizer traits plus a dense autoencoder
//! - [`training`] - The epoch loop and loss history
//! - [`config`] - Run configuration via TOML
//! - [`logging`] - Tracing setup and JSON line-delimited run logs

pub mod config;
pub mod data;
pub mod error;
pub mod image;
pub mod logging;
pub mod neural;
pub mod palette;
pub mod training;

pub use config::{ConfigError, DataConfig, PalletsConfig};
pub use data::{
    partition, Batch, BatchSource, DataLoader, Dataset, ImageDataset, IndexPartition, LazyDataset,
};
pub use error::{ComputeError, PalletsError, PalletsResult};
pub use image::{Image, ImageSource, InMemorySource, SyntheticConfig, SyntheticSource};
pub use neural::{
    Adam, AutoencoderConfig, Criterion, DenseAutoencoder, Device, Loss, Model, MseLoss,
    NeuralError, Optimizer, OutputActivation, Sgd,
};
pub use palette::{
    color_histogram, one_hot_decode, one_hot_encode, source_palette, unique_colors,
    unique_colors_many, ColorVector, Palette, PaletteBuilder,
};
pub use training::{
    train, CollectProgress, EpochLoss, LossHistory, NullProgress, ProgressSink, Trainer,
    TracingProgress, TrainingConfig,
};
