//! Datasets, train/test partitioning and batching.

pub mod dataset;
pub mod loader;
pub mod partition;

pub use dataset::{Dataset, ImageDataset, LazyDataset};
pub use loader::{Batch, BatchSource, DataLoader};
pub use partition::{partition, IndexPartition};
