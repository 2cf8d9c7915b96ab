//! Indexable image collections with a fixed train/test partition.

use std::borrow::Cow;

use rand::Rng;

use super::partition::{partition, IndexPartition};
use crate::error::{PalletsError, PalletsResult};
use crate::image::{Image, ImageSource};

/// Uniform indexable-collection contract over images.
pub trait Dataset {
    /// Number of images
    fn len(&self) -> usize;

    /// Image at `index`, failing with [`PalletsError::IndexOutOfBounds`]
    /// outside `[0, len)`.
    fn get(&self, index: usize) -> PalletsResult<Cow<'_, Image>>;

    /// The train/test split fixed at construction
    fn partition(&self) -> &IndexPartition;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn train_indices(&self) -> &[usize] {
        self.partition().train()
    }

    fn test_indices(&self) -> &[usize] {
        self.partition().test()
    }
}

fn check_index(index: usize, len: usize) -> PalletsResult<()> {
    if index >= len {
        return Err(PalletsError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

/// Dataset with every image resolved into memory at construction.
///
/// Fine for collections the size of the punks set (10,000 images of
/// 4x24x24 is under 100 MB); use [`LazyDataset`] when that does not hold.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Vec<Image>,
    partition: IndexPartition,
}

impl ImageDataset {
    /// Loads all of `source` and partitions it, holding out `held_out`
    /// images for testing.
    ///
    /// Arguments are validated before anything is loaded; a missing image
    /// aborts construction with the source's error.
    pub fn new<S, R>(source: &S, held_out: usize, rng: &mut R) -> PalletsResult<Self>
    where
        S: ImageSource + ?Sized,
        R: Rng + ?Sized,
    {
        let size = source.size();
        let partition = partition(size, held_out, rng)?;

        let images = (0..size)
            .map(|id| source.get(id))
            .collect::<PalletsResult<Vec<_>>>()?;

        tracing::info!(
            "Loaded {} images ({} train / {} test)",
            images.len(),
            partition.train().len(),
            partition.test().len()
        );

        Ok(Self { images, partition })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }
}

impl Dataset for ImageDataset {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn get(&self, index: usize) -> PalletsResult<Cow<'_, Image>> {
        check_index(index, self.images.len())?;
        Ok(Cow::Borrowed(&self.images[index]))
    }

    fn partition(&self) -> &IndexPartition {
        &self.partition
    }
}

/// Dataset that resolves images from its source on every access.
#[derive(Debug, Clone)]
pub struct LazyDataset<S> {
    source: S,
    partition: IndexPartition,
}

impl<S: ImageSource> LazyDataset<S> {
    pub fn new<R: Rng + ?Sized>(source: S, held_out: usize, rng: &mut R) -> PalletsResult<Self> {
        let partition = partition(source.size(), held_out, rng)?;
        Ok(Self { source, partition })
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ImageSource> Dataset for LazyDataset<S> {
    fn len(&self) -> usize {
        self.source.size()
    }

    fn get(&self, index: usize) -> PalletsResult<Cow<'_, Image>> {
        check_index(index, self.source.size())?;
        self.source.get(index).map(Cow::Owned)
    }

    fn partition(&self) -> &IndexPartition {
        &self.partition
    }
}
