//! Fixed-size batching over a dataset.

use ndarray::{Array4, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::dataset::Dataset;
use crate::error::{PalletsError, PalletsResult};

/// A group of images stacked into one `[batch, channels, height, width]`
/// array, plus the ids of the images it holds.
///
/// Ids play the role of labels; the reconstruction objective ignores them.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub data: Array4<f32>,
    pub ids: Vec<usize>,
}

impl Batch {
    /// Stacks equally-shaped images. Fails on an empty or ragged input.
    pub fn stack(images: &[ArrayView3<'_, f32>], ids: Vec<usize>) -> PalletsResult<Self> {
        if images.is_empty() {
            return Err(PalletsError::invalid("cannot build an empty batch"));
        }
        let data = ndarray::stack(Axis(0), images)
            .map_err(|err| PalletsError::invalid(format!("cannot stack batch: {err}")))?;
        Ok(Self { data, ids })
    }

    /// Wraps a precomputed batch array; ids default to `0..batch`.
    pub fn from_array(data: Array4<f32>) -> Self {
        let ids = (0..data.dim().0).collect();
        Self { data, ids }
    }

    /// Number of images in the batch
    pub fn len(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A lazy, finite, restartable sequence of batches.
///
/// Every call to [`BatchSource::batches`] starts a new pass from the
/// beginning.
pub trait BatchSource {
    /// Number of batches one pass yields
    fn num_batches(&self) -> usize;

    /// Starts a new pass
    fn batches(&mut self) -> Box<dyn Iterator<Item = PalletsResult<Batch>> + '_>;

    fn is_empty(&self) -> bool {
        self.num_batches() == 0
    }
}

/// Precomputed batches, replayed verbatim on every pass.
impl BatchSource for Vec<Batch> {
    fn num_batches(&self) -> usize {
        self.len()
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = PalletsResult<Batch>> + '_> {
        Box::new(self.iter().cloned().map(Ok))
    }
}

/// Groups a subset of a dataset into batches of `batch_size`.
///
/// Without shuffling, batches follow the supplied index order. With
/// shuffling, the order is re-drawn at the start of each pass from a seeded
/// generator, so a run is reproducible from its seed.
pub struct DataLoader<'a, D: Dataset + ?Sized> {
    dataset: &'a D,
    indices: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    shuffle: Option<StdRng>,
}

impl<'a, D: Dataset + ?Sized> DataLoader<'a, D> {
    pub fn new(dataset: &'a D, indices: &[usize], batch_size: usize) -> PalletsResult<Self> {
        if batch_size == 0 {
            return Err(PalletsError::invalid("batch_size must be > 0"));
        }
        let len = dataset.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(PalletsError::IndexOutOfBounds { index, len });
        }

        Ok(Self {
            dataset,
            indices: indices.to_vec(),
            batch_size,
            drop_last: false,
            shuffle: None,
        })
    }

    /// Loader over the dataset's train indices.
    pub fn train(dataset: &'a D, batch_size: usize) -> PalletsResult<Self> {
        Self::new(dataset, dataset.train_indices(), batch_size)
    }

    /// Loader over the dataset's test indices.
    pub fn test(dataset: &'a D, batch_size: usize) -> PalletsResult<Self> {
        Self::new(dataset, dataset.test_indices(), batch_size)
    }

    /// Reshuffle the index order at the start of every pass.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Skip the final batch when it is smaller than `batch_size`.
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn load_batch(dataset: &D, indices: &[usize]) -> PalletsResult<Batch> {
        let images = indices
            .iter()
            .map(|&i| dataset.get(i))
            .collect::<PalletsResult<Vec<_>>>()?;
        let views: Vec<_> = images.iter().map(|image| image.view()).collect();
        Batch::stack(&views, indices.to_vec())
    }
}

impl<'a, D: Dataset + ?Sized> BatchSource for DataLoader<'a, D> {
    fn num_batches(&self) -> usize {
        if self.drop_last {
            self.indices.len() / self.batch_size
        } else {
            (self.indices.len() + self.batch_size - 1) / self.batch_size
        }
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = PalletsResult<Batch>> + '_> {
        if let Some(rng) = self.shuffle.as_mut() {
            self.indices.shuffle(rng);
            tracing::debug!("Reshuffled {} indices", self.indices.len());
        }

        let dataset = self.dataset;
        let batch_size = self.batch_size;
        let drop_last = self.drop_last;
        Box::new(
            self.indices
                .chunks(batch_size)
                .filter(move |chunk| !drop_last || chunk.len() == batch_size)
                .map(move |chunk| Self::load_batch(dataset, chunk)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ImageDataset;
    use crate::image::InMemorySource;
    use ndarray::Array3;
    use std::collections::HashSet;

    fn dataset(n: usize, held_out: usize) -> ImageDataset {
        let source = InMemorySource::from_arrays(
            (0..n).map(|i| Array3::from_elem((4, 3, 3), i as f32 / n as f32)),
        )
        .unwrap();
        ImageDataset::new(&source, held_out, &mut StdRng::seed_from_u64(11)).unwrap()
    }

    #[test]
    fn batches_keep_index_order_and_partial_tail() {
        let ds = dataset(10, 0);
        let mut loader = DataLoader::new(&ds, &[9, 8, 7, 6, 5], 2).unwrap();

        assert_eq!(loader.num_batches(), 3);
        let batches: Vec<Batch> = loader.batches().collect::<PalletsResult<_>>().unwrap();
        assert_eq!(batches[0].ids, vec![9, 8]);
        assert_eq!(batches[2].ids, vec![5]);
        assert_eq!(batches[0].data.dim(), (2, 4, 3, 3));
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn drop_last_skips_partial_batch() {
        let ds = dataset(5, 0);
        let mut loader = DataLoader::new(&ds, &[0, 1, 2, 3, 4], 2)
            .unwrap()
            .with_drop_last(true);
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(loader.batches().count(), 2);
    }

    #[test]
    fn passes_are_restartable() {
        let ds = dataset(6, 2);
        let mut loader = DataLoader::train(&ds, 3).unwrap();
        let first: Vec<_> = loader.batches().map(|b| b.unwrap().ids).collect();
        let second: Vec<_> = loader.batches().map(|b| b.unwrap().ids).collect();
        assert_eq!(first, second);
        assert_eq!(first.concat().len(), 4);
    }

    #[test]
    fn shuffle_reorders_but_keeps_members() {
        let ds = dataset(50, 0);
        let all: Vec<usize> = (0..50).collect();
        let mut loader = DataLoader::new(&ds, &all, 50).unwrap().with_shuffle(3);

        let first = loader.batches().next().unwrap().unwrap().ids;
        let second = loader.batches().next().unwrap().unwrap().ids;
        assert_ne!(first, second);
        assert_eq!(
            first.iter().collect::<HashSet<_>>(),
            second.iter().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn rejects_bad_construction() {
        let ds = dataset(3, 0);
        assert!(DataLoader::new(&ds, &[0, 1], 0).is_err());
        assert!(matches!(
            DataLoader::new(&ds, &[0, 3], 1),
            Err(PalletsError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn vec_of_batches_is_a_source() {
        let mut batches = vec![Batch::from_array(Array4::zeros((2, 1, 1, 1)))];
        assert_eq!(batches.num_batches(), 1);
        assert_eq!(batches.batches().count(), 1);
        assert_eq!(batches.batches().count(), 1);
    }
}
