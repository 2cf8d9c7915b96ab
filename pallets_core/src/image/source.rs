//! Backing stores that resolve image ids to [`Image`] values.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Image, PUNK_HEIGHT, PUNK_WIDTH, RGBA_CHANNELS};
use crate::error::{PalletsError, PalletsResult};

/// A fixed-size collection of images addressed by id in `[0, size)`.
pub trait ImageSource {
    /// Number of images the source provides
    fn size(&self) -> usize;

    /// Resolve image `id`, failing with [`PalletsError::NotFound`] when the
    /// backing resource is absent.
    fn get(&self, id: usize) -> PalletsResult<Image>;
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn get(&self, id: usize) -> PalletsResult<Image> {
        (**self).get(id)
    }
}

/// Images already decoded into memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    images: Vec<Image>,
}

impl InMemorySource {
    /// Builds a source from arrays, assigning ids by position.
    pub fn from_arrays<I>(arrays: I) -> PalletsResult<Self>
    where
        I: IntoIterator<Item = Array3<f32>>,
    {
        let images = arrays
            .into_iter()
            .enumerate()
            .map(|(id, data)| Image::new(id, data))
            .collect::<PalletsResult<Vec<_>>>()?;
        Ok(Self { images })
    }

    /// Wraps already-built images. Image `i` must carry id `i`.
    pub fn from_images(images: Vec<Image>) -> PalletsResult<Self> {
        if let Some((pos, image)) = images
            .iter()
            .enumerate()
            .find(|(pos, image)| image.id() != *pos)
        {
            return Err(PalletsError::invalid(format!(
                "image at position {pos} carries id {}",
                image.id()
            )));
        }
        Ok(Self { images })
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }
}

impl ImageSource for InMemorySource {
    fn size(&self) -> usize {
        self.images.len()
    }

    fn get(&self, id: usize) -> PalletsResult<Image> {
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| PalletsError::NotFound {
                id,
                reason: format!("source holds {} images", self.images.len()),
            })
    }
}

/// Configuration for [`SyntheticSource`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of images
    pub size: usize,
    /// Image dimensions (channels, height, width)
    pub shape: (usize, usize, usize),
    /// Number of distinct colors images are painted from
    pub palette_size: usize,
    /// Base seed; image `id` is drawn from `seed + id`
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            shape: (RGBA_CHANNELS, PUNK_HEIGHT, PUNK_WIDTH),
            palette_size: 32,
            seed: 42,
        }
    }
}

/// Deterministic punk-like images: a flat background with a handful of
/// rectangular patches, every color drawn from a fixed palette of 8-bit
/// levels.
///
/// Image `id` depends only on `(seed, id)`, so the same image comes back no
/// matter the order of access.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SyntheticConfig,
    colors: Vec<Vec<f32>>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> PalletsResult<Self> {
        let (channels, height, width) = config.shape;
        if channels == 0 || height == 0 || width == 0 {
            return Err(PalletsError::invalid(format!(
                "synthetic image shape {:?} has an empty dimension",
                config.shape
            )));
        }
        if config.palette_size == 0 {
            return Err(PalletsError::invalid("synthetic palette_size must be > 0"));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let colors = (0..config.palette_size)
            .map(|_| {
                (0..channels)
                    .map(|_| rng.gen_range(0u8..=255) as f32 / 255.0)
                    .collect()
            })
            .collect();

        Ok(Self { config, colors })
    }

    /// Every color an image of this source can contain.
    pub fn colors(&self) -> &[Vec<f32>] {
        &self.colors
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }
}

impl ImageSource for SyntheticSource {
    fn size(&self) -> usize {
        self.config.size
    }

    fn get(&self, id: usize) -> PalletsResult<Image> {
        if id >= self.config.size {
            return Err(PalletsError::NotFound {
                id,
                reason: format!("synthetic source has {} images", self.config.size),
            });
        }

        let (channels, height, width) = self.config.shape;
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(id as u64 + 1));

        let background = rng.gen_range(0..self.colors.len());
        let mut labels = vec![background; height * width];

        let patches = rng.gen_range(1..=4);
        for _ in 0..patches {
            let color = rng.gen_range(0..self.colors.len());
            let top = rng.gen_range(0..height);
            let left = rng.gen_range(0..width);
            let bottom = rng.gen_range(top..height) + 1;
            let right = rng.gen_range(left..width) + 1;
            for y in top..bottom {
                for x in left..right {
                    labels[y * width + x] = color;
                }
            }
        }

        let data = Array3::from_shape_fn((channels, height, width), |(c, y, x)| {
            self.colors[labels[y * width + x]][c]
        });
        Image::new(id, data)
    }
}
