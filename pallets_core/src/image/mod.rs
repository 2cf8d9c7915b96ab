//! Image values and the sources that provide them.
//!
//! An [`Image`] is a `[channels, height, width]` array of per-channel
//! intensities in `[0, 1]`, tagged with its position in the collection.

pub mod source;

pub use source::{ImageSource, InMemorySource, SyntheticConfig, SyntheticSource};

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{PalletsError, PalletsResult};

/// Number of channels in an RGBA image
pub const RGBA_CHANNELS: usize = 4;
/// Height of a punk image in pixels
pub const PUNK_HEIGHT: usize = 24;
/// Width of a punk image in pixels
pub const PUNK_WIDTH: usize = 24;
/// Total number of punks in the full collection
pub const CPUNKS_SIZE: usize = 10_000;

/// An immutable `[channels, height, width]` image.
///
/// Deserialization goes through [`Image::new`], so out-of-range values are
/// rejected the same way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ImageRecord")]
pub struct Image {
    id: usize,
    data: Array3<f32>,
}

#[derive(Deserialize)]
struct ImageRecord {
    id: usize,
    data: Array3<f32>,
}

impl TryFrom<ImageRecord> for Image {
    type Error = PalletsError;

    fn try_from(record: ImageRecord) -> Result<Self, Self::Error> {
        Image::new(record.id, record.data)
    }
}

impl Image {
    /// Wraps `data` after checking every value is finite and inside `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::Array3;
    /// use pallets_core::Image;
    ///
    /// let image = Image::new(7, Array3::from_elem((4, 24, 24), 0.5)).unwrap();
    /// assert_eq!(image.shape(), (4, 24, 24));
    /// assert_eq!(image.id(), 7);
    /// ```
    pub fn new(id: usize, data: Array3<f32>) -> PalletsResult<Self> {
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(PalletsError::invalid(format!(
                "image {id} has value {bad} outside [0, 1]"
            )));
        }
        Ok(Self { id, data })
    }

    /// Builds an image from interleaved 8-bit pixels (`RGBARGBA...` for four
    /// channels), scaling each byte by `1/255`.
    pub fn from_interleaved_u8(
        id: usize,
        channels: usize,
        height: usize,
        width: usize,
        bytes: &[u8],
    ) -> PalletsResult<Self> {
        let expected = channels * height * width;
        if bytes.len() != expected {
            return Err(PalletsError::invalid(format!(
                "image {id}: expected {expected} bytes for {channels}x{height}x{width}, got {}",
                bytes.len()
            )));
        }

        let data = Array3::from_shape_fn((channels, height, width), |(c, y, x)| {
            bytes[(y * width + x) * channels + c] as f32 / 255.0
        });
        Ok(Self { id, data })
    }

    /// Convenience for [`Image::from_interleaved_u8`] with four channels.
    pub fn from_rgba8(id: usize, height: usize, width: usize, bytes: &[u8]) -> PalletsResult<Self> {
        Self::from_interleaved_u8(id, RGBA_CHANNELS, height, width, bytes)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// `(channels, height, width)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn channels(&self) -> usize {
        self.data.dim().0
    }

    /// Number of pixels (`height * width`).
    pub fn pixel_count(&self) -> usize {
        let (_, height, width) = self.data.dim();
        height * width
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}
