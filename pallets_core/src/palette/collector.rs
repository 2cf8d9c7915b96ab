//! Color collection for single images and streaming aggregation over many.

use std::collections::BTreeSet;

use ndarray::Axis;

use super::{ColorVector, Palette};
use crate::error::{PalletsError, PalletsResult};
use crate::image::{Image, ImageSource};

/// Distinct colors of one image, in canonical order.
///
/// The `[channels, height, width]` image is read as `height * width` color
/// vectors (one per pixel, all channels of that pixel) which are sorted and
/// deduplicated, so the cost is `O(P log P)` in the pixel count.
///
/// # Examples
///
/// ```
/// use ndarray::Array3;
/// use pallets_core::{unique_colors, Image};
///
/// let mut data = Array3::zeros((4, 2, 2));
/// data[[0, 1, 1]] = 1.0;
/// let image = Image::new(0, data).unwrap();
///
/// let palette = unique_colors(&image);
/// assert_eq!(palette.len(), 2);
/// ```
pub fn unique_colors(image: &Image) -> Palette {
    let view = image.view();
    let mut colors: Vec<ColorVector> = view
        .lanes(Axis(0))
        .into_iter()
        .map(ColorVector::from_view)
        .collect();
    colors.sort_unstable();
    colors.dedup();
    Palette::from_sorted(image.channels(), colors)
}

/// Distinct colors across many images.
///
/// Images are folded into a [`PaletteBuilder`] one at a time, so memory is
/// bounded by the number of distinct colors rather than the number of raw
/// pixels. Fails with [`PalletsError::InvalidArgument`] when images disagree
/// on channel count. An empty input yields an empty zero-channel palette.
pub fn unique_colors_many<'a, I>(images: I) -> PalletsResult<Palette>
where
    I: IntoIterator<Item = &'a Image>,
{
    let mut builder = PaletteBuilder::new();
    for image in images {
        builder.add_image(image)?;
    }
    Ok(builder.finish())
}

/// Palette of every image in `source`, resolving images one at a time.
pub fn source_palette<S: ImageSource + ?Sized>(source: &S) -> PalletsResult<Palette> {
    let mut builder = PaletteBuilder::new();
    for id in 0..source.size() {
        let image = source.get(id)?;
        builder.add_image(&image)?;
    }
    let palette = builder.finish();
    tracing::info!(
        "Collected {} distinct colors from {} images",
        palette.len(),
        source.size()
    );
    Ok(palette)
}

/// Incremental union of palettes.
///
/// Adding an image, merging a palette built elsewhere, or adding the same
/// image twice all produce the same set, which is what makes split-then-
/// aggregate strategies agree with a single pass.
#[derive(Debug, Default, Clone)]
pub struct PaletteBuilder {
    channels: Option<usize>,
    colors: BTreeSet<ColorVector>,
    images_seen: usize,
}

impl PaletteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_channels(&mut self, channels: usize) -> PalletsResult<()> {
        match self.channels {
            Some(expected) if expected != channels => Err(PalletsError::invalid(format!(
                "expected {expected}-channel colors, got {channels}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.channels = Some(channels);
                Ok(())
            }
        }
    }

    /// Adds the colors of one image.
    pub fn add_image(&mut self, image: &Image) -> PalletsResult<()> {
        self.check_channels(image.channels())?;
        // Deduplicate within the image first so the set only sees each
        // image's distinct colors.
        let palette = unique_colors(image);
        self.colors.extend(palette.colors);
        self.images_seen += 1;
        Ok(())
    }

    /// Adds every color of `palette`. An empty palette adds nothing and
    /// places no constraint on the channel count.
    pub fn merge(&mut self, palette: &Palette) -> PalletsResult<()> {
        if palette.is_empty() {
            return Ok(());
        }
        self.check_channels(palette.channels())?;
        self.colors.extend(palette.iter().cloned());
        Ok(())
    }

    /// Distinct colors collected so far.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Number of images passed to [`PaletteBuilder::add_image`].
    pub fn images_seen(&self) -> usize {
        self.images_seen
    }

    /// The collected palette; zero channels if nothing was ever added.
    pub fn finish(self) -> Palette {
        let channels = self.channels.unwrap_or(0);
        self.finish_or_empty(channels)
    }

    pub(crate) fn finish_or_empty(self, channels: usize) -> Palette {
        let channels = self.channels.unwrap_or(channels);
        Palette::from_sorted(channels, self.colors.into_iter().collect())
    }
}
