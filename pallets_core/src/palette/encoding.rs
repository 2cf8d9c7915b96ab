//! One-hot encoding of images over a palette.
//!
//! Encoded images have one channel per palette color, in the palette's
//! canonical order, which is the input layout the one-hot autoencoder
//! variant trains on.

use ndarray::{Array3, ArrayView3, Axis};

use super::{ColorVector, Palette};
use crate::error::{PalletsError, PalletsResult};
use crate::image::Image;

/// Encodes `image` as a `[palette.len(), height, width]` indicator array.
pub fn one_hot_encode(image: &Image, palette: &Palette) -> PalletsResult<Array3<f32>> {
    if image.channels() != palette.channels() {
        return Err(PalletsError::invalid(format!(
            "image {} has {} channels, palette has {}",
            image.id(),
            image.channels(),
            palette.channels()
        )));
    }

    let (_, height, width) = image.shape();
    let view = image.view();
    let mut encoded = Array3::zeros((palette.len(), height, width));

    for y in 0..height {
        for x in 0..width {
            let color = ColorVector::from_view(view.slice(ndarray::s![.., y, x]));
            let index = palette.index_of(&color).ok_or_else(|| {
                PalletsError::invalid(format!(
                    "image {} pixel ({y}, {x}) color {:?} is not in the palette",
                    image.id(),
                    color.as_slice()
                ))
            })?;
            encoded[[index, y, x]] = 1.0;
        }
    }

    Ok(encoded)
}

/// Decodes a `[palette.len(), height, width]` array back to
/// `[channels, height, width]`, picking the highest-scoring palette entry
/// per pixel. Ties resolve to the lower palette index.
pub fn one_hot_decode(encoded: ArrayView3<'_, f32>, palette: &Palette) -> PalletsResult<Array3<f32>> {
    let (k, height, width) = encoded.dim();
    if palette.is_empty() {
        return Err(PalletsError::invalid("cannot decode against an empty palette"));
    }
    if k != palette.len() {
        return Err(PalletsError::invalid(format!(
            "encoded array has {k} channels, palette has {} colors",
            palette.len()
        )));
    }

    let mut decoded = Array3::zeros((palette.channels(), height, width));
    for y in 0..height {
        for x in 0..width {
            let scores = encoded.slice(ndarray::s![.., y, x]);
            let best = scores
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best_idx, best_val), (idx, &val)| {
                    if val > best_val {
                        (idx, val)
                    } else {
                        (best_idx, best_val)
                    }
                })
                .0;
            for (channel, &value) in palette.colors()[best].as_slice().iter().enumerate() {
                decoded[[channel, y, x]] = value;
            }
        }
    }

    Ok(decoded)
}

/// Channel sums of an encoded array: how many pixels use each palette color.
pub fn color_histogram(encoded: ArrayView3<'_, f32>) -> Vec<f32> {
    encoded
        .axis_iter(Axis(0))
        .map(|plane| plane.sum())
        .collect()
}
