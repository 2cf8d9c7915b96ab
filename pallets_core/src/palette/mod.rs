//! Palette extraction: the distinct pixel colors of one or many images.
//!
//! A [`Palette`] is kept in canonical (lexicographic) order, so two palettes
//! built from the same colors compare equal no matter which images they came
//! from or in what order those images were visited.

pub mod collector;
pub mod color;
pub mod encoding;

pub use collector::{source_palette, unique_colors, unique_colors_many, PaletteBuilder};
pub use color::ColorVector;
pub use encoding::{color_histogram, one_hot_decode, one_hot_encode};

use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{PalletsError, PalletsResult};

/// A set of distinct colors sharing one channel count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    channels: usize,
    colors: Vec<ColorVector>,
}

#[derive(Serialize, Deserialize)]
struct PaletteFile {
    channels: usize,
    colors: Vec<ColorVector>,
}

impl Palette {
    /// An empty palette for `channels`-wide colors.
    pub fn empty(channels: usize) -> Self {
        Self {
            channels,
            colors: Vec::new(),
        }
    }

    /// Builds a palette from arbitrary colors, deduplicating and sorting them.
    pub fn from_colors<I>(channels: usize, colors: I) -> PalletsResult<Self>
    where
        I: IntoIterator<Item = ColorVector>,
    {
        let mut colors: Vec<ColorVector> = colors.into_iter().collect();
        if let Some(bad) = colors.iter().find(|c| c.channels() != channels) {
            return Err(PalletsError::invalid(format!(
                "color with {} channels in a {channels}-channel palette",
                bad.channels()
            )));
        }
        colors.sort_unstable();
        colors.dedup();
        Ok(Self { channels, colors })
    }

    /// Caller guarantees `colors` is sorted, deduplicated and uniformly wide.
    pub(crate) fn from_sorted(channels: usize, colors: Vec<ColorVector>) -> Self {
        debug_assert!(colors.windows(2).all(|w| w[0] < w[1]));
        Self { channels, colors }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[ColorVector] {
        &self.colors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorVector> {
        self.colors.iter()
    }

    /// Position of `color` in canonical order.
    pub fn index_of(&self, color: &ColorVector) -> Option<usize> {
        self.colors.binary_search(color).ok()
    }

    pub fn contains(&self, color: &ColorVector) -> bool {
        self.index_of(color).is_some()
    }

    /// Union of two palettes of the same width. An empty side imposes no
    /// width, so unioning with an empty palette returns the other side.
    pub fn union(&self, other: &Palette) -> PalletsResult<Palette> {
        let mut builder = PaletteBuilder::new();
        builder.merge(self)?;
        builder.merge(other)?;
        let channels = if self.channels != 0 {
            self.channels
        } else {
            other.channels
        };
        Ok(builder.finish_or_empty(channels))
    }

    /// The palette as a `[len, channels]` matrix, one color per row.
    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.colors.len(), self.channels), |(row, channel)| {
            self.colors[row].as_slice()[channel]
        })
    }

    /// Writes the palette as pretty-printed JSON, creating parent directories.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> PalletsResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = PaletteFile {
            channels: self.channels,
            colors: self.colors.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Reads a palette written by [`Palette::save_json`]. The colors are
    /// re-canonicalized, so hand-edited files are accepted in any order.
    pub fn load_json<P: AsRef<Path>>(path: P) -> PalletsResult<Self> {
        let contents = fs::read_to_string(path)?;
        let file: PaletteFile = serde_json::from_str(&contents)?;
        Self::from_colors(file.channels, file.colors)
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a ColorVector;
    type IntoIter = std::slice::Iter<'a, ColorVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.colors.iter()
    }
}
