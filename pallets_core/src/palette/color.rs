//! Exact-equality color vectors.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One pixel's per-channel values.
///
/// Equality is exact: two colors are equal only when every channel holds the
/// same `f32`. Values are canonicalized on construction so that `-0.0`
/// equals `0.0` and every NaN is a single color, which keeps `Eq`, `Hash`
/// and `Ord` consistent with each other. Ordering is lexicographic over
/// channels using the IEEE total order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct ColorVector(Box<[f32]>);

fn canonical(value: f32) -> f32 {
    if value.is_nan() {
        f32::NAN
    } else if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl ColorVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into_iter().map(canonical).collect())
    }

    pub fn from_view(values: ArrayView1<'_, f32>) -> Self {
        Self(values.iter().copied().map(canonical).collect())
    }

    pub fn channels(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for ColorVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<ColorVector> for Vec<f32> {
    fn from(color: ColorVector) -> Self {
        color.0.into_vec()
    }
}

impl PartialEq for ColorVector {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for ColorVector {}

impl Hash for ColorVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in self.0.iter() {
            value.to_bits().hash(state);
        }
    }
}

impl Ord for ColorVector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for ColorVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
