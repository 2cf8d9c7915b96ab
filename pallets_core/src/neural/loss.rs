//! Loss functions for reconstruction training.

use ndarray::{Array4, Zip};
use rayon::prelude::*;

use super::{Criterion, Loss, NeuralError};
use crate::error::ComputeError;

/// Mean squared error over every element of the batch.
///
/// ```text
/// loss = mean((predicted - target)^2)
/// grad = 2 * (predicted - target) / N
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl MseLoss {
    pub fn new() -> Self {
        Self
    }
}

impl Criterion for MseLoss {
    fn compute(&self, predicted: &Array4<f32>, target: &Array4<f32>) -> Result<Loss, ComputeError> {
        if predicted.dim() != target.dim() {
            return Err(NeuralError::ShapeMismatch {
                expected: target.shape().to_vec(),
                got: predicted.shape().to_vec(),
                context: "MseLoss".into(),
            }
            .into());
        }
        if predicted.is_empty() {
            return Err(NeuralError::EmptyInput("MseLoss".into()).into());
        }

        let n = predicted.len() as f32;
        let predicted_std = predicted.as_standard_layout();
        let target_std = target.as_standard_layout();
        let predicted_slice = predicted_std
            .as_slice()
            .expect("standard layout arrays are contiguous");
        let target_slice = target_std
            .as_slice()
            .expect("standard layout arrays are contiguous");

        let sum = predicted_slice
            .par_iter()
            .zip(target_slice.par_iter())
            .map(|(&lhs, &rhs)| {
                let diff = (lhs - rhs) as f64;
                diff * diff
            })
            .sum::<f64>();

        let mut grad = Array4::zeros(predicted.raw_dim());
        Zip::from(&mut grad)
            .and(predicted)
            .and(target)
            .for_each(|g, &p, &t| *g = 2.0 * (p - t) / n);

        Ok(Loss {
            value: (sum / n as f64) as f32,
            grad,
        })
    }

    fn name(&self) -> &str {
        "MseLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_tensors_have_zero_loss() {
        let a = Array4::from_elem((2, 4, 3, 3), 0.3);
        let loss = MseLoss.compute(&a, &a).unwrap();
        assert_eq!(loss.value, 0.0);
        assert!(loss.grad.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn mse_value_and_gradient() {
        let predicted = Array4::from_shape_vec((1, 1, 1, 2), vec![1.0, 0.0]).unwrap();
        let target = Array4::from_shape_vec((1, 1, 1, 2), vec![0.0, 0.0]).unwrap();
        let loss = MseLoss.compute(&predicted, &target).unwrap();

        assert!((loss.value - 0.5).abs() < 1e-6);
        assert!((loss.grad[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(loss.grad[[0, 0, 0, 1]], 0.0);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = Array4::<f32>::zeros((1, 1, 1, 2));
        let b = Array4::<f32>::zeros((1, 1, 2, 1));
        assert!(MseLoss.compute(&a, &b).is_err());
    }
}
