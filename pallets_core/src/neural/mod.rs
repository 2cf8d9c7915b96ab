//! Model, criterion and optimizer capabilities used by the training loop.
//!
//! The training loop only talks to these traits. It calls them in a fixed
//! order per batch (zero gradients, forward, loss, backward, step) and never
//! looks at parameters or gradients itself, so any architecture or update
//! rule that implements them can be swapped in.
//!
//! Reference implementations are provided for the punks autoencoder:
//! [`DenseAutoencoder`], [`MseLoss`], [`Sgd`] and [`Adam`].

pub mod autoencoder;
pub mod layer;
pub mod loss;
pub mod optimizer;

pub use autoencoder::{AutoencoderConfig, DenseAutoencoder, OutputActivation};
pub use layer::{Layer, Linear};
pub use loss::MseLoss;
pub use optimizer::{Adam, Sgd};

use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, ArrayViewMutD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ComputeError;

/// Errors raised by the reference neural implementations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NeuralError {
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        context: String,
    },

    #[error("backward called without a cached forward pass in {layer}")]
    MissingForwardCache { layer: String },

    #[error("{0} received an empty tensor")]
    EmptyInput(String),
}

/// Compute device a model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            other => Err(format!("unsupported device '{other}' (available: cpu)")),
        }
    }
}

/// Mutable access to one named parameter and its accumulated gradient.
pub struct ParamMut<'a> {
    pub name: String,
    pub value: ArrayViewMutD<'a, f32>,
    pub grad: ArrayViewMutD<'a, f32>,
}

/// A differentiable map from a batch to a batch of the same shape.
pub trait Model {
    /// Runs the batch through the model. In training mode the activations
    /// needed by [`Model::backward`] are retained.
    fn forward(&mut self, input: &Array4<f32>) -> Result<Array4<f32>, ComputeError>;

    /// Accumulates parameter gradients from the gradient of the loss with
    /// respect to the last forward output.
    fn backward(&mut self, grad_output: &Array4<f32>) -> Result<(), ComputeError>;

    /// Every trainable parameter with its gradient buffer.
    fn parameters(&mut self) -> Vec<ParamMut<'_>>;

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize;

    /// Switches between training mode and evaluation mode.
    fn set_training(&mut self, training: bool);

    fn is_training(&self) -> bool;

    /// Moves parameters to `device`.
    fn to_device(&mut self, device: Device) -> Result<(), ComputeError> {
        match device {
            Device::Cpu => Ok(()),
        }
    }
}

/// Scalar loss and its gradient with respect to the prediction.
#[derive(Debug, Clone)]
pub struct Loss {
    pub value: f32,
    pub grad: Array4<f32>,
}

/// Loss function comparing a prediction with its target.
pub trait Criterion {
    fn compute(&self, predicted: &Array4<f32>, target: &Array4<f32>) -> Result<Loss, ComputeError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Parameter update rule.
pub trait Optimizer {
    /// Clears the gradients accumulated on every parameter of `model`.
    fn zero_grad(&mut self, model: &mut dyn Model) {
        for mut param in model.parameters() {
            param.grad.fill(0.0);
        }
    }

    /// Applies one update from the accumulated gradients.
    fn step(&mut self, model: &mut dyn Model) -> Result<(), ComputeError>;

    fn learning_rate(&self) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_parses_case_insensitively() {
        assert_eq!("CPU".parse::<Device>(), Ok(Device::Cpu));
        assert!("cuda".parse::<Device>().is_err());
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }
}
