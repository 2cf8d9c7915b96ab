//! Dense layers and activations with hand-written backpropagation.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use super::{NeuralError, ParamMut};

/// Fully connected layer: `y = x · Wᵀ + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    /// [out_features, in_features]
    pub weight: Array2<f32>,
    /// [out_features]
    pub bias: Array1<f32>,
    pub grad_weight: Array2<f32>,
    pub grad_bias: Array1<f32>,
    input: Option<Array2<f32>>,
}

impl Linear {
    /// Uniform initialization in `±1/sqrt(in_features)`.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let scale = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * scale
        });
        let bias = Array1::from_shape_fn(out_features, |_| (rng.gen::<f32>() - 0.5) * 2.0 * scale);

        Self {
            grad_weight: Array2::zeros(weight.dim()),
            grad_bias: Array1::zeros(bias.dim()),
            weight,
            bias,
            input: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.dim().1
    }

    pub fn out_features(&self) -> usize {
        self.weight.dim().0
    }

    fn forward(&mut self, input: Array2<f32>, training: bool) -> Result<Array2<f32>, NeuralError> {
        if input.dim().1 != self.in_features() {
            return Err(NeuralError::ShapeMismatch {
                expected: vec![input.dim().0, self.in_features()],
                got: vec![input.dim().0, input.dim().1],
                context: "Linear::forward".into(),
            });
        }

        let output = input.dot(&self.weight.t()) + &self.bias;
        self.input = training.then_some(input);
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Result<Array2<f32>, NeuralError> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| NeuralError::MissingForwardCache {
                layer: "Linear".into(),
            })?;

        self.grad_weight += &grad_output.t().dot(input);
        self.grad_bias += &grad_output.sum_axis(Axis(0));
        Ok(grad_output.dot(&self.weight))
    }

    fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

/// One step of a sequential stack.
#[derive(Debug, Clone)]
pub enum Layer {
    Linear(Linear),
    /// Caches the positive mask of its input
    Relu(Option<Array2<f32>>),
    /// Caches its output
    Sigmoid(Option<Array2<f32>>),
}

impl Layer {
    pub fn forward(&mut self, input: Array2<f32>, training: bool) -> Result<Array2<f32>, NeuralError> {
        match self {
            Layer::Linear(linear) => linear.forward(input, training),
            Layer::Relu(cache) => {
                if training {
                    *cache = Some(input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }));
                }
                Ok(input.mapv(|v| v.max(0.0)))
            }
            Layer::Sigmoid(cache) => {
                let output = input.mapv(|v| 1.0 / (1.0 + (-v).exp()));
                if training {
                    *cache = Some(output.clone());
                }
                Ok(output)
            }
        }
    }

    pub fn backward(&mut self, grad_output: &Array2<f32>) -> Result<Array2<f32>, NeuralError> {
        match self {
            Layer::Linear(linear) => linear.backward(grad_output),
            Layer::Relu(cache) => {
                let mask = cache.as_ref().ok_or_else(|| NeuralError::MissingForwardCache {
                    layer: "Relu".into(),
                })?;
                Ok(grad_output * mask)
            }
            Layer::Sigmoid(cache) => {
                let output = cache.as_ref().ok_or_else(|| NeuralError::MissingForwardCache {
                    layer: "Sigmoid".into(),
                })?;
                Ok(grad_output * &output.mapv(|s| s * (1.0 - s)))
            }
        }
    }

    /// Drops cached activations.
    pub fn clear_cache(&mut self) {
        match self {
            Layer::Linear(linear) => linear.input = None,
            Layer::Relu(cache) | Layer::Sigmoid(cache) => *cache = None,
        }
    }

    pub fn num_parameters(&self) -> usize {
        match self {
            Layer::Linear(linear) => linear.num_parameters(),
            _ => 0,
        }
    }

    /// Parameters of this layer, named `{prefix}.weight` / `{prefix}.bias`.
    pub fn parameters(&mut self, prefix: &str) -> Vec<ParamMut<'_>> {
        match self {
            Layer::Linear(Linear {
                weight,
                bias,
                grad_weight,
                grad_bias,
                ..
            }) => vec![
                ParamMut {
                    name: format!("{prefix}.weight"),
                    value: weight.view_mut().into_dyn(),
                    grad: grad_weight.view_mut().into_dyn(),
                },
                ParamMut {
                    name: format!("{prefix}.bias"),
                    value: bias.view_mut().into_dyn(),
                    grad: grad_bias.view_mut().into_dyn(),
                },
            ],
            _ => Vec::new(),
        }
    }
}
