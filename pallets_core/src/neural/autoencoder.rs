//! Dense autoencoder for small fixed-size images.
//!
//! Architecture (D = channels * height * width):
//!
//! ```text
//! flatten → Linear(D, hidden) → ReLU → Linear(hidden, latent)      (encoder)
//!         → Linear(latent, hidden) → ReLU → Linear(hidden, D)
//!         → [Sigmoid] → unflatten                                  (decoder)
//! ```
//!
//! The sigmoid output suits RGBA inputs in `[0, 1]`; one-hot encoded inputs
//! use [`OutputActivation::Identity`].

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::layer::{Layer, Linear};
use super::{Model, NeuralError, ParamMut};
use crate::error::ComputeError;
use crate::image::{PUNK_HEIGHT, PUNK_WIDTH, RGBA_CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    Sigmoid,
    Identity,
}

/// Configuration for [`DenseAutoencoder`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoencoderConfig {
    /// Input image shape (channels, height, width)
    pub input_shape: (usize, usize, usize),
    /// Width of the hidden layers
    pub hidden_size: usize,
    /// Width of the bottleneck
    pub latent_size: usize,
    pub output_activation: OutputActivation,
    /// Random seed for weight initialization
    pub seed: u64,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            input_shape: (RGBA_CHANNELS, PUNK_HEIGHT, PUNK_WIDTH),
            hidden_size: 128,
            latent_size: 64,
            output_activation: OutputActivation::Sigmoid,
            seed: 42,
        }
    }
}

impl AutoencoderConfig {
    /// Configuration for one-hot inputs with `palette_size` channels.
    pub fn one_hot(palette_size: usize) -> Self {
        Self {
            input_shape: (palette_size, PUNK_HEIGHT, PUNK_WIDTH),
            output_activation: OutputActivation::Identity,
            ..Default::default()
        }
    }

    pub fn input_size(&self) -> usize {
        let (c, h, w) = self.input_shape;
        c * h * w
    }
}

pub struct DenseAutoencoder {
    config: AutoencoderConfig,
    encoder: Vec<Layer>,
    decoder: Vec<Layer>,
    training: bool,
}

impl DenseAutoencoder {
    pub fn new(config: AutoencoderConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let d = config.input_size();
        let (hidden, latent) = (config.hidden_size, config.latent_size);

        let encoder = vec![
            Layer::Linear(Linear::new(d, hidden, &mut rng)),
            Layer::Relu(None),
            Layer::Linear(Linear::new(hidden, latent, &mut rng)),
        ];

        let mut decoder = vec![
            Layer::Linear(Linear::new(latent, hidden, &mut rng)),
            Layer::Relu(None),
            Layer::Linear(Linear::new(hidden, d, &mut rng)),
        ];
        if config.output_activation == OutputActivation::Sigmoid {
            decoder.push(Layer::Sigmoid(None));
        }

        Self {
            config,
            encoder,
            decoder,
            training: true,
        }
    }

    pub fn config(&self) -> &AutoencoderConfig {
        &self.config
    }

    fn check_shape(&self, batch: &Array4<f32>, context: &str) -> Result<(), NeuralError> {
        let (n, c, h, w) = batch.dim();
        let (ec, eh, ew) = self.config.input_shape;
        if (c, h, w) != (ec, eh, ew) {
            return Err(NeuralError::ShapeMismatch {
                expected: vec![n, ec, eh, ew],
                got: vec![n, c, h, w],
                context: context.to_string(),
            });
        }
        if n == 0 {
            return Err(NeuralError::EmptyInput(context.to_string()));
        }
        Ok(())
    }

    fn flatten(batch: &Array4<f32>) -> Result<ndarray::Array2<f32>, NeuralError> {
        let (n, c, h, w) = batch.dim();
        batch
            .as_standard_layout()
            .into_owned()
            .into_shape((n, c * h * w))
            .map_err(|err| NeuralError::ShapeMismatch {
                expected: vec![n, c * h * w],
                got: vec![n, c, h, w],
                context: format!("flatten: {err}"),
            })
    }
}

impl Model for DenseAutoencoder {
    fn forward(&mut self, input: &Array4<f32>) -> Result<Array4<f32>, ComputeError> {
        self.check_shape(input, "DenseAutoencoder::forward")?;
        let (n, c, h, w) = input.dim();

        let mut x = Self::flatten(input)?;
        for layer in self.encoder.iter_mut().chain(self.decoder.iter_mut()) {
            x = layer.forward(x, self.training)?;
        }

        let output = x
            .into_shape((n, c, h, w))
            .map_err(|err| NeuralError::ShapeMismatch {
                expected: vec![n, c, h, w],
                got: vec![n, c * h * w],
                context: format!("unflatten: {err}"),
            })?;
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Array4<f32>) -> Result<(), ComputeError> {
        self.check_shape(grad_output, "DenseAutoencoder::backward")?;

        let mut grad = Self::flatten(grad_output)?;
        for layer in self
            .decoder
            .iter_mut()
            .rev()
            .chain(self.encoder.iter_mut().rev())
        {
            grad = layer.backward(&grad)?;
        }
        Ok(())
    }

    fn parameters(&mut self) -> Vec<ParamMut<'_>> {
        let encoder = self
            .encoder
            .iter_mut()
            .enumerate()
            .flat_map(|(i, layer)| layer.parameters(&format!("encoder.{i}")));
        let decoder = self
            .decoder
            .iter_mut()
            .enumerate()
            .flat_map(|(i, layer)| layer.parameters(&format!("decoder.{i}")));
        encoder.chain(decoder).collect()
    }

    fn num_parameters(&self) -> usize {
        self.encoder
            .iter()
            .chain(self.decoder.iter())
            .map(Layer::num_parameters)
            .sum()
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        if !training {
            for layer in self.encoder.iter_mut().chain(self.decoder.iter_mut()) {
                layer.clear_cache();
            }
        }
    }

    fn is_training(&self) -> bool {
        self.training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Adam, Criterion, MseLoss, Optimizer};

    fn tiny() -> DenseAutoencoder {
        DenseAutoencoder::new(AutoencoderConfig {
            input_shape: (2, 3, 3),
            hidden_size: 8,
            latent_size: 4,
            ..Default::default()
        })
    }

    #[test]
    fn output_matches_input_shape_and_range() {
        let mut model = tiny();
        let input = Array4::from_elem((5, 2, 3, 3), 0.5);
        let output = model.forward(&input).unwrap();

        assert_eq!(output.dim(), input.dim());
        assert!(output.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn parameter_count_matches_layers() {
        let model = DenseAutoencoder::new(AutoencoderConfig::default());
        let d = 4 * 24 * 24;
        let expected = (d * 128 + 128) + (128 * 64 + 64) + (64 * 128 + 128) + (128 * d + d);
        assert_eq!(model.num_parameters(), expected);
    }

    #[test]
    fn parameters_are_named_per_layer() {
        let mut model = tiny();
        let names: Vec<String> = model.parameters().into_iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "encoder.0.weight");
        assert_eq!(names[7], "decoder.2.bias");
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut model = tiny();
        let input = Array4::zeros((1, 3, 3, 3));
        assert!(model.forward(&input).is_err());
    }

    #[test]
    fn backward_requires_training_mode() {
        let mut model = tiny();
        model.set_training(false);
        let input = Array4::from_elem((1, 2, 3, 3), 0.5);
        model.forward(&input).unwrap();
        assert!(model.backward(&input).is_err());
    }

    #[test]
    fn a_few_adam_steps_reduce_reconstruction_loss() {
        let mut model = tiny();
        let criterion = MseLoss::new();
        let mut optimizer = Adam::new(1e-2);
        let input = Array4::from_shape_fn((4, 2, 3, 3), |(n, c, h, w)| {
            ((n + c * 3 + h * 5 + w * 7) % 4) as f32 / 3.0
        });

        let initial = criterion.compute(&model.forward(&input).unwrap(), &input).unwrap().value;
        for _ in 0..100 {
            optimizer.zero_grad(&mut model);
            let output = model.forward(&input).unwrap();
            let loss = criterion.compute(&output, &input).unwrap();
            model.backward(&loss.grad).unwrap();
            optimizer.step(&mut model).unwrap();
        }
        let last = criterion.compute(&model.forward(&input).unwrap(), &input).unwrap().value;

        assert!(last < initial, "loss went from {initial} to {last}");
    }
}
