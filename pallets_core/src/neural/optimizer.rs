//! Optimizers over named model parameters.

use std::collections::HashMap;

use ndarray::{ArrayD, Zip};

use super::{Model, NeuralError, Optimizer};
use crate::error::ComputeError;

fn state_for<'a>(
    states: &'a mut HashMap<String, ArrayD<f32>>,
    name: &str,
    shape: &[usize],
) -> Result<&'a mut ArrayD<f32>, NeuralError> {
    let state = states
        .entry(name.to_string())
        .or_insert_with(|| ArrayD::zeros(shape));
    if state.shape() != shape {
        return Err(NeuralError::ShapeMismatch {
            expected: state.shape().to_vec(),
            got: shape.to_vec(),
            context: format!("optimizer state for {name}"),
        });
    }
    Ok(state)
}

/// Stochastic Gradient Descent optimizer with momentum.
///
/// Implements the update rule:
/// ```text
/// velocity = momentum * velocity + (gradient + weight_decay * parameter)
/// parameter = parameter - learning_rate * velocity
/// ```
#[derive(Debug, Clone)]
pub struct Sgd {
    /// Learning rate
    pub learning_rate: f32,
    /// Momentum coefficient (0.0 = no momentum, 0.9 = strong momentum)
    pub momentum: f32,
    /// Weight decay for L2 regularization
    pub weight_decay: f32,
    velocities: HashMap<String, ArrayD<f32>>,
}

impl Sgd {
    /// Creates a new SGD optimizer.
    ///
    /// # Examples
    ///
    /// ```
    /// use pallets_core::neural::Sgd;
    ///
    /// let optimizer = Sgd::new(0.01, 0.9, 0.0001);
    /// assert_eq!(optimizer.momentum, 0.9);
    /// ```
    pub fn new(learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            velocities: HashMap::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Model) -> Result<(), ComputeError> {
        let (lr, momentum, decay) = (self.learning_rate, self.momentum, self.weight_decay);

        for mut param in model.parameters() {
            let velocity = state_for(&mut self.velocities, &param.name, param.value.shape())?;
            Zip::from(&mut param.value)
                .and(&param.grad)
                .and(velocity)
                .for_each(|w, &g, v| {
                    *v = momentum * *v + g + decay * *w;
                    *w -= lr * *v;
                });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

/// Adam optimizer (Adaptive Moment Estimation).
///
/// Implements adaptive learning rates for each parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    /// Learning rate
    pub learning_rate: f32,
    /// Exponential decay rate for first moment (typically 0.9)
    pub beta1: f32,
    /// Exponential decay rate for second moment (typically 0.999)
    pub beta2: f32,
    /// Small constant for numerical stability
    pub epsilon: f32,
    /// Weight decay
    pub weight_decay: f32,
    first_moments: HashMap<String, ArrayD<f32>>,
    second_moments: HashMap<String, ArrayD<f32>>,
    /// Number of steps taken
    t: i32,
}

impl Adam {
    /// Creates a new Adam optimizer with the usual defaults
    /// (β1 = 0.9, β2 = 0.999, ε = 1e-8, no weight decay).
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            first_moments: HashMap::new(),
            second_moments: HashMap::new(),
            t: 0,
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Model) -> Result<(), ComputeError> {
        self.t += 1;
        let (lr, beta1, beta2, eps, decay) = (
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            self.weight_decay,
        );
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for mut param in model.parameters() {
            let shape = param.value.shape().to_vec();
            let m = state_for(&mut self.first_moments, &param.name, &shape)?;
            let v = state_for(&mut self.second_moments, &param.name, &shape)?;

            Zip::from(&mut param.value)
                .and(&param.grad)
                .and(m)
                .and(v)
                .for_each(|w, &g, m, v| {
                    let g = g + decay * *w;
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *w -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::ParamMut;
    use ndarray::{array, Array1, Array4};

    /// A single scalar parameter `w` with gradient `g`.
    struct Scalar {
        w: Array1<f32>,
        g: Array1<f32>,
    }

    impl Model for Scalar {
        fn forward(&mut self, input: &Array4<f32>) -> Result<Array4<f32>, ComputeError> {
            Ok(input.clone())
        }

        fn backward(&mut self, _grad_output: &Array4<f32>) -> Result<(), ComputeError> {
            Ok(())
        }

        fn parameters(&mut self) -> Vec<ParamMut<'_>> {
            vec![ParamMut {
                name: "w".into(),
                value: self.w.view_mut().into_dyn(),
                grad: self.g.view_mut().into_dyn(),
            }]
        }

        fn num_parameters(&self) -> usize {
            1
        }

        fn set_training(&mut self, _training: bool) {}

        fn is_training(&self) -> bool {
            true
        }
    }

    #[test]
    fn sgd_moves_against_gradient() {
        let mut model = Scalar {
            w: array![1.0],
            g: array![2.0],
        };
        let mut sgd = Sgd::new(0.1, 0.0, 0.0);
        sgd.step(&mut model).unwrap();
        assert!((model.w[0] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn sgd_momentum_accumulates() {
        let mut model = Scalar {
            w: array![0.0],
            g: array![1.0],
        };
        let mut sgd = Sgd::new(1.0, 0.5, 0.0);
        sgd.step(&mut model).unwrap();
        sgd.step(&mut model).unwrap();
        // v1 = 1, v2 = 0.5 + 1 = 1.5
        assert!((model.w[0] + 2.5).abs() < 1e-6);
    }

    #[test]
    fn adam_first_step_is_learning_rate_sized() {
        let mut model = Scalar {
            w: array![0.0],
            g: array![3.0],
        };
        let mut adam = Adam::new(0.01);
        adam.step(&mut model).unwrap();
        assert!((model.w[0] + 0.01).abs() < 1e-5);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn zero_grad_clears_gradients() {
        let mut model = Scalar {
            w: array![0.0],
            g: array![3.0],
        };
        let mut adam = Adam::new(0.01);
        adam.zero_grad(&mut model);
        assert_eq!(model.g[0], 0.0);
    }
}
