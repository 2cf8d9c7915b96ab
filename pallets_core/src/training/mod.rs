//! Reconstruction training loop.
//!
//! Each epoch is one pass over the train batches (forward, loss against the
//! batch itself, backward, optimizer step) followed by one pass over the
//! test batches in evaluation mode. Batch losses are averaged per epoch;
//! nothing is carried across epoch boundaries.

pub mod progress;

pub use progress::{CollectProgress, NullProgress, ProgressSink, TracingProgress};

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::data::BatchSource;
use crate::error::{PalletsError, PalletsResult};
use crate::logging::{log_epoch, EpochLogEntry};
use crate::neural::{Adam, Criterion, Device, Model, Optimizer};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size used when building loaders from this config
    pub batch_size: usize,
    /// Learning rate
    pub learning_rate: f32,
    /// Emit a progress line every `log_every` train batches
    pub log_every: usize,
    /// Reshuffle train batches every epoch
    pub shuffle: bool,
    /// Seed for batch shuffling
    pub seed: u64,
    pub device: Device,
    /// Optional JSON-lines file receiving one record per epoch
    pub log_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            learning_rate: 1e-3,
            log_every: 100,
            shuffle: true,
            seed: 42,
            device: Device::Cpu,
            log_path: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> PalletsResult<()> {
        if self.epochs < 1 {
            return Err(PalletsError::invalid("epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PalletsError::invalid("batch_size must be > 0"));
        }
        if self.log_every == 0 {
            return Err(PalletsError::invalid("log_every must be > 0"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PalletsError::invalid(format!(
                "learning_rate must be finite and positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// One epoch's averaged losses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    /// 1-based epoch number
    pub epoch: usize,
    pub train_loss: f32,
    pub test_loss: f32,
}

/// Per-epoch train and test losses, in epoch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub train_losses: Vec<f32>,
    pub test_losses: Vec<f32>,
}

impl LossHistory {
    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }

    pub fn records(&self) -> impl Iterator<Item = EpochLoss> + '_ {
        self.train_losses
            .iter()
            .zip(self.test_losses.iter())
            .enumerate()
            .map(|(i, (&train_loss, &test_loss))| EpochLoss {
                epoch: i + 1,
                train_loss,
                test_loss,
            })
    }

    pub fn last(&self) -> Option<EpochLoss> {
        self.records().last()
    }

    /// `(train_losses, test_losses)`
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (self.train_losses, self.test_losses)
    }

    fn push(&mut self, train_loss: f32, test_loss: f32) {
        self.train_losses.push(train_loss);
        self.test_losses.push(test_loss);
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// Training orchestrator
pub struct Trainer<P = TracingProgress> {
    pub config: TrainingConfig,
    progress: P,
}

impl Trainer<TracingProgress> {
    /// Create a new trainer reporting progress through `tracing`
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            progress: TracingProgress,
        }
    }
}

impl<P: ProgressSink> Trainer<P> {
    /// Replace the progress sink
    pub fn with_progress<Q: ProgressSink>(self, progress: Q) -> Trainer<Q> {
        Trainer {
            config: self.config,
            progress,
        }
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn into_progress(self) -> P {
        self.progress
    }

    /// Train `model` for `config.epochs` epochs.
    ///
    /// Fails with [`PalletsError::InvalidArgument`] before touching the
    /// model when the config is invalid or either batch source is empty.
    /// Model, criterion and optimizer failures abort the run and come back
    /// as [`PalletsError::Compute`] holding the original error.
    pub fn train<M, C, O>(
        &mut self,
        model: &mut M,
        criterion: &C,
        optimizer: &mut O,
        train_batches: &mut dyn BatchSource,
        test_batches: &mut dyn BatchSource,
    ) -> PalletsResult<LossHistory>
    where
        M: Model,
        C: Criterion + ?Sized,
        O: Optimizer + ?Sized,
    {
        self.config.validate()?;
        if train_batches.is_empty() {
            return Err(PalletsError::invalid("train batch source is empty"));
        }
        if test_batches.is_empty() {
            return Err(PalletsError::invalid("test batch source is empty"));
        }

        model
            .to_device(self.config.device)
            .map_err(PalletsError::Compute)?;

        tracing::info!("Starting training for {} epochs", self.config.epochs);
        tracing::info!("Model: {}", std::any::type_name::<M>());
        tracing::info!("Model parameters: {}", model.num_parameters());
        tracing::info!("Criterion: {}", criterion.name());
        tracing::info!(
            "Learning rate: {}, device: {}",
            optimizer.learning_rate(),
            self.config.device
        );
        tracing::info!(
            "Batches per epoch: {} train / {} test",
            train_batches.num_batches(),
            test_batches.num_batches()
        );

        let start_time = Instant::now();
        let mut history = LossHistory::default();

        for epoch in 1..=self.config.epochs {
            let epoch_start = Instant::now();

            model.set_training(true);
            let train_loss = self.train_epoch(epoch, model, criterion, optimizer, train_batches)?;

            model.set_training(false);
            let test_loss = self.test_epoch(epoch, model, criterion, test_batches);
            model.set_training(true);
            let test_loss = test_loss?;

            history.push(train_loss, test_loss);

            let elapsed = epoch_start.elapsed();
            tracing::info!(
                "Epoch {}/{}: train_loss={:.6}, test_loss={:.6}, time={:.2}s",
                epoch,
                self.config.epochs,
                train_loss,
                test_loss,
                elapsed.as_secs_f64()
            );

            if let Some(path) = &self.config.log_path {
                let entry = EpochLogEntry::new(
                    epoch,
                    train_loss,
                    test_loss,
                    train_batches.num_batches(),
                    test_batches.num_batches(),
                    elapsed.as_millis(),
                );
                if let Err(err) = log_epoch(path, &entry) {
                    tracing::warn!("Failed to write epoch log to {}: {err}", path.display());
                }
            }
        }

        tracing::info!(
            "Training complete! Total time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(history)
    }

    fn train_epoch<M, C, O>(
        &mut self,
        epoch: usize,
        model: &mut M,
        criterion: &C,
        optimizer: &mut O,
        batches: &mut dyn BatchSource,
    ) -> PalletsResult<f32>
    where
        M: Model,
        C: Criterion + ?Sized,
        O: Optimizer + ?Sized,
    {
        let num_batches = batches.num_batches().max(1);
        let log_every = self.config.log_every;
        let mut losses = Vec::with_capacity(num_batches);
        let mut last_batch_len = 1;

        for (batch_idx, batch) in batches.batches().enumerate() {
            let batch = batch?;

            optimizer.zero_grad(model);
            let reconstruction = model.forward(&batch.data).map_err(PalletsError::Compute)?;
            let loss = criterion
                .compute(&reconstruction, &batch.data)
                .map_err(PalletsError::Compute)?;
            model.backward(&loss.grad).map_err(PalletsError::Compute)?;
            optimizer.step(model).map_err(PalletsError::Compute)?;

            losses.push(loss.value);
            last_batch_len = batch.len().max(1);

            if batch_idx % log_every == 0 {
                self.progress.emit(&format!(
                    "epoch {} ({:>3}%) loss: {:.6}",
                    epoch,
                    (100 * batch_idx / num_batches).min(100),
                    mean(&losses) / last_batch_len as f32
                ));
            }
        }

        if losses.is_empty() {
            return Err(PalletsError::invalid(format!(
                "train batch source yielded no batches in epoch {epoch}"
            )));
        }

        let epoch_loss = mean(&losses);
        self.progress.emit(&format!(
            "epoch {} (100%) loss: {:.6}",
            epoch,
            epoch_loss / last_batch_len as f32
        ));
        Ok(epoch_loss)
    }

    fn test_epoch<M, C>(
        &mut self,
        epoch: usize,
        model: &mut M,
        criterion: &C,
        batches: &mut dyn BatchSource,
    ) -> PalletsResult<f32>
    where
        M: Model,
        C: Criterion + ?Sized,
    {
        let mut losses = Vec::with_capacity(batches.num_batches());
        let mut last_batch_len = 1;

        for batch in batches.batches() {
            let batch = batch?;
            let reconstruction = model.forward(&batch.data).map_err(PalletsError::Compute)?;
            let loss = criterion
                .compute(&reconstruction, &batch.data)
                .map_err(PalletsError::Compute)?;

            losses.push(loss.value);
            last_batch_len = batch.len().max(1);
        }

        if losses.is_empty() {
            return Err(PalletsError::invalid(format!(
                "test batch source yielded no batches in epoch {epoch}"
            )));
        }

        let epoch_loss = mean(&losses);
        self.progress.emit(&format!(
            "epoch {} (test) loss: {:.6}",
            epoch,
            epoch_loss / last_batch_len as f32
        ));
        Ok(epoch_loss)
    }
}

/// Trains `model` with an Adam optimizer at `learning_rate` for `epochs`
/// epochs, reporting progress through `tracing`.
///
/// Returns `(train_losses, test_losses)` as a [`LossHistory`], each holding
/// exactly `epochs` entries.
pub fn train<M, C>(
    model: &mut M,
    criterion: &C,
    train_batches: &mut dyn BatchSource,
    test_batches: &mut dyn BatchSource,
    learning_rate: f32,
    epochs: usize,
) -> PalletsResult<LossHistory>
where
    M: Model,
    C: Criterion + ?Sized,
{
    let config = TrainingConfig {
        epochs,
        learning_rate,
        ..Default::default()
    };
    let mut optimizer = Adam::new(learning_rate);
    Trainer::new(config).train(model, criterion, &mut optimizer, train_batches, test_batches)
}
