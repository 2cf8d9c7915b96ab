use std::collections::HashSet;

use ndarray::Array4;
use pallets_core::data::partition;
use pallets_core::{
    train, Adam, AutoencoderConfig, Batch, CollectProgress, ComputeError, Criterion, DataLoader,
    DenseAutoencoder, ImageDataset, Loss, Model, MseLoss, NullProgress, OutputActivation,
    SyntheticConfig, SyntheticSource, Trainer, TrainingConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

struct ConstantLoss;

impl Criterion for ConstantLoss {
    fn compute(&self, predicted: &Array4<f32>, _target: &Array4<f32>) -> Result<Loss, ComputeError> {
        Ok(Loss {
            value: 1.0,
            grad: Array4::zeros(predicted.raw_dim()),
        })
    }
}

fn tiny_autoencoder(shape: (usize, usize, usize)) -> DenseAutoencoder {
    DenseAutoencoder::new(AutoencoderConfig {
        input_shape: shape,
        hidden_size: 16,
        latent_size: 4,
        output_activation: OutputActivation::Sigmoid,
        seed: 7,
    })
}

fn uniform_batches(count: usize, value: f32) -> Vec<Batch> {
    (0..count)
        .map(|_| Batch::from_array(Array4::from_elem((2, 1, 2, 2), value)))
        .collect()
}

#[test]
fn partition_of_ten_holding_out_three() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let split = partition(10, 3, &mut rng).unwrap();
        assert_eq!(split.train().len(), 7);
        assert_eq!(split.test().len(), 3);

        let all: HashSet<usize> = split.train().iter().chain(split.test()).copied().collect();
        assert_eq!(all, (0..10).collect());
    }
}

#[test]
fn partition_composition_varies_between_calls() {
    let mut rng = StdRng::seed_from_u64(1);
    let tests: HashSet<Vec<usize>> = (0..10)
        .map(|_| partition(10, 3, &mut rng).unwrap().test().to_vec())
        .collect();
    assert!(tests.len() > 1);
}

#[test]
fn partition_rejects_held_out_above_size() {
    let mut rng = StdRng::seed_from_u64(0);
    assert!(partition(3, 4, &mut rng).unwrap_err().is_invalid_argument());
}

#[test]
fn train_returns_one_loss_per_epoch() {
    let mut model = tiny_autoencoder((1, 2, 2));
    let history = train(
        &mut model,
        &MseLoss::new(),
        &mut uniform_batches(4, 0.25),
        &mut uniform_batches(2, 0.75),
        1e-3,
        3,
    )
    .unwrap();

    assert_eq!(history.train_losses.len(), 3);
    assert_eq!(history.test_losses.len(), 3);
    assert!(history
        .train_losses
        .iter()
        .chain(&history.test_losses)
        .all(|l| l.is_finite() && *l >= 0.0));
}

#[test]
fn constant_criterion_gives_constant_history() {
    let mut model = tiny_autoencoder((1, 2, 2));
    let (train_losses, test_losses) = train(
        &mut model,
        &ConstantLoss,
        &mut uniform_batches(3, 0.5),
        &mut uniform_batches(1, 0.5),
        1e-3,
        4,
    )
    .unwrap()
    .into_parts();

    assert_eq!(train_losses, vec![1.0; 4]);
    assert_eq!(test_losses, vec![1.0; 4]);
}

#[test]
fn zero_epochs_is_invalid() {
    let mut model = tiny_autoencoder((1, 2, 2));
    let err = train(
        &mut model,
        &MseLoss::new(),
        &mut uniform_batches(1, 0.5),
        &mut uniform_batches(1, 0.5),
        1e-3,
        0,
    )
    .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn progress_lines_follow_epoch_schedule() {
    let config = TrainingConfig {
        epochs: 2,
        log_every: 2,
        ..Default::default()
    };
    let mut model = tiny_autoencoder((1, 2, 2));
    let mut trainer = Trainer::new(config).with_progress(CollectProgress::new());
    trainer
        .train(
            &mut model,
            &ConstantLoss,
            &mut Adam::new(1e-3),
            &mut uniform_batches(5, 0.5),
            &mut uniform_batches(1, 0.5),
        )
        .unwrap();

    // batches 0, 2 and 4, then the epoch summary and the test pass
    let lines = trainer.progress().lines();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "epoch 1 (  0%) loss: 0.500000");
    assert_eq!(lines[1], "epoch 1 ( 40%) loss: 0.500000");
    assert_eq!(lines[2], "epoch 1 ( 80%) loss: 0.500000");
    assert_eq!(lines[3], "epoch 1 (100%) loss: 0.500000");
    assert_eq!(lines[4], "epoch 1 (test) loss: 0.500000");
    assert!(lines[5].starts_with("epoch 2 (  0%)"));
    assert!(model.is_training());
}

#[test]
fn autoencoder_learns_synthetic_images() {
    let source = SyntheticSource::new(SyntheticConfig {
        size: 48,
        shape: (4, 4, 4),
        palette_size: 4,
        seed: 3,
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let dataset = ImageDataset::new(&source, 8, &mut rng).unwrap();

    let mut train_loader = DataLoader::train(&dataset, 8).unwrap().with_shuffle(11);
    let mut test_loader = DataLoader::test(&dataset, 8).unwrap();

    let mut model = tiny_autoencoder((4, 4, 4));
    let config = TrainingConfig {
        epochs: 8,
        learning_rate: 1e-2,
        ..Default::default()
    };
    let history = Trainer::new(config)
        .with_progress(NullProgress)
        .train(
            &mut model,
            &MseLoss::new(),
            &mut Adam::new(1e-2),
            &mut train_loader,
            &mut test_loader,
        )
        .unwrap();

    assert_eq!(history.epochs(), 8);
    let first = history.train_losses[0];
    let last = history.last().unwrap();
    assert!(last.train_loss < first, "{first} -> {}", last.train_loss);
    assert!(last.test_loss.is_finite());
}
