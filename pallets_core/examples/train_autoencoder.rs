//! Trains the dense autoencoder on synthetic punk-like images.
//!
//! Run with: cargo run --example train_autoencoder [config.toml]
//!
//! Without a config file a small run is used so the example finishes in
//! seconds. Set `RUST_LOG=debug` for more output.

use anyhow::Context;
use pallets_core::logging::{init_tracing, log_palette};
use pallets_core::{
    source_palette, Adam, DataLoader, DenseAutoencoder, ImageDataset, ImageSource, Model, MseLoss,
    PalletsConfig, SyntheticConfig, SyntheticSource, Trainer,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn small_config() -> PalletsConfig {
    let mut config = PalletsConfig::default();
    config.data.size = 512;
    config.data.held_out = 64;
    config.training.epochs = 3;
    config.training.log_every = 4;
    config
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => PalletsConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => small_config(),
    };

    let source = SyntheticSource::new(SyntheticConfig {
        size: config.data.size,
        shape: config.data.image_shape,
        seed: config.data.seed,
        ..Default::default()
    })?;

    let palette = source_palette(&source)?;
    tracing::info!(
        "Palette: {} colors over {} channels",
        palette.len(),
        palette.channels()
    );
    if let Some(path) = &config.data.palette_path {
        palette.save_json(path)?;
        log_palette(path.with_extension("jsonl"), source.size(), &palette)?;
    }

    let mut rng = StdRng::seed_from_u64(config.data.seed);
    let dataset = ImageDataset::new(&source, config.data.held_out, &mut rng)?;

    let batch_size = config.training.batch_size;
    let mut train_loader = DataLoader::train(&dataset, batch_size)?;
    if config.training.shuffle {
        train_loader = train_loader.with_shuffle(config.training.seed);
    }
    let mut test_loader = DataLoader::test(&dataset, batch_size)?;

    let mut model = DenseAutoencoder::new(config.model.clone());
    tracing::info!("Autoencoder with {} parameters", model.num_parameters());

    let mut optimizer = Adam::new(config.training.learning_rate);
    let mut trainer = Trainer::new(config.training.clone());
    let history = trainer.train(
        &mut model,
        &MseLoss::new(),
        &mut optimizer,
        &mut train_loader,
        &mut test_loader,
    )?;

    for record in history.records() {
        println!(
            "epoch {:>2}: train {:.6}  test {:.6}",
            record.epoch, record.train_loss, record.test_loss
        );
    }

    Ok(())
}
