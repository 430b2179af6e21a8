use std::env;

use anyhow::{Context, Result};
use gradient_pool::{Hyperparameters, Topology, Trainer, TrainingConfig, WeightInit};
use log::info;
use ndarray::array;

const LOG_EVERY: usize = 500;

fn default_config() -> Result<TrainingConfig> {
    Ok(TrainingConfig {
        topology: Topology::new([2, 8, 1])?,
        threads: 2,
        epochs: 5000,
        seed: Some(7),
        init: WeightInit::XavierNormal,
        remainder: Default::default(),
        hyperparameters: Hyperparameters {
            batch_size: 4,
            learning_rate: 2.,
            momentum: 0.5,
            ..Default::default()
        },
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => TrainingConfig::from_path(&path)
            .with_context(|| format!("failed to load config from '{path}'"))?,
        None => default_config()?,
    };

    let inputs = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]];
    let targets = array![[0.], [1.], [1.], [0.]];

    let mut trainer = Trainer::from_config(&config).context("failed to start the trainer")?;
    info!(
        threads = config.threads,
        epochs = config.epochs;
        "training XOR with topology {:?}",
        config.topology.layers()
    );

    for epoch in 1..=config.epochs {
        trainer.train(inputs.view(), targets.view())?;

        if epoch % LOG_EVERY == 0 || epoch == config.epochs {
            let loss = trainer.evaluate(inputs.view(), targets.view())?;
            info!(epoch = epoch; "loss {loss:.6}");
        }
    }

    for (x, y) in inputs.rows().into_iter().zip(targets.rows()) {
        let prediction = trainer.predict(x)?;
        println!("{x} -> {:.4} (expected {})", prediction[0], y[0]);
    }

    trainer.stop();
    Ok(())
}
