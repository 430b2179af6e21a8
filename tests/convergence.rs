use gradient_pool::{
    Hyperparameters, Mlp, RemainderPolicy, Topology, Trainer, TrainingConfig, WeightInit,
};
use ndarray::{Array2, array};

fn xor() -> (Array2<f32>, Array2<f32>) {
    (
        array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]],
        array![[0.], [1.], [1.], [0.]],
    )
}

#[test]
fn xor_converges() {
    let config = TrainingConfig::from_json(
        r#"{
            "topology": [2, 8, 1],
            "threads": 2,
            "seed": 7,
            "hyperparameters": { "batchSize": 4, "learningRate": 2.0, "momentum": 0.5 }
        }"#,
    )
    .unwrap();
    let mut trainer = Trainer::from_config(&config).unwrap();
    let (x, y) = xor();

    let initial = trainer.evaluate(x.view(), y.view()).unwrap();
    for _ in 0..10_000 {
        trainer.train(x.view(), y.view()).unwrap();
    }
    let loss = trainer.evaluate(x.view(), y.view()).unwrap();

    assert!(loss < initial, "loss went from {initial} to {loss}");
    assert!(loss < 0.1, "final loss {loss}");
}

#[test]
fn mini_batches_reduce_the_loss() {
    let mut trainer = Trainer::new(
        Mlp::new(),
        Hyperparameters {
            batch_size: 3,
            learning_rate: 1.,
            ..Default::default()
        },
    )
    .with_remainder_policy(RemainderPolicy::Spread);
    trainer.seed(19);
    trainer
        .initialize(Topology::new([2, 4, 1]).unwrap(), 3)
        .unwrap();

    // An OR gate, linearly separable.
    let x = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.], [0., 0.], [1., 1.]];
    let y = array![[0.], [1.], [1.], [1.], [0.], [1.]];

    let initial = trainer.evaluate(x.view(), y.view()).unwrap();
    for _ in 0..500 {
        trainer.train(x.view(), y.view()).unwrap();
    }
    let loss = trainer.evaluate(x.view(), y.view()).unwrap();

    assert!(loss < initial / 2., "loss went from {initial} to {loss}");
}

#[test]
fn result_does_not_depend_on_the_amount_of_workers() {
    let (x, y) = xor();
    let h = Hyperparameters {
        batch_size: 4,
        learning_rate: 0.5,
        ..Default::default()
    };

    let run = |threads| {
        let mut trainer = Trainer::new(Mlp::new(), h)
            .with_init(WeightInit::Uniform { low: -1., high: 1. })
            .with_remainder_policy(RemainderPolicy::Spread);
        trainer.seed(23);
        trainer
            .initialize(Topology::new([2, 3, 1]).unwrap(), threads)
            .unwrap();

        for _ in 0..5 {
            trainer.train(x.view(), y.view()).unwrap();
        }

        trainer.weights().cloned().unwrap()
    };

    let single = run(1);
    for threads in [2, 3, 4] {
        let diff = single.max_abs_diff(&run(threads));
        assert!(diff < 1e-5, "{threads} workers differ by {diff}");
    }
}

#[test]
fn dropout_still_trains() {
    let mut trainer = Trainer::new(
        Mlp::new(),
        Hyperparameters {
            batch_size: 4,
            learning_rate: 1.,
            dropout_rate: 0.2,
            ..Default::default()
        },
    );
    trainer.seed(2);
    trainer
        .initialize(Topology::new([2, 16, 1]).unwrap(), 2)
        .unwrap();
    let x = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]];
    let y = array![[0.], [1.], [1.], [1.]];

    let initial = trainer.evaluate(x.view(), y.view()).unwrap();
    for _ in 0..1000 {
        trainer.train(x.view(), y.view()).unwrap();
    }
    let loss = trainer.evaluate(x.view(), y.view()).unwrap();

    assert!(loss < initial, "loss went from {initial} to {loss}");
    assert!(trainer.weights().unwrap().is_finite());
}
