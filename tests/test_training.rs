// End-to-end behavior of the adversarial loop on scaled-down networks:
// loss bookkeeping, gradient isolation between the two updates, snapshot
// cadence, and seeded reproducibility.

use std::path::PathBuf;

use tch::{Device, Kind, Tensor};

use dcgan_mnist::metrics::MetricsRecorder;
use dcgan_mnist::{GanTrainer, TrainConfig, TrainingState};

fn tiny_config() -> TrainConfig {
    TrainConfig { batch_size: 4, ngf: 8, ndf: 8, sample_count: 8, ..Default::default() }
}

fn tmp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("dcgan-mnist-{tag}-{}", std::process::id()))
}

// Stand-in for a prepared MNIST batch: right shape, right value range.
fn real_batch(cfg: &TrainConfig) -> Tensor {
    Tensor::randn([cfg.batch_size, cfg.nc, 64, 64], (Kind::Float, Device::Cpu)).clamp(-1.0, 1.0)
}

#[test]
fn one_batch_appends_one_loss_to_each_history() {
    tch::manual_seed(7);
    let cfg = tiny_config();
    let mut trainer = GanTrainer::new(cfg.clone(), Device::Cpu).unwrap();
    let mut state = TrainingState::new();

    trainer.step(&real_batch(&cfg), &mut state).unwrap();

    assert_eq!(state.d_losses.len(), 1);
    assert_eq!(state.g_losses.len(), 1);
    assert!(state.d_losses[0].is_finite() && state.d_losses[0] > 0.0);
    assert!(state.g_losses[0].is_finite() && state.g_losses[0] > 0.0);
}

#[test]
fn discriminator_step_sends_no_gradient_to_the_generator() {
    tch::manual_seed(11);
    let cfg = tiny_config();
    let mut trainer = GanTrainer::new(cfg.clone(), Device::Cpu).unwrap();
    let real = real_batch(&cfg);

    let noise = trainer.noise(cfg.batch_size);
    let fake = noise.apply_t(trainer.generator(), true);
    trainer.discriminator_step(&real, &fake).unwrap();

    for (name, tensor) in trainer.generator_vs().variables() {
        let grad = tensor.grad();
        assert!(
            !grad.defined() || grad.abs().max().double_value(&[]) == 0.0,
            "discriminator update leaked gradient into {name}"
        );
    }

    // The generator update against the same fake batch must reach its
    // parameters as long as the discriminator is not saturated.
    trainer.generator_step(&fake).unwrap();
    let reached = trainer.generator_vs().trainable_variables().iter().any(|tensor| {
        let grad = tensor.grad();
        grad.defined() && grad.abs().max().double_value(&[]) > 0.0
    });
    assert!(reached, "generator update produced no gradient at all");
}

#[test]
fn snapshot_cadence_follows_the_logging_interval() {
    tch::manual_seed(13);
    let cfg = tiny_config();
    let mut trainer = GanTrainer::new(cfg.clone(), Device::Cpu).unwrap();
    let mut recorder = MetricsRecorder::new(tmp_dir("cadence")).unwrap();
    let mut state = TrainingState::new();
    let real = real_batch(&cfg);

    // Batches 0..=99 log exactly once, at batch 0.
    for _ in 0..100 {
        trainer.train_batch(&real, &mut state, &mut recorder).unwrap();
    }
    assert_eq!(state.snapshots.len(), 1);
    assert_eq!(state.step, 1);
    assert_eq!(state.d_losses.len(), 100);

    // Batch 100 logs again.
    trainer.train_batch(&real, &mut state, &mut recorder).unwrap();
    assert_eq!(state.snapshots.len(), 2);
    assert_eq!(state.step, 2);
}

#[test]
fn seeded_runs_are_bit_identical() {
    let run = || {
        tch::manual_seed(42);
        let cfg = tiny_config();
        let mut trainer = GanTrainer::new(cfg.clone(), Device::Cpu).unwrap();
        let mut state = TrainingState::new();
        for _ in 0..3 {
            let real = real_batch(&cfg);
            trainer.step(&real, &mut state).unwrap();
        }
        let params: Vec<Tensor> = trainer
            .generator_vs()
            .trainable_variables()
            .iter()
            .map(|tensor| tensor.copy())
            .collect();
        (state.d_losses, state.g_losses, params)
    };

    let (d1, g1, p1) = run();
    let (d2, g2, p2) = run();

    assert_eq!(d1, d2);
    assert_eq!(g1, g2);
    assert_eq!(p1.len(), p2.len());
    for (a, b) in p1.iter().zip(&p2) {
        assert!(a.equal(b), "generator parameters diverged across seeded runs");
    }
}
