use std::path::Path;

use anyhow::Result;
use clap::Parser;
use rand::{thread_rng, Rng};
use tch::Device;

use dcgan_mnist::data::{MnistData, IMG_SIZE};
use dcgan_mnist::metrics::{write_loss_history, MetricsRecorder};
use dcgan_mnist::visuals::save_animation;
use dcgan_mnist::{GanTrainer, TrainConfig, TrainingState};

#[derive(Parser, Debug)]
#[command(version, about = "DCGAN on MNIST via tch-rs.", long_about = None)]
struct Args {
    /// Directory holding the raw MNIST idx files.
    #[arg(short, long, default_value_t = String::from("data/mnist"))]
    dataset: String,
    /// Directory the run's metrics and images are written to.
    #[arg(short, long, default_value_t = String::from("runs/dcgan-mnist"))]
    out: String,
    #[arg(long, default_value_t = 128)]
    batch_size: i64,
    #[arg(long, default_value_t = 100)]
    nz: i64,
    #[arg(long, default_value_t = 64)]
    ngf: i64,
    #[arg(long, default_value_t = 64)]
    ndf: i64,
    #[arg(short, long, default_value_t = 5)]
    epochs: i64,
    #[arg(long, default_value_t = 0.0002)]
    lr: f64,
    #[arg(long, default_value_t = 0.5)]
    beta1: f64,
    #[arg(long, default_value_t = 0.999)]
    beta2: f64,
    #[arg(long, default_value_t = 100)]
    log_every: i64,
    /// Seed for weight init, noise sampling and shuffling. Random if absent.
    #[arg(long)]
    seed: Option<i64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(|| thread_rng().gen_range(0..i64::MAX));
    tch::manual_seed(seed);

    let device = Device::cuda_if_available();
    println!("Use Device: {device:?}");
    println!("Seed: {seed}");
    println!("--------");

    println!("MNIST Dataset Dir: {}", args.dataset);
    println!("Output Dir: {}", args.out);
    println!("Image Size: {IMG_SIZE}");
    println!("Dim Latent: {}", args.nz);
    println!("Batch Size: {}", args.batch_size);
    println!("Epochs: {}", args.epochs);
    println!("Learning Rate: {}", args.lr);
    println!("Adam Betas: ({}, {})", args.beta1, args.beta2);
    println!("Log Interval: {}", args.log_every);
    println!("--------");

    println!("Loading Dataset...");
    let data = MnistData::load(&args.dataset)?;
    println!("Loaded MNIST: {} training images", data.train_size());
    println!("--------");

    let cfg = TrainConfig {
        batch_size: args.batch_size,
        nz: args.nz,
        ngf: args.ngf,
        ndf: args.ndf,
        epochs: args.epochs,
        lr: args.lr,
        beta1: args.beta1,
        beta2: args.beta2,
        log_every: args.log_every,
        ..Default::default()
    };
    let mut trainer = GanTrainer::new(cfg, device)?;
    let mut recorder = MetricsRecorder::new(&args.out)?;
    let mut state = TrainingState::new();

    println!("Starting Training");
    trainer.run(&data, &mut state, &mut recorder)?;

    let out = Path::new(&args.out);
    write_loss_history(&state.d_losses, &state.g_losses, &out.join("losses.csv"))?;
    save_animation(&state.snapshots, &out.join("progress.gif"))?;
    println!(
        "Done: {} batches, {} snapshots, artifacts in {}",
        state.d_losses.len(),
        state.snapshots.len(),
        out.display()
    );

    Ok(())
}
