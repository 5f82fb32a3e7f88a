use anyhow::{ensure, Result};
use tch::{nn, nn::OptimizerConfig, no_grad, Device, Kind, Reduction, Tensor};
use tqdm::tqdm;

use crate::data::MnistData;
use crate::discriminator::Discriminator;
use crate::generator::Generator;
use crate::metrics::MetricsRecorder;
use crate::visuals::make_grid;
use crate::weights::init_weights;

const GRID_COLS: i64 = 8;
const GRID_PADDING: i64 = 2;
/// At most this many real/fake samples go into the per-interval grids.
const GRID_SAMPLES: i64 = 32;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub batch_size: i64,
    /// Latent dimension.
    pub nz: i64,
    /// Image channels.
    pub nc: i64,
    pub ngf: i64,
    pub ndf: i64,
    pub epochs: i64,
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    /// A snapshot is taken on every batch index divisible by this.
    pub log_every: i64,
    /// Size of the fixed noise batch used for snapshots.
    pub sample_count: i64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            nz: 100,
            nc: 1,
            ngf: 64,
            ndf: 64,
            epochs: 5,
            lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            log_every: 100,
            sample_count: 64,
        }
    }
}

/// Mutable bookkeeping for one training run. Loss histories get one entry per
/// batch; `snapshots` gets one fixed-noise grid per logging interval.
#[derive(Debug, Default)]
pub struct TrainingState {
    pub epoch: i64,
    /// Batch index within the current epoch.
    pub batch: i64,
    /// Step index handed to the metrics recorder.
    pub step: i64,
    pub d_losses: Vec<f64>,
    pub g_losses: Vec<f64>,
    pub snapshots: Vec<Tensor>,
}

impl TrainingState {
    pub fn new() -> TrainingState {
        TrainingState::default()
    }
}

/// Owns both networks, their optimizers, and the fixed visualization noise.
/// Each network's parameters live in their own var store and are only ever
/// written by that network's optimizer.
pub struct GanTrainer {
    cfg: TrainConfig,
    device: Device,
    g_vs: nn::VarStore,
    d_vs: nn::VarStore,
    generator: Generator,
    discriminator: Discriminator,
    opt_g: nn::Optimizer,
    opt_d: nn::Optimizer,
    fixed_noise: Tensor,
}

impl GanTrainer {
    pub fn new(cfg: TrainConfig, device: Device) -> Result<GanTrainer> {
        ensure!(cfg.nz > 0 && cfg.nc > 0 && cfg.ngf > 0 && cfg.ndf > 0,
                "network dimensions must be positive");
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(cfg.log_every > 0, "logging interval must be positive");

        let g_vs = nn::VarStore::new(device);
        let generator = Generator::new(g_vs.root(), cfg.nz, cfg.nc, cfg.ngf);
        let opt_g = nn::adam(cfg.beta1, cfg.beta2, 0.).build(&g_vs, cfg.lr)?;

        let d_vs = nn::VarStore::new(device);
        let discriminator = Discriminator::new(d_vs.root(), cfg.nc, cfg.ndf);
        let opt_d = nn::adam(cfg.beta1, cfg.beta2, 0.).build(&d_vs, cfg.lr)?;

        init_weights(&g_vs);
        init_weights(&d_vs);

        let fixed_noise = Tensor::randn([cfg.sample_count, cfg.nz, 1, 1], (Kind::Float, device));

        Ok(GanTrainer {
            cfg,
            device,
            g_vs,
            d_vs,
            generator,
            discriminator,
            opt_g,
            opt_d,
            fixed_noise,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.cfg
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    pub fn generator_vs(&self) -> &nn::VarStore {
        &self.g_vs
    }

    pub fn discriminator_vs(&self) -> &nn::VarStore {
        &self.d_vs
    }

    pub fn noise(&self, batch_size: i64) -> Tensor {
        Tensor::randn([batch_size, self.cfg.nz, 1, 1], (Kind::Float, self.device))
    }

    /// One discriminator update. The fake batch is detached before it enters
    /// the discriminator, so the generator receives no gradient from this
    /// step; the discriminator is pushed towards 1 on real and 0 on fake.
    pub fn discriminator_step(&mut self, real: &Tensor, fake: &Tensor) -> Result<f64> {
        let d_real = real.apply_t(&self.discriminator, true).reshape([-1]);
        let loss_real =
            d_real.binary_cross_entropy::<Tensor>(&Tensor::ones_like(&d_real), None, Reduction::Mean);

        let d_fake = fake.copy().detach().apply_t(&self.discriminator, true).reshape([-1]);
        let loss_fake =
            d_fake.binary_cross_entropy::<Tensor>(&Tensor::zeros_like(&d_fake), None, Reduction::Mean);

        let loss = (loss_real + loss_fake) / 2.;
        self.opt_d.backward_step(&loss);
        Ok(f64::try_from(&loss)?)
    }

    /// One generator update with the non-saturating loss: the same fake batch
    /// is scored again by the freshly updated discriminator, this time with
    /// gradients flowing back into the generator, against an all-real target.
    pub fn generator_step(&mut self, fake: &Tensor) -> Result<f64> {
        let output = fake.apply_t(&self.discriminator, true).reshape([-1]);
        let loss =
            output.binary_cross_entropy::<Tensor>(&Tensor::ones_like(&output), None, Reduction::Mean);
        self.opt_g.backward_step(&loss);
        Ok(f64::try_from(&loss)?)
    }

    /// One adversarial step on one real batch: discriminator update, then
    /// generator update, then one entry appended to each loss history.
    pub fn step(&mut self, real: &Tensor, state: &mut TrainingState) -> Result<()> {
        let noise = self.noise(real.size()[0]);
        let fake = noise.apply_t(&self.generator, true);

        let d_loss = self.discriminator_step(real, &fake)?;
        let g_loss = self.generator_step(&fake)?;

        state.d_losses.push(d_loss);
        state.g_losses.push(g_loss);
        Ok(())
    }

    /// `step` plus the periodic snapshot, advancing the batch index.
    pub fn train_batch(
        &mut self,
        real: &Tensor,
        state: &mut TrainingState,
        recorder: &mut MetricsRecorder,
    ) -> Result<()> {
        self.step(real, state)?;
        if state.batch % self.cfg.log_every == 0 {
            self.log_samples(real, state, recorder)?;
        }
        state.batch += 1;
        Ok(())
    }

    /// Runs the full epochs x batches schedule. No early stopping: a NaN loss
    /// or an exhausted device surfaces as a fatal error from tch.
    pub fn run(
        &mut self,
        data: &MnistData,
        state: &mut TrainingState,
        recorder: &mut MetricsRecorder,
    ) -> Result<()> {
        for epoch in 0..self.cfg.epochs {
            state.epoch = epoch;
            state.batch = 0;
            for real in tqdm(data.batches(self.cfg.batch_size, self.device)) {
                self.train_batch(&real, state, recorder)?;
            }
        }
        Ok(())
    }

    fn log_samples(
        &self,
        real: &Tensor,
        state: &mut TrainingState,
        recorder: &mut MetricsRecorder,
    ) -> Result<()> {
        let d_loss = state.d_losses.last().copied().unwrap_or(f64::NAN);
        let g_loss = state.g_losses.last().copied().unwrap_or(f64::NAN);
        println!(
            "Epoch [{}/{}] Batch {} Loss_D: {:.4} Loss_G: {:.4}",
            state.epoch, self.cfg.epochs, state.batch, d_loss, g_loss
        );
        recorder.add_scalar("loss_d", state.step, d_loss)?;
        recorder.add_scalar("loss_g", state.step, g_loss)?;

        let fake = no_grad(|| self.fixed_noise.apply_t(&self.generator, false));
        let n_real = real.size()[0].min(GRID_SAMPLES);
        let n_fake = fake.size()[0].min(GRID_SAMPLES);
        recorder.add_image("real", &make_grid(&real.narrow(0, 0, n_real), GRID_COLS, GRID_PADDING)?, state.step)?;
        recorder.add_image("fake", &make_grid(&fake.narrow(0, 0, n_fake), GRID_COLS, GRID_PADDING)?, state.step)?;

        state.snapshots.push(make_grid(&fake, GRID_COLS, GRID_PADDING)?);
        state.step += 1;
        Ok(())
    }
}
