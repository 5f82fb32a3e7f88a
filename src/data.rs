use anyhow::{Context, Result};
use tch::{vision::dataset::Dataset, vision::mnist, Device, Tensor};

/// Spatial size the networks are built around: four stride-2 stages up from 4x4.
pub const IMG_SIZE: i64 = 64;

const MNIST_SIZE: i64 = 28;

/// The MNIST training images, served as shuffled fixed-size batches.
pub struct MnistData {
    dataset: Dataset,
}

impl MnistData {
    /// Loads the raw idx files from `dir`. There is no downloader; a missing
    /// dataset is fatal.
    pub fn load(dir: &str) -> Result<MnistData> {
        let dataset = mnist::load_dir(dir)
            .with_context(|| format!("failed to load MNIST from {dir} (expected the raw idx files)"))?;
        Ok(MnistData { dataset })
    }

    pub fn train_size(&self) -> i64 {
        self.dataset.train_images.size()[0]
    }

    /// One shuffled pass over the training set. Labels are dropped, a smaller
    /// trailing batch is dropped, and every batch is resized and normalized.
    pub fn batches(&self, batch_size: i64, device: Device) -> impl Iterator<Item = Tensor> {
        let mut iter = self.dataset.train_iter(batch_size);
        iter.shuffle().to_device(device);
        iter.map(|(images, _)| prepare_batch(&images))
    }
}

/// Reshapes flat `[n, 784]` rows in [0, 1] to `[n, 1, 64, 64]` in [-1, 1],
/// the range the generator's tanh output lives in.
pub fn prepare_batch(images: &Tensor) -> Tensor {
    let n = images.size()[0];
    let images = images
        .reshape([n, 1, MNIST_SIZE, MNIST_SIZE])
        .upsample_bilinear2d([IMG_SIZE, IMG_SIZE], false, None, None);
    (images - 0.5) / 0.5
}
