use tch::{nn, Tensor};

/// Negative slope shared by every discriminator activation.
pub const LEAK: f64 = 0.2;

// tch's bare leaky_relu() fixes the slope at 0.01.
fn leaky_relu(xs: &Tensor) -> Tensor {
    xs.maximum(&(xs * LEAK))
}

/// Convolution (no bias) -> batch norm -> leaky ReLU.
fn block(path: nn::Path, c_in: i64, c_out: i64, ksize: i64, stride: i64, padding: i64) -> nn::SequentialT {
    let cfg = nn::ConvConfig { stride, padding, bias: false, ..Default::default() };
    nn::seq_t()
        .add(nn::conv2d(&path / "conv", c_in, c_out, ksize, cfg))
        .add(nn::batch_norm2d(&path / "bn", c_out, Default::default()))
        .add_fn(leaky_relu)
}

/// Maps `[batch, nc, 64, 64]` images to `[batch, 1, 1, 1]` real-probabilities.
#[derive(Debug)]
pub struct Discriminator {
    net: nn::SequentialT,
}

impl Discriminator {
    pub fn new(path: nn::Path, nc: i64, ndf: i64) -> Discriminator {
        let net = nn::seq_t()
            // 64x64 -> 32x32, no norm on the input layer
            .add(nn::conv2d(&path / "conv_in", nc, ndf, 4,
                            nn::ConvConfig { stride: 2, padding: 1, ..Default::default() }))
            .add_fn(leaky_relu)
            // each block halves the resolution and doubles the channels
            .add(block(&path / "block_1", ndf, ndf * 2, 4, 2, 1))
            .add(block(&path / "block_2", ndf * 2, ndf * 4, 4, 2, 1))
            .add(block(&path / "block_3", ndf * 4, ndf * 8, 4, 2, 1))
            // 4x4 -> 1x1
            .add(nn::conv2d(&path / "conv_out", ndf * 8, 1, 4,
                            nn::ConvConfig { stride: 2, padding: 0, ..Default::default() }))
            .add_fn(Tensor::sigmoid);
        Discriminator { net }
    }
}

impl nn::ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(xs, train)
    }
}
