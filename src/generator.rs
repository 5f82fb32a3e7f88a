use tch::{nn, Tensor};

/// Transposed convolution (no bias) -> batch norm -> ReLU.
fn block(path: nn::Path, c_in: i64, c_out: i64, ksize: i64, stride: i64, padding: i64) -> nn::SequentialT {
    let cfg = nn::ConvTransposeConfig { stride, padding, bias: false, ..Default::default() };
    nn::seq_t()
        .add(nn::conv_transpose2d(&path / "convt", c_in, c_out, ksize, cfg))
        .add(nn::batch_norm2d(&path / "bn", c_out, Default::default()))
        .add_fn(Tensor::relu)
}

/// Maps `[batch, nz, 1, 1]` latent noise to `[batch, nc, 64, 64]` images in [-1, 1].
#[derive(Debug)]
pub struct Generator {
    net: nn::SequentialT,
}

impl Generator {
    pub fn new(path: nn::Path, nz: i64, nc: i64, ngf: i64) -> Generator {
        let net = nn::seq_t()
            // 1x1 -> 4x4
            .add(block(&path / "block_1", nz, ngf * 16, 4, 1, 0))
            // each block doubles the resolution and halves the channels
            .add(block(&path / "block_2", ngf * 16, ngf * 8, 4, 2, 1))
            .add(block(&path / "block_3", ngf * 8, ngf * 4, 4, 2, 1))
            .add(block(&path / "block_4", ngf * 4, ngf * 2, 4, 2, 1))
            // 32x32 -> 64x64, no norm on the output layer
            .add(nn::conv_transpose2d(&path / "convt_out", ngf * 2, nc, 4,
                                      nn::ConvTransposeConfig { stride: 2, padding: 1, ..Default::default() }))
            .add_fn(Tensor::tanh);
        Generator { net }
    }
}

impl nn::ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(xs, train)
    }
}
