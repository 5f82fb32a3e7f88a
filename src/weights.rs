use tch::{nn, no_grad, Tensor};

/// Standard deviation of the DCGAN initialization.
pub const WEIGHT_STD: f64 = 0.02;

/// Overwrites every convolution and batch-norm weight in `vs` in place with
/// draws from N(0, 0.02). Biases and batch-norm running statistics are left
/// at their defaults. Invoke once per network, right after construction.
pub fn init_weights(vs: &nn::VarStore) {
    // Sorted so a fixed seed assigns the same draws to the same tensors.
    let mut variables: Vec<(String, Tensor)> = vs.variables().into_iter().collect();
    variables.sort_by(|a, b| a.0.cmp(&b.0));
    no_grad(|| {
        for (name, mut tensor) in variables {
            if name.ends_with("weight") {
                let _ = tensor.normal_(0.0, WEIGHT_STD);
            }
        }
    });
}
