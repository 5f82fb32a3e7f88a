// Shape and range contracts for the two networks, plus the weight
// initialization policy. Networks are scaled down (ngf = ndf = 8) so the
// whole file runs in seconds on CPU.

use tch::{nn, Device, Kind, Tensor};

use dcgan_mnist::weights::init_weights;
use dcgan_mnist::{Discriminator, Generator};

const NZ: i64 = 100;
const NC: i64 = 1;
const NF: i64 = 8;

#[test]
fn generator_output_shape_and_range() {
    tch::manual_seed(1);
    let vs = nn::VarStore::new(Device::Cpu);
    let generator = Generator::new(vs.root(), NZ, NC, NF);
    init_weights(&vs);

    let noise = Tensor::randn([4, NZ, 1, 1], (Kind::Float, Device::Cpu));
    let fake = noise.apply_t(&generator, true);

    assert_eq!(fake.size(), [4, NC, 64, 64]);
    assert!(fake.max().double_value(&[]) <= 1.0);
    assert!(fake.min().double_value(&[]) >= -1.0);
}

#[test]
fn discriminator_outputs_one_probability_per_sample() {
    tch::manual_seed(2);
    let vs = nn::VarStore::new(Device::Cpu);
    let discriminator = Discriminator::new(vs.root(), NC, NF);
    init_weights(&vs);

    let images = Tensor::randn([4, NC, 64, 64], (Kind::Float, Device::Cpu));
    let scores = images.apply_t(&discriminator, true).reshape([-1]);

    assert_eq!(scores.size(), [4]);
    assert!(scores.max().double_value(&[]) <= 1.0);
    assert!(scores.min().double_value(&[]) >= 0.0);
}

#[test]
fn reinitialization_preserves_shapes_but_redraws_values() {
    tch::manual_seed(3);
    let vs = nn::VarStore::new(Device::Cpu);
    let _generator = Generator::new(vs.root(), NZ, NC, NF);
    init_weights(&vs);

    let before: Vec<(String, Tensor)> = vs
        .variables()
        .into_iter()
        .map(|(name, tensor)| (name, tensor.copy()))
        .collect();

    init_weights(&vs);
    let after = vs.variables();

    for (name, old) in &before {
        let new = after.get(name).expect("variable vanished on re-init");
        assert_eq!(old.size(), new.size(), "{name} changed shape");
        if name.ends_with("weight") {
            assert!(!old.allclose(new, 1e-9, 1e-9, false), "{name} kept its values");
        }
    }
}
