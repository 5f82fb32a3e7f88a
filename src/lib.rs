pub mod data;
pub mod discriminator;
pub mod generator;
pub mod metrics;
pub mod train;
pub mod visuals;
pub mod weights;

pub use discriminator::Discriminator;
pub use generator::Generator;
pub use train::{GanTrainer, TrainConfig, TrainingState};
