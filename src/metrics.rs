use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tch::Tensor;

/// Fire-and-forget sink for scalars and image grids, rooted at one run
/// directory. Nothing written here is ever read back by the training loop.
pub struct MetricsRecorder {
    dir: PathBuf,
    scalars: BufWriter<File>,
}

impl MetricsRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Result<MetricsRecorder> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let mut scalars = BufWriter::new(File::create(dir.join("scalars.csv"))?);
        writeln!(scalars, "name,step,value")?;
        Ok(MetricsRecorder { dir, scalars })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn add_scalar(&mut self, name: &str, step: i64, value: f64) -> Result<()> {
        writeln!(self.scalars, "{name},{step},{value:.6}")?;
        self.scalars.flush()?;
        Ok(())
    }

    /// Saves a `[c, h, w]` grid in [0, 1] as `{name}-{step}.png`.
    pub fn add_image(&mut self, name: &str, grid: &Tensor, step: i64) -> Result<()> {
        let path = self.dir.join(format!("{name}-{step:05}.png"));
        tch::vision::image::save(&(grid * 255.0), path)?;
        Ok(())
    }
}

/// Dumps the per-batch loss histories as CSV, one row per training batch.
pub fn write_loss_history(d_losses: &[f64], g_losses: &[f64], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "batch,loss_d,loss_g")?;
    for (i, (d, g)) in d_losses.iter().zip(g_losses).enumerate() {
        writeln!(out, "{i},{d:.6},{g:.6}")?;
    }
    Ok(())
}
