use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Result};
use gif::{Encoder, Frame, Repeat};
use tch::{Kind, Tensor};

/// Tiles a `[batch, c, h, w]` batch into a single `[c, H, W]` image with
/// `nrow` images per row, min-max normalized to [0, 1] over the whole batch.
pub fn make_grid(images: &Tensor, nrow: i64, padding: i64) -> Result<Tensor> {
    let (b, c, h, w) = images.size4()?;
    ensure!(b > 0 && nrow > 0, "grid needs at least one image and one column");

    let min = images.min();
    let range = (images.max() - &min).clamp_min(1e-5);
    let images = ((images - min) / range).constant_pad_nd([padding, padding, padding, padding]);

    let (hp, wp) = (h + 2 * padding, w + 2 * padding);
    let rows = (b + nrow - 1) / nrow;
    let images = if rows * nrow > b {
        // pad the last row out with black cells
        let blank = Tensor::zeros([rows * nrow - b, c, hp, wp], (Kind::Float, images.device()));
        Tensor::cat(&[images, blank], 0)
    } else {
        images
    };

    Ok(images
        .reshape([rows, nrow, c, hp, wp])
        .permute([2, 0, 3, 1, 4])
        .reshape([c, rows * hp, nrow * wp]))
}

/// Writes the snapshot grids (each `[c, h, w]` in [0, 1], all the same size)
/// as a looping GIF, one second per frame.
pub fn save_animation(frames: &[Tensor], path: &Path) -> Result<()> {
    let (h, w) = match frames.first() {
        Some(first) => {
            let (_, h, w) = first.size3()?;
            (h, w)
        }
        None => return Ok(()),
    };

    let mut file = File::create(path)?;
    let mut encoder = Encoder::new(&mut file, w as u16, h as u16, &[])?;
    encoder.set_repeat(Repeat::Infinite)?;

    let len = (3 * h * w) as usize;
    for grid in frames {
        let rgb = match grid.size3()?.0 {
            1 => grid.repeat([3, 1, 1]),
            _ => grid.shallow_clone(),
        };
        let flat = (rgb.permute_copy([1, 2, 0]).flat_view() * 255.0).to_kind(Kind::Uint8);
        let mut data = vec![0u8; len];
        flat.copy_data(&mut data, len);
        let mut frame = Frame::from_rgb(w as u16, h as u16, &data);
        frame.delay = 100;
        encoder.write_frame(&frame)?;
    }
    Ok(())
}
