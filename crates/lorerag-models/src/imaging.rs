//! Conversions between image files, PNG bytes and candle tensors.

use anyhow::{anyhow, ensure, Context, Result};
use std::io::Cursor;
use std::path::Path;

use candle_core::{DType, Device, Tensor};

/// Per-channel mean and std used by CLIP/BLIP preprocessing.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Loads an image as a normalized `(3, size, size)` f32 tensor.
///
/// The image is scaled to cover `size x size` and center-cropped.
pub fn load_normalized(path: &Path, size: u32, device: &Device) -> Result<Tensor> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("opening image {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decoding image {}", path.display()))?
        .resize_to_fill(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();
    let side = size as usize;
    let data = img.into_raw();
    let pixels = Tensor::from_vec(data, (side, side, 3), device)?
        .permute((2, 0, 1))?;
    let mean = Tensor::new(&CLIP_MEAN, device)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&CLIP_STD, device)?.reshape((3, 1, 1))?;
    let scaled = (pixels.to_dtype(DType::F32)? / 255.)?;
    Ok(scaled.broadcast_sub(&mean)?.broadcast_div(&std)?)
}

/// Encodes a `(3, h, w)` u8 tensor as PNG.
pub fn png_from_tensor(image: &Tensor) -> Result<Vec<u8>> {
    let (channels, height, width) = image.dims3()?;
    ensure!(
        channels == 3,
        "expected an RGB tensor, got {channels} channels"
    );
    let pixels = image
        .to_device(&Device::Cpu)?
        .permute((1, 2, 0))?
        .flatten_all()?
        .to_vec1::<u8>()?;
    let buffer = image::RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
