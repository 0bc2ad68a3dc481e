//! Still image decoding and tensor conversion

use crate::loader::inference_err;
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::RgbImage;
use truthlens_core::{Error, Result};

/// Decode image bytes and resize to a square RGB frame
pub fn decode_rgb(bytes: &[u8], size: usize) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::preprocess(format!("Failed to decode image: {}", e)))?;
    let side = side_u32(size)?;
    Ok(img.resize_exact(side, side, FilterType::Triangle).to_rgb8())
}

/// Scale an RGB frame to `[0, 1]` in channel-first order
pub fn rgb_to_chw(frame: &RgbImage) -> Vec<f32> {
    let (w, h) = frame.dimensions();
    let plane = (w * h) as usize;
    let mut out = vec![0f32; plane * 3];
    for (idx, pixel) in frame.pixels().enumerate() {
        for channel in 0..3 {
            out[channel * plane + idx] = f32::from(pixel[channel]) / 255.0;
        }
    }
    out
}

/// Stack frames into a `(N, 3, H, W)` tensor
pub fn frames_to_tensor(frames: &[RgbImage], device: &Device) -> Result<Tensor> {
    let first = frames
        .first()
        .ok_or_else(|| Error::preprocess("No frames to convert"))?;
    let (w, h) = first.dimensions();

    let mut data = Vec::with_capacity(frames.len() * 3 * (w * h) as usize);
    for frame in frames {
        if frame.dimensions() != (w, h) {
            return Err(Error::preprocess("Frames have mismatched dimensions"));
        }
        data.extend(rgb_to_chw(frame));
    }

    Tensor::from_vec(data, (frames.len(), 3, h as usize, w as usize), device)
        .map_err(inference_err("Failed to create image tensor"))
}

/// Decode image bytes into a `(1, 3, size, size)` tensor
pub fn preprocess_image(bytes: &[u8], size: usize, device: &Device) -> Result<Tensor> {
    let frame = decode_rgb(bytes, size)?;
    frames_to_tensor(std::slice::from_ref(&frame), device)
}

pub(crate) fn side_u32(size: usize) -> Result<u32> {
    u32::try_from(size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| Error::config(format!("Invalid frame size: {}", size)))
}
