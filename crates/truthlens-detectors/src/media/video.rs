//! Video frame extraction
//!
//! Animated GIFs are decoded in-process. Every other container is handed
//! to ffmpeg, which writes scaled raw RGB frames to stdout.

use super::image::side_u32;
use crate::config::MediaConfig;
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use truthlens_core::{Error, Result};

const GIF_MAGIC: [&[u8]; 2] = [b"GIF87a", b"GIF89a"];

pub(crate) fn is_gif(bytes: &[u8]) -> bool {
    GIF_MAGIC.iter().any(|magic| bytes.starts_with(magic))
}

/// Decode up to `config.frame_count` frames, each resized to `image_size`
pub async fn extract_frames(path: &Path, config: &MediaConfig) -> Result<Vec<RgbImage>> {
    let bytes = tokio::fs::read(path).await?;
    let size = config.image_size;
    let max_frames = config.frame_count;

    let frames = if is_gif(&bytes) {
        tokio::task::spawn_blocking(move || decode_gif(bytes, size, max_frames))
            .await
            .map_err(|e| Error::internal(format!("Frame decode task failed: {}", e)))??
    } else {
        extract_with_ffmpeg(&config.ffmpeg_path, path, size, max_frames).await?
    };

    if frames.is_empty() {
        return Err(Error::preprocess("No frames extracted from video"));
    }

    tracing::debug!(frames = frames.len(), "Extracted video frames");
    Ok(frames)
}

/// Decode the leading frames of an animated GIF
pub fn decode_gif(bytes: Vec<u8>, size: usize, max_frames: usize) -> Result<Vec<RgbImage>> {
    let side = side_u32(size)?;
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| Error::preprocess(format!("Failed to decode GIF: {}", e)))?;

    decoder
        .into_frames()
        .take(max_frames)
        .map(|frame| {
            let frame = frame
                .map_err(|e| Error::preprocess(format!("Failed to decode GIF frame: {}", e)))?;
            Ok(DynamicImage::ImageRgba8(frame.into_buffer())
                .resize_exact(side, side, FilterType::Triangle)
                .to_rgb8())
        })
        .collect()
}

async fn extract_with_ffmpeg(
    ffmpeg: &Path,
    input: &Path,
    size: usize,
    max_frames: usize,
) -> Result<Vec<RgbImage>> {
    let side = side_u32(size)?;
    let output = Command::new(ffmpeg)
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(input)
        .arg("-frames:v")
        .arg(max_frames.to_string())
        .arg("-vf")
        .arg(format!("scale={}:{}", side, side))
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgb24")
        .arg("pipe:1")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            Error::preprocess(format!("Failed to run {}: {}", ffmpeg.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::preprocess(format!(
            "Video decoding failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    let frame_len = size * size * 3;
    Ok(output
        .stdout
        .chunks_exact(frame_len)
        .take(max_frames)
        .filter_map(|chunk| RgbImage::from_raw(side, side, chunk.to_vec()))
        .collect())
}
