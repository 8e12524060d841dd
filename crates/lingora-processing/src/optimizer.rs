use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;

/// Result of avatar optimization, ready for storage.
#[derive(Debug, Clone)]
pub struct OptimizedAvatar {
    pub data: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

/// File extension for a content type, used when building storage keys.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Normalizes avatars to a square WebP at a fixed edge length.
///
/// The source is scaled to cover the target square and center-cropped, so
/// every stored avatar has identical dimensions regardless of the upload's
/// aspect ratio. Optimization failure is never fatal: the caller gets the
/// validated original back and the upload proceeds.
pub struct AvatarOptimizer {
    target_edge_px: u32,
    webp_quality: f32,
}

impl AvatarOptimizer {
    pub fn new(target_edge_px: u32, webp_quality: f32) -> Self {
        Self {
            target_edge_px,
            webp_quality,
        }
    }

    pub fn optimize(&self, data: &[u8], content_type: &str) -> OptimizedAvatar {
        let start = std::time::Instant::now();

        match self.encode_square_webp(data) {
            Ok(optimized) => {
                tracing::info!(
                    input_bytes = data.len(),
                    output_bytes = optimized.data.len(),
                    edge_px = self.target_edge_px,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Avatar optimized to WebP"
                );
                optimized
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    content_type = %content_type,
                    "Avatar optimization failed, storing validated original"
                );
                OptimizedAvatar {
                    data: data.to_vec(),
                    content_type: content_type.to_string(),
                    extension: extension_for_content_type(content_type).to_string(),
                }
            }
        }
    }

    fn encode_square_webp(&self, data: &[u8]) -> Result<OptimizedAvatar, anyhow::Error> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;

        let square = img.resize_to_fill(self.target_edge_px, self.target_edge_px, FilterType::Lanczos3);

        let rgba = square.to_rgba8();
        let (width, height) = rgba.dimensions();
        let encoder = webp::Encoder::from_rgba(&rgba, width, height);
        let webp_data = encoder.encode(self.webp_quality);

        Ok(OptimizedAvatar {
            data: webp_data.to_vec(),
            content_type: "image/webp".to_string(),
            extension: "webp".to_string(),
        })
    }
}
