//! Screen capture for multimodal requests.
//!
//! Grabs the primary monitor, downsizes to half resolution, and encodes to
//! an inline base64 data URL - all in memory, no temp files. PNG is the
//! preferred encoding; when the result would blow past the API's inline
//! limit we re-encode as JPEG instead.

use base64::Engine;
use image::DynamicImage;
use std::io::Cursor;

/// Inline image payloads above this are rejected upstream.
const MAX_INLINE_BYTES: usize = 19 * 1024 * 1024;

const JPEG_QUALITY: u8 = 85;

/// An encoded screenshot ready to attach to a user message.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime: &'static str,
    pub data_url: String,
}

/// Capture, downscale, and encode the primary monitor.
///
/// Every failure comes back as `Err(String)`; callers degrade to a
/// text-only message - a broken capture never aborts the turn.
pub fn capture_inline_image() -> Result<InlineImage, String> {
    let start = std::time::Instant::now();
    let screenshot = capture_primary_monitor()?;
    log::info!(
        "[CAPTURE] Screen grab {}x{} in {}ms",
        screenshot.width(),
        screenshot.height(),
        start.elapsed().as_millis()
    );
    encode_inline(&screenshot, MAX_INLINE_BYTES)
}

fn capture_primary_monitor() -> Result<DynamicImage, String> {
    let monitors = xcap::Monitor::all().map_err(|e| format!("Monitor enumeration failed: {}", e))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| monitors.first())
        .ok_or("No monitor available")?;
    let rgba = monitor
        .capture_image()
        .map_err(|e| format!("Screen capture failed: {}", e))?;
    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Downscale to 50% and encode. `max_bytes` is injectable so the JPEG
/// fallback path is testable without a 19 MiB fixture.
fn encode_inline(screenshot: &DynamicImage, max_bytes: usize) -> Result<InlineImage, String> {
    let (width, height) = (screenshot.width(), screenshot.height());
    let scaled = screenshot.resize_exact(
        (width / 2).max(1),
        (height / 2).max(1),
        image::imageops::FilterType::Lanczos3,
    );

    let mut png_bytes = Vec::new();
    scaled
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {}", e))?;

    let (mime, bytes) = if png_bytes.len() > max_bytes {
        log::info!(
            "[CAPTURE] PNG {} bytes over the {} byte limit, re-encoding as JPEG",
            png_bytes.len(),
            max_bytes
        );
        // JPEG has no alpha channel.
        let rgb = scaled.to_rgb8();
        let mut jpeg_bytes = Vec::new();
        let mut cursor = Cursor::new(&mut jpeg_bytes);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|e| format!("JPEG encode failed: {}", e))?;
        ("image/jpeg", jpeg_bytes)
    } else {
        ("image/png", png_bytes)
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    log::info!(
        "[CAPTURE] Encoded {} ({} bytes raw, {} chars base64)",
        mime,
        bytes.len(),
        encoded.len()
    );
    Ok(InlineImage {
        mime,
        data_url: format!("data:{};base64,{}", mime, encoded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: u32, h: u32) -> DynamicImage {
        let img = image::RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn small_capture_encodes_as_png() {
        let img = checkerboard(64, 48);
        let inline = encode_inline(&img, MAX_INLINE_BYTES).unwrap();
        assert_eq!(inline.mime, "image/png");
        assert!(inline.data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn over_limit_falls_back_to_jpeg() {
        let img = checkerboard(64, 48);
        // Force the fallback with an absurdly small limit.
        let inline = encode_inline(&img, 16).unwrap();
        assert_eq!(inline.mime, "image/jpeg");
        assert!(inline.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn encode_halves_dimensions() {
        let img = checkerboard(64, 48);
        let inline = encode_inline(&img, MAX_INLINE_BYTES).unwrap();
        let b64 = inline.data_url.split(',').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }
}
