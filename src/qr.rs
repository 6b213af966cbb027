//! QR rendering for the migration URL, so an export can be scanned
//! straight into a phone authenticator.

use anyhow::{Context, Result, anyhow};
use image::{GrayImage, Luma};
use qrcode::QrCode;
use std::path::Path;

/// Pixels per QR module.
const MODULE_PX: u32 = 8;
/// Quiet-zone border in modules.
const QUIET_ZONE: u32 = 4;

/// Render `text` as a QR code and write it as a PNG file.
pub fn write_qr_png(text: &str, path: &Path) -> Result<()> {
    let png = qr_png_bytes(text)?;
    std::fs::write(path, png).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

fn qr_png_bytes(text: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(text.as_bytes()).map_err(|e| anyhow!("QR encode error: {e}"))?;

    let width = code.width() as u32;
    let matrix = code.to_colors();
    let img_size = (width + QUIET_ZONE * 2) * MODULE_PX;
    let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));

    for y in 0..width {
        for x in 0..width {
            if matrix[(y * width + x) as usize] == qrcode::Color::Dark {
                let px_x = (x + QUIET_ZONE) * MODULE_PX;
                let px_y = (y + QUIET_ZONE) * MODULE_PX;
                for dy in 0..MODULE_PX {
                    for dx in 0..MODULE_PX {
                        img.put_pixel(px_x + dx, px_y + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img_size,
        img_size,
        image::ExtendedColorType::L8,
    )
    .map_err(|e| anyhow!("PNG encode error: {e}"))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_png_bytes() {
        let png = qr_png_bytes("otpauth-migration://offline?data=ChAKBHRlc3Q").unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.png");
        write_qr_png("hello", &path).unwrap();
        assert!(path.exists());
    }
}
