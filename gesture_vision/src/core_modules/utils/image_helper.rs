use image::{ImageEncoder, RgbaImage};
use std::io::BufWriter;
use std::path::Path;

/// Writes an RGBA raster as PNG.
pub fn save(path: impl AsRef<Path>, image: &RgbaImage) -> Result<(), crate::error::DetectionError> {
    let output = BufWriter::new(std::fs::File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgba8)?;
    Ok(())
}

/// Alpha-blends `overlay` onto `frame` in place. Both must have the same size;
/// extra pixels of the larger image are ignored.
pub fn composite(frame: &mut RgbaImage, overlay: &RgbaImage) {
    for (dst, src) in frame.pixels_mut().zip(overlay.pixels()) {
        let alpha = src.0[3] as u32;
        if alpha == 0 {
            continue;
        }
        for c in 0..3 {
            dst.0[c] = ((src.0[c] as u32 * alpha + dst.0[c] as u32 * (255 - alpha)) / 255) as u8;
        }
        dst.0[3] = 255;
    }
}
