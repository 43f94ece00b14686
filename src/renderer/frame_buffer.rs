use crate::config::FrameFormat;
use crate::error::Result;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// RGBA frame buffer for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // RGBA, 4 bytes per pixel
}

impl FrameBuffer {
    /// Create new frame buffer with given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        let size = width as usize * height as usize * 4;
        Self {
            width,
            height,
            pixels: vec![0; size],
        }
    }

    /// Clear buffer with color
    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Set pixel at position
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }

    /// Get pixel at position
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x, y)?;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(pixel)
    }

    /// Alpha blend a color onto the buffer, with `coverage` scaling its alpha
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: [u8; 4], coverage: f32) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let alpha = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let inv_alpha = 1.0 - alpha;
        let bg = &mut self.pixels[idx..idx + 4];
        for c in 0..3 {
            bg[c] = (color[c] as f32 * alpha + bg[c] as f32 * inv_alpha).round() as u8;
        }
        bg[3] = 255; // Output alpha is always opaque
    }

    /// Get buffer dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get raw pixel data
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn rgb(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }

    /// Write binary PPM (alpha dropped)
    pub fn write_ppm<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "P6\n{} {}\n255\n", self.width, self.height)?;
        writer.write_all(&self.rgb())?;
        Ok(())
    }

    /// Encode the frame in the given file format
    pub fn encode(&self, format: FrameFormat) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match format {
            FrameFormat::Png => {
                PngEncoder::new(&mut bytes).write_image(
                    &self.rgb(),
                    self.width,
                    self.height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            FrameFormat::Ppm => self.write_ppm(&mut bytes)?,
        }
        Ok(bytes)
    }

    /// Save as PPM (simple image format)
    pub fn save_ppm(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_ppm(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
