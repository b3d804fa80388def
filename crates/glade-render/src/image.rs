//! Linear RGBA float images for the software device and snapshots.

use std::path::Path;

use glam::{Vec2, Vec4};

/// Errors writing an image to disk.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Row-major image, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Image {
    /// Zero sizes are clamped to one pixel.
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![fill; (width * height) as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Vec4) -> Self {
        let mut image = Self::new(width, height, Vec4::ZERO);
        for y in 0..image.height {
            for x in 0..image.width {
                image.pixels[(y * image.width + x) as usize] = f(x, y);
            }
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn fill(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Normalized coordinate of a pixel centre.
    #[inline]
    pub fn uv_of(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    /// Bilinear sample with clamp-to-edge addressing. `uv` may lie anywhere.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        if !px.is_finite() || !py.is_finite() {
            return self.get(0, 0);
        }
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let px = px.clamp(0.0, max_x);
        let py = py.clamp(0.0, max_y);

        let x0 = px.floor() as u32;
        let y0 = py.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = px - x0 as f32;
        let fy = py - y0 as f32;

        let top = self.get(x0, y0).lerp(self.get(x1, y0), fx);
        let bottom = self.get(x0, y1).lerp(self.get(x1, y1), fx);
        top.lerp(bottom, fy)
    }

    /// 8-bit RGBA, clamped to [0, 1] and sRGB-encoded.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            for c in [p.x, p.y, p.z] {
                out.push(to_u8(linear_to_srgb(c.clamp(0.0, 1.0))));
            }
            out.push(to_u8(p.w.clamp(0.0, 1.0)));
        }
        out
    }

    pub fn write_png(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        };
        let file = std::fs::File::create(path).map_err(io_err)?;
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.to_rgba8())?;
        writer.finish()?;
        log::info!(
            "Wrote {}x{} snapshot to {}",
            self.width,
            self.height,
            path.display()
        );
        Ok(())
    }
}

fn to_u8(c: f32) -> u8 {
    (c * 255.0 + 0.5) as u8
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}
