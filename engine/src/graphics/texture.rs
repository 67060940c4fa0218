//! CPU-side texture images
//!
//! Backends receive a [`TextureImage`] once through [`RenderBackend::upload_texture`] and hand
//! back a handle that entities bind at draw time.
//!
//! [`RenderBackend::upload_texture`]: super::backend::RenderBackend::upload_texture

use glam::{Vec2, Vec3};

/// Errors that can occur when building a texture
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// Width or height is zero
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyTexture { width: u32, height: u32 },
    /// Pixel buffer does not match the declared dimensions
    #[error("Expected {expected} bytes of RGBA8 data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// RGBA8 image stored row by row, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl TextureImage {
    /// Build an image from tightly packed RGBA8 bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyTexture { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-pixel image of one color
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    /// Square checkerboard with `cells` squares per side
    pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let pixels = (0..size)
            .flat_map(|y| (0..size).map(move |x| if (x / cell + y / cell) % 2 == 0 { a } else { b }))
            .collect();
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, suitable for a GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Nearest-neighbour lookup with repeat wrapping, returned as linear RGB in `[0, 1]`
    pub fn sample_nearest(&self, uv: Vec2) -> Vec3 {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        // NaN saturates to zero in the float to int cast
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let [r, g, b, _] = self.pixels[(y * self.width + x) as usize];
        Vec3::new(r as f32, g as f32, b as f32) / 255.0
    }
}
