//! Raster storage: straight-alpha RGBA texels in a flat row-major grid
//!
//! Every pass reads a `Raster` as immutable input and writes its result into
//! another one. Channels are normalized `f32` regardless of whether the PNG
//! carried 8- or 16-bit samples.

use crate::error::Result;

/// Alpha above this value marks a texel as foreground.
pub const FOREGROUND_THRESHOLD: f32 = 0.5;

/// RGBA color with floating point components (straight alpha)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    /// Same color, different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Rgba { a, ..self }
    }

    #[inline]
    pub fn is_foreground(&self) -> bool {
        self.a > FOREGROUND_THRESHOLD
    }
}

/// Width × height grid of texels, index = y * width + x
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    texels: Vec<Rgba>,
}

impl Raster {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Raster {
            width,
            height,
            texels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn from_texels(width: u32, height: u32, texels: Vec<Rgba>) -> Self {
        assert_eq!(
            texels.len(),
            width as usize * height as usize,
            "texel count does not match {}x{}",
            width,
            height
        );
        Raster { width, height, texels }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgba) -> Self {
        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Raster { width, height, texels }
    }

    /// Decode PNG bytes. 16-bit images keep their full precision.
    pub fn decode_png(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        let color = image.color();
        let wide = color.bytes_per_pixel() / color.channel_count() > 1;
        let (width, height) = (image.width(), image.height());

        let texels = if wide {
            image
                .to_rgba16()
                .pixels()
                .map(|p| {
                    let [r, g, b, a] = p.0.map(|c| c as f32 / 65535.0);
                    Rgba::new(r, g, b, a)
                })
                .collect()
        } else {
            image
                .to_rgba8()
                .pixels()
                .map(|p| {
                    let [r, g, b, a] = p.0.map(|c| c as f32 / 255.0);
                    Rgba::new(r, g, b, a)
                })
                .collect()
        };

        Ok(Raster { width, height, texels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texels(&self) -> &[Rgba] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Rgba] {
        &mut self.texels
    }

    /// In-bounds texel access.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.texels[y as usize * self.width as usize + x as usize]
    }

    /// Signed-coordinate fetch; anything outside the raster is transparent
    /// black, i.e. background.
    #[inline]
    pub fn fetch(&self, x: i64, y: i64) -> Rgba {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            Rgba::TRANSPARENT
        } else {
            self.get(x as u32, y as u32)
        }
    }

    /// Per-texel class mask, row-major.
    pub fn class_mask(&self) -> Vec<bool> {
        self.texels.iter().map(Rgba::is_foreground).collect()
    }

    /// Fraction of texels classed as foreground.
    pub fn foreground_coverage(&self) -> f32 {
        if self.texels.is_empty() {
            return 0.0;
        }
        let count = self.texels.iter().filter(|t| t.is_foreground()).count();
        count as f32 / self.texels.len() as f32
    }

    /// Quantize to interleaved RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|t| [to_byte(t.r), to_byte(t.g), to_byte(t.b), to_byte(t.a)])
            .collect()
    }
}

/// Convert a float value (0.0-1.0) to a byte (0-255)
#[inline]
pub fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
