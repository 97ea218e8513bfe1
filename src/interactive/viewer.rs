//! Preview window - source on the left, generated output on the right

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::error::{Result, SdfError};
use crate::raster::{Raster, Rgba, to_byte};
use crate::session::SdfMaker;
use crate::surface::ExecutionSurface;

/// Configuration for the preview window
#[derive(Clone)]
pub struct PreviewConfig {
    /// Size of each of the two canvases in window pixels
    pub canvas_size: (usize, usize),
    /// Checkerboard cell size behind transparent texels
    pub checker_size: usize,
    /// Window title
    pub title: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            canvas_size: (512, 512),
            checker_size: 8,
            title: "SDF Maker - Preview (ESC to exit)".to_string(),
        }
    }
}

/// Interactive preview driving an `SdfMaker`
pub struct PreviewWindow {
    config: PreviewConfig,
    window: Window,
    buffer: Vec<u32>,
}

impl PreviewWindow {
    pub fn new(config: PreviewConfig) -> Result<Self> {
        let (canvas_w, canvas_h) = config.canvas_size;

        let window = Window::new(
            &config.title,
            canvas_w * 2,
            canvas_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| SdfError::Preview(e.to_string()))?;

        let buffer = vec![0u32; canvas_w * 2 * canvas_h];

        Ok(Self { config, window, buffer })
    }

    /// Run the preview loop until the window closes
    pub fn run<S: ExecutionSurface>(&mut self, maker: &mut SdfMaker<S>) -> Result<()> {
        let (canvas_w, canvas_h) = self.config.canvas_size;
        self.window.set_target_fps(60);

        println!("=== SDF Maker Preview ===");
        println!("Controls:");
        println!("  Up/Down    - Radius +1/-1");
        println!("  [ / ]      - Output width -10%/+10% (height follows)");
        println!("  K          - Cycle kernel (brute/jfa/fill/bleed)");
        println!("  G / Space  - Generate");
        println!("  ESC        - Exit");
        println!();

        let mut dirty = true;

        while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
            let settings = maker.settings();
            let (width, radius) = (settings.width(), settings.radius());

            if self.window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
                maker.set_radius_input(&(radius + 1).to_string());
                println!("Radius: {}", maker.settings().radius());
            }
            if self.window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
                maker.set_radius_input(&radius.saturating_sub(1).to_string());
                println!("Radius: {}", maker.settings().radius());
            }

            let width_step = (width / 10).max(1);
            if self.window.is_key_pressed(Key::LeftBracket, KeyRepeat::Yes) {
                maker.set_width_input(&width.saturating_sub(width_step).to_string());
                print_size(maker);
            }
            if self.window.is_key_pressed(Key::RightBracket, KeyRepeat::Yes) {
                maker.set_width_input(&(width + width_step).to_string());
                print_size(maker);
            }

            if self.window.is_key_pressed(Key::K, KeyRepeat::No) {
                maker.set_kernel(maker.kernel().next());
                println!("Kernel: {}", maker.kernel());
            }

            if self.window.is_key_pressed(Key::G, KeyRepeat::No)
                || self.window.is_key_pressed(Key::Space, KeyRepeat::No)
            {
                match maker.generate() {
                    Ok(output) => println!("Generated {}x{}", output.width(), output.height()),
                    Err(e) => eprintln!("Generate failed: {}", e),
                }
                dirty = true;
            }

            if dirty {
                self.buffer.fill(0);
                if let Some(image) = maker.image() {
                    self.draw_canvas(0, &image.raster);
                }
                let output = maker.output();
                if output.width() > 0 && output.height() > 0 {
                    self.draw_canvas(canvas_w, output);
                }
                dirty = false;
            }

            self.window
                .update_with_buffer(&self.buffer, canvas_w * 2, canvas_h)
                .map_err(|e| SdfError::Preview(e.to_string()))?;
        }

        Ok(())
    }

    /// Letterbox `raster` into the canvas starting at column `origin_x`,
    /// composited over a checkerboard
    fn draw_canvas(&mut self, origin_x: usize, raster: &Raster) {
        let (canvas_w, canvas_h) = self.config.canvas_size;
        let stride = canvas_w * 2;
        let checker = self.config.checker_size.max(1);

        let (w, h) = (raster.width() as f32, raster.height() as f32);
        let scale = (canvas_w as f32 / w).min(canvas_h as f32 / h);
        let offset_x = 0.5 * (canvas_w as f32 - w * scale);
        let offset_y = 0.5 * (canvas_h as f32 - h * scale);

        for py in 0..canvas_h {
            let ry = (py as f32 + 0.5 - offset_y) / scale;
            if ry < 0.0 || ry >= h {
                continue;
            }
            for px in 0..canvas_w {
                let rx = (px as f32 + 0.5 - offset_x) / scale;
                if rx < 0.0 || rx >= w {
                    continue;
                }
                let texel = raster.get(rx as u32, ry as u32);
                let light = (px / checker + py / checker) % 2 == 0;
                self.buffer[py * stride + origin_x + px] = composite(texel, light);
            }
        }
    }
}

fn print_size<S: ExecutionSurface>(maker: &SdfMaker<S>) {
    let settings = maker.settings();
    println!("Output: {}x{}", settings.width(), settings.height());
}

/// Blend a straight-alpha texel over a checker cell into 0x00RRGGBB
fn composite(texel: Rgba, light: bool) -> u32 {
    let back = if light { 0.8 } else { 0.6 };
    let a = texel.a.clamp(0.0, 1.0);
    let mix = |c: f32| to_byte(c * a + back * (1.0 - a)) as u32;
    (mix(texel.r) << 16) | (mix(texel.g) << 8) | mix(texel.b)
}
