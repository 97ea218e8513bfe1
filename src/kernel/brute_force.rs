//! Brute-force windowed search.
//!
//! For every output pixel the (2r+1)² window around its source pixel is
//! scanned for texels of the opposite class, the window clipped to the
//! source extent. Cost is O(min(r, extent)²) per pixel, fine for small radii
//! and prohibitive for large ones; `propagation` covers those.

use rayon::prelude::*;

use super::{signed_alpha, source_index};
use crate::raster::{Raster, Rgba};

/// Single-pass distance field kernel specialized for one radius.
#[derive(Debug, Clone, Copy)]
pub struct DistanceFieldKernel {
    radius: u32,
}

impl DistanceFieldKernel {
    pub fn new(radius: u32) -> Self {
        debug_assert!(radius >= 1, "search radius must be at least 1");
        DistanceFieldKernel { radius }
    }

    /// Shade the output texel that reads source pixel `(x, y)`.
    ///
    /// Only a background pixel remembers the offset of its nearest opposite
    /// texel, so background picks up the nearest foreground color while
    /// foreground always keeps its own.
    ///
    /// The window never reaches further than the source extent: past it
    /// every texel is background, and the nearest opposite texel of any
    /// pixel lies within that distance. Distances are still normalized by
    /// the full radius.
    pub fn shade(&self, source: &Raster, x: i64, y: i64) -> Rgba {
        let (w, h) = source.dimensions();
        let reach = (self.radius as i64).min(w.max(h) as i64);
        let base = source.fetch(x, y).is_foreground();

        let mut nearest_dist2 = self.radius as u64 * self.radius as u64;
        let mut nearest_offset = (0i64, 0i64);

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if source.fetch(x + dx, y + dy).is_foreground() == base {
                    continue;
                }
                let d2 = (dx * dx + dy * dy) as u64;
                if d2 < nearest_dist2 {
                    nearest_dist2 = d2;
                    if !base {
                        nearest_offset = (dx, dy);
                    }
                }
            }
        }

        let color = source.fetch(x + nearest_offset.0, y + nearest_offset.1);
        color.with_alpha(signed_alpha(base, nearest_dist2, self.radius))
    }

    /// Render into a freshly allocated `width`×`height` raster.
    pub fn render(&self, source: &Raster, width: u32, height: u32) -> Raster {
        let mut target = Raster::new(width, height);
        self.render_into(source, &mut target);
        target
    }

    /// Full-grid pass over `target`, one rayon task per row.
    pub fn render_into(&self, source: &Raster, target: &mut Raster) {
        let (out_w, out_h) = target.dimensions();
        let (src_w, src_h) = source.dimensions();
        if out_w == 0 || out_h == 0 {
            return;
        }

        target
            .texels_mut()
            .par_chunks_mut(out_w as usize)
            .enumerate()
            .for_each(|(row, texels)| {
                let sy = source_index(row as u32, out_h, src_h) as i64;
                for (col, texel) in texels.iter_mut().enumerate() {
                    let sx = source_index(col as u32, out_w, src_w) as i64;
                    *texel = self.shade(source, sx, sy);
                }
            });
    }
}
