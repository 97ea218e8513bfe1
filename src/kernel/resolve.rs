//! Final pass reading a converged `FeatureAtlas` back into an output raster.

use rayon::prelude::*;

use super::propagation::FeatureAtlas;
use super::{Coord, ResolveMode, signed_alpha, source_index};
use crate::raster::{Raster, Rgba};

/// Turns nearest-feature coordinates into either a distance encoding or a
/// class-directed color fill.
#[derive(Debug, Clone, Copy)]
pub struct FeatureResolvePass {
    mode: ResolveMode,
    radius: u32,
}

impl FeatureResolvePass {
    pub fn new(mode: ResolveMode, radius: u32) -> Self {
        debug_assert!(radius >= 1, "search radius must be at least 1");
        FeatureResolvePass { mode, radius }
    }

    /// Shade the output texel that reads source pixel `(x, y)`.
    pub fn shade(&self, atlas: &FeatureAtlas, source: &Raster, x: u32, y: u32) -> Rgba {
        let cell = Coord::new(x, y);
        let own = source.get(x, y);
        let base = own.is_foreground();

        match self.mode {
            ResolveMode::Distance => self.shade_distance(atlas, source, cell, base),
            ResolveMode::Fill => {
                let from = if base {
                    atlas.record(x, y).foreground
                } else {
                    atlas.record(x, y).background
                };
                source.get(from.x, from.y).with_alpha(1.0)
            }
            ResolveMode::Bleed => {
                let from = if base {
                    cell
                } else {
                    atlas.nearest_foreground(x, y).unwrap_or(cell)
                };
                source.get(from.x, from.y).with_alpha(1.0)
            }
        }
    }

    fn shade_distance(&self, atlas: &FeatureAtlas, source: &Raster, cell: Coord, base: bool) -> Rgba {
        let r2 = self.radius as u64 * self.radius as u64;
        let mut nearest_dist2 = r2;
        let mut color_from = cell;

        if base {
            // Outside the raster counts as background.
            let (w, h) = source.dimensions();
            let border = (cell.x + 1).min(cell.y + 1).min(w - cell.x).min(h - cell.y) as u64;
            nearest_dist2 = nearest_dist2.min(border * border);
            if let Some(bg) = atlas.nearest_background(cell.x, cell.y) {
                nearest_dist2 = nearest_dist2.min(cell.dist2(bg));
            }
        } else if let Some(fg) = atlas.nearest_foreground(cell.x, cell.y) {
            let d2 = cell.dist2(fg);
            if d2 < nearest_dist2 {
                nearest_dist2 = d2;
                color_from = fg;
            }
        }

        source
            .get(color_from.x, color_from.y)
            .with_alpha(signed_alpha(base, nearest_dist2, self.radius))
    }

    pub fn render(&self, atlas: &FeatureAtlas, source: &Raster, width: u32, height: u32) -> Raster {
        let mut target = Raster::new(width, height);
        self.render_into(atlas, source, &mut target);
        target
    }

    /// Full-grid pass over `target`, one rayon task per row.
    pub fn render_into(&self, atlas: &FeatureAtlas, source: &Raster, target: &mut Raster) {
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
                let sy = source_index(row as u32, out_h, src_h);
                for (col, texel) in texels.iter_mut().enumerate() {
                    let sx = source_index(col as u32, out_w, src_w);
                    *texel = self.shade(atlas, source, sx, sy);
                }
            });
    }
}
