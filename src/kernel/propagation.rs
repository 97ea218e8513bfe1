//! Jump-flood propagation of nearest-feature coordinates.
//!
//! Every cell tracks the nearest known foreground and background coordinate.
//! Passes run with steps 2^(k-1), ..., 2, 1 where k = ⌈log2(max(w, h))⌉,
//! followed by two refinement passes with steps 2 and 1. Each cell compares
//! its own record with the records of its 8 neighbors at distance `step`.
//! The halving passes alone can leave a cell holding a feature that is only
//! almost the nearest; the refinement passes repair those cells.
//!
//! Key properties:
//! - Records always hold in-bounds coordinates. Before a class is found the
//!   field points at the cell itself, which is recognized as "unknown"
//!   because the texel there has the other class.
//! - Two flat buffers ping-pong between passes; a pass only reads the buffer
//!   written by the previous one.

use rayon::prelude::*;

use super::Coord;
use crate::raster::Raster;

/// Nearest known feature of each class for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRecord {
    pub foreground: Coord,
    pub background: Coord,
}

impl FeatureRecord {
    /// Both fields pointing at `cell`.
    pub fn seed(cell: Coord) -> Self {
        FeatureRecord {
            foreground: cell,
            background: cell,
        }
    }

    /// GPU atlas layout: one u32 per field, x in the low 16 bits, y high.
    pub fn pack(&self) -> [u32; 2] {
        [pack_coord(self.foreground), pack_coord(self.background)]
    }

    pub fn unpack(packed: [u32; 2]) -> Self {
        FeatureRecord {
            foreground: unpack_coord(packed[0]),
            background: unpack_coord(packed[1]),
        }
    }
}

#[inline]
fn pack_coord(c: Coord) -> u32 {
    (c.x & 0xffff) | ((c.y & 0xffff) << 16)
}

#[inline]
fn unpack_coord(v: u32) -> Coord {
    Coord::new(v & 0xffff, v >> 16)
}

/// Extra passes run after the halving sequence.
const REFINEMENT_STEPS: [u32; 2] = [2, 1];

/// Converged nearest-feature records for a whole source raster.
#[derive(Debug, Clone)]
pub struct FeatureAtlas {
    width: u32,
    height: u32,
    records: Vec<FeatureRecord>,
    classes: Vec<bool>,
    passes: u32,
}

impl FeatureAtlas {
    /// Number of passes needed for a `width`×`height` grid, refinement
    /// passes included.
    pub fn pass_count(width: u32, height: u32) -> u32 {
        let halving = Self::halving_passes(width, height);
        if halving == 0 { 0 } else { halving + REFINEMENT_STEPS.len() as u32 }
    }

    /// Step sizes in execution order: halving from the largest, then the
    /// refinement steps.
    pub fn steps(width: u32, height: u32) -> impl Iterator<Item = u32> {
        let halving = Self::halving_passes(width, height);
        let refinement: &'static [u32] = if halving == 0 { &[] } else { &REFINEMENT_STEPS };
        (0..halving).rev().map(|k| 1u32 << k).chain(refinement.iter().copied())
    }

    /// ⌈log2(max(w, h))⌉, zero for grids with a single cell per axis.
    fn halving_passes(width: u32, height: u32) -> u32 {
        let n = width.max(height);
        if n <= 1 { 0 } else { 32 - (n - 1).leading_zeros() }
    }

    /// Every field self-referencing; only cells of the matching class are
    /// "known" at this point.
    pub fn seed(source: &Raster) -> Self {
        let (width, height) = source.dimensions();
        let records = (0..height)
            .flat_map(|y| (0..width).map(move |x| FeatureRecord::seed(Coord::new(x, y))))
            .collect();

        FeatureAtlas {
            width,
            height,
            records,
            classes: source.class_mask(),
            passes: 0,
        }
    }

    /// Seed and run every pass.
    pub fn build(source: &Raster) -> Self {
        let mut atlas = Self::seed(source);
        if atlas.records.is_empty() {
            return atlas;
        }
        let mut scratch = atlas.records.clone();

        for step in Self::steps(atlas.width, atlas.height) {
            atlas.propagate_into(step, &mut scratch);
            std::mem::swap(&mut atlas.records, &mut scratch);
            atlas.passes += 1;
            log::debug!("jump flood pass {} (step {})", atlas.passes, step);
        }

        atlas
    }

    /// Passes executed so far.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    #[inline]
    pub fn record(&self, x: u32, y: u32) -> FeatureRecord {
        self.records[self.index(Coord::new(x, y))]
    }

    #[inline]
    pub fn is_foreground(&self, c: Coord) -> bool {
        self.classes[self.index(c)]
    }

    /// Nearest foreground coordinate, `None` if the raster has none.
    pub fn nearest_foreground(&self, x: u32, y: u32) -> Option<Coord> {
        let c = self.record(x, y).foreground;
        self.is_foreground(c).then_some(c)
    }

    /// Nearest background coordinate, `None` if the raster has none.
    pub fn nearest_background(&self, x: u32, y: u32) -> Option<Coord> {
        let c = self.record(x, y).background;
        (!self.is_foreground(c)).then_some(c)
    }

    #[inline]
    fn index(&self, c: Coord) -> usize {
        c.y as usize * self.width as usize + c.x as usize
    }

    /// One pass: read `self.records`, write `out`.
    fn propagate_into(&self, step: u32, out: &mut [FeatureRecord]) {
        let w = self.width as usize;
        out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = self.best_of_neighbors(Coord::new(x as u32, y as u32), step as i64);
            }
        });
    }

    fn best_of_neighbors(&self, cell: Coord, step: i64) -> FeatureRecord {
        let own = self.records[self.index(cell)];
        let mut fg = Candidate::new(self, cell, own.foreground, true);
        let mut bg = Candidate::new(self, cell, own.background, false);

        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = cell.x as i64 + dx * step;
                let ny = cell.y as i64 + dy * step;
                if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
                    continue;
                }
                let neighbor = self.records[self.index(Coord::new(nx as u32, ny as u32))];
                fg.offer(self, cell, neighbor.foreground);
                bg.offer(self, cell, neighbor.background);
            }
        }

        FeatureRecord {
            foreground: fg.coord,
            background: bg.coord,
        }
    }
}

// ============================================================================
// Candidate tracking
// ============================================================================

/// Best coordinate of one class seen so far for a cell.
struct Candidate {
    class: bool,
    coord: Coord,
    dist2: u64,
}

impl Candidate {
    fn new(atlas: &FeatureAtlas, cell: Coord, start: Coord, class: bool) -> Self {
        let dist2 = if atlas.is_foreground(start) == class {
            cell.dist2(start)
        } else {
            u64::MAX
        };
        Candidate { class, coord: start, dist2 }
    }

    /// Strictly closer candidates win; ties keep the earlier one.
    #[inline]
    fn offer(&mut self, atlas: &FeatureAtlas, cell: Coord, c: Coord) {
        if atlas.is_foreground(c) != self.class {
            return;
        }
        let d2 = cell.dist2(c);
        if d2 < self.dist2 {
            self.dist2 = d2;
            self.coord = c;
        }
    }
}
