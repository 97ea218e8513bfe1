//! Per-pixel nearest-opposite-class search
//!
//! Two algorithms produce the same encoding:
//! - `brute_force`: scans a (2r+1)² window around every output pixel.
//! - `propagation` + `resolve`: jump-flood a per-cell atlas of nearest
//!   foreground/background coordinates, then read it back per output pixel.
//!
//! Both map output pixels to source pixels and normalize distances with the
//! helpers in this module so their results can be compared directly.

pub mod brute_force;
pub mod propagation;
pub mod resolve;

pub use brute_force::DistanceFieldKernel;
pub use propagation::{FeatureAtlas, FeatureRecord};
pub use resolve::FeatureResolvePass;

use std::fmt;

/// What the resolve pass emits for each output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    /// Signed normalized distance in alpha, same formula as brute force.
    Distance,
    /// Foreground reads its nearest foreground, background its nearest
    /// background. Alpha is forced to 1.
    Fill,
    /// Background takes the color of its nearest foreground. Alpha is forced
    /// to 1.
    Bleed,
}

/// Which kernel program a generation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    BruteForce,
    JumpFlood(ResolveMode),
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [
        Kernel::BruteForce,
        Kernel::JumpFlood(ResolveMode::Distance),
        Kernel::JumpFlood(ResolveMode::Fill),
        Kernel::JumpFlood(ResolveMode::Bleed),
    ];

    /// Parse the short names used on the command line.
    pub fn from_name(name: &str) -> Option<Kernel> {
        match name {
            "brute" => Some(Kernel::BruteForce),
            "jfa" => Some(Kernel::JumpFlood(ResolveMode::Distance)),
            "fill" => Some(Kernel::JumpFlood(ResolveMode::Fill)),
            "bleed" => Some(Kernel::JumpFlood(ResolveMode::Bleed)),
            _ => None,
        }
    }

    /// The next kernel in `ALL`, wrapping around.
    pub fn next(self) -> Kernel {
        let idx = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::BruteForce => write!(f, "brute"),
            Kernel::JumpFlood(ResolveMode::Distance) => write!(f, "jfa"),
            Kernel::JumpFlood(ResolveMode::Fill) => write!(f, "fill"),
            Kernel::JumpFlood(ResolveMode::Bleed) => write!(f, "bleed"),
        }
    }
}

/// Source pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub fn new(x: u32, y: u32) -> Self {
        Coord { x, y }
    }

    /// Squared Euclidean distance.
    #[inline]
    pub fn dist2(self, other: Coord) -> u64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        (dx * dx + dy * dy) as u64
    }
}

/// Map output index `i` on an axis of length `out_len` onto the source axis.
///
/// uv is taken at the texel origin (`i / out_len`) and rounded to the nearest
/// source texel, so equal sizes map one to one. Integer math, matching the
/// WGSL kernels exactly.
#[inline]
pub fn source_index(i: u32, out_len: u32, src_len: u32) -> u32 {
    let mapped = (2 * i as u64 * src_len as u64 + out_len as u64) / (2 * out_len as u64);
    (mapped as u32).min(src_len.saturating_sub(1))
}

/// Encode a squared distance as alpha: `0.5 + sign * 0.5 * min(d, r) / r`
/// where sign is +1 for foreground and -1 for background.
#[inline]
pub fn signed_alpha(foreground: bool, dist2: u64, radius: u32) -> f32 {
    let r2 = radius as u64 * radius as u64;
    let magnitude = if dist2 >= r2 {
        1.0
    } else {
        (dist2 as f32).sqrt() / radius as f32
    };
    let sign = if foreground { 1.0 } else { -1.0 };
    0.5 * sign * magnitude + 0.5
}
