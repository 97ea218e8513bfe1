//! GPU execution surface using wgpu
//!
//! Runs the brute-force and jump-flood kernels as WGSL compute shaders and
//! reads the result back into a host `Raster`.

pub mod context;
pub mod surface;

pub use context::GpuContext;
pub use surface::{GpuProgram, GpuSurface, KernelParams};
