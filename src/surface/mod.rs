//! Execution surfaces: where kernel programs are compiled and dispatched
//!
//! The generator only talks to this trait. `CpuSurface` runs the kernels as
//! rayon parallel-for loops; `gpu::GpuSurface` runs the WGSL ports.

mod cpu;

pub use cpu::{CpuProgram, CpuSurface};

use crate::error::Result;
use crate::kernel::Kernel;
use crate::raster::Raster;

/// Compile/bind/dispatch interface shared by every backend.
pub trait ExecutionSurface {
    /// A kernel specialized for one radius.
    type Program;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Build `kernel` with `radius` baked in.
    fn compile(&mut self, kernel: Kernel, radius: u32) -> Result<Self::Program>;

    /// Upload the immutable source raster all passes read from.
    fn bind_source(&mut self, source: &Raster) -> Result<()>;

    /// Source dimensions the next dispatch expects; must match the bound
    /// raster or the dispatch fails.
    fn set_source_size(&mut self, width: u32, height: u32);

    /// Reallocate the output target. Prior contents are discarded.
    fn resize_target(&mut self, width: u32, height: u32) -> Result<()>;

    /// Run `program` over every cell of the target. Either the whole grid is
    /// written or nothing is.
    fn dispatch_full_grid(&mut self, program: &Self::Program) -> Result<()>;

    /// Host-visible copy of the target after the last successful dispatch.
    fn target(&self) -> &Raster;
}

/// Shared radius validation for `compile` implementations.
pub(crate) fn check_radius(radius: u32) -> Result<()> {
    if radius == 0 {
        return Err(crate::error::SdfError::KernelCompileFailure {
            radius,
            reason: "radius must be at least 1".to_string(),
        });
    }
    Ok(())
}
