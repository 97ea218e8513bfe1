//! CPU execution surface backed by the rayon thread pool

use super::{ExecutionSurface, check_radius};
use crate::error::{Result, SdfError};
use crate::kernel::{DistanceFieldKernel, FeatureAtlas, FeatureResolvePass, Kernel};
use crate::raster::Raster;

/// "Compiled" CPU kernel: the kernel choice plus its radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuProgram {
    pub kernel: Kernel,
    pub radius: u32,
}

/// Runs kernels as parallel-for loops over the target rows.
#[derive(Debug)]
pub struct CpuSurface {
    source: Option<Raster>,
    source_size: (u32, u32),
    target: Raster,
    allocations: u32,
    dispatches: u32,
}

impl Default for CpuSurface {
    fn default() -> Self {
        CpuSurface {
            source: None,
            source_size: (0, 0),
            target: Raster::new(0, 0),
            allocations: 0,
            dispatches: 0,
        }
    }
}

impl CpuSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of target reallocations so far.
    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    /// Number of completed full-grid dispatches.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }
}

impl ExecutionSurface for CpuSurface {
    type Program = CpuProgram;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn compile(&mut self, kernel: Kernel, radius: u32) -> Result<CpuProgram> {
        check_radius(radius)?;
        Ok(CpuProgram { kernel, radius })
    }

    fn bind_source(&mut self, source: &Raster) -> Result<()> {
        if source.width() == 0 || source.height() == 0 {
            return Err(SdfError::DispatchFailure("source raster is empty".to_string()));
        }
        self.source = Some(source.clone());
        Ok(())
    }

    fn set_source_size(&mut self, width: u32, height: u32) {
        self.source_size = (width, height);
    }

    fn resize_target(&mut self, width: u32, height: u32) -> Result<()> {
        self.target = Raster::new(width, height);
        self.allocations += 1;
        Ok(())
    }

    fn dispatch_full_grid(&mut self, program: &CpuProgram) -> Result<()> {
        let source = self.source.as_ref().ok_or(SdfError::NoSource)?;
        if source.dimensions() != self.source_size {
            return Err(SdfError::DispatchFailure(format!(
                "bound source is {}x{}, expected {}x{}",
                source.width(),
                source.height(),
                self.source_size.0,
                self.source_size.1
            )));
        }

        match program.kernel {
            Kernel::BruteForce => {
                DistanceFieldKernel::new(program.radius).render_into(source, &mut self.target);
            }
            Kernel::JumpFlood(mode) => {
                let atlas = FeatureAtlas::build(source);
                FeatureResolvePass::new(mode, program.radius).render_into(&atlas, source, &mut self.target);
            }
        }

        self.dispatches += 1;
        Ok(())
    }

    fn target(&self) -> &Raster {
        &self.target
    }
}
