//! Generation orchestration: radius derivation, program rebuilds, target
//! sizing, and the single full-grid dispatch.

use crate::error::Result;
use crate::kernel::Kernel;
use crate::raster::Raster;
use crate::surface::ExecutionSurface;

/// Search radius in source pixels that spans `user_radius` output pixels.
///
/// Downsampling shrinks features, so the window has to grow by the
/// source/output ratio on whichever axis shrinks more. Radii past `u32::MAX`
/// saturate.
pub fn kernel_radius(
    source_width: u32,
    source_height: u32,
    output_width: u32,
    output_height: u32,
    user_radius: u32,
) -> u32 {
    let along = |source: u32, output: u32| -> u32 {
        let scaled = user_radius as u64 * source as u64;
        u32::try_from(scaled.div_ceil(output.max(1) as u64)).unwrap_or(u32::MAX)
    };
    along(source_width, output_width).max(along(source_height, output_height))
}

/// One `generate` call's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub source_width: u32,
    pub source_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub user_radius: u32,
    pub kernel: Kernel,
}

/// Drives an `ExecutionSurface` through one generation at a time.
///
/// Holds at most one compiled program. A request with a different kernel or
/// radius discards it and compiles a replacement.
pub struct Generator<S: ExecutionSurface> {
    surface: S,
    program: Option<S::Program>,
    program_key: Option<(Kernel, u32)>,
    target_size: Option<(u32, u32)>,
    rebuilds: u32,
}

impl<S: ExecutionSurface> Generator<S> {
    pub fn new(surface: S) -> Self {
        Generator {
            surface,
            program: None,
            program_key: None,
            target_size: None,
            rebuilds: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Upload a new source raster. The compiled program stays valid.
    pub fn set_source(&mut self, source: &Raster) -> Result<()> {
        self.surface.bind_source(source)
    }

    /// Radius the current program was compiled for.
    pub fn compiled_radius(&self) -> Option<u32> {
        self.program_key.map(|(_, radius)| radius)
    }

    /// Programs compiled so far.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    /// Last generated output.
    pub fn output(&self) -> &Raster {
        self.surface.target()
    }

    /// Run one generation and return the output raster.
    ///
    /// A compile failure drops the previous program and leaves the target
    /// untouched; the next call compiles again.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<&Raster> {
        let radius = kernel_radius(
            request.source_width,
            request.source_height,
            request.output_width,
            request.output_height,
            request.user_radius,
        );

        let key = (request.kernel, radius);
        if self.program_key != Some(key) {
            self.program = None;
            self.program_key = None;
            log::debug!(
                "building {} kernel for radius {} on {}",
                request.kernel,
                radius,
                self.surface.name()
            );
            let program = self.surface.compile(request.kernel, radius)?;
            self.program = Some(program);
            self.program_key = Some(key);
            self.rebuilds += 1;
        }

        self.surface.set_source_size(request.source_width, request.source_height);

        let size = (request.output_width, request.output_height);
        if self.target_size != Some(size) {
            log::debug!("reallocating target to {}x{}", size.0, size.1);
            self.target_size = None;
            self.surface.resize_target(size.0, size.1)?;
            self.target_size = Some(size);
        }

        if let Some(program) = &self.program {
            self.surface.dispatch_full_grid(program)?;
        }

        log::info!(
            "generated {}x{} from {}x{} ({} kernel, radius {})",
            size.0,
            size.1,
            request.source_width,
            request.source_height,
            request.kernel,
            radius
        );
        Ok(self.surface.target())
    }
}
