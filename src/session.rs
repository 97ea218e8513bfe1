//! The tool's state: loaded image, settings, and the generator they feed.

use crate::error::{Result, SdfError};
use crate::generator::{GenerationRequest, Generator, kernel_radius};
use crate::intake::{self, FileDrop, LoadedImage};
use crate::kernel::Kernel;
use crate::raster::Raster;
use crate::settings::OutputSettings;
use crate::surface::ExecutionSurface;

/// Configuration for a maker session
#[derive(Debug, Clone, Copy)]
pub struct MakerConfig {
    /// Output width bounds (inclusive)
    pub width_bounds: (u32, u32),
    /// Output height bounds (inclusive)
    pub height_bounds: (u32, u32),
    /// Radius bounds in output pixels (inclusive)
    pub radius_bounds: (u32, u32),
    /// Initial radius
    pub radius: u32,
    /// Initial kernel
    pub kernel: Kernel,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            width_bounds: (1, 16384),
            height_bounds: (1, 16384),
            radius_bounds: (1, 255),
            radius: 1,
            kernel: Kernel::BruteForce,
        }
    }
}

/// Loaded source plus settings plus generator.
pub struct SdfMaker<S: ExecutionSurface> {
    settings: OutputSettings,
    image: Option<LoadedImage>,
    kernel: Kernel,
    generator: Generator<S>,
}

impl<S: ExecutionSurface> SdfMaker<S> {
    pub fn new(surface: S, config: MakerConfig) -> Self {
        SdfMaker {
            settings: OutputSettings::new(
                config.width_bounds,
                config.height_bounds,
                config.radius_bounds,
                config.radius,
            ),
            image: None,
            kernel: config.kernel,
            generator: Generator::new(surface),
        }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn generator(&self) -> &Generator<S> {
        &self.generator
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn set_kernel(&mut self, kernel: Kernel) {
        self.kernel = kernel;
    }

    /// Handle a drop. Only the first item counts; an empty drop does nothing.
    ///
    /// A rejected drop leaves the loaded image and settings as they were.
    pub fn drop_files(&mut self, drops: &[FileDrop]) -> Result<()> {
        let Some(first) = drops.first() else {
            return Ok(());
        };

        let image = match intake::accept(first) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("rejected drop {:?}: {}", first.name, err);
                return Err(err);
            }
        };
        self.load(image)
    }

    /// Make `image` the source and reset width/height to its size.
    pub fn load(&mut self, image: LoadedImage) -> Result<()> {
        self.generator.set_source(&image.raster)?;
        let (width, height) = image.raster.dimensions();
        self.settings.load_source(width, height);
        log::info!("loaded source\n{}", image.info());
        self.image = Some(image);
        Ok(())
    }

    pub fn set_width_input(&mut self, input: &str) {
        self.settings.set_width_input(input);
    }

    pub fn set_height_input(&mut self, input: &str) {
        self.settings.set_height_input(input);
    }

    pub fn set_radius_input(&mut self, input: &str) {
        self.settings.set_radius_input(input);
    }

    /// The request `generate` would run right now.
    pub fn request(&self) -> Result<GenerationRequest> {
        let image = self.image.as_ref().ok_or(SdfError::NoSource)?;
        Ok(GenerationRequest {
            source_width: image.raster.width(),
            source_height: image.raster.height(),
            output_width: self.settings.width(),
            output_height: self.settings.height(),
            user_radius: self.settings.radius(),
            kernel: self.kernel,
        })
    }

    /// Source-space radius for the current settings.
    pub fn kernel_radius(&self) -> Result<u32> {
        let request = self.request()?;
        Ok(kernel_radius(
            request.source_width,
            request.source_height,
            request.output_width,
            request.output_height,
            request.user_radius,
        ))
    }

    pub fn generate(&mut self) -> Result<&Raster> {
        let request = self.request()?;
        self.generator.generate(&request)
    }

    /// Last generated output.
    pub fn output(&self) -> &Raster {
        self.generator.output()
    }
}
