//! GPU execution surface: the WGSL kernels dispatched through wgpu compute
//!
//! Source and target live in storage buffers of `vec4<f32>`, so texels are
//! uploaded and read back as `Rgba` slices without conversion. The search
//! radius is a WGSL `override` constant, injected when the pipelines are
//! created; a new radius means new pipelines.

use std::collections::HashMap;
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use super::context::GpuContext;
use crate::error::{Result, SdfError};
use crate::kernel::{FeatureAtlas, Kernel, ResolveMode};
use crate::raster::{Raster, Rgba};
use crate::surface::{ExecutionSurface, check_radius};

/// Threads per workgroup along each axis (matches `@workgroup_size(8, 8, 1)`)
const WORKGROUP_SIZE: u32 = 8;

/// `RADIUS` is an `i32` override in WGSL
pub const MAX_GPU_RADIUS: u32 = i32::MAX as u32;

/// Largest source side the GPU kernels address. Squared distances between
/// two texels stay below 2³¹, and coordinates fit the 16-bit atlas packing.
pub const MAX_GPU_SOURCE_SIDE: u32 = 32767;

/// Uniform data shared by every kernel entry point
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub source_size: [u32; 2],
    pub output_size: [u32; 2],
    pub step: u32,
    pub _padding: [u32; 3],
}

enum Pipelines {
    BruteForce(wgpu::ComputePipeline),
    JumpFlood {
        seed: wgpu::ComputePipeline,
        step: wgpu::ComputePipeline,
        resolve: wgpu::ComputePipeline,
    },
}

/// Pipelines specialized for one kernel and radius
pub struct GpuProgram {
    kernel: Kernel,
    radius: u32,
    pipelines: Pipelines,
}

struct SourceBinding {
    buffer: wgpu::Buffer,
    size: (u32, u32),
}

struct TargetBinding {
    buffer: wgpu::Buffer,
    staging: wgpu::Buffer,
    size: (u32, u32),
}

/// Execution surface running on a wgpu device
pub struct GpuSurface {
    ctx: GpuContext,
    brute_layout: wgpu::BindGroupLayout,
    flood_layout: wgpu::BindGroupLayout,
    source: Option<SourceBinding>,
    source_size: (u32, u32),
    target: Option<TargetBinding>,
    host_target: Raster,
}

impl GpuSurface {
    /// Create a surface on a fresh headless context
    pub fn new() -> Result<Self> {
        Ok(Self::with_context(GpuContext::new()?))
    }

    pub fn with_context(ctx: GpuContext) -> Self {
        let device = &ctx.device;

        let brute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SDF Bind Group Layout"),
            entries: &[
                storage_entry(0, true),  // source texels
                storage_entry(1, false), // output texels
                uniform_entry(2),
            ],
        });

        let flood_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Jump Flood Bind Group Layout"),
            entries: &[
                storage_entry(0, true),  // source texels
                storage_entry(1, true),  // atlas read side
                storage_entry(2, false), // atlas write side
                storage_entry(3, false), // output texels
                uniform_entry(4),
            ],
        });

        Self {
            ctx,
            brute_layout,
            flood_layout,
            source: None,
            source_size: (0, 0),
            target: None,
            host_target: Raster::new(0, 0),
        }
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.ctx.adapter_info
    }
}

impl ExecutionSurface for GpuSurface {
    type Program = GpuProgram;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn compile(&mut self, kernel: Kernel, radius: u32) -> Result<GpuProgram> {
        check_radius(radius)?;
        if radius > MAX_GPU_RADIUS {
            return Err(SdfError::KernelCompileFailure {
                radius,
                reason: format!("GPU kernels take a radius up to {}", MAX_GPU_RADIUS),
            });
        }
        let constants = HashMap::from([("RADIUS".to_string(), radius as f64)]);
        let brute_layout = &self.brute_layout;
        let flood_layout = &self.flood_layout;

        let (pipelines, error) = self.ctx.validated(|device| match kernel {
            Kernel::BruteForce => {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("SDF Kernel"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sdf.wgsl").into()),
                });
                let layout = pipeline_layout(device, brute_layout, "SDF Pipeline Layout");
                Pipelines::BruteForce(compute_pipeline(
                    device,
                    &layout,
                    &module,
                    "main",
                    &constants,
                    "SDF Brute Force Pipeline",
                ))
            }
            Kernel::JumpFlood(mode) => {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Jump Flood Kernel"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("shaders/jfa.wgsl").into()),
                });
                let layout = pipeline_layout(device, flood_layout, "Jump Flood Pipeline Layout");
                let no_constants = HashMap::new();
                let resolve_entry = match mode {
                    ResolveMode::Distance => "resolve_distance_main",
                    ResolveMode::Fill => "resolve_fill_main",
                    ResolveMode::Bleed => "resolve_bleed_main",
                };
                Pipelines::JumpFlood {
                    seed: compute_pipeline(device, &layout, &module, "seed_main", &no_constants, "Jump Flood Seed Pipeline"),
                    step: compute_pipeline(device, &layout, &module, "step_main", &no_constants, "Jump Flood Step Pipeline"),
                    resolve: compute_pipeline(
                        device,
                        &layout,
                        &module,
                        resolve_entry,
                        &constants,
                        "Jump Flood Resolve Pipeline",
                    ),
                }
            }
        });

        if let Some(error) = error {
            return Err(SdfError::KernelCompileFailure {
                radius,
                reason: error.to_string(),
            });
        }

        Ok(GpuProgram {
            kernel,
            radius,
            pipelines,
        })
    }

    fn bind_source(&mut self, source: &Raster) -> Result<()> {
        check_source_size(source.width(), source.height())?;

        let (buffer, error) = self.ctx.validated(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Source Texel Buffer"),
                contents: bytemuck::cast_slice(source.texels()),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        });
        if let Some(error) = error {
            return Err(SdfError::DispatchFailure(format!("source upload: {}", error)));
        }

        self.source = Some(SourceBinding {
            buffer,
            size: source.dimensions(),
        });
        Ok(())
    }

    fn set_source_size(&mut self, width: u32, height: u32) {
        self.source_size = (width, height);
    }

    fn resize_target(&mut self, width: u32, height: u32) -> Result<()> {
        let bytes = texel_bytes(width, height);

        let ((buffer, staging), error) = self.ctx.validated(|device| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Output Texel Buffer"),
                size: bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Output Staging Buffer"),
                size: bytes,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (buffer, staging)
        });
        if let Some(error) = error {
            return Err(SdfError::DispatchFailure(format!(
                "target allocation {}x{}: {}",
                width, height, error
            )));
        }

        self.target = Some(TargetBinding {
            buffer,
            staging,
            size: (width, height),
        });
        self.host_target = Raster::new(width, height);
        Ok(())
    }

    fn dispatch_full_grid(&mut self, program: &GpuProgram) -> Result<()> {
        let source = self.source.as_ref().ok_or(SdfError::NoSource)?;
        if source.size != self.source_size {
            return Err(SdfError::DispatchFailure(format!(
                "bound source is {}x{}, expected {}x{}",
                source.size.0, source.size.1, self.source_size.0, self.source_size.1
            )));
        }
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SdfError::DispatchFailure("no target allocated".to_string()))?;

        let (src_w, src_h) = source.size;
        let (out_w, out_h) = target.size;
        log::debug!(
            "dispatching {} kernel (radius {}) over {}x{}",
            program.kernel,
            program.radius,
            out_w,
            out_h
        );
        let params = KernelParams {
            source_size: [src_w, src_h],
            output_size: [out_w, out_h],
            step: 0,
            _padding: [0; 3],
        };
        let queue = &self.ctx.queue;
        let brute_layout = &self.brute_layout;
        let flood_layout = &self.flood_layout;

        let ((), error) = self.ctx.validated(|device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("SDF Generate Encoder"),
            });

            match &program.pipelines {
                Pipelines::BruteForce(pipeline) => {
                    let uniforms = uniform_buffer(device, &params);
                    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("SDF Bind Group"),
                        layout: brute_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: source.buffer.as_entire_binding(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: target.buffer.as_entire_binding(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: uniforms.as_entire_binding(),
                            },
                        ],
                    });
                    encode_pass(&mut encoder, pipeline, &bind_group, (out_w, out_h), "SDF Brute Force Pass");
                }
                Pipelines::JumpFlood { seed, step, resolve } => {
                    let atlas_bytes = src_w as u64 * src_h as u64 * std::mem::size_of::<[u32; 2]>() as u64;
                    let atlas = [
                        atlas_buffer(device, atlas_bytes, "Atlas Buffer A"),
                        atlas_buffer(device, atlas_bytes, "Atlas Buffer B"),
                    ];
                    let flood_group = |read: usize, uniforms: &wgpu::Buffer| {
                        device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("Jump Flood Bind Group"),
                            layout: flood_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: source.buffer.as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: atlas[read].as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 2,
                                    resource: atlas[1 - read].as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 3,
                                    resource: target.buffer.as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 4,
                                    resource: uniforms.as_entire_binding(),
                                },
                            ],
                        })
                    };

                    let base_uniforms = uniform_buffer(device, &params);

                    // Seed writes atlas A
                    let group = flood_group(1, &base_uniforms);
                    encode_pass(&mut encoder, seed, &group, (src_w, src_h), "Jump Flood Seed Pass");

                    // Each step gets its own uniforms; one compute pass per step
                    let mut read = 0;
                    for jump in FeatureAtlas::steps(src_w, src_h) {
                        let uniforms = uniform_buffer(device, &KernelParams { step: jump, ..params });
                        let group = flood_group(read, &uniforms);
                        encode_pass(&mut encoder, step, &group, (src_w, src_h), "Jump Flood Step Pass");
                        read = 1 - read;
                    }

                    let group = flood_group(read, &base_uniforms);
                    encode_pass(&mut encoder, resolve, &group, (out_w, out_h), "Jump Flood Resolve Pass");
                }
            }

            encoder.copy_buffer_to_buffer(&target.buffer, 0, &target.staging, 0, texel_bytes(out_w, out_h));
            queue.submit(std::iter::once(encoder.finish()));
        });

        if let Some(error) = error {
            return Err(SdfError::DispatchFailure(error.to_string()));
        }

        let texels = read_back(&self.ctx, &target.staging)?;
        self.host_target = Raster::from_texels(out_w, out_h, texels);
        Ok(())
    }

    fn target(&self) -> &Raster {
        &self.host_target
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sources the GPU kernels can address without overflow.
pub(crate) fn check_source_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SdfError::DispatchFailure("source raster is empty".to_string()));
    }
    if width > MAX_GPU_SOURCE_SIDE || height > MAX_GPU_SOURCE_SIDE {
        return Err(SdfError::DispatchFailure(format!(
            "source {}x{} exceeds the GPU limit of {} per side",
            width, height, MAX_GPU_SOURCE_SIDE
        )));
    }
    Ok(())
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn pipeline_layout(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    })
}

fn compute_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
    constants: &HashMap<String, f64>,
    label: &str,
) -> wgpu::ComputePipeline {
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: wgpu::PipelineCompilationOptions {
            constants,
            zero_initialize_workgroup_memory: false,
        },
        cache: None,
    })
}

fn uniform_buffer(device: &wgpu::Device, params: &KernelParams) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Kernel Uniform Buffer"),
        contents: bytemuck::cast_slice(&[*params]),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

fn atlas_buffer(device: &wgpu::Device, size: u64, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    })
}

fn texel_bytes(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * std::mem::size_of::<Rgba>() as u64
}

/// Record one compute pass covering a `grid.0`×`grid.1` grid
fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    grid: (u32, u32),
    label: &str,
) {
    let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some(label),
        timestamp_writes: None,
    });

    compute_pass.set_pipeline(pipeline);
    compute_pass.set_bind_group(0, bind_group, &[]);

    let workgroups_x = (grid.0 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
    let workgroups_y = (grid.1 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
    compute_pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
}

/// Map the staging buffer and copy its texels out
fn read_back(ctx: &GpuContext, staging: &wgpu::Buffer) -> Result<Vec<Rgba>> {
    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    let _ = ctx.device.poll(wgpu::Maintain::Wait);

    receiver
        .recv()
        .map_err(|e| SdfError::DispatchFailure(format!("readback channel closed: {}", e)))?
        .map_err(|e| SdfError::DispatchFailure(format!("readback failed: {}", e)))?;

    let texels = {
        let view = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, Rgba>(&view).to_vec()
    };
    staging.unmap();
    Ok(texels)
}
