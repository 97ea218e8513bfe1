mod error;
mod generator;
mod gpu;
mod intake;
mod interactive;
mod kernel;
mod raster;
mod session;
mod settings;
mod surface;

#[cfg(test)]
mod tests;

// Re-export public API
pub use error::{Result, SdfError};
pub use generator::{GenerationRequest, Generator, kernel_radius};
pub use gpu::{GpuContext, GpuSurface};
pub use intake::{FileDrop, LoadedImage, PNG_MIME, accept, mime_for_path};
pub use interactive::{PreviewConfig, PreviewWindow};
pub use kernel::{Coord, DistanceFieldKernel, FeatureAtlas, FeatureRecord, FeatureResolvePass, Kernel, ResolveMode};
pub use raster::{Raster, Rgba};
pub use session::{MakerConfig, SdfMaker};
pub use settings::{NumericSetting, OutputSettings};
pub use surface::{CpuSurface, ExecutionSurface};

use std::path::PathBuf;
use std::time::Instant;

const USAGE: &str = "\
Usage: sdf_maker <image.png> [--width N] [--height N] [--radius N]
                 [--kernel brute|jfa|fill|bleed] [--gpu] [--preview]
       sdf_maker --benchmark

  --width/--height  output size; the other side follows the source aspect
  --radius          distance range in output pixels
  --kernel          brute: windowed search, jfa: jump flood distance,
                    fill/bleed: jump flood color fill
  --gpu             run kernels on the GPU instead of the CPU thread pool
  --preview         open the preview window after generating
  --benchmark       compare brute force and jump flood on synthetic input";

/// Command line options. Size and radius stay raw text so they go through
/// the same parsing and clamping as interactive input.
#[derive(Debug, Clone, Default)]
struct CliOptions {
    input: Option<PathBuf>,
    width: Option<String>,
    height: Option<String>,
    radius: Option<String>,
    kernel: Option<Kernel>,
    gpu: bool,
    preview: bool,
    benchmark: bool,
}

fn parse_args(args: &[String]) -> std::result::Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--width" => options.width = Some(value("--width")?),
            "--height" => options.height = Some(value("--height")?),
            "--radius" => options.radius = Some(value("--radius")?),
            "--kernel" => {
                let name = value("--kernel")?;
                options.kernel =
                    Some(Kernel::from_name(&name).ok_or_else(|| format!("unknown kernel {:?}", name))?);
            }
            "--gpu" => options.gpu = true,
            "--preview" => options.preview = true,
            "--benchmark" => options.benchmark = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path => {
                if options.input.is_some() {
                    return Err(format!("unexpected argument {}", path));
                }
                options.input = Some(PathBuf::from(path));
            }
        }
    }

    Ok(options)
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    if options.benchmark {
        run_benchmark();
        return;
    }
    if options.input.is_none() {
        println!("SDF Maker");
        println!("{}", USAGE);
        return;
    }

    let outcome = if options.gpu {
        GpuSurface::new().and_then(|surface| run(surface, &options))
    } else {
        run(CpuSurface::new(), &options)
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run<S: ExecutionSurface>(surface: S, options: &CliOptions) -> Result<()> {
    let config = MakerConfig {
        kernel: options.kernel.unwrap_or(Kernel::BruteForce),
        ..MakerConfig::default()
    };
    let mut maker = SdfMaker::new(surface, config);

    if let Some(path) = &options.input {
        let drop = FileDrop::from_path(path)?;
        maker.drop_files(&[drop])?;
    }
    if let Some(image) = maker.image() {
        println!("{}", image.info());
    }

    if let Some(width) = &options.width {
        maker.set_width_input(width);
    }
    if let Some(height) = &options.height {
        maker.set_height_input(height);
    }
    if let Some(radius) = &options.radius {
        maker.set_radius_input(radius);
    }

    let kernel_radius = maker.kernel_radius()?;
    let start = Instant::now();
    let (width, height, coverage) = {
        let output = maker.generate()?;
        (output.width(), output.height(), output.foreground_coverage())
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    println!(
        "Output: {}x{} ({} kernel, radius {} -> {} source px) in {:.2} ms",
        width,
        height,
        maker.kernel(),
        maker.settings().radius(),
        kernel_radius,
        elapsed_ms
    );
    println!("Foreground coverage: {:.1}%", coverage * 100.0);

    if options.preview {
        let mut preview = PreviewWindow::new(PreviewConfig::default())?;
        preview.run(&mut maker)?;
    }

    Ok(())
}

/// Filled disc of radius `r` centred in a `w`×`h` raster, colored by position
fn disc_raster(w: u32, h: u32, r: f32) -> Raster {
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    Raster::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let a = if dx * dx + dy * dy <= r * r { 1.0 } else { 0.0 };
        Rgba::new(x as f32 / w as f32, y as f32 / h as f32, 0.5, a)
    })
}

fn run_benchmark() {
    println!("=== Brute Force vs Jump Flood Benchmark ===\n");

    let sizes = [(128, 128), (256, 256), (512, 512)];
    let radii = [4u32, 16, 48];
    let iterations = 5;

    for (width, height) in sizes {
        let source = disc_raster(width, height, width.min(height) as f32 / 3.0);

        println!("Grid size: {}x{}", width, height);
        println!("-----------------------");

        for radius in radii {
            let brute = DistanceFieldKernel::new(radius);
            let start = Instant::now();
            let mut brute_out = Raster::new(width, height);
            for _ in 0..iterations {
                brute.render_into(&source, &mut brute_out);
            }
            let brute_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

            let resolve = FeatureResolvePass::new(ResolveMode::Distance, radius);
            let start = Instant::now();
            let mut flood_out = Raster::new(width, height);
            for _ in 0..iterations {
                let atlas = FeatureAtlas::build(&source);
                resolve.render_into(&atlas, &source, &mut flood_out);
            }
            let flood_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;

            let max_diff = brute_out
                .texels()
                .iter()
                .zip(flood_out.texels())
                .map(|(a, b)| (a.a - b.a).abs())
                .fold(0.0f32, f32::max);

            println!(
                "  r={:<3} brute {:8.3} ms/iter  jump flood {:8.3} ms/iter  speedup {:6.2}x  max alpha diff {:.5}",
                radius,
                brute_ms,
                flood_ms,
                brute_ms / flood_ms,
                max_diff
            );
        }
        println!();
    }
}
