//! Reprojection demonstration on a synthetic star field
//!
//! Renders Gaussian stars on a gnomonic (TAN) grid, reprojects the image onto
//! a second TAN grid (optionally rotated, rescaled, or in another celestial
//! frame) and reports how much flux landed on the destination grid.
//!
//! # Usage
//!
//! ```bash
//! # All CPUs, destination rotated by 30 degrees
//! cargo run --release --bin reproject_demo -- --rotation-deg 30
//!
//! # Galactic destination grid with four workers
//! cargo run --release --bin reproject_demo -- --dst-frame galactic --workers 4
//!
//! # Serial run with settings from a JSON file
//! cargo run --release --bin reproject_demo -- --serial --config reproject.json
//! ```
//!
//! Ctrl-C cancels the running reprojection.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use reproject::{GridShape, Parallelism, ReprojectConfig, ReprojectError, Reprojector};
use skyproj::{convert, CelestialFrame, TanProjection};

/// Command line arguments for the reprojection demo
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flux-conserving reprojection of a synthetic star field",
    long_about = "Renders a synthetic star field on a TAN grid and reprojects it onto a \
        second TAN grid using exact spherical polygon overlap. Prints the flux before \
        and after reprojection together with coverage statistics."
)]
struct Args {
    #[arg(long, default_value_t = 128, help = "Source and destination rows")]
    rows: usize,

    #[arg(long, default_value_t = 128, help = "Source and destination columns")]
    cols: usize,

    #[arg(long, default_value_t = 83.82, help = "Field centre right ascension in degrees")]
    ra: f64,

    #[arg(long, default_value_t = -5.39, allow_negative_numbers = true, help = "Field centre declination in degrees")]
    dec: f64,

    #[arg(long, default_value_t = 0.001, help = "Source pixel scale in degrees")]
    scale: f64,

    #[arg(
        long,
        help = "Destination pixel scale in degrees",
        long_help = "Pixel scale of the destination grid in degrees. Defaults to the \
            source scale. Larger values bin flux into fewer destination pixels."
    )]
    dst_scale: Option<f64>,

    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Destination grid rotation in degrees"
    )]
    rotation_deg: f64,

    #[arg(
        long,
        default_value = "icrs",
        help = "Destination celestial frame (icrs or galactic)"
    )]
    dst_frame: CelestialFrame,

    #[arg(
        short,
        long,
        conflicts_with = "serial",
        allow_negative_numbers = true,
        help = "Number of worker threads",
        long_help = "Number of worker threads for the parallel kernel. Must be strictly \
            positive. Without this flag all available CPUs are used."
    )]
    workers: Option<i64>,

    #[arg(long, help = "Run on the calling thread only")]
    serial: bool,

    #[arg(
        short,
        long,
        help = "JSON configuration file",
        long_help = "Path to a JSON file with reprojection settings (parallelism, \
            poll_interval_ms, thread_name_prefix). Command line parallelism flags \
            override the file."
    )]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 200, help = "Number of synthetic stars")]
    stars: usize,

    #[arg(long, default_value_t = 1.5, help = "Star PSF sigma in pixels")]
    sigma: f64,

    #[arg(long, default_value_t = 7, help = "Random seed for the star field")]
    seed: u64,
}

/// Render Gaussian stars with random positions and fluxes
fn synthetic_star_field(shape: GridShape, stars: usize, sigma: f64, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut image = shape.zeros();
    let radius = (4.0 * sigma).ceil() as i64;
    let norm = 1.0 / (2.0 * std::f64::consts::PI * sigma * sigma);

    for _ in 0..stars {
        let x0 = rng.random_range(0.0..shape.cols as f64);
        let y0 = rng.random_range(0.0..shape.rows as f64);
        let flux = 10f64.powf(rng.random_range(2.0..5.0));

        let (cx, cy) = (x0.round() as i64, y0.round() as i64);
        for y in (cy - radius).max(0)..=(cy + radius).min(shape.rows as i64 - 1) {
            for x in (cx - radius).max(0)..=(cx + radius).min(shape.cols as i64 - 1) {
                let dx = x as f64 - x0;
                let dy = y as f64 - y0;
                let r2 = (dx * dx + dy * dy) / (2.0 * sigma * sigma);
                image[[y as usize, x as usize]] += flux * norm * (-r2).exp();
            }
        }
    }

    image
}

/// Reject arguments that leave nothing to render
fn validate_args(args: &Args) -> Result<()> {
    if args.rows == 0 || args.cols == 0 {
        bail!(
            "grid must have at least one row and one column, got {}x{}",
            args.rows,
            args.cols
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    validate_args(&args)?;

    let mut config = match &args.config {
        Some(path) => ReprojectConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReprojectConfig::default(),
    };
    if args.serial {
        config.parallelism = Parallelism::Serial;
    } else if let Some(workers) = args.workers {
        config.parallelism = Parallelism::Workers(workers);
    }

    let shape = GridShape::from_rows_cols(args.rows, args.cols);
    let crpix = [
        (args.cols as f64 - 1.0) / 2.0,
        (args.rows as f64 - 1.0) / 2.0,
    ];
    let src = TanProjection::from_scale(
        crpix,
        [args.ra, args.dec],
        args.scale,
        0.0,
        CelestialFrame::Icrs,
    )?;
    let (lon, lat) = convert(args.ra, args.dec, CelestialFrame::Icrs, args.dst_frame);
    let dst = TanProjection::from_scale(
        crpix,
        [lon, lat],
        args.dst_scale.unwrap_or(args.scale),
        args.rotation_deg,
        args.dst_frame,
    )?;

    println!("Reprojection Demo");
    println!("=================");
    println!("Grid: {shape}, {} stars", args.stars);
    println!(
        "Source: ICRS ({:.4}, {:.4}), {} deg/pixel",
        args.ra, args.dec, args.scale
    );
    println!(
        "Destination: {} ({lon:.4}, {lat:.4}), rotated {} deg",
        args.dst_frame, args.rotation_deg
    );
    println!("Parallelism: {:?}", config.parallelism);

    let image = synthetic_star_field(shape, args.stars, args.sigma, args.seed);

    let reprojector = Reprojector::new(config);
    let token = reprojector.cancel_token();
    ctrlc::set_handler(move || {
        info!("Interrupt received, cancelling");
        token.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let start = Instant::now();
    let result = match reprojector.reproject(&image, &src, &dst, shape) {
        Ok(result) => result,
        Err(ReprojectError::Cancelled) => {
            println!("Cancelled after {:.2?}", start.elapsed());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let elapsed = start.elapsed();

    let source_flux: f64 = image.sum();
    let flux_on_grid = result.total_flux();
    let footprint_max = result.footprint.iter().copied().fold(0.0, f64::max);

    println!();
    println!("Elapsed: {elapsed:.2?}");
    println!("Source flux:       {source_flux:.3}");
    println!("Flux on grid:      {flux_on_grid:.3}");
    println!(
        "Flux retained:     {:.4}%",
        100.0 * flux_on_grid / source_flux
    );
    println!(
        "Covered pixels:    {} / {}",
        result.covered_count(),
        shape.pixel_count()
    );
    println!("Max footprint:     {footprint_max:.6}");

    Ok(())
}
