use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_omniplanes::config::PipelineConfig;
use rust_omniplanes::io::{load_cloud_csv, write_patches_yaml, RigCalibration};
use rust_omniplanes::system::{Frame, PlaneExtractor};

const USAGE: &str =
    "usage: omniplanes [--config pipeline.yaml] <rig.yaml> <output.yaml> <sensor0.csv> [sensor1.csv ...]";

struct Args {
    config: Option<PathBuf>,
    rig: PathBuf,
    output: PathBuf,
    clouds: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut positional = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    if positional.len() < 3 {
        bail!(USAGE);
    }
    let clouds = positional.split_off(2);
    let output = positional.pop().context(USAGE)?;
    let rig = positional.pop().context(USAGE)?;
    Ok(Args {
        config,
        rig,
        output,
        clouds,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };
    let rig = RigCalibration::load(&args.rig)?;
    if args.clouds.len() != rig.num_sensors() {
        bail!(
            "Rig has {} sensors but {} clouds were given",
            rig.num_sensors(),
            args.clouds.len()
        );
    }
    info!(
        "Loaded rig with {} sensors ({}x{})",
        rig.num_sensors(),
        rig.width,
        rig.height
    );

    let clouds = args
        .clouds
        .iter()
        .map(|path| load_cloud_csv(path, rig.width, rig.height))
        .collect::<Result<Vec<_>>>()?;
    let frame = Frame::new(0, clouds);

    let extractor = PlaneExtractor::with_default_detectors(rig.extrinsics.clone(), config);
    let result = extractor.process_frame(&frame, None);

    for err in &result.sensor_errors {
        info!("Skipped {}", err);
    }
    for patch in result.patches.iter() {
        info!(
            "{}: n=[{:.3}, {:.3}, {:.3}] d={:.3} area={:.2} m² sensor={} observations={}",
            patch.id,
            patch.normal.x,
            patch.normal.y,
            patch.normal.z,
            patch.offset,
            patch.area,
            patch.sensor_id,
            patch.num_observations
        );
    }

    write_patches_yaml(&args.output, result.timestamp_ns, &result.patches)?;
    info!(
        "Wrote {} patches to {} ({:.1} ms)",
        result.patches.len(),
        args.output.display(),
        result.timing.total_ms
    );
    Ok(())
}
