//! Rig calibration and per-sensor cloud files.
//!
//! Calibration YAML:
//!
//! ```yaml
//! width: 320
//! height: 240
//! sensors:
//!   - T_RS:          # sensor-to-rig, 4x4 row-major
//!       rows: 4
//!       cols: 4
//!       data: [1, 0, 0, 0,  0, 1, 0, 0,  0, 0, 1, 0,  0, 0, 0, 1]
//! ```
//!
//! Cloud CSV: one `x,y,z,r,g,b` row per pixel, row-major, `nan` for pixels
//! without depth.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use nalgebra::{Matrix4, Vector3};
use serde::Deserialize;

use crate::cloud::{ColoredPoint, PointCloud};
use crate::geometry::SE3;

/// Extrinsics and cloud geometry of the sensor ring.
#[derive(Debug, Clone)]
pub struct RigCalibration {
    /// Organized cloud width of every sensor.
    pub width: usize,
    /// Organized cloud height of every sensor.
    pub height: usize,
    /// Sensor-to-rig transforms, in sensor order.
    pub extrinsics: Vec<SE3>,
}

#[derive(Debug, Deserialize)]
struct TransformYaml {
    #[serde(default = "four")]
    rows: usize,
    #[serde(default = "four")]
    cols: usize,
    data: Vec<f64>,
}

fn four() -> usize {
    4
}

#[derive(Debug, Deserialize)]
struct SensorYaml {
    #[serde(rename = "T_RS")]
    t_rs: TransformYaml,
}

#[derive(Debug, Deserialize)]
struct RigYaml {
    width: usize,
    height: usize,
    sensors: Vec<SensorYaml>,
}

impl RigCalibration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let yaml: RigYaml = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse rig calibration {}", path.display()))?;
        Self::from_yaml(yaml)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let yaml: RigYaml = serde_yaml::from_str(yaml).context("Failed to parse rig calibration")?;
        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: RigYaml) -> Result<Self> {
        if yaml.sensors.is_empty() {
            bail!("Rig calibration lists no sensors");
        }
        if yaml.width < 2 || yaml.height < 2 {
            bail!("Sensor clouds must be organized, got {}x{}", yaml.width, yaml.height);
        }

        let extrinsics = yaml
            .sensors
            .iter()
            .enumerate()
            .map(|(i, sensor)| {
                let t = &sensor.t_rs;
                if t.rows != 4 || t.cols != 4 || t.data.len() != 16 {
                    bail!(
                        "Sensor {}: T_RS must be 4x4 with 16 values, got {}x{} with {}",
                        i,
                        t.rows,
                        t.cols,
                        t.data.len()
                    );
                }
                Ok(SE3::from_matrix(Matrix4::from_row_slice(&t.data)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            width: yaml.width,
            height: yaml.height,
            extrinsics,
        })
    }

    pub fn num_sensors(&self) -> usize {
        self.extrinsics.len()
    }

    pub fn points_per_sensor(&self) -> usize {
        self.width * self.height
    }
}

/// Load one sensor's organized cloud from CSV.
pub fn load_cloud_csv(path: impl AsRef<Path>, width: usize, height: usize) -> Result<PointCloud> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut points = Vec::with_capacity(width * height);
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("{}: bad record {}", path.display(), line))?;
        if rec.len() < 6 {
            bail!("{}: record {} has {} fields, expected 6", path.display(), line, rec.len());
        }
        let position = Vector3::new(
            rec[0].trim().parse()?,
            rec[1].trim().parse()?,
            rec[2].trim().parse()?,
        );
        let color = [
            rec[3].trim().parse()?,
            rec[4].trim().parse()?,
            rec[5].trim().parse()?,
        ];
        points.push(ColoredPoint::new(position, color));
    }

    if points.len() != width * height {
        bail!(
            "{}: expected {}x{} = {} points, found {}",
            path.display(),
            width,
            height,
            width * height,
            points.len()
        );
    }
    Ok(PointCloud::new(width, height, points))
}
