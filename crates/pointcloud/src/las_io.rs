//! LAS/LAZ reading and the recorder's scan writer

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use contracts::LidarScan;
use las::point::Format;
use las::{Builder, Point, Reader, Transform, Vector, Writer};
use tracing::debug;

use crate::cloud::PointCloud;
use crate::error::{ConvertError, Result};

/// Coordinate resolution of written scans (millimetres)
pub const SCAN_SCALE: f64 = 0.001;

/// `.laz` / `.las` check, case-insensitive
pub fn is_point_cloud_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("laz") || e.eq_ignore_ascii_case("las"))
        .unwrap_or(false)
}

/// Load every point of a LAS/LAZ file
pub fn read_cloud(path: &Path) -> Result<PointCloud> {
    let file = File::open(path).map_err(ConvertError::io(path))?;
    let mut reader = Reader::new(BufReader::new(file)).map_err(ConvertError::las(path))?;

    let capacity = reader.header().number_of_points() as usize;
    let mut positions = Vec::with_capacity(capacity);
    let mut intensity = Vec::with_capacity(capacity);
    for point in reader.points() {
        let point = point.map_err(ConvertError::las(path))?;
        positions.push([point.x, point.y, point.z]);
        intensity.push(f64::from(point.intensity));
    }
    debug!(file = %path.display(), points = positions.len(), "point cloud loaded");

    Ok(PointCloud {
        positions,
        intensity: Some(intensity),
    })
}

/// Writes LiDAR scans as LAS 1.2, point format 0
///
/// Output is LAZ-compressed when the path ends in `.laz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanWriter;

impl ScanWriter {
    pub fn write(&self, path: &Path, scan: &LidarScan) -> Result<()> {
        let header = scan_header(path, scan).map_err(ConvertError::las(path))?;
        let mut writer = Writer::from_path(path, header).map_err(ConvertError::las(path))?;
        for p in &scan.points {
            let point = Point {
                x: f64::from(p.x),
                y: f64::from(p.y),
                z: f64::from(p.z),
                intensity: intensity_to_u16(p.intensity),
                ..Default::default()
            };
            writer.write_point(point).map_err(ConvertError::las(path))?;
        }
        writer.close().map_err(ConvertError::las(path))
    }
}

fn scan_header(path: &Path, scan: &LidarScan) -> las::Result<las::Header> {
    let mut offset = [0.0f64; 3];
    if !scan.is_empty() {
        offset = [f64::INFINITY; 3];
        for p in &scan.points {
            offset[0] = offset[0].min(f64::from(p.x));
            offset[1] = offset[1].min(f64::from(p.y));
            offset[2] = offset[2].min(f64::from(p.z));
        }
    }
    let transform = |offset: f64| Transform {
        scale: SCAN_SCALE,
        offset,
    };

    let mut builder = Builder::from((1, 2));
    builder.point_format = Format::new(0)?;
    builder.point_format.is_compressed = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("laz"))
        .unwrap_or(false);
    builder.transforms = Vector {
        x: transform(offset[0]),
        y: transform(offset[1]),
        z: transform(offset[2]),
    };
    builder.into_header()
}

/// Sensor intensity in `[0, 1]` to the full `u16` range
pub fn intensity_to_u16(intensity: f32) -> u16 {
    (intensity.clamp(0.0, 1.0) * 65535.0) as u16
}
