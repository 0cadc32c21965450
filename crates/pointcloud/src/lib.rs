//! Point-cloud IO for recorded LiDAR scans
//!
//! Writes scans as LAS/LAZ, reads them back, and exports them as coloured
//! Wavefront OBJ point meshes.

pub mod cloud;
pub mod colormap;
pub mod convert;
pub mod error;
pub mod las_io;
pub mod obj;

pub use cloud::{Bounds, PointCloud};
pub use colormap::{ColorBy, Colormap, Rgb};
pub use convert::{convert, ConversionSummary, ConvertOptions};
pub use error::{ConvertError, Result};
pub use las_io::{read_cloud, ScanWriter};
pub use obj::write_obj;
