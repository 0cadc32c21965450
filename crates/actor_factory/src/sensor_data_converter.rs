//! CARLA LiDAR measurement conversion
//!
//! Turns a native `LidarMeasurement` into a `LidarScan`.
//! Only compiled when the `real-carla` feature is enabled.

use carla::sensor::data::LidarMeasurement;
use carla::sensor::{SensorData, SensorDataBase};
use contracts::LidarScan;

/// View a slice of plain-old-data detections as bytes
///
/// # Safety
/// `T` must be a `repr(C)` type without padding or pointers.
#[inline]
unsafe fn pod_slice_as_bytes<T>(slice: &[T]) -> &[u8] {
    std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice))
}

/// Convert a CARLA sensor event into a LiDAR scan
///
/// Returns None if the event is not a LiDAR measurement.
pub fn convert_lidar_data(data: &SensorData) -> Option<LidarScan> {
    let timestamp = data.timestamp();
    let frame = data.frame() as u64;

    let lidar = LidarMeasurement::try_from(data.clone()).ok()?;
    // Each detection is x, y, z, intensity as f32
    let raw = unsafe { pod_slice_as_bytes(lidar.as_slice()) };
    LidarScan::from_raw(frame, timestamp, raw)
}
