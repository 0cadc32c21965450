//! SensorSource trait - LiDAR data source abstraction
//!
//! Decouples the recorder from the concrete sensor: a real CARLA sensor and
//! the mock sensor deliver scans through the same callback interface.

use std::sync::Arc;

use crate::LidarScan;

/// Scan callback type
///
/// Called from the sensor's own thread for every sweep.
pub type LidarCallback = Arc<dyn Fn(LidarScan) + Send + Sync>;

/// LiDAR data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = client.get_sensor_source(actor_id, "lidar".into())?;
/// sensor.listen(Arc::new(|scan| {
///     println!("frame {} with {} points", scan.frame, scan.len());
/// }));
/// // ... tick the world ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Register data callback
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: LidarCallback);

    /// Stop listening
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
