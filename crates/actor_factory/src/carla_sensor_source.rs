//! CARLA Sensor SensorSource wrapper
//!
//! Wraps a native LiDAR `Sensor` as a type implementing `SensorSource`.
//! Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carla::client::Sensor;
use contracts::{LidarCallback, SensorSource};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_lidar_data;

/// CARLA LiDAR sensor wrapper
pub struct CarlaSensorSource {
    sensor_id: String,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    pub fn new(sensor_id: String, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn listen(&self, callback: LidarCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(sensor_id = %self.sensor_id, "sensor already listening");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let listening = self.listening.clone();

        debug!(sensor_id = %sensor_id, "starting CARLA lidar");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_lidar_data(&sensor_data) {
                Some(scan) => {
                    trace!(
                        sensor_id = %sensor_id,
                        frame = scan.frame,
                        points = scan.len(),
                        "CARLA lidar sweep received"
                    );
                    callback(scan);
                }
                None => {
                    trace!(sensor_id = %sensor_id, "sensor event is not a lidar measurement");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor_id = %self.sensor_id, "stopping CARLA lidar");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
