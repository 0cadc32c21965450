//! Mock LiDAR sensor
//!
//! Implements `SensorSource` without a simulator. Scans are produced by
//! [`MockLidar::emit`], which the mock client calls on every tick, so data
//! arrives in lock-step with the simulation like a real synchronous-mode
//! sensor.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{LidarCallback, LidarPoint, LidarScan, SensorSource};
use tracing::{debug, trace};

/// Shared state of one mock LiDAR
///
/// Owned by the mock client; handed out as `SensorSource` through
/// [`MockLidar::source`].
#[derive(Default)]
pub struct MockLidar {
    points_per_scan: usize,
    listening: AtomicBool,
    callback: Mutex<Option<LidarCallback>>,
}

impl MockLidar {
    pub fn new(points_per_scan: usize) -> Arc<Self> {
        Arc::new(Self {
            points_per_scan,
            ..Default::default()
        })
    }

    /// Sensor handle for the recorder
    pub fn source(self: &Arc<Self>, sensor_id: String) -> MockLidarSource {
        MockLidarSource {
            sensor_id,
            lidar: Arc::clone(self),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// Deliver one sweep to the registered callback, if any
    pub fn emit(&self, frame: u64, timestamp: f64) {
        if !self.is_listening() {
            return;
        }
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            let scan = LidarScan {
                frame,
                timestamp,
                points: synthetic_sweep(self.points_per_scan, frame),
            };
            trace!(frame, points = scan.len(), "mock lidar sweep");
            callback(scan);
        }
    }
}

/// Ring of points around the sensor with a slight per-frame rotation
fn synthetic_sweep(count: usize, frame: u64) -> Vec<LidarPoint> {
    let phase = (frame % 360) as f32 * TAU / 360.0;
    (0..count)
        .map(|i| {
            let angle = phase + i as f32 * TAU / count.max(1) as f32;
            let radius = 10.0 + (i % 7) as f32;
            LidarPoint {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
                z: -1.5 + (i % 5) as f32 * 0.1,
                intensity: (i % 10) as f32 / 10.0,
            }
        })
        .collect()
}

/// `SensorSource` view of a [`MockLidar`]
pub struct MockLidarSource {
    sensor_id: String,
    lidar: Arc<MockLidar>,
}

impl SensorSource for MockLidarSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn listen(&self, callback: LidarCallback) {
        // Repeated calls while listening are ignored
        if self.lidar.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.lidar.callback.lock().unwrap() = Some(callback);
        debug!(sensor_id = %self.sensor_id, "mock lidar listening");
    }

    fn stop(&self) {
        if self.lidar.listening.swap(false, Ordering::SeqCst) {
            self.lidar.callback.lock().unwrap().take();
            debug!(sensor_id = %self.sensor_id, "mock lidar stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.lidar.is_listening()
    }
}
