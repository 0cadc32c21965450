//! Recorder metrics
//!
//! Thin wrappers over the `metrics` facade; without an installed recorder
//! every call is a no-op.

use metrics::{counter, gauge, histogram};

/// One annotation frame processed
pub fn record_frame_recorded(town: &str) {
    counter!("phantom_lidar_frames_total", "town" => town.to_string()).increment(1);
}

/// One LiDAR scan written to disk
pub fn record_scan_saved(points: usize) {
    counter!("phantom_lidar_scans_saved_total").increment(1);
    histogram!("phantom_lidar_scan_points").record(points as f64);
}

pub fn record_phantoms_spawned(count: usize) {
    if count > 0 {
        counter!("phantom_lidar_phantoms_spawned_total").increment(count as u64);
    }
}

/// Spawn attempts the simulator refused
pub fn record_phantoms_rejected(count: usize) {
    if count > 0 {
        counter!("phantom_lidar_phantoms_rejected_total").increment(count as u64);
    }
}

pub fn record_phantoms_despawned(count: usize) {
    if count > 0 {
        counter!("phantom_lidar_phantoms_despawned_total").increment(count as u64);
    }
}

pub fn record_live_phantoms(live: usize) {
    gauge!("phantom_lidar_phantoms_live").set(live as f64);
}

/// Scene actors from the dataset that could not be placed
pub fn record_scene_spawn_failures(count: usize) {
    if count > 0 {
        counter!("phantom_lidar_scene_spawn_failures_total").increment(count as u64);
    }
}

/// Wall time of one frame (ms)
pub fn record_frame_duration_ms(ms: f64) {
    histogram!("phantom_lidar_frame_duration_ms").record(ms);
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl std::fmt::Display for RunningStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min,
                self.max,
                self.mean(),
                self.std_dev(),
                self.count
            )
        }
    }
}
