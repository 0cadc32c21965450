//! Single-slot hand-off of LiDAR scans from the sensor thread

use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{LidarCallback, LidarScan};
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Most recent scan delivered by the sensor callback
///
/// Older scans are overwritten; the recorder only ever wants the sweep of
/// the frame it just ticked.
#[derive(Debug, Clone, Default)]
pub struct LatestScan {
    slot: Arc<Mutex<Option<LidarScan>>>,
}

impl LatestScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that stores every incoming scan in this slot
    pub fn callback(&self) -> LidarCallback {
        let slot = Arc::clone(&self.slot);
        Arc::new(move |scan: LidarScan| {
            *slot.lock().unwrap() = Some(scan);
        })
    }

    pub fn take(&self) -> Option<LidarScan> {
        self.slot.lock().unwrap().take()
    }

    /// Take the next scan, waiting at most `settle` for one to arrive
    pub async fn wait_take(&self, settle: Duration) -> Option<LidarScan> {
        let deadline = Instant::now() + settle;
        loop {
            if let Some(scan) = self.take() {
                return Some(scan);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
