//! Recording statistics

use std::time::Duration;

use observability::RunningStats;
use phantom_spawner::StepReport;

/// Totals of a recording run
#[derive(Debug, Clone, Default)]
pub struct RecordingStats {
    /// Instances recorded to the end (or until stopped)
    pub instances: usize,

    /// Instances abandoned after a non-fatal error
    pub instances_skipped: usize,

    pub frames: u64,

    pub scans_saved: u64,

    /// Ticks after which no scan arrived within the settle time
    pub scans_missed: u64,

    pub phantoms_spawned: u64,
    pub phantoms_rejected: u64,
    pub phantoms_despawned: u64,

    /// Phantoms still alive when an instance ended
    pub phantoms_released: u64,

    /// Dataset actors that could not be placed in the simulator
    pub scene_spawn_failures: u64,

    pub duration: Duration,

    /// Wall time per frame (ms)
    pub frame_ms: RunningStats,
}

impl RecordingStats {
    pub fn add_step(&mut self, report: &StepReport) {
        self.phantoms_spawned += report.spawned as u64;
        self.phantoms_rejected += report.rejected as u64;
        self.phantoms_despawned += report.despawned as u64;
    }

    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Recording Statistics ===\n");
        println!("Overview");
        println!("  Duration:          {:.2}s", self.duration.as_secs_f64());
        println!(
            "  Instances:         {} ({} skipped)",
            self.instances, self.instances_skipped
        );
        println!("  Frames:            {}", self.frames);
        println!("  FPS:               {:.2}", self.fps());
        println!("  Frame time (ms):   {}", self.frame_ms);

        println!("\nLiDAR");
        println!("  Scans saved:       {}", self.scans_saved);
        println!("  Scans missed:      {}", self.scans_missed);

        println!("\nPhantoms");
        println!("  Spawned:           {}", self.phantoms_spawned);
        println!("  Rejected:          {}", self.phantoms_rejected);
        println!("  Despawned:         {}", self.phantoms_despawned);
        println!("  Released at end:   {}", self.phantoms_released);

        if self.scene_spawn_failures > 0 {
            println!("\nScene actors not placed: {}", self.scene_spawn_failures);
        }
        println!();
    }
}
