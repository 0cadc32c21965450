//! LiDAR recorder - replays dataset instances and records phantom-augmented sweeps.
//!
//! Per instance: load the town, replay every annotation frame into the
//! simulator, drive the phantom spawner, tick, and store the LiDAR sweep
//! with the original and augmented annotations.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::{ActorFactoryError, CarlaClient, SceneActors};
use anyhow::{Context, Result};
use contracts::{
    ActorId, ContractError, LidarConfig, LidarScan, RecorderSettings, SensorSource, SpawnConfig,
    WorldSettings, LIDAR_BLUEPRINT,
};
use dataset::{discover_instances, frame_file_name, read_annotation, write_annotation, DatasetInstance};
use phantom_spawner::SpawnController;
use pointcloud::ScanWriter;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, instrument, warn};

use super::{LatestScan, RecordingStats};

/// Sensor id handed to the LiDAR source
const LIDAR_SENSOR_ID: &str = "lidar";

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Instance directory or a directory of instances
    pub dataset_path: PathBuf,

    pub output_path: PathBuf,

    pub host: String,
    pub port: u16,
    pub timeout: Duration,

    pub lidar: LidarConfig,
    pub spawn: SpawnConfig,

    /// Frames to record across all instances (None = all)
    pub max_frames: Option<u64>,

    /// Phantom spawner seed (None = entropy)
    pub seed: Option<u64>,

    /// Attach a LiDAR and write scans; off for plain scene replay
    pub capture_lidar: bool,

    /// Wait for a sweep after each tick
    pub settle: Duration,
}

impl RecorderConfig {
    pub fn from_settings(
        settings: &RecorderSettings,
        dataset_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            output_path: output_path.into(),
            host: settings.carla.host.clone(),
            port: settings.carla.port,
            timeout: Duration::from_secs_f64(settings.carla.timeout_secs),
            lidar: settings.lidar.clone(),
            spawn: settings.spawn.clone(),
            max_frames: settings.recording.max_frames,
            seed: settings.recording.seed,
            capture_lidar: true,
            settle: Duration::from_millis(settings.recording.settle_ms),
        }
    }

    /// Scene replay only: no sensor, no phantoms
    pub fn replay_only(mut self) -> Self {
        self.capture_lidar = false;
        self.spawn = SpawnConfig::disabled();
        self
    }
}

/// Output folders of one instance
#[derive(Debug, Clone)]
pub struct InstanceOutput {
    pub lidar: PathBuf,
    pub anno_original: PathBuf,
    pub anno_new: PathBuf,
}

impl InstanceOutput {
    pub fn new(output_root: &Path, instance: &str) -> Self {
        let root = output_root.join(instance);
        Self {
            lidar: root.join("lidar"),
            anno_original: root.join("anno_original"),
            anno_new: root.join("anno_new"),
        }
    }

    pub fn create(&self, with_lidar: bool) -> std::io::Result<()> {
        if with_lidar {
            std::fs::create_dir_all(&self.lidar)?;
        }
        std::fs::create_dir_all(&self.anno_original)?;
        std::fs::create_dir_all(&self.anno_new)
    }

    pub fn scan_path(&self, index: usize) -> PathBuf {
        self.lidar.join(format!("{index:05}.laz"))
    }
}

/// Simulator state owned by one instance; torn down on every exit path
#[derive(Default)]
struct Session {
    scene: SceneActors,
    sensor_actor: Option<ActorId>,
    sensor: Option<Box<dyn SensorSource>>,
    latest: LatestScan,
}

/// True when the error chain contains a lost or failed simulator connection
pub fn is_connection_loss(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ActorFactoryError>()
            .is_some_and(ActorFactoryError::is_connection_error)
    })
}

/// Drives recording over all dataset instances
pub struct Recorder {
    config: RecorderConfig,
    spawner: SpawnController,
    rng: ChaCha8Rng,
    scan_writer: ScanWriter,
    frames_recorded: u64,
}

impl Recorder {
    /// Validates the spawn configuration
    pub fn new(config: RecorderConfig) -> std::result::Result<Self, ContractError> {
        let spawner = SpawnController::new(config.spawn.clone())?;
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, "phantom spawner seeded");
        Ok(Self {
            config,
            spawner,
            rng: ChaCha8Rng::seed_from_u64(seed),
            scan_writer: ScanWriter,
            frames_recorded: 0,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Record every instance until done, stopped, or the connection drops
    ///
    /// A lost connection aborts the run after cleanup; other per-instance
    /// failures skip to the next instance.
    #[instrument(name = "recorder_run", skip_all, fields(dataset = %self.config.dataset_path.display()))]
    pub async fn run<C: CarlaClient>(
        &mut self,
        client: &mut C,
        stop: Arc<AtomicBool>,
    ) -> Result<RecordingStats> {
        let start = Instant::now();
        let instances = discover_instances(&self.config.dataset_path)
            .context("Failed to discover dataset instances")?;
        info!(instances = instances.len(), "dataset instances found");

        client
            .connect(&self.config.host, self.config.port, self.config.timeout)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to CARLA at {}:{}",
                    self.config.host, self.config.port
                )
            })?;

        let mut stats = RecordingStats::default();
        for instance in &instances {
            if self.should_stop(&stop) {
                break;
            }

            match self.record_instance(client, instance, &stop, &mut stats).await {
                Ok(()) => stats.instances += 1,
                Err(e) if is_connection_loss(&e) => {
                    error!(instance = %instance.name, error = %e, "simulator connection lost");
                    return Err(e.context(format!("Recording aborted in '{}'", instance.name)));
                }
                Err(e) => {
                    warn!(instance = %instance.name, error = format!("{e:#}"), "instance skipped");
                    stats.instances_skipped += 1;
                }
            }
        }

        stats.duration = start.elapsed();
        info!(
            instances = stats.instances,
            frames = stats.frames,
            scans = stats.scans_saved,
            duration_secs = stats.duration.as_secs_f64(),
            "recording finished"
        );
        Ok(stats)
    }

    fn should_stop(&self, stop: &AtomicBool) -> bool {
        if stop.load(Ordering::SeqCst) {
            info!("stop requested");
            return true;
        }
        if let Some(max) = self.config.max_frames {
            if self.frames_recorded >= max {
                info!(frames = self.frames_recorded, "reached max frames limit");
                return true;
            }
        }
        false
    }

    #[instrument(name = "recorder_instance", skip_all, fields(instance = %instance.name))]
    async fn record_instance<C: CarlaClient>(
        &mut self,
        client: &C,
        instance: &DatasetInstance,
        stop: &AtomicBool,
        stats: &mut RecordingStats,
    ) -> Result<()> {
        let town = instance.town()?.to_string();
        let frames = instance.annotation_files()?;
        if frames.is_empty() {
            anyhow::bail!("no annotation frames in {}", instance.anno_dir().display());
        }

        info!(town = %town, frames = frames.len(), "loading world");
        client
            .load_world(&town)
            .await
            .with_context(|| format!("Failed to load map {town}"))?;
        client
            .apply_settings(WorldSettings::recording())
            .await
            .context("Failed to enable synchronous mode")?;

        let output = InstanceOutput::new(&self.config.output_path, &instance.name);
        output
            .create(self.config.capture_lidar)
            .with_context(|| format!("Failed to create output folders for {}", instance.name))?;

        let mut session = Session::default();
        let result = self
            .replay_frames(client, &town, &frames, &output, &mut session, stop, stats)
            .await;
        self.teardown(client, &mut session, stats).await;
        result
    }

    async fn replay_frames<C: CarlaClient>(
        &mut self,
        client: &C,
        town: &str,
        frames: &[PathBuf],
        output: &InstanceOutput,
        session: &mut Session,
        stop: &AtomicBool,
        stats: &mut RecordingStats,
    ) -> Result<()> {
        for (index, path) in frames.iter().enumerate() {
            if self.should_stop(stop) {
                break;
            }
            let frame_start = Instant::now();

            let annotation = match read_annotation(path) {
                Ok(a) => a,
                Err(e) => {
                    warn!(frame = index, error = %e, "unreadable annotation, frame skipped");
                    continue;
                }
            };
            let name = frame_file_name(index);
            write_annotation(&output.anno_original.join(&name), &annotation)?;

            let sync = session
                .scene
                .sync_frame(client, &annotation.bounding_boxes)
                .await?;
            if sync.failed > 0 {
                stats.scene_spawn_failures += sync.failed as u64;
                observability::record_scene_spawn_failures(sync.failed);
            }
            if let Some(ego_id) = sync.new_ego {
                if self.config.capture_lidar && session.sensor_actor.is_none() {
                    self.attach_lidar(client, ego_id, session).await?;
                }
            }

            if let Some(weather) = &annotation.weather {
                client.set_weather(weather).await?;
            }

            let ego = annotation.ego().map(|b| b.transform());
            if ego.is_none() {
                debug!(frame = index, "no ego box, phantom batch skipped");
            }
            let report = self
                .spawner
                .step(client, index as u64, ego.as_ref(), &mut self.rng)
                .await?;
            stats.add_step(&report);
            observability::record_phantoms_spawned(report.spawned);
            observability::record_phantoms_rejected(report.rejected);
            observability::record_phantoms_despawned(report.despawned);
            observability::record_live_phantoms(report.live);

            session.latest.take();
            let sim_frame = client.tick().await?;

            if session.sensor.is_some() {
                match session.latest.wait_take(self.config.settle).await {
                    Some(scan) => {
                        let points = scan.len();
                        self.save_scan(output.scan_path(index), scan).await?;
                        stats.scans_saved += 1;
                        observability::record_scan_saved(points);
                    }
                    None => {
                        warn!(frame = index, sim_frame, "no LiDAR sweep within settle time");
                        stats.scans_missed += 1;
                    }
                }
            }

            let augmented = annotation.with_boxes(self.spawner.annotations());
            write_annotation(&output.anno_new.join(&name), &augmented)?;

            self.frames_recorded += 1;
            stats.frames += 1;
            let elapsed_ms = frame_start.elapsed().as_secs_f64() * 1000.0;
            stats.frame_ms.push(elapsed_ms);
            observability::record_frame_duration_ms(elapsed_ms);
            observability::record_frame_recorded(town);
            debug!(frame = index, sim_frame, live = self.spawner.live().len(), "frame recorded");
        }
        Ok(())
    }

    async fn attach_lidar<C: CarlaClient>(
        &self,
        client: &C,
        ego_id: ActorId,
        session: &mut Session,
    ) -> Result<()> {
        let sensor_actor = client
            .spawn_sensor(
                LIDAR_BLUEPRINT,
                self.config.lidar.mount_transform(),
                ego_id,
                &self.config.lidar.attributes(),
            )
            .await
            .context("Failed to attach LiDAR to ego vehicle")?;
        session.sensor_actor = Some(sensor_actor);

        let source = client
            .get_sensor_source(sensor_actor, LIDAR_SENSOR_ID.to_string())
            .context("LiDAR sensor source unavailable")?;
        source.listen(session.latest.callback());
        session.sensor = Some(source);
        info!(ego_id, sensor_actor, "LiDAR attached");
        Ok(())
    }

    async fn save_scan(&self, path: PathBuf, scan: LidarScan) -> Result<()> {
        let writer = self.scan_writer;
        tokio::task::spawn_blocking(move || writer.write(&path, &scan))
            .await
            .context("Scan writer task failed")?
            .context("Failed to write LiDAR scan")
    }

    /// Release phantoms, remove the sensor and scene actors, leave synchronous mode
    ///
    /// Best-effort; failures are logged.
    async fn teardown<C: CarlaClient>(
        &mut self,
        client: &C,
        session: &mut Session,
        stats: &mut RecordingStats,
    ) {
        let released = self.spawner.release_all(client).await;
        stats.phantoms_released += released as u64;
        observability::record_live_phantoms(0);

        if let Some(sensor) = session.sensor.take() {
            sensor.stop();
        }
        if let Some(sensor_actor) = session.sensor_actor.take() {
            if let Err(e) = client.destroy_actor(sensor_actor).await {
                warn!(sensor_actor, error = %e, "failed to destroy LiDAR");
            }
        }
        session.scene.teardown(client).await;

        if let Err(e) = client.apply_settings(WorldSettings::asynchronous()).await {
            warn!(error = %e, "failed to disable synchronous mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_factory::{MockCarlaClient, MockConfig};
    use contracts::{AnnotationId, BoundingBox, FrameAnnotation, ValueRange, Weather};
    use serde_json::Map;

    fn bbox(class: &str, id: i64, type_id: &str, x: f64) -> BoundingBox {
        BoundingBox {
            class: class.to_string(),
            id: AnnotationId::Number(id),
            type_id: Some(type_id.to_string()),
            base_type: None,
            location: [x, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            extent: None,
            extra: Map::new(),
        }
    }

    fn write_instance(root: &Path, name: &str, frames: usize) {
        let anno = root.join(name).join("anno");
        std::fs::create_dir_all(&anno).unwrap();
        for i in 0..frames {
            let frame = FrameAnnotation {
                bounding_boxes: vec![
                    bbox("ego_vehicle", 1, "vehicle.lincoln.mkz_2020", i as f64),
                    bbox("vehicle", 2, "vehicle.tesla.model3", 20.0 + i as f64),
                ],
                weather: Some(Weather::default()),
                extra: Map::new(),
            };
            write_annotation(&anno.join(frame_file_name(i)), &frame).unwrap();
        }
    }

    fn config(dataset: &Path, output: &Path) -> RecorderConfig {
        let mut config =
            RecorderConfig::from_settings(&RecorderSettings::default(), dataset, output);
        config.seed = Some(42);
        config.settle = Duration::from_millis(20);
        config.spawn.frequency = ValueRange::exactly(2);
        config.spawn.persistence = ValueRange::exactly(3);
        config
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_records_instance_outputs() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "Accident_Town03_Route156_Weather0", 4);

        let mut client = MockCarlaClient::new();
        let mut recorder = Recorder::new(config(data.path(), out.path())).unwrap();
        let stats = recorder
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(stats.instances, 1);
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.scans_saved, 4);
        assert_eq!(stats.phantoms_spawned, 2);

        let output = InstanceOutput::new(out.path(), "Accident_Town03_Route156_Weather0");
        assert_eq!(count_files(&output.lidar), 4);
        assert_eq!(count_files(&output.anno_original), 4);
        assert_eq!(count_files(&output.anno_new), 4);

        let first = read_annotation(&output.anno_new.join("00000.json.gz")).unwrap();
        assert_eq!(first.bounding_boxes.len(), 4);
        assert_eq!(
            first.bounding_boxes[2].id,
            AnnotationId::Text("random_0_0".into())
        );
        let last = read_annotation(&output.anno_new.join("00003.json.gz")).unwrap();
        assert_eq!(last.bounding_boxes.len(), 2);

        assert_eq!(client.current_map().as_deref(), Some("Town03"));
        assert!(!client.current_settings().synchronous_mode);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_max_frames_across_instances() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "A_Town01_Route1_Weather0", 3);
        write_instance(data.path(), "B_Town02_Route2_Weather1", 3);

        let mut cfg = config(data.path(), out.path());
        cfg.max_frames = Some(4);
        let mut client = MockCarlaClient::new();
        let stats = Recorder::new(cfg)
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(stats.frames, 4);
        assert_eq!(stats.instances, 2);
        assert_eq!(client.current_map().as_deref(), Some("Town02"));
    }

    #[tokio::test]
    async fn test_bad_instances_are_skipped() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "A_Town01_Route1_Weather0", 2);
        write_instance(data.path(), "B_NoTown_Route2", 2);
        write_instance(data.path(), "C_Town07_Route3_Weather0", 2);
        std::fs::create_dir_all(data.path().join("D_Town04_Route4/anno")).unwrap();

        let mut client = MockCarlaClient::with_config(MockConfig {
            unknown_maps: vec!["Town07".into()],
            ..Default::default()
        });
        let stats = Recorder::new(config(data.path(), out.path()))
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(stats.instances, 1);
        assert_eq!(stats.instances_skipped, 3);
        assert_eq!(stats.frames, 2);
    }

    #[tokio::test]
    async fn test_disconnect_is_fatal_and_cleans_up() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "A_Town01_Route1_Weather0", 6);
        write_instance(data.path(), "B_Town02_Route2_Weather0", 6);

        let mut cfg = config(data.path(), out.path());
        cfg.spawn.persistence = ValueRange::exactly(50);
        let mut client = MockCarlaClient::with_config(MockConfig {
            disconnect_after_ticks: Some(2),
            ..Default::default()
        });
        let err = Recorder::new(cfg)
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap_err();

        assert!(is_connection_loss(&err));
        assert_eq!(client.actor_count(), 0);
        assert_eq!(client.current_map().as_deref(), Some("Town01"));
    }

    #[tokio::test]
    async fn test_stop_flag_ends_run() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "A_Town01_Route1_Weather0", 3);

        let mut client = MockCarlaClient::new();
        let stats = Recorder::new(config(data.path(), out.path()))
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();
        assert_eq!(stats.frames, 0);
        assert_eq!(client.tick_count(), 0);
    }

    #[tokio::test]
    async fn test_phantoms_age_on_frames_without_ego() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let name = "A_Town01_Route1_Weather0";
        let anno = data.path().join(name).join("anno");
        std::fs::create_dir_all(&anno).unwrap();
        for i in 0..5 {
            let mut boxes = vec![bbox("vehicle", 2, "vehicle.tesla.model3", 20.0)];
            if i == 0 || i == 4 {
                boxes.push(bbox("ego_vehicle", 1, "vehicle.lincoln.mkz_2020", i as f64));
            }
            let frame = FrameAnnotation {
                bounding_boxes: boxes,
                weather: None,
                extra: Map::new(),
            };
            write_annotation(&anno.join(frame_file_name(i)), &frame).unwrap();
        }

        let mut cfg = config(data.path(), out.path());
        cfg.spawn.frequency = ValueRange::exactly(1);
        cfg.spawn.persistence = ValueRange::exactly(2);
        let mut client = MockCarlaClient::new();
        let stats = Recorder::new(cfg)
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        let output = InstanceOutput::new(out.path(), name);
        let counts: Vec<usize> = (0..5)
            .map(|i| {
                read_annotation(&output.anno_new.join(frame_file_name(i)))
                    .unwrap()
                    .bounding_boxes
                    .iter()
                    .filter(|b| b.class == contracts::PHANTOM_CLASS)
                    .count()
            })
            .collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0]);
        assert_eq!(stats.phantoms_despawned, 1);
        assert_eq!(stats.phantoms_released, 0);
    }

    #[tokio::test]
    async fn test_replay_only_spawns_no_phantoms_or_scans() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), "A_Town01_Route1_Weather0", 3);

        let mut client = MockCarlaClient::new();
        let stats = Recorder::new(config(data.path(), out.path()).replay_only())
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.scans_saved, 0);
        assert_eq!(stats.phantoms_spawned, 0);
        let output = InstanceOutput::new(out.path(), "A_Town01_Route1_Weather0");
        assert!(!output.lidar.exists());
        assert_eq!(client.tick_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_dataset_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let mut client = MockCarlaClient::new();
        let result = Recorder::new(config(&out.path().join("nothing"), out.path()))
            .unwrap()
            .run(&mut client, Arc::new(AtomicBool::new(false)))
            .await;
        assert!(result.is_err());
        assert!(!client.is_connected());
    }

    #[test]
    fn test_invalid_spawn_config_rejected() {
        let mut cfg = config(Path::new("."), Path::new("."));
        cfg.spawn.distance = ValueRange::new(10.0, 5.0);
        assert!(Recorder::new(cfg).is_err());
    }
}
