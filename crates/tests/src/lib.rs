//! # Integration Tests
//!
//! End-to-end runs of the recorder against the mock simulator.
//!
//! Covers:
//! - Settings file → recorder → on-disk outputs
//! - Phantom lifetime, placement and allow-list in the written annotations
//! - Cleanup after a dropped connection
//! - Recorded scans through the OBJ converter

#[cfg(test)]
mod support {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    use actor_factory::MockCarlaClient;
    use cli::pipeline::{InstanceOutput, Recorder, RecorderConfig, RecordingStats};
    use contracts::{
        AnnotationId, BoundingBox, FrameAnnotation, RecorderSettings, Weather, PHANTOM_CLASS,
    };
    use dataset::{frame_file_name, read_annotation, write_annotation};
    use serde_json::Map;

    pub const TOWN03: &str = "Accident_Town03_Route156_Weather0";
    pub const TOWN05: &str = "ParkingExit_Town05_Route12_Weather3";

    fn bbox(class: &str, id: i64, type_id: &str, location: [f64; 3]) -> BoundingBox {
        BoundingBox {
            class: class.to_string(),
            id: AnnotationId::Number(id),
            type_id: Some(type_id.to_string()),
            base_type: None,
            location,
            rotation: [0.0, 0.0, 0.0],
            extent: Some([2.4, 1.0, 0.8]),
            extra: Map::new(),
        }
    }

    /// Ego driving along +x, one parked car, one pedestrian appearing halfway
    pub fn write_instance(root: &Path, name: &str, frames: usize) {
        let anno = root.join(name).join("anno");
        std::fs::create_dir_all(&anno).unwrap();
        for i in 0..frames {
            let mut boxes = vec![
                bbox("ego_vehicle", 100, "vehicle.lincoln.mkz_2020", [i as f64 * 2.0, 0.0, 0.5]),
                bbox("vehicle", 101, "vehicle.tesla.model3", [40.0, 3.5, 0.5]),
            ];
            if i >= frames / 2 {
                boxes.push(bbox("walker", 102, "walker.pedestrian.0001", [30.0, -4.0, 0.9]));
            }
            let frame = FrameAnnotation {
                bounding_boxes: boxes,
                weather: Some(Weather {
                    cloudiness: 30.0,
                    ..Default::default()
                }),
                extra: Map::new(),
            };
            write_annotation(&anno.join(frame_file_name(i)), &frame).unwrap();
        }
    }

    pub fn config(settings: &RecorderSettings, dataset: &Path, output: &Path) -> RecorderConfig {
        let mut config = RecorderConfig::from_settings(settings, dataset, output);
        config.settle = Duration::from_millis(20);
        config
    }

    pub async fn record(
        config: RecorderConfig,
        client: &mut MockCarlaClient,
    ) -> anyhow::Result<RecordingStats> {
        Recorder::new(config)?
            .run(client, Arc::new(AtomicBool::new(false)))
            .await
    }

    pub fn augmented_frames(output: &Path, instance: &str) -> Vec<FrameAnnotation> {
        let dir = InstanceOutput::new(output, instance).anno_new;
        sorted_files(&dir)
            .iter()
            .map(|path| read_annotation(path).unwrap())
            .collect()
    }

    pub fn phantoms(frame: &FrameAnnotation) -> Vec<&BoundingBox> {
        frame
            .bounding_boxes
            .iter()
            .filter(|b| b.class == PHANTOM_CLASS)
            .collect()
    }

    /// Spawn frame encoded in a phantom id (`random_<frame>_<index>`)
    pub fn spawn_frame(phantom: &BoundingBox) -> usize {
        match &phantom.id {
            AnnotationId::Text(id) => id.split('_').nth(1).unwrap().parse().unwrap(),
            other => panic!("phantom id should be text, got {other:?}"),
        }
    }

    pub fn sorted_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod recording_tests {
    use actor_factory::{MockCarlaClient, MockConfig};
    use cli::pipeline::{is_connection_loss, InstanceOutput};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{RecorderSettings, SpawnTrigger, ValueRange, WorldSettings};

    use super::support::*;

    const SETTINGS: &str = r#"
        [carla]
        host = "127.0.0.1"
        port = 2000

        [lidar]
        channels = 32
        points_per_second = 600000

        [spawn]
        frequency = { min = 5, max = 5 }
        distance = { min = 6.0, max = 9.0 }
        persistence = { min = 3, max = 3 }
        rotation = { min = -90.0, max = 90.0 }
        allowed_objects = ["static.prop.trafficcone01"]
        trigger = { kind = "interval", frames = 10 }

        [recording]
        seed = 7
    "#;

    fn settings() -> RecorderSettings {
        ConfigLoader::load_from_str(SETTINGS, ConfigFormat::Toml).unwrap()
    }

    #[tokio::test]
    async fn test_e2e_recording_layout() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);
        write_instance(data.path(), TOWN05, 4);

        let mut client = MockCarlaClient::new();
        let stats = record(config(&settings(), data.path(), out.path()), &mut client)
            .await
            .unwrap();

        assert_eq!(stats.instances, 2);
        assert_eq!(stats.frames, 16);
        assert_eq!(stats.scans_saved, 16);
        assert_eq!(stats.scans_missed, 0);

        for (instance, frames) in [(TOWN03, 12), (TOWN05, 4)] {
            let output = InstanceOutput::new(out.path(), instance);
            assert_eq!(sorted_files(&output.lidar).len(), frames);
            assert_eq!(sorted_files(&output.anno_original).len(), frames);
            assert_eq!(sorted_files(&output.anno_new).len(), frames);
            assert!(output.scan_path(0).exists());
        }

        // Everything is gone and the world is back in asynchronous mode
        assert_eq!(client.actor_count(), 0);
        assert_eq!(client.current_map().as_deref(), Some("Town05"));
        assert_eq!(client.current_settings(), WorldSettings::asynchronous());
    }

    #[tokio::test]
    async fn test_e2e_phantom_lifetime_in_annotations() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);

        let mut client = MockCarlaClient::new();
        let stats = record(config(&settings(), data.path(), out.path()), &mut client)
            .await
            .unwrap();

        // Batches on frames 0 and 10, five objects each, three frames alive
        assert_eq!(stats.phantoms_spawned, 10);
        assert_eq!(stats.phantoms_rejected, 0);
        let counts: Vec<usize> = augmented_frames(out.path(), TOWN03)
            .iter()
            .map(|f| phantoms(f).len())
            .collect();
        assert_eq!(counts, vec![5, 5, 5, 0, 0, 0, 0, 0, 0, 0, 5, 5]);

        for (index, frame) in augmented_frames(out.path(), TOWN03).iter().enumerate() {
            for phantom in phantoms(frame) {
                let age = index - spawn_frame(phantom);
                assert!(age < 3, "phantom {:?} outlived its persistence", phantom.id);
            }
        }
    }

    #[tokio::test]
    async fn test_e2e_allow_list_and_placement() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);

        let mut client = MockCarlaClient::new();
        record(config(&settings(), data.path(), out.path()), &mut client)
            .await
            .unwrap();

        let mut checked = 0;
        for (index, frame) in augmented_frames(out.path(), TOWN03).iter().enumerate() {
            let ego = frame.ego().unwrap().location;
            for phantom in phantoms(frame) {
                assert_eq!(
                    phantom.type_id.as_deref(),
                    Some("static.prop.trafficcone01")
                );
                let yaw = phantom.rotation[2];
                assert!((-90.0..=90.0).contains(&yaw), "yaw {yaw} out of range");

                // Placement is relative to the ego of the spawn frame
                if spawn_frame(phantom) == index {
                    let dx = phantom.location[0] - ego[0];
                    let dy = phantom.location[1] - ego[1];
                    let d = (dx * dx + dy * dy).sqrt();
                    assert!((6.0 - 1e-6..=9.0 + 1e-6).contains(&d), "distance {d}");
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 10);
    }

    #[tokio::test]
    async fn test_e2e_exact_batch_size_counts_attempts() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 1);

        // Every attempt is refused; refusals are counted, never retried
        let mut client = MockCarlaClient::with_config(MockConfig {
            reject_blueprints: vec!["static.prop.trafficcone01".to_string()],
            ..Default::default()
        });
        let stats = record(config(&settings(), data.path(), out.path()), &mut client)
            .await
            .unwrap();

        assert_eq!(stats.phantoms_rejected, 5);
        assert_eq!(stats.phantoms_spawned, 0);
        let frames = augmented_frames(out.path(), TOWN03);
        assert!(phantoms(&frames[0]).is_empty());
    }

    #[tokio::test]
    async fn test_e2e_exact_batch_size_spawns_exactly() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 1);

        let mut client = MockCarlaClient::new();
        let stats = record(config(&settings(), data.path(), out.path()), &mut client)
            .await
            .unwrap();

        assert_eq!(stats.phantoms_spawned, 5);
        let frames = augmented_frames(out.path(), TOWN03);
        assert_eq!(phantoms(&frames[0]).len(), 5);
    }

    #[tokio::test]
    async fn test_e2e_same_seed_same_phantoms() {
        let data = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);

        let mut settings = settings();
        settings.spawn.allowed_objects = None;
        settings.spawn.frequency = ValueRange::new(1, 8);
        settings.spawn.trigger = SpawnTrigger::Probability { p: 0.4 };

        let mut runs = Vec::new();
        for _ in 0..2 {
            let out = tempfile::tempdir().unwrap();
            let mut client = MockCarlaClient::new();
            record(config(&settings, data.path(), out.path()), &mut client)
                .await
                .unwrap();
            runs.push(augmented_frames(out.path(), TOWN03));
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn test_e2e_disconnect_releases_everything() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);
        write_instance(data.path(), TOWN05, 12);

        let mut settings = settings();
        settings.spawn.persistence = ValueRange::exactly(30);
        let mut client = MockCarlaClient::with_config(MockConfig {
            disconnect_after_ticks: Some(4),
            ..Default::default()
        });
        let err = record(config(&settings, data.path(), out.path()), &mut client)
            .await
            .unwrap_err();

        assert!(is_connection_loss(&err));
        assert_eq!(client.actor_count(), 0);
        // The second instance was never started
        assert_eq!(client.current_map().as_deref(), Some("Town03"));
        assert!(!InstanceOutput::new(out.path(), TOWN05).anno_new.exists());
    }

    #[tokio::test]
    async fn test_e2e_max_frames_across_instances() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, 12);
        write_instance(data.path(), TOWN05, 12);

        let mut settings = settings();
        settings.recording.max_frames = Some(15);
        let mut client = MockCarlaClient::new();
        let stats = record(config(&settings, data.path(), out.path()), &mut client)
            .await
            .unwrap();

        assert_eq!(stats.frames, 15);
        assert_eq!(client.tick_count(), 15);
        assert_eq!(sorted_files(&InstanceOutput::new(out.path(), TOWN05).lidar).len(), 3);
    }
}

#[cfg(test)]
mod convert_tests {
    use actor_factory::{MockCarlaClient, MockConfig};
    use cli::pipeline::InstanceOutput;
    use pointcloud::{ColorBy, ConvertOptions};

    use super::support::*;

    const POINTS_PER_SCAN: usize = 64;

    async fn recorded_scans(frames: usize) -> (tempfile::TempDir, InstanceOutput) {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_instance(data.path(), TOWN03, frames);

        let mut client = MockCarlaClient::with_config(MockConfig {
            lidar_points: POINTS_PER_SCAN,
            ..Default::default()
        });
        let settings = contracts::RecorderSettings::default();
        record(config(&settings, data.path(), out.path()), &mut client)
            .await
            .unwrap();
        let output = InstanceOutput::new(out.path(), TOWN03);
        (out, output)
    }

    fn count_prefix(obj: &str, prefix: &str) -> usize {
        obj.lines().filter(|l| l.starts_with(prefix)).count()
    }

    #[tokio::test]
    async fn test_e2e_convert_recorded_scan() {
        let (out, output) = recorded_scans(2).await;
        let obj_path = out.path().join("scan.obj");

        let options = ConvertOptions {
            color_by: ColorBy::None,
            ..Default::default()
        };
        let summary = pointcloud::convert(&output.scan_path(0), &obj_path, &options).unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.points, POINTS_PER_SCAN);
        let obj = std::fs::read_to_string(&obj_path).unwrap();
        assert_eq!(count_prefix(&obj, "v "), POINTS_PER_SCAN);
        assert_eq!(count_prefix(&obj, "p "), POINTS_PER_SCAN);
    }

    #[tokio::test]
    async fn test_e2e_convert_stacked_directory() {
        let (out, output) = recorded_scans(3).await;
        let obj_path = out.path().join("stack.obj");

        let options = ConvertOptions {
            color_by: ColorBy::File,
            stack: true,
            subsample: Some(16),
            seed: Some(3),
            ..Default::default()
        };
        let summary = pointcloud::convert(&output.lidar, &obj_path, &options).unwrap();

        assert_eq!(summary.files, 3);
        assert_eq!(summary.points, 48);
        assert!(summary.colored);
        let obj = std::fs::read_to_string(&obj_path).unwrap();
        assert_eq!(count_prefix(&obj, "v "), 48);
        // Coloured vertices carry six components
        let first = obj.lines().find(|l| l.starts_with("v ")).unwrap();
        assert_eq!(first.split_whitespace().count(), 7);
    }
}

#[cfg(test)]
mod spawner_tests {
    use actor_factory::{CarlaClient, MockCarlaClient};
    use contracts::{Location, Rotation, SpawnConfig, Transform, ValueRange};
    use phantom_spawner::SpawnController;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[tokio::test]
    async fn test_persistence_decreases_by_one_per_frame() {
        let mut client = MockCarlaClient::new();
        client
            .connect("127.0.0.1", 2000, std::time::Duration::from_secs(1))
            .await
            .unwrap();

        let config = SpawnConfig {
            frequency: ValueRange::exactly(4),
            persistence: ValueRange::new(2, 6),
            ..Default::default()
        };
        let mut controller = SpawnController::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let ego = Transform::new(Location::new(0.0, 0.0, 0.0), Rotation::default());

        controller.step(&client, 0, Some(&ego), &mut rng).await.unwrap();
        let mut previous: Vec<(u32, u32)> = controller
            .live()
            .iter()
            .map(|p| (p.actor_id, p.remaining))
            .collect();
        assert_eq!(previous.len(), 4);

        for frame in 1..10 {
            controller.step(&client, frame, Some(&ego), &mut rng).await.unwrap();
            for (actor_id, remaining) in &previous {
                match controller.live().iter().find(|p| p.actor_id == *actor_id) {
                    Some(p) => assert_eq!(p.remaining, remaining - 1),
                    None => assert_eq!(*remaining, 1, "despawned early"),
                }
            }
            previous = controller
                .live()
                .iter()
                .map(|p| (p.actor_id, p.remaining))
                .collect();
        }

        assert!(controller.live().is_empty());
        assert_eq!(client.actor_count(), 0);
    }
}
