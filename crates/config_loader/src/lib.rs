//! # Config Loader
//!
//! Recorder settings loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON settings files
//! - Validate every range and sensor attribute
//! - Produce `RecorderSettings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("recorder.toml")).unwrap();
//! println!("CARLA at {}:{}", settings.carla.host, settings.carla.port);
//! ```

mod parser;
mod validator;

pub use contracts::RecorderSettings;
pub use parser::ConfigFormat;
pub use validator::{validate, validate_lidar};

use contracts::ContractError;
use std::path::Path;

/// Settings loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from a file path
    ///
    /// Format is taken from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RecorderSettings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load settings from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RecorderSettings, ContractError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        Ok(settings)
    }

    /// Serialize settings to TOML
    pub fn to_toml(settings: &RecorderSettings) -> Result<String, ContractError> {
        toml::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize settings to JSON
    pub fn to_json(settings: &RecorderSettings) -> Result<String, ContractError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SpawnTrigger;

    const SAMPLE_TOML: &str = r#"
[carla]
host = "carla.local"
port = 2000
timeout_secs = 60.0

[lidar]
channels = 64
range = 80.0
upper_fov = 10.0
lower_fov = -30.0

[spawn]
frequency = { min = 2, max = 4 }
distance = { min = 6.0, max = 12.0 }
persistence = { min = 5, max = 8 }
allowed_objects = ["static.prop.trafficcone01", "vehicle.tesla.model3"]

[spawn.trigger]
kind = "interval"
frames = 5

[recording]
seed = 42
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let settings = result.unwrap();
        assert_eq!(settings.carla.host, "carla.local");
        assert_eq!(settings.lidar.range, 80.0);
        assert_eq!(settings.spawn.trigger, SpawnTrigger::Interval { frames: 5 });
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&settings).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(settings, again);
    }

    #[test]
    fn test_round_trip_json() {
        let settings = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&settings).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(settings, again);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[spawn]
distance = { min = 10.0, max = 5.0 }
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("spawn.distance"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.toml");
        std::fs::write(&path, SAMPLE_TOML).unwrap();
        let settings = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(settings.recording.seed, Some(42));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.yaml");
        std::fs::write(&path, "carla: {}").unwrap();
        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
