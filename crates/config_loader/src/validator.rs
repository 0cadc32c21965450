//! Settings validation
//!
//! Rules:
//! - every spawn range has min <= max, persistence >= 1, distance >= 0
//! - the allow-list, if present, is non-empty and fully known
//! - LiDAR channels / points / rotation frequency / range > 0
//! - upper_fov >= lower_fov
//! - CARLA host non-empty, port and timeout > 0

use contracts::{CarlaEndpoint, ContractError, LidarConfig, RecorderSettings};

/// Validate RecorderSettings
///
/// Returns the first error encountered.
pub fn validate(settings: &RecorderSettings) -> Result<(), ContractError> {
    validate_carla(&settings.carla)?;
    validate_lidar(&settings.lidar)?;
    settings.spawn.validate()?;
    validate_recording(settings)?;
    Ok(())
}

fn validate_carla(carla: &CarlaEndpoint) -> Result<(), ContractError> {
    if carla.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "carla.host",
            "host cannot be empty",
        ));
    }
    if carla.port == 0 {
        return Err(ContractError::config_validation(
            "carla.port",
            "port must be > 0",
        ));
    }
    if !(carla.timeout_secs > 0.0) {
        return Err(ContractError::config_validation(
            "carla.timeout_secs",
            format!("timeout must be > 0, got {}", carla.timeout_secs),
        ));
    }
    Ok(())
}

/// Validate the LiDAR sensor settings
pub fn validate_lidar(lidar: &LidarConfig) -> Result<(), ContractError> {
    let positive = [
        ("lidar.channels", lidar.channels as f64),
        ("lidar.points_per_second", lidar.points_per_second as f64),
        ("lidar.rotation_frequency", lidar.rotation_frequency as f64),
        ("lidar.range", lidar.range),
    ];
    for (field, value) in positive {
        if !(value > 0.0) {
            return Err(ContractError::config_validation(
                field,
                format!("must be > 0, got {value}"),
            ));
        }
    }

    if lidar.upper_fov < lidar.lower_fov {
        return Err(ContractError::config_validation(
            "lidar.upper_fov / lidar.lower_fov",
            format!(
                "upper_fov ({}) must be >= lower_fov ({})",
                lidar.upper_fov, lidar.lower_fov
            ),
        ));
    }
    Ok(())
}

fn validate_recording(settings: &RecorderSettings) -> Result<(), ContractError> {
    if settings.recording.max_frames == Some(0) {
        return Err(ContractError::config_validation(
            "recording.max_frames",
            "max_frames must be > 0 when set",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ValueRange;

    #[test]
    fn test_valid_config() {
        assert!(validate(&RecorderSettings::default()).is_ok());
    }

    #[test]
    fn test_spawn_min_greater_than_max() {
        let mut settings = RecorderSettings::default();
        settings.spawn.frequency = ValueRange::new(10, 5);
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("spawn.frequency"), "got: {err}");
    }

    #[test]
    fn test_unknown_allowed_object() {
        let mut settings = RecorderSettings::default();
        settings.spawn.allowed_objects = Some(vec![
            "static.prop.trafficcone01".into(),
            "static.prop.piano".into(),
        ]);
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("static.prop.piano"), "got: {err}");
    }

    #[test]
    fn test_invalid_fov() {
        let mut settings = RecorderSettings::default();
        settings.lidar.upper_fov = -40.0;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("upper_fov"), "got: {err}");
    }

    #[test]
    fn test_zero_channels() {
        let mut settings = RecorderSettings::default();
        settings.lidar.channels = 0;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("lidar.channels"), "got: {err}");
    }

    #[test]
    fn test_empty_host() {
        let mut settings = RecorderSettings::default();
        settings.carla.host = "  ".into();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_zero_max_frames() {
        let mut settings = RecorderSettings::default();
        settings.recording.max_frames = Some(0);
        assert!(validate(&settings).is_err());
    }
}
