//! Dataset size variants and where each one lives

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MANIFEST_BASE_URL: &str = "https://raw.githubusercontent.com/Thinklab-SJTU/Bench2Drive/main/docs";

/// Scenario archives that make up the mini dataset
pub const MINI_FILES: [&str; 10] = [
    "HardBreakRoute_Town01_Route30_Weather3.tar.gz",
    "DynamicObjectCrossing_Town02_Route13_Weather6.tar.gz",
    "Accident_Town03_Route156_Weather0.tar.gz",
    "YieldToEmergencyVehicle_Town04_Route165_Weather7.tar.gz",
    "ConstructionObstacle_Town05_Route68_Weather8.tar.gz",
    "ParkedObstacle_Town10HD_Route371_Weather7.tar.gz",
    "ControlLoss_Town11_Route401_Weather11.tar.gz",
    "AccidentTwoWays_Town12_Route1444_Weather0.tar.gz",
    "OppositeVehicleTakingPriority_Town13_Route600_Weather2.tar.gz",
    "VehicleTurningRoute_Town15_Route443_Weather1.tar.gz",
];

/// Bench2Drive dataset size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSize {
    #[default]
    Mini,
    Base,
    Full,
}

impl DatasetSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mini => "mini",
            Self::Base => "base",
            Self::Full => "full",
        }
    }

    /// Hugging Face dataset repository
    pub fn repo_id(&self) -> &'static str {
        match self {
            Self::Mini | Self::Base => "rethinklab/Bench2Drive",
            Self::Full => "rethinklab/Bench2Drive-Full",
        }
    }

    /// Published `{file: {size, sha256}}` manifest
    pub fn manifest_url(&self) -> String {
        let name = match self {
            Self::Mini => "bench2drive_mini_10.json",
            Self::Base => "bench2drive_base_1000.json",
            Self::Full => "bench2drive_full+sup_13638.json",
        };
        format!("{MANIFEST_BASE_URL}/{name}")
    }

    /// File name the manifest is stored under in the target directory
    pub fn manifest_file_name(&self) -> String {
        format!("bench2drive_{}.json", self.as_str())
    }

    /// Whether a repository file belongs to this size
    pub fn includes(&self, repo_path: &str) -> bool {
        match self {
            Self::Mini => MINI_FILES.iter().any(|f| repo_path.ends_with(f)),
            Self::Base | Self::Full => true,
        }
    }
}

impl fmt::Display for DatasetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mini" => Ok(Self::Mini),
            "base" => Ok(Self::Base),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown dataset size '{other}' (mini, base, full)")),
        }
    }
}
