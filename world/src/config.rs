use crate::assemble::VerticalPlacement;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, prelude::*},
    path::Path,
};
use tracing::{error, warn};

/// Tunables shared by every assembly. Missing fields fall back to their
/// defaults, so old settings files keep loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenSettings {
    /// Upper bound on retry-until-valid attempts for a single structure.
    pub max_attempts: u32,
    /// Roots resting on terrain lower than this are not placed.
    pub min_ground_height: i32,
    pub sea_level: i32,
    pub end_city: EndCitySettings,
    pub fortress: FortressSettings,
    pub ruin: RuinSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndCitySettings {
    /// Side of the footprint whose corners are sampled to seat the city.
    pub footprint: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortressSettings {
    /// Beyond this depth every exit is capped with a dead end.
    pub depth_limit: u32,
    /// Horizontal distance from the start beyond which exits are capped.
    pub radius: i32,
    /// Tries at picking a fitting piece before an exit is capped.
    pub piece_tries: u32,
    pub vertical: VerticalPlacement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuinSettings {
    pub large_chance: f32,
    pub cluster_chance: f32,
    pub large_integrity: f32,
    pub small_integrity: f32,
    /// Spacing between the large ruin and its satellites.
    pub cluster_spacing: i32,
}

impl Default for GenSettings {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            min_ground_height: 60,
            sea_level: 63,
            end_city: EndCitySettings::default(),
            fortress: FortressSettings::default(),
            ruin: RuinSettings::default(),
        }
    }
}

impl Default for EndCitySettings {
    fn default() -> Self { Self { footprint: 5 } }
}

impl Default for FortressSettings {
    fn default() -> Self {
        Self {
            depth_limit: 30,
            radius: 112,
            piece_tries: 5,
            vertical: VerticalPlacement::InsideHeights { min: 48, max: 70 },
        }
    }
}

impl Default for RuinSettings {
    fn default() -> Self {
        Self {
            large_chance: 0.3,
            cluster_chance: 0.9,
            large_integrity: 0.9,
            small_integrity: 0.8,
            cluster_spacing: 16,
        }
    }
}

impl GenSettings {
    /// Load settings from a RON file. A missing file is created with the
    /// defaults, a broken one is ignored.
    pub fn load(path: &Path) -> Self {
        if let Ok(file) = fs::File::open(path) {
            match ron::de::from_reader(file) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(?e, ?path, "Failed to parse settings file! Falling back to default");
                    Self::default()
                },
            }
        } else {
            let default_settings = Self::default();
            if let Err(e) = default_settings.save_to_file(path) {
                error!(?e, ?path, "Failed to create default settings file!");
            }
            default_settings
        }
    }

    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        let s = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut config_file = fs::File::create(path)?;
        config_file.write_all(s.as_bytes())
    }
}
