//! Pose sync configuration. Loaded from posesync.ron at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracking::TrackingTuning;
use vr_rig::RigTuning;

/// Persistent sync settings. Loaded from `posesync.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Only broadcast the local rig when it changed since the last send.
    #[serde(default = "default_true")]
    pub send_only_on_change: bool,
    /// Name label opacity lost per second.
    #[serde(default = "default_label_fade_rate")]
    pub label_fade_rate: f32,
    /// Local preference replicated to other peers.
    #[serde(default)]
    pub disable_steering_wheel: bool,
    #[serde(default)]
    pub rig: RigTuning,
    #[serde(default)]
    pub tracking: TrackingTuning,
}

fn default_true() -> bool {
    true
}
fn default_label_fade_rate() -> f32 {
    1.0
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            send_only_on_change: default_true(),
            label_fade_rate: default_label_fade_rate(),
            disable_steering_wheel: false,
            rig: RigTuning::default(),
            tracking: TrackingTuning::default(),
        }
    }
}

impl SyncConfig {
    /// Load config from `posesync.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `posesync.ron`. Logs on error.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("posesync.ron")
}
