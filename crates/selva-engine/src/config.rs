//! Runner configuration.
//!
//! Loaded from `selva.toml`; every field has a default so a partial or
//! missing file still runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use selva_encounter::EncounterConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "selva.toml";

/// Runner configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run Settings ===
    /// Seed for the encounter and the scripted input
    pub seed: u64,
    /// Simulated seconds before the run is abandoned
    pub max_seconds: f32,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Presented frames per second
    pub render_fps: u32,
    /// Pace frames against the wall clock instead of running flat out
    pub realtime: bool,

    // === Persistence ===
    /// Behavior profile location
    pub profile_path: PathBuf,
    /// Write the profile on a background thread
    pub background_writer: bool,

    // === Encounter ===
    /// Encounter tuning
    pub encounter: EncounterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5E17A,
            max_seconds: 300.0,
            tick_rate: 60,
            render_fps: 60,
            realtime: false,
            profile_path: PathBuf::from("behavior.json"),
            background_writer: true,
            encounter: EncounterConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp all values to sane ranges.
    pub fn validate(&mut self) {
        self.max_seconds = self.max_seconds.clamp(1.0, 3600.0);
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.render_fps = self.render_fps.clamp(10, 240);
        self.encounter.validate();
    }
}
