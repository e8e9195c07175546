//! Run settings and sanity bounds
//!
//! Loaded from JSON by the embedding game; every field has a default so partial
//! files are fine.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::SPEED_UP_TICKS;
use crate::tuning::Tuning;

/// Error loading settings or tuning from disk
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "failed to read settings: {}", e),
            SettingsError::Parse(e) => write!(f, "failed to parse settings: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Parse(e)
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run two ticks per rendered frame
    pub speed_up: bool,

    // === Sanity bounds ===
    /// Events processed per drain before the rest are dropped
    pub max_events_per_drain: usize,
    /// Destroyed-brick sweeps per drain before giving up
    pub max_sweep_passes: usize,
    /// Chain lightning hops from a single origin hit
    pub max_chain_depth: u32,

    // === Aiming ===
    /// Frames an aim-preview ghost survives
    pub ghost_lifetime_ticks: u32,

    /// RNG seed for the run
    pub seed: u64,

    /// Gameplay balance
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed_up: false,

            max_events_per_drain: 10_000,
            max_sweep_passes: 64,
            max_chain_depth: 8,

            ghost_lifetime_ticks: 90,

            seed: 0,

            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    /// Ticks to run per rendered frame
    pub fn ticks_per_frame(&self) -> u32 {
        if self.speed_up { SPEED_UP_TICKS } else { 1 }
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
