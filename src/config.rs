// src/config.rs

//! Configuration of the presentation engine.
//!
//! Deserialized from JSON. Every section and field has a default, so an empty
//! object (or no file at all) yields a usable configuration.

use crate::color::{Color, NamedColor};
use crate::geometry::Size;
use crate::orchestrator::PresentationSettings;
use crate::unit::StereoLayout;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub timing: TimingConfig,
    pub preload: PreloadConfig,
    pub stereo: StereoConfig,
    pub animation: AnimationConfig,
}

// --- Surface ---

/// Target surface. Used by the headless driver; real drivers report their own
/// size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Whether the target can page-flip. Without it preloaded frames are
    /// blitted.
    pub page_flip: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig {
            width: 800,
            height: 600,
            background: NamedColor::Gray.to_color(),
            page_flip: true,
        }
    }
}

impl SurfaceConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

// --- Timing ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// The clock spins instead of sleeping this close to a deadline.
    pub spin_threshold_us: u64,
    /// Overruns longer than this are logged as warnings.
    pub overrun_warning_ms: f64,
    /// Polling interval of the channel-based response wait.
    pub response_poll_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            spin_threshold_us: 1500,
            overrun_warning_ms: 2.0,
            response_poll_us: 500,
        }
    }
}

impl TimingConfig {
    pub fn spin_threshold(&self) -> Duration {
        Duration::from_micros(self.spin_threshold_us)
    }

    /// Saturates at `Duration::MAX`; a threshold that large never warns.
    pub fn overrun_warning(&self) -> Duration {
        Duration::try_from_secs_f64(self.overrun_warning_ms.max(0.0) / 1000.0)
            .unwrap_or(Duration::MAX)
    }

    pub fn response_poll(&self) -> Duration {
        Duration::from_micros(self.response_poll_us)
    }
}

// --- Preload ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreloadConfig {
    pub enabled: bool,
    /// Off-screen buffers alive at once.
    pub max_buffers: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        PreloadConfig {
            enabled: true,
            max_buffers: 4,
        }
    }
}

// --- Stereo ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StereoConfig {
    pub enabled: bool,
    /// Horizontal shift in pixels applied within each eye's half.
    pub disparity: i32,
}

impl StereoConfig {
    pub fn layout(&self) -> Option<StereoLayout> {
        self.enabled.then_some(StereoLayout {
            disparity: self.disparity,
        })
    }
}

// --- Animation ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub frame_interval_us: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            frame_interval_us: 16_667,
        }
    }
}

impl AnimationConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(self.frame_interval_us)
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ms = self.timing.overrun_warning_ms;
        Duration::try_from_secs_f64(ms / 1000.0)
            .with_context(|| format!("timing.overrun_warning_ms out of range: {ms}"))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn presentation_settings(&self) -> PresentationSettings {
        PresentationSettings {
            preload: self.preload.enabled,
            overrun_warning: self.timing.overrun_warning(),
            stereo: self.stereo.layout(),
        }
    }
}
