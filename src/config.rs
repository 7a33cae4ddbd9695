//! Capture configuration loaded from YAML.
//!
//! Every key is optional; missing keys take the defaults shown below.
//!
//! ```yaml
//! standard: ntsc        # ntsc | pal
//! model: dual           # dual | quad
//! input: 0              # index into the model's input table
//! audio:
//!   period_frames: 1024
//!   periods: 4
//! diagnostics:
//!   interval_ms: 5000   # rate-limit window for malformed delivery warnings
//!   burst: 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::PcmParams;
use crate::ratelimit::RateLimiter;
use crate::types::{DeviceModel, VideoStandard};
use crate::{CaptureError, Result};

/// Rate limit for producer-side warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub interval_ms: u64,
    pub burst: u32,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { interval_ms: 5000, burst: 10 }
    }
}

impl DiagnosticsConfig {
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(Duration::from_millis(self.interval_ms), self.burst)
    }
}

/// Settings for one capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub standard: VideoStandard,
    pub model: DeviceModel,
    pub input: usize,
    pub audio: PcmParams,
    pub diagnostics: DiagnosticsConfig,
}

impl CaptureConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|source| CaptureError::Config {
            context: "capture configuration".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::io_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|source| CaptureError::Config {
            context: "serializing capture configuration".to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let available = self.model.inputs().len();
        if self.input >= available {
            return Err(CaptureError::InvalidInput { index: self.input, available });
        }
        if self.diagnostics.interval_ms == 0 {
            return Err(CaptureError::invalid_config("diagnostics interval must be positive"));
        }
        self.audio.validate()
    }
}
