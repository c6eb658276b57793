//! Bridge configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file named by `FBBRIDGE_CONFIG`
//! 3. tslib environment variables (`TSLIB_FBDEVICE`, `TSLIB_TSDEVICE`,
//!    `TSLIB_CALIBFILE`, `TSLIB_CONFFILE`)

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "FBBRIDGE_CONFIG";

/// tslib environment variables
pub mod env {
    pub const FB_DEVICE: &str = "TSLIB_FBDEVICE";
    pub const TS_DEVICE: &str = "TSLIB_TSDEVICE";
    pub const CALIB_FILE: &str = "TSLIB_CALIBFILE";
    pub const CONF_FILE: &str = "TSLIB_CONFFILE";
}

/// Display mode to force before mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeConfig {
    pub bits_per_pixel: u32,
    pub width: u32,
    pub height: u32,
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Framebuffer device node
    pub framebuffer: PathBuf,
    /// Touchscreen event device node
    pub touch_device: PathBuf,
    /// tslib module configuration
    pub touch_conf_file: PathBuf,
    /// tslib calibration
    pub calibration_file: PathBuf,
    /// Hardware samples consumed per poll
    pub samples_per_read: usize,
    /// Sleep between engine ticks
    pub tick_period_ms: u64,
    /// Optional mode to set before mapping
    pub mode: Option<ModeConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            framebuffer: PathBuf::from("/dev/fb0"),
            touch_device: PathBuf::from("/dev/input/event0"),
            touch_conf_file: PathBuf::from("/etc/ts.conf"),
            calibration_file: PathBuf::from("/etc/pointercal"),
            samples_per_read: 1,
            tick_period_ms: 5,
            mode: None,
        }
    }
}

impl BridgeConfig {
    /// Parse TOML content; missing keys take their defaults
    pub fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse_toml(&content, path)
    }

    /// Defaults, then `FBBRIDGE_CONFIG`, then the tslib variables
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Same as `from_env` over an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = match vars.get(CONFIG_ENV) {
            Some(path) => {
                log::debug!("loading configuration from {}", path);
                Self::from_file(Path::new(path))?
            }
            None => Self::default(),
        };
        config.apply_tslib_vars(vars);
        Ok(config)
    }

    /// Override device and file paths from the tslib variables
    pub fn apply_tslib_vars(&mut self, vars: &HashMap<String, String>) {
        let overrides: [(&str, &mut PathBuf); 4] = [
            (env::FB_DEVICE, &mut self.framebuffer),
            (env::TS_DEVICE, &mut self.touch_device),
            (env::CALIB_FILE, &mut self.calibration_file),
            (env::CONF_FILE, &mut self.touch_conf_file),
        ];

        for (name, field) in overrides {
            if let Some(value) = vars.get(name).filter(|v| !v.is_empty()) {
                *field = PathBuf::from(value);
            }
        }
    }

    /// Tick period as a `Duration`
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };

        if self.samples_per_read == 0 {
            return Err(invalid("samples_per_read must be at least 1".to_string()));
        }
        if let Some(mode) = self.mode {
            if ![8, 16, 24, 32].contains(&mode.bits_per_pixel) {
                return Err(invalid(format!(
                    "mode.bits_per_pixel {} is not one of 8, 16, 24, 32",
                    mode.bits_per_pixel
                )));
            }
            if mode.width == 0 || mode.height == 0 {
                return Err(invalid("mode width and height must be non-zero".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.framebuffer, PathBuf::from("/dev/fb0"));
        assert_eq!(config.tick_period(), Duration::from_millis(5));
        assert_eq!(config.samples_per_read, 1);
    }

    #[test]
    fn test_parse_toml_with_mode() {
        let content = r#"
framebuffer = "/dev/fb1"
tick_period_ms = 10

[mode]
bits_per_pixel = 24
width = 320
height = 480
"#;
        let config = BridgeConfig::parse_toml(content, Path::new("test.toml")).unwrap();
        assert_eq!(config.framebuffer, PathBuf::from("/dev/fb1"));
        assert_eq!(config.tick_period_ms, 10);
        assert_eq!(
            config.mode,
            Some(ModeConfig {
                bits_per_pixel: 24,
                width: 320,
                height: 480
            })
        );
        assert_eq!(config.touch_device, PathBuf::from("/dev/input/event0"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BridgeConfig::parse_toml("frame_buffer = \"/dev/fb0\"", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(BridgeConfig::parse_toml("samples_per_read = 0", Path::new("x")).is_err());
        let bad_mode = "[mode]\nbits_per_pixel = 12\nwidth = 1\nheight = 1\n";
        assert!(BridgeConfig::parse_toml(bad_mode, Path::new("x")).is_err());
    }

    #[test]
    fn test_tslib_vars_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "touch_device = \"/dev/input/event3\"").unwrap();
        writeln!(file, "framebuffer = \"/dev/fb2\"").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = BridgeConfig::from_vars(&vars(&[
            (CONFIG_ENV, path.as_str()),
            (env::TS_DEVICE, "/dev/input/touchscreen"),
            (env::CALIB_FILE, "/tmp/pointercal"),
            (env::FB_DEVICE, ""),
        ]))
        .unwrap();

        assert_eq!(config.touch_device, PathBuf::from("/dev/input/touchscreen"));
        assert_eq!(config.calibration_file, PathBuf::from("/tmp/pointercal"));
        assert_eq!(config.framebuffer, PathBuf::from("/dev/fb2"));
        assert_eq!(config.touch_conf_file, PathBuf::from("/etc/ts.conf"));
    }

    #[test]
    fn test_missing_config_file() {
        let result = BridgeConfig::from_vars(&vars(&[(CONFIG_ENV, "/nonexistent/bridge.toml")]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
