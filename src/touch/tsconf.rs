//! tslib-compatible configuration
//!
//! Understands the two files tslib reads at startup:
//!
//! - `ts.conf`: one `module <name> [key=value ...]` per line, applied in order.
//!   `module_raw` lines name the raw backend and are accepted but ignored,
//!   since evdev is the only backend here.
//! - `pointercal`: seven integers `a0 .. a6` describing an affine transform,
//!   optionally followed by the screen size the calibration was taken at.
//!
//! Supported filters are `linear` (pointercal transform) and `pthres`
//! (pressure window). Other modules are logged and skipped.

use std::fs;
use std::path::Path;

use super::RawSample;
use crate::error::{Error, Result};

/// Affine calibration from `pointercal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    coeffs: [i64; 7],
}

impl Calibration {
    /// Identity transform (tslib's default scale of 65536)
    pub const IDENTITY: Self = Self {
        coeffs: [65536, 0, 0, 0, 65536, 0, 65536],
    };

    /// Parse `pointercal` contents
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let values: Vec<i64> = content
            .split_whitespace()
            .map(|t| t.parse::<i64>().map_err(|_| format!("not an integer: {t:?}")))
            .collect::<std::result::Result<_, _>>()?;

        if values.len() < 7 {
            return Err(format!("expected 7 coefficients, found {}", values.len()));
        }
        if values[6] == 0 {
            return Err("divisor (a6) is zero".to_string());
        }

        let mut coeffs = [0i64; 7];
        coeffs.copy_from_slice(&values[..7]);
        Ok(Self { coeffs })
    }

    /// Read and parse a `pointercal` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Map raw coordinates through the transform
    pub fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        let [a0, a1, a2, a3, a4, a5, a6] = self.coeffs;
        let (x, y) = (i64::from(x), i64::from(y));
        let tx = (a2 + a0 * x + a1 * y) / a6;
        let ty = (a5 + a3 * x + a4 * y) / a6;
        (saturate(tx), saturate(ty))
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// `module` line from ts.conf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLine {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub line_number: usize,
}

impl ModuleLine {
    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed ts.conf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsConf {
    pub raw_module: Option<String>,
    pub modules: Vec<ModuleLine>,
}

impl TsConf {
    /// Parse ts.conf contents
    pub fn parse(content: &str) -> Self {
        let mut conf = Self::default();

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some("module_raw"), Some(name)) => conf.raw_module = Some(name.to_string()),
                (Some("module"), Some(name)) => {
                    let params = tokens
                        .filter_map(|t| t.split_once('='))
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    conf.modules.push(ModuleLine {
                        name: name.to_string(),
                        params,
                        line_number,
                    });
                }
                _ => log::warn!("ts.conf line {}: unrecognized: {}", line_number, trimmed),
            }
        }

        conf
    }

    /// Read and parse a ts.conf file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::parse(&content))
    }
}

/// One stage of the sample pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Pressures outside `[pmin, pmax]` are reported as no contact
    Pthres { pmin: u32, pmax: u32 },
    /// Affine calibration
    Linear(Calibration),
}

impl Filter {
    fn apply(&self, sample: RawSample) -> RawSample {
        match *self {
            Filter::Pthres { pmin, pmax } => {
                if sample.pressure < pmin || sample.pressure > pmax {
                    RawSample { pressure: 0, ..sample }
                } else {
                    sample
                }
            }
            Filter::Linear(cal) => {
                let (x, y) = cal.apply(sample.x, sample.y);
                RawSample { x, y, ..sample }
            }
        }
    }
}

/// Ordered filter chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchFilters {
    filters: Vec<Filter>,
}

impl TouchFilters {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Build the chain from a parsed ts.conf
    ///
    /// `linear` needs a calibration; without one it is skipped with a
    /// warning, like any module that fails to load.
    pub fn from_conf(conf: &TsConf, calibration: Option<Calibration>) -> Self {
        let mut filters = Vec::new();

        for module in &conf.modules {
            match module.name.as_str() {
                "linear" => match calibration {
                    Some(cal) => filters.push(Filter::Linear(cal)),
                    None => log::warn!(
                        "ts.conf line {}: linear needs a calibration file, skipped",
                        module.line_number
                    ),
                },
                "pthres" => {
                    let pmin = parse_param(module, "pmin", 1);
                    let pmax = parse_param(module, "pmax", u32::MAX);
                    filters.push(Filter::Pthres { pmin, pmax });
                }
                other => log::warn!(
                    "ts.conf line {}: module {} not supported, skipped",
                    module.line_number,
                    other
                ),
            }
        }

        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Run a sample through every stage in order
    pub fn apply(&self, sample: RawSample) -> RawSample {
        self.filters.iter().fold(sample, |s, f| f.apply(s))
    }
}

fn parse_param(module: &ModuleLine, key: &str, default: u32) -> u32 {
    match module.param(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!(
                "ts.conf line {}: {}={} is not a number, using {}",
                module.line_number,
                key,
                raw,
                default
            );
            default
        }),
        None => default,
    }
}
