//! Touch input source
//!
//! Wraps a `SampleSource` with the configured filter chain and press
//! detection, and never fails past `poll`:
//!
//! - no device: every poll reports `RELEASED_ORIGIN`
//! - read error: the last known sample is repeated and the error logged
//!   once per failure streak
//! - interrupted read: the last known sample is repeated, no error counted

use std::path::Path;

use super::evdev::EvdevSource;
use super::tsconf::{Calibration, TouchFilters, TsConf};
use super::{SampleSource, TouchError, TouchSample, TouchState};
use crate::engine::{PointerData, PointerDriver, PointerState};
use crate::error::Result;

/// Polling touch input
pub struct TouchInput {
    source: Option<Box<dyn SampleSource>>,
    samples_per_read: usize,
    filters: TouchFilters,
    last: TouchSample,
    failing: bool,
    read_errors: u64,
}

impl TouchInput {
    /// Open an evdev touchscreen
    ///
    /// Each poll reads `samples_per_read` samples (at least one) and reports
    /// the last.
    pub fn open(path: impl AsRef<Path>, samples_per_read: usize) -> Result<Self> {
        let source = EvdevSource::open(path)?;
        Ok(Self::from_source(source, samples_per_read))
    }

    /// Use an already constructed sample source
    pub fn from_source(source: impl SampleSource + 'static, samples_per_read: usize) -> Self {
        Self {
            source: Some(Box::new(source)),
            samples_per_read: samples_per_read.max(1),
            filters: TouchFilters::default(),
            last: TouchSample::RELEASED_ORIGIN,
            failing: false,
            read_errors: 0,
        }
    }

    /// Input with no device behind it
    pub fn disconnected() -> Self {
        Self {
            source: None,
            samples_per_read: 1,
            filters: TouchFilters::default(),
            last: TouchSample::RELEASED_ORIGIN,
            failing: false,
            read_errors: 0,
        }
    }

    /// Whether a device is attached
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Load ts.conf and pointercal; failures are logged, not returned
    ///
    /// On failure the filter chain is left as it was.
    pub fn configure(&mut self, conf_file: &Path, calib_file: &Path) {
        let conf = match TsConf::load(conf_file) {
            Ok(conf) => conf,
            Err(e) => {
                log::warn!("touch configuration not loaded: {}", e);
                return;
            }
        };

        let needs_calibration = conf.modules.iter().any(|m| m.name == "linear");
        let calibration = if needs_calibration {
            match Calibration::load(calib_file) {
                Ok(cal) => Some(cal),
                Err(e) => {
                    log::warn!("touch calibration not loaded: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.filters = TouchFilters::from_conf(&conf, calibration);
        log::info!(
            "touch configured from {}: {} filter(s)",
            conf_file.display(),
            self.filters.len()
        );
    }

    /// Replace the filter chain
    pub fn set_filters(&mut self, filters: TouchFilters) {
        self.filters = filters;
    }

    /// Read errors seen since open
    pub fn read_errors(&self) -> u64 {
        self.read_errors
    }

    /// Last reported sample
    pub fn last_sample(&self) -> TouchSample {
        self.last
    }

    /// Blocking read of the next sample
    pub fn poll(&mut self) -> TouchSample {
        let Some(source) = self.source.as_mut() else {
            return TouchSample::RELEASED_ORIGIN;
        };

        let mut latest = None;
        for _ in 0..self.samples_per_read {
            match source.read_sample() {
                Ok(raw) => latest = Some(raw),
                Err(TouchError::Interrupted) => break,
                Err(e) => {
                    self.read_errors += 1;
                    if !self.failing {
                        log::warn!("touch read failed, keeping last state: {}", e);
                        self.failing = true;
                    }
                    break;
                }
            }
        }

        if let Some(raw) = latest {
            if self.failing {
                log::info!("touch reads recovered");
                self.failing = false;
            }
            self.last = TouchSample::from_raw(self.filters.apply(raw));
        }
        self.last
    }
}

impl PointerDriver for TouchInput {
    fn read(&mut self, data: &mut PointerData) -> bool {
        let sample = self.poll();
        data.x = sample.x;
        data.y = sample.y;
        data.state = match sample.state {
            TouchState::Pressed => PointerState::Pressed,
            TouchState::Released => PointerState::Released,
        };
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::evdev::codes::*;
    use crate::touch::evdev::tests::encode;
    use crate::touch::evdev::EventReader;
    use crate::touch::{RawSample, TouchError};
    use std::collections::VecDeque;
    use std::io::{self, Cursor, Write};

    /// Replays a fixed script of reads
    struct Scripted(VecDeque<std::result::Result<RawSample, TouchError>>);

    impl SampleSource for Scripted {
        fn read_sample(&mut self) -> std::result::Result<RawSample, TouchError> {
            self.0.pop_front().unwrap_or(Err(TouchError::EndOfStream))
        }
    }

    fn scripted(reads: Vec<std::result::Result<RawSample, TouchError>>) -> TouchInput {
        TouchInput::from_source(Scripted(reads.into()), 1)
    }

    #[test]
    fn test_pressure_boundary_through_poll() {
        let mut input = scripted(vec![
            Ok(RawSample::new(10, 20, 10)),
            Ok(RawSample::new(10, 20, 11)),
        ]);
        assert_eq!(input.poll().state, TouchState::Released);
        assert_eq!(input.poll().state, TouchState::Pressed);
    }

    #[test]
    fn test_disconnected_reports_released_origin() {
        let mut input = TouchInput::disconnected();
        assert!(!input.is_connected());
        assert_eq!(input.poll(), TouchSample::RELEASED_ORIGIN);

        let mut data = PointerData {
            x: 5,
            y: 5,
            state: PointerState::Pressed,
        };
        assert!(!input.read(&mut data));
        assert_eq!(data, PointerData::default());
    }

    #[test]
    fn test_read_error_keeps_last_state() {
        let mut input = scripted(vec![
            Ok(RawSample::new(100, 200, 80)),
            Err(TouchError::Io(io::Error::new(io::ErrorKind::Other, "boom"))),
            Err(TouchError::EndOfStream),
            Ok(RawSample::new(101, 201, 0)),
        ]);

        let pressed = input.poll();
        assert!(pressed.is_pressed());
        assert_eq!(input.poll(), pressed);
        assert_eq!(input.poll(), pressed);
        assert_eq!(input.read_errors(), 2);

        let released = input.poll();
        assert_eq!((released.x, released.y), (101, 201));
        assert_eq!(released.state, TouchState::Released);
    }

    #[test]
    fn test_interrupted_read_keeps_last_state_without_error() {
        let mut input = scripted(vec![
            Ok(RawSample::new(30, 40, 90)),
            Err(TouchError::Interrupted),
            Ok(RawSample::new(31, 41, 90)),
        ]);

        let pressed = input.poll();
        assert_eq!(input.poll(), pressed);
        assert_eq!(input.read_errors(), 0);
        assert_eq!((input.poll().x, input.last_sample().y), (31, 41));
    }

    #[test]
    fn test_samples_per_read_reports_last() {
        let source = Scripted(
            vec![
                Ok(RawSample::new(1, 1, 50)),
                Ok(RawSample::new(2, 2, 50)),
                Ok(RawSample::new(3, 3, 0)),
            ]
            .into(),
        );
        let mut input = TouchInput::from_source(source, 3);
        let sample = input.poll();
        assert_eq!((sample.x, sample.y), (3, 3));
        assert!(!sample.is_pressed());
    }

    #[test]
    fn test_poll_over_evdev_stream() {
        let bytes = encode(&[
            (EV_ABS, ABS_X, 300),
            (EV_ABS, ABS_Y, 400),
            (EV_ABS, ABS_PRESSURE, 11),
            (EV_SYN, SYN_REPORT, 0),
            (EV_ABS, ABS_PRESSURE, 10),
            (EV_SYN, SYN_REPORT, 0),
        ]);
        let mut input = TouchInput::from_source(EventReader::new(Cursor::new(bytes)), 1);

        let mut data = PointerData::default();
        input.read(&mut data);
        assert_eq!(data, PointerData { x: 300, y: 400, state: PointerState::Pressed });
        input.read(&mut data);
        assert_eq!(data.state, PointerState::Released);
    }

    #[test]
    fn test_configure_applies_calibration() {
        let mut conf = tempfile::NamedTempFile::new().unwrap();
        writeln!(conf, "module_raw input\nmodule linear").unwrap();
        let mut cal = tempfile::NamedTempFile::new().unwrap();
        writeln!(cal, "32768 0 0 0 32768 0 65536").unwrap();

        let mut input = scripted(vec![Ok(RawSample::new(200, 100, 40))]);
        input.configure(conf.path(), cal.path());

        let sample = input.poll();
        assert_eq!((sample.x, sample.y), (100, 50));
    }

    #[test]
    fn test_configure_missing_files_is_not_fatal() {
        let mut input = scripted(vec![Ok(RawSample::new(7, 8, 30))]);
        input.configure(Path::new("/nonexistent/ts.conf"), Path::new("/nonexistent/pointercal"));

        let sample = input.poll();
        assert_eq!((sample.x, sample.y, sample.pressure), (7, 8, 30));
    }
}
