//! Touch input
//!
//! Reads samples from a Linux evdev touchscreen, runs them through the
//! tslib-style filter chain configured in `ts.conf`, and turns them into
//! pressed/released pointer samples.

pub mod evdev;
pub mod input;
pub mod tsconf;

pub use evdev::EvdevSource;
pub use input::TouchInput;
pub use tsconf::{Calibration, TouchFilters};

use std::io;

/// Pressure above which a sample counts as a press
pub const PRESSURE_THRESHOLD: u32 = 10;

/// Derived press state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchState {
    Pressed,
    #[default]
    Released,
}

/// One hardware sample before press detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: i32,
    pub y: i32,
    pub pressure: u32,
}

impl RawSample {
    pub const fn new(x: i32, y: i32, pressure: u32) -> Self {
        Self { x, y, pressure }
    }
}

/// Pointer sample handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchSample {
    /// X in device coordinates
    pub x: i32,
    /// Y in device coordinates
    pub y: i32,
    /// Pressure in device units
    pub pressure: u32,
    pub state: TouchState,
}

impl TouchSample {
    /// Sample reported when no touch device is available
    pub const RELEASED_ORIGIN: Self = Self {
        x: 0,
        y: 0,
        pressure: 0,
        state: TouchState::Released,
    };

    /// Classify a raw sample: pressed iff pressure > `PRESSURE_THRESHOLD`
    pub const fn from_raw(raw: RawSample) -> Self {
        let state = if raw.pressure > PRESSURE_THRESHOLD {
            TouchState::Pressed
        } else {
            TouchState::Released
        };
        Self {
            x: raw.x,
            y: raw.y,
            pressure: raw.pressure,
            state,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.state == TouchState::Pressed
    }
}

/// Touch read failures
#[derive(Debug, thiserror::Error)]
pub enum TouchError {
    #[error("touch read failed: {0}")]
    Io(#[from] io::Error),
    #[error("touch device closed the event stream")]
    EndOfStream,
    /// A signal arrived while waiting for events
    #[error("touch read interrupted by a signal")]
    Interrupted,
}

/// Something that yields one hardware sample per call
///
/// Implementations may block; the bridge calls this once per tick.
pub trait SampleSource {
    fn read_sample(&mut self) -> Result<RawSample, TouchError>;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read_sample(&mut self) -> Result<RawSample, TouchError> {
        (**self).read_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_threshold_boundary() {
        assert_eq!(TouchSample::from_raw(RawSample::new(5, 6, 10)).state, TouchState::Released);
        assert_eq!(TouchSample::from_raw(RawSample::new(5, 6, 11)).state, TouchState::Pressed);
        assert_eq!(TouchSample::from_raw(RawSample::new(5, 6, 0)).state, TouchState::Released);
    }

    #[test]
    fn test_from_raw_keeps_coordinates() {
        let sample = TouchSample::from_raw(RawSample::new(1234, 567, 200));
        assert_eq!((sample.x, sample.y, sample.pressure), (1234, 567, 200));
        assert!(sample.is_pressed());
    }
}
