//! # evdev sample decoder
//!
//! Decodes `struct input_event` records into touch samples. A sample is
//! complete at `EV_SYN / SYN_REPORT`; axes that did not change keep their
//! previous value, as the kernel only reports deltas.
//!
//! ## Reference
//! - https://www.kernel.org/doc/html/latest/input/event-codes.html

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{NativeEndian, ReadBytesExt};

use super::{RawSample, SampleSource, TouchError};
use crate::error::{Error, Result};

/// Event types and codes from `<linux/input-event-codes.h>`
pub mod codes {
    pub const EV_SYN: u16 = 0x00;
    pub const EV_KEY: u16 = 0x01;
    pub const EV_ABS: u16 = 0x03;

    pub const SYN_REPORT: u16 = 0;
    pub const SYN_DROPPED: u16 = 3;

    pub const BTN_TOUCH: u16 = 0x14a;

    pub const ABS_X: u16 = 0x00;
    pub const ABS_Y: u16 = 0x01;
    pub const ABS_PRESSURE: u16 = 0x18;
    pub const ABS_MT_POSITION_X: u16 = 0x35;
    pub const ABS_MT_POSITION_Y: u16 = 0x36;
    pub const ABS_MT_PRESSURE: u16 = 0x3a;
}

/// Size of one `struct input_event` on this platform
pub const EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

/// Bytes of `struct timeval` at the start of each event
const TIME_SIZE: usize = EVENT_SIZE - 8;

/// Pressure synthesized for devices that only report `BTN_TOUCH`
pub const SYNTHETIC_PRESSURE: u32 = 255;

/// One decoded `input_event` (timestamp dropped)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// Decode from exactly `EVENT_SIZE` bytes
    pub fn decode(record: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(record.get(TIME_SIZE..).unwrap_or_default());
        Ok(Self {
            kind: cursor.read_u16::<NativeEndian>()?,
            code: cursor.read_u16::<NativeEndian>()?,
            value: cursor.read_i32::<NativeEndian>()?,
        })
    }
}

/// Sample assembler over any byte stream of `input_event` records
///
/// A read interrupted by a signal returns `TouchError::Interrupted`; bytes
/// of a partly read record are kept and the next call resumes with them.
pub struct EventReader<R> {
    reader: R,
    record: [u8; EVENT_SIZE],
    filled: usize,
    current: RawSample,
    has_pressure_axis: bool,
    dropping: bool,
}

impl<R: Read> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            record: [0u8; EVENT_SIZE],
            filled: 0,
            current: RawSample::default(),
            has_pressure_axis: false,
            dropping: false,
        }
    }

    /// Read the next event record (blocks on a device node)
    pub fn next_event(&mut self) -> std::result::Result<InputEvent, TouchError> {
        // Not read_exact: it retries on EINTR and would hide the signal
        while self.filled < EVENT_SIZE {
            match self.reader.read(&mut self.record[self.filled..]) {
                Ok(0) => return Err(TouchError::EndOfStream),
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Err(TouchError::Interrupted)
                }
                Err(e) => return Err(TouchError::Io(e)),
            }
        }

        self.filled = 0;
        Ok(InputEvent::decode(&self.record)?)
    }

    fn apply(&mut self, event: InputEvent) {
        use codes::*;

        match (event.kind, event.code) {
            (EV_ABS, ABS_X) | (EV_ABS, ABS_MT_POSITION_X) => self.current.x = event.value,
            (EV_ABS, ABS_Y) | (EV_ABS, ABS_MT_POSITION_Y) => self.current.y = event.value,
            (EV_ABS, ABS_PRESSURE) | (EV_ABS, ABS_MT_PRESSURE) => {
                self.has_pressure_axis = true;
                self.current.pressure = event.value.max(0) as u32;
            }
            (EV_KEY, BTN_TOUCH) if !self.has_pressure_axis => {
                self.current.pressure = if event.value != 0 { SYNTHETIC_PRESSURE } else { 0 };
            }
            (EV_KEY, BTN_TOUCH) if event.value == 0 => {
                // Some drivers lift the finger without a final ABS_PRESSURE 0
                self.current.pressure = 0;
            }
            _ => {}
        }
    }
}

impl<R: Read> SampleSource for EventReader<R> {
    fn read_sample(&mut self) -> std::result::Result<RawSample, TouchError> {
        use codes::*;

        loop {
            let event = self.next_event()?;

            if event.kind == EV_SYN {
                match event.code {
                    SYN_REPORT if self.dropping => {
                        self.dropping = false;
                    }
                    SYN_REPORT => return Ok(self.current),
                    SYN_DROPPED => {
                        log::debug!("touch: events dropped by the kernel, resynchronizing");
                        self.dropping = true;
                    }
                    _ => {}
                }
                continue;
            }

            if !self.dropping {
                self.apply(event);
            }
        }
    }
}

/// Touchscreen event device
pub struct EvdevSource {
    path: PathBuf,
    events: EventReader<File>,
}

impl EvdevSource {
    /// Open an event device read-only (blocking reads)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|source| Error::DeviceOpen {
                path: path.clone(),
                source,
            })?;

        log::info!("Opened touch device {}", path.display());
        Ok(Self {
            path,
            events: EventReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for EvdevSource {
    fn read_sample(&mut self) -> std::result::Result<RawSample, TouchError> {
        self.events.read_sample()
    }
}
