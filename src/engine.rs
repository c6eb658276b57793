//! # Engine boundary
//!
//! The graphics engine (widget tree, layout, rendering) lives outside this
//! crate. It talks to the hardware only through the traits below:
//!
//! ```text
//!   Engine::tick ──► DisplayDriver::flush(area, colors) ──► FlushReady
//!        │
//!        └───────► PointerDriver::read(&mut PointerData)
//! ```
//!
//! Drivers are handed to the engine on every tick rather than stored inside
//! it, so the bridge keeps ownership of the devices for their whole lifetime.

/// A packed color in the engine's native format
///
/// `full` is written verbatim into the framebuffer; when the device slot is
/// narrower than 32 bits only the low bytes are kept.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub full: u32,
}

impl Color {
    /// Wrap an already packed value
    #[inline]
    pub const fn from_full(full: u32) -> Self {
        Self { full }
    }

    /// Pack as opaque XRGB8888
    pub const fn rgb888(r: u8, g: u8, b: u8) -> Self {
        Self::from_full(0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Pack as RGB565 (5 red, 6 green, 5 blue)
    pub const fn rgb565(r: u8, g: u8, b: u8) -> Self {
        let r5 = (r >> 3) as u32;
        let g6 = (g >> 2) as u32;
        let b5 = (b >> 3) as u32;
        Self::from_full((r5 << 11) | (g6 << 5) | b5)
    }

    /// Pack as RGB332
    pub const fn rgb332(r: u8, g: u8, b: u8) -> Self {
        Self::from_full(((r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6)) as u32)
    }

    /// Pack for a given framebuffer depth
    pub const fn rgb_for_depth(bits_per_pixel: u32, r: u8, g: u8, b: u8) -> Self {
        match bits_per_pixel {
            16 => Self::rgb565(r, g, b),
            8 => Self::rgb332(r, g, b),
            _ => Self::rgb888(r, g, b),
        }
    }
}

/// Inclusive screen rectangle as supplied by the engine
///
/// Coordinates are signed and not validated: an area may extend past any
/// edge of the screen, or lie entirely outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Area {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width of the unclipped area (0 for inverted areas)
    pub fn width(&self) -> usize {
        (i64::from(self.x2) - i64::from(self.x1) + 1).max(0) as usize
    }

    /// Height of the unclipped area (0 for inverted areas)
    pub fn height(&self) -> usize {
        (i64::from(self.y2) - i64::from(self.y1) + 1).max(0) as usize
    }

    /// Number of color values the engine supplies for this area
    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }
}

/// Pointer button state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerState {
    #[default]
    Released,
    Pressed,
}

/// Pointer sample as the engine consumes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerData {
    pub x: i32,
    pub y: i32,
    pub state: PointerState,
}

/// Engine-side completion signal for a flush
pub trait FlushReady {
    /// The color buffer passed to `flush` may be reused
    fn flush_ready(&mut self);
}

/// Output side: paint a rectangle
pub trait DisplayDriver {
    /// Visible resolution, if a display is attached
    fn resolution(&self) -> Option<(u32, u32)>;

    /// Copy `colors` (row-major, covering the whole unclipped `area`) to the
    /// display. Must call `ready.flush_ready()` exactly once on every path.
    fn flush(&mut self, area: Area, colors: &[Color], ready: &mut dyn FlushReady);
}

/// Input side: sample the pointer
pub trait PointerDriver {
    /// Fill `data` with the current pointer state.
    ///
    /// Returns true when more buffered samples are waiting.
    fn read(&mut self, data: &mut PointerData) -> bool;
}

/// Drivers lent to the engine for one tick
pub struct Drivers<'a> {
    pub display: &'a mut dyn DisplayDriver,
    pub pointer: &'a mut dyn PointerDriver,
}

/// The external retained-mode engine
pub trait Engine {
    /// Called once when the drivers are wired up
    fn attach(&mut self, _resolution: Option<(u32, u32)>) {}

    /// Run pending timers, input processing and redraws
    fn tick(&mut self, elapsed_ms: u32, drivers: &mut Drivers<'_>);
}
