//! Flush driver: engine dirty rectangles into a `Surface`

use super::blit::{blit, BlitError};
use super::surface::Surface;
use crate::engine::{Area, Color, DisplayDriver, FlushReady};

/// Display driver over an optional surface
///
/// Without a surface (device failed to open or map) every flush is a no-op,
/// but completion is still signaled so the engine keeps running.
pub struct FramebufferDisplay<S> {
    surface: Option<S>,
    flushes: u64,
    pixels_written: u64,
}

impl<S: Surface> FramebufferDisplay<S> {
    /// Driver writing into `surface`
    pub fn new(surface: S) -> Self {
        Self {
            surface: Some(surface),
            flushes: 0,
            pixels_written: 0,
        }
    }

    /// Driver with no display attached
    pub fn detached() -> Self {
        Self {
            surface: None,
            flushes: 0,
            pixels_written: 0,
        }
    }

    /// Attached surface, if any
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Give the surface back (e.g. to close the device)
    pub fn into_surface(self) -> Option<S> {
        self.surface
    }

    /// Flush calls seen so far
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Pixels actually stored so far
    pub fn pixels_written(&self) -> u64 {
        self.pixels_written
    }

    fn copy(&mut self, area: Area, colors: &[Color]) -> Result<usize, BlitError> {
        let surface = self.surface.as_mut().ok_or(BlitError::Unmapped)?;
        let geometry = *surface.geometry();
        blit(&geometry, surface.pixels_mut(), area, colors)
    }
}

impl<S: Surface> DisplayDriver for FramebufferDisplay<S> {
    fn resolution(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(|s| {
            let geometry = s.geometry();
            (geometry.width, geometry.height)
        })
    }

    fn flush(&mut self, area: Area, colors: &[Color], ready: &mut dyn FlushReady) {
        self.flushes += 1;

        match self.copy(area, colors) {
            Ok(written) => {
                self.pixels_written += written as u64;
                log::trace!("flush {:?}: {} px", area, written);
            }
            Err(err) => log::trace!("flush {:?} skipped: {}", area, err),
        }

        ready.flush_ready();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::{DeviceGeometry, MemorySurface};

    #[derive(Default)]
    struct Ready(u32);

    impl FlushReady for Ready {
        fn flush_ready(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_flush_writes_and_signals() {
        let geometry = DeviceGeometry::packed(320, 480, 16).with_stride(640);
        let mut display = FramebufferDisplay::new(MemorySurface::new(geometry));
        let mut ready = Ready::default();

        let colors: Vec<Color> = [0x1111, 0x2222, 0x3333, 0x4444]
            .into_iter()
            .map(Color::from_full)
            .collect();
        display.flush(Area::new(0, 0, 1, 1), &colors, &mut ready);

        assert_eq!(ready.0, 1);
        assert_eq!(display.pixels_written(), 4);
        let surface = display.surface().unwrap();
        assert_eq!(surface.pixel(0, 0), Some(0x1111));
        assert_eq!(surface.pixel(1, 0), Some(0x2222));
        assert_eq!(surface.pixel(0, 1), Some(0x3333));
        assert_eq!(surface.pixel(1, 1), Some(0x4444));
    }

    #[test]
    fn test_offscreen_flush_still_signals() {
        let geometry = DeviceGeometry::packed(32, 32, 32);
        let mut display = FramebufferDisplay::new(MemorySurface::new(geometry));
        let mut ready = Ready::default();

        let colors = vec![Color::from_full(7); 25];
        display.flush(Area::new(-5, -5, -1, -1), &colors, &mut ready);

        assert_eq!(ready.0, 1);
        assert_eq!(display.pixels_written(), 0);
        assert!(display.surface().unwrap().pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_detached_display_is_inert() {
        let mut display: FramebufferDisplay<MemorySurface> = FramebufferDisplay::detached();
        let mut ready = Ready::default();

        assert_eq!(display.resolution(), None);
        display.flush(Area::new(0, 0, 3, 3), &[Color::default(); 16], &mut ready);
        display.flush(Area::new(0, 0, 0, 0), &[Color::default()], &mut ready);

        assert_eq!(ready.0, 2);
        assert_eq!(display.flushes(), 2);
        assert_eq!(display.pixels_written(), 0);
    }
}
