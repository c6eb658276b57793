//! Pixel memory seen by the flush driver
//!
//! `FramebufferDevice` is the real implementation; `MemorySurface` backs the
//! same driver with a heap buffer for tests and headless runs.

use super::blit::read_unit;
use super::geometry::{DeviceGeometry, PixelUnit};

/// Geometry plus writable pixel memory
pub trait Surface {
    /// Current geometry
    fn geometry(&self) -> &DeviceGeometry;

    /// Mapped pixel memory; empty when nothing is mapped
    fn pixels_mut(&mut self) -> &mut [u8];
}

/// Heap-backed surface with the same layout as a mapped framebuffer
#[derive(Debug, Clone)]
pub struct MemorySurface {
    geometry: DeviceGeometry,
    pixels: Vec<u8>,
}

impl MemorySurface {
    /// Allocate `geometry.map_len()` zeroed bytes, plus room for the pan offset
    pub fn new(geometry: DeviceGeometry) -> Self {
        let pan_rows = geometry.pan_y as usize * geometry.line_stride_bytes as usize;
        let pan_cols = geometry.pan_x as usize * geometry.pixel_unit().map_or(4, PixelUnit::bytes);
        Self {
            geometry,
            pixels: vec![0; geometry.map_len() + pan_rows + pan_cols],
        }
    }

    /// Raw bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Native value of visible pixel (x, y), if the depth is addressable
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        let unit = self.geometry.pixel_unit().ok()?;
        let index = self.geometry.unit_index(unit, x as usize, y as usize);
        read_unit(&self.pixels, unit, index)
    }
}

impl Surface for MemorySurface {
    fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Area, Color};
    use crate::framebuffer::blit;

    #[test]
    fn test_memory_surface_reads_back_panned_pixels() {
        let geometry = DeviceGeometry::packed(8, 8, 32).with_pan(2, 3);
        let mut surface = MemorySurface::new(geometry);

        let area = Area::new(7, 7, 7, 7);
        let written = blit(&geometry, surface.pixels_mut(), area, &[Color::from_full(42)]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(surface.pixel(7, 7), Some(42));
        assert_eq!(surface.pixel(0, 0), Some(0));
    }

    #[test]
    fn test_memory_surface_pan_room_follows_depth() {
        let geometry = DeviceGeometry::packed(8, 8, 16).with_pan(3, 1);
        let mut surface = MemorySurface::new(geometry);
        assert_eq!(surface.pixels().len(), 8 * 8 * 2 + 16 + 3 * 2);

        let area = Area::new(7, 7, 7, 7);
        let written = blit(&geometry, surface.pixels_mut(), area, &[Color::from_full(0xBEEF)]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(surface.pixel(7, 7), Some(0xBEEF));
    }
}
