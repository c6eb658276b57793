//! Display surface geometry
//!
//! Describes how pixels are laid out in the mapped framebuffer memory.

use super::sys::{FbFixScreeninfo, FbVarScreeninfo};
use crate::error::{Error, Result};

/// Size of one native pixel slot in mapped memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelUnit {
    /// 8 bpp palettized / RGB332
    One = 1,
    /// 16 bpp RGB565
    Two = 2,
    /// 24 and 32 bpp (padding/alpha byte kept as written)
    Four = 4,
}

impl PixelUnit {
    /// Native unit for a bit depth, `None` when the depth is not addressable
    pub const fn for_depth(bits_per_pixel: u32) -> Option<Self> {
        match bits_per_pixel {
            32 | 24 => Some(Self::Four),
            16 => Some(Self::Two),
            8 => Some(Self::One),
            _ => None,
        }
    }

    /// Width in bytes
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

/// Display surface geometry as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in pixels
    pub height: u32,
    /// Bits per pixel (8, 16, 24 or 32 are addressable)
    pub bits_per_pixel: u32,
    /// Bytes per scanline (may be > width * bytes_per_pixel due to alignment)
    pub line_stride_bytes: u32,
    /// Horizontal pan of the visible origin, in pixels
    pub pan_x: u32,
    /// Vertical pan of the visible origin, in pixels
    pub pan_y: u32,
    /// Virtual width reported by the driver
    pub virtual_width: u32,
    /// Virtual height reported by the driver
    pub virtual_height: u32,
    /// Size of the device memory window reported by the driver (0 if unknown)
    pub memory_len: u32,
}

/// Packed bytes for a bit depth, rounded up (24 bpp is 3 bytes here)
#[inline]
pub const fn bytes_per_pixel(bits_per_pixel: u32) -> u32 {
    (bits_per_pixel + 7) / 8
}

impl DeviceGeometry {
    /// Geometry with a tightly packed stride and no pan offset
    pub const fn packed(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            line_stride_bytes: width * bytes_per_pixel(bits_per_pixel),
            pan_x: 0,
            pan_y: 0,
            virtual_width: width,
            virtual_height: height,
            memory_len: 0,
        }
    }

    /// Replace the stride
    pub const fn with_stride(mut self, line_stride_bytes: u32) -> Self {
        self.line_stride_bytes = line_stride_bytes;
        self
    }

    /// Replace the pan offset
    pub const fn with_pan(mut self, pan_x: u32, pan_y: u32) -> Self {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
        self
    }

    /// Build from the two screeninfo structures
    ///
    /// A zero `line_length` (some drivers do not report one) falls back to
    /// the packed row size.
    pub fn from_screeninfo(var: &FbVarScreeninfo, fix: &FbFixScreeninfo) -> Self {
        let packed_stride = var.xres * bytes_per_pixel(var.bits_per_pixel);
        let line_stride_bytes = if fix.line_length == 0 {
            packed_stride
        } else {
            fix.line_length
        };

        Self {
            width: var.xres,
            height: var.yres,
            bits_per_pixel: var.bits_per_pixel,
            line_stride_bytes,
            pan_x: var.xoffset,
            pan_y: var.yoffset,
            virtual_width: var.xres_virtual,
            virtual_height: var.yres_virtual,
            memory_len: fix.smem_len,
        }
    }

    /// Native pixel unit for this depth
    pub fn pixel_unit(&self) -> Result<PixelUnit> {
        PixelUnit::for_depth(self.bits_per_pixel)
            .ok_or(Error::UnsupportedDepth(self.bits_per_pixel))
    }

    /// Row stride expressed in native units
    ///
    /// Integer division: at 24 bpp with the packed fallback stride
    /// (`width * 3`) and a width that is not a multiple of 4, the stride is
    /// not a whole number of 4-byte units and rows drift. Real 24 bpp
    /// drivers report a `line_length`, which is used instead.
    #[inline]
    pub fn stride_units(&self, unit: PixelUnit) -> usize {
        self.line_stride_bytes as usize / unit.bytes()
    }

    /// Index of the native slot holding visible pixel (x, y)
    ///
    /// All framebuffer addressing goes through here: rows by stride, then
    /// the pan offset in both axes.
    #[inline]
    pub fn unit_index(&self, unit: PixelUnit, x: usize, y: usize) -> usize {
        (y + self.pan_y as usize) * self.stride_units(unit) + self.pan_x as usize + x
    }

    /// Bytes to map: stride * height, or the packed size without a stride
    pub fn map_len(&self) -> usize {
        if self.line_stride_bytes > 0 {
            self.line_stride_bytes as usize * self.height as usize
        } else {
            self.width as usize
                * self.height as usize
                * bytes_per_pixel(self.bits_per_pixel) as usize
        }
    }

    /// Whether the stride/width invariant holds
    pub fn is_consistent(&self) -> bool {
        self.line_stride_bytes >= self.width * bytes_per_pixel(self.bits_per_pixel)
    }
}

impl std::fmt::Display for DeviceGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} @ {} bpp, stride {} B, pan ({}, {}), virtual {}x{}",
            self.width,
            self.height,
            self.bits_per_pixel,
            self.line_stride_bytes,
            self.pan_x,
            self.pan_y,
            self.virtual_width,
            self.virtual_height
        )
    }
}
