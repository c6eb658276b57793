//! # Pixel blitter
//!
//! Copies an engine color buffer into mapped framebuffer memory.
//!
//! Key properties:
//! - Areas entirely off-screen write nothing
//! - Partially visible areas are clamped per coordinate, and the source
//!   cursor still advances by the unclipped row width
//! - Rows are addressed by stride, never by `width * bytes_per_pixel`
//! - No write lands outside `buffer`, whatever the pan offset or mapping size

use super::geometry::{DeviceGeometry, PixelUnit};
use crate::engine::{Area, Color};

/// Reasons a blit wrote nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlitError {
    /// No pixel memory is mapped
    #[error("framebuffer is not mapped")]
    Unmapped,
    /// The area does not intersect the visible surface
    #[error("area ({x1},{y1})-({x2},{y2}) is entirely off-surface")]
    OutOfBounds { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// The device depth has no native unit
    #[error("unsupported bit depth: {0} bpp")]
    UnsupportedDepth(u32),
}

/// Write `area` from `colors` into `buffer`
///
/// Returns the number of pixels written. `colors` must be row-major and
/// cover the whole unclipped area; a shorter slice stops the copy at the
/// first missing value.
pub fn blit(
    geometry: &DeviceGeometry,
    buffer: &mut [u8],
    area: Area,
    colors: &[Color],
) -> Result<usize, BlitError> {
    if buffer.is_empty() {
        return Err(BlitError::Unmapped);
    }

    let max_x = i64::from(geometry.width) - 1;
    let max_y = i64::from(geometry.height) - 1;
    let (x1, y1) = (i64::from(area.x1), i64::from(area.y1));
    let (x2, y2) = (i64::from(area.x2), i64::from(area.y2));

    if x2 < 0 || y2 < 0 || x1 > max_x || y1 > max_y {
        return Err(BlitError::OutOfBounds {
            x1: area.x1,
            y1: area.y1,
            x2: area.x2,
            y2: area.y2,
        });
    }

    let unit = PixelUnit::for_depth(geometry.bits_per_pixel)
        .ok_or(BlitError::UnsupportedDepth(geometry.bits_per_pixel))?;

    let act_x1 = x1.clamp(0, max_x);
    let act_y1 = y1.clamp(0, max_y);
    let act_x2 = x2.clamp(0, max_x);
    let act_y2 = y2.clamp(0, max_y);

    if act_x1 > act_x2 || act_y1 > act_y2 {
        return Ok(0);
    }

    let src_width = area.width();
    let skip_left = (act_x1 - x1) as usize;
    let run = (act_x2 - act_x1) as usize + 1;
    let mut written = 0;

    for row in act_y1..=act_y2 {
        let src_start = (row - y1) as usize * src_width + skip_left;
        let dst_start = geometry.unit_index(unit, act_x1 as usize, row as usize);

        for i in 0..run {
            let Some(color) = colors.get(src_start + i) else {
                return Ok(written);
            };
            // Indices only grow from here on
            if !write_unit(buffer, unit, dst_start + i, color.full) {
                return Ok(written);
            }
            written += 1;
        }
    }

    Ok(written)
}

/// Store the low bytes of `value` in native slot `index`
#[inline]
fn write_unit(buffer: &mut [u8], unit: PixelUnit, index: usize, value: u32) -> bool {
    let start = index * unit.bytes();
    let Some(slot) = buffer.get_mut(start..start + unit.bytes()) else {
        return false;
    };

    match unit {
        PixelUnit::One => slot[0] = value as u8,
        PixelUnit::Two => slot.copy_from_slice(&(value as u16).to_ne_bytes()),
        PixelUnit::Four => slot.copy_from_slice(&value.to_ne_bytes()),
    }
    true
}

/// Read native slot `index` back, zero-extended
pub fn read_unit(buffer: &[u8], unit: PixelUnit, index: usize) -> Option<u32> {
    let start = index * unit.bytes();
    let slot = buffer.get(start..start + unit.bytes())?;

    Some(match unit {
        PixelUnit::One => u32::from(slot[0]),
        PixelUnit::Two => u32::from(u16::from_ne_bytes([slot[0], slot[1]])),
        PixelUnit::Four => u32::from_ne_bytes([slot[0], slot[1], slot[2], slot[3]]),
    })
}
