//! Framebuffer output
//!
//! Device access, geometry, and the blitter that copies engine colors into
//! mapped pixel memory.

pub mod blit;
pub mod device;
pub mod display;
pub mod geometry;
pub mod surface;
pub mod sys;

pub use blit::{blit, BlitError};
pub use device::FramebufferDevice;
pub use display::FramebufferDisplay;
pub use geometry::{DeviceGeometry, PixelUnit};
pub use surface::{MemorySurface, Surface};
