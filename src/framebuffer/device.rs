//! # Framebuffer device
//!
//! Opens a Linux fbdev node, reads (and optionally sets) its mode, and maps
//! its pixel memory.
//!
//! The mapping is released before the file handle on every path: field
//! order in `FramebufferDevice` guarantees it for `Drop`, and `close`
//! does it explicitly.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use super::geometry::DeviceGeometry;
use super::surface::Surface;
use super::sys::{ioctl, FbFixScreeninfo, FbVarScreeninfo, FB_ACTIVATE_NOW};
use crate::error::{Error, Result};

/// Shared read-write mapping of the device memory
struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr/len describe a live MAP_SHARED region owned by self
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: the region was returned by mmap with this length
        let rc = unsafe { libc::munmap(self.ptr.as_ptr().cast(), self.len) };
        if rc != 0 {
            log::warn!("munmap failed: {}", io::Error::last_os_error());
        }
    }
}

/// Open framebuffer device
pub struct FramebufferDevice {
    // Dropped before `file`
    mapping: Option<Mapping>,
    file: File,
    path: PathBuf,
    geometry: DeviceGeometry,
    driver_id: String,
}

impl FramebufferDevice {
    /// Open `path` read-write and read its geometry
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata = std::fs::metadata(&path).map_err(|source| Error::DeviceOpen {
            path: path.clone(),
            source,
        })?;
        if !metadata.file_type().is_char_device() {
            return Err(Error::NotCharDevice { path });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| Error::DeviceOpen {
                path: path.clone(),
                source,
            })?;

        let mut device = Self {
            mapping: None,
            file,
            path,
            geometry: DeviceGeometry::packed(0, 0, 0),
            driver_id: String::new(),
        };
        device.query_geometry()?;

        log::info!(
            "Opened {} ({}): {}",
            device.path.display(),
            device.driver_id,
            device.geometry
        );
        Ok(device)
    }

    /// Device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Driver identification string from the fixed screen info
    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    /// Last geometry read from the driver
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// Whether pixel memory is mapped
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Re-read fixed and variable screen info
    pub fn query_geometry(&mut self) -> Result<DeviceGeometry> {
        let mut fix = FbFixScreeninfo::default();
        self.ioctl(ioctl::FBIOGET_FSCREENINFO, "FBIOGET_FSCREENINFO", &mut fix)?;

        let mut var = FbVarScreeninfo::default();
        self.ioctl(ioctl::FBIOGET_VSCREENINFO, "FBIOGET_VSCREENINFO", &mut var)?;

        self.geometry = DeviceGeometry::from_screeninfo(&var, &fix);
        self.driver_id = fix.id_string();

        if !self.geometry.is_consistent() {
            log::warn!(
                "{}: stride {} B is smaller than a packed row",
                self.path.display(),
                self.geometry.line_stride_bytes
            );
        }
        Ok(self.geometry)
    }

    /// Request a new mode and read back what the driver actually set
    ///
    /// Only allowed before `map`; the driver may clamp any of the values.
    pub fn reconfigure(
        &mut self,
        bits_per_pixel: u32,
        width: u32,
        height: u32,
    ) -> Result<DeviceGeometry> {
        if self.mapping.is_some() {
            return Err(Error::ModeLocked {
                path: self.path.clone(),
            });
        }

        let mut var = FbVarScreeninfo::default();
        self.ioctl(ioctl::FBIOGET_VSCREENINFO, "FBIOGET_VSCREENINFO", &mut var)?;

        var.bits_per_pixel = bits_per_pixel;
        var.xres = width;
        var.yres = height;
        var.xres_virtual = width;
        var.yres_virtual = height;
        var.xoffset = 0;
        var.yoffset = 0;
        var.activate = FB_ACTIVATE_NOW;
        self.ioctl(ioctl::FBIOPUT_VSCREENINFO, "FBIOPUT_VSCREENINFO", &mut var)?;

        let geometry = self.query_geometry()?;
        if (geometry.bits_per_pixel, geometry.width, geometry.height)
            != (bits_per_pixel, width, height)
        {
            log::warn!(
                "{}: requested {}x{} @ {} bpp, driver set {}",
                self.path.display(),
                width,
                height,
                bits_per_pixel,
                geometry
            );
        } else {
            log::info!("{}: mode set to {}", self.path.display(), geometry);
        }
        Ok(geometry)
    }

    /// Map the pixel memory (`stride * height` bytes)
    ///
    /// Mapping twice returns the existing region.
    pub fn map(&mut self) -> Result<&mut [u8]> {
        if self.mapping.is_none() {
            let len = self.geometry.map_len();
            if len == 0 {
                return Err(Error::Map {
                    len,
                    path: self.path.clone(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "empty geometry"),
                });
            }
            if self.geometry.memory_len != 0 && len > self.geometry.memory_len as usize {
                log::warn!(
                    "{}: mapping {} B but driver reports {} B of video memory",
                    self.path.display(),
                    len,
                    self.geometry.memory_len
                );
            }

            // SAFETY: fresh mapping of an open descriptor; checked below
            let raw = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    self.file.as_raw_fd(),
                    0,
                )
            };
            if raw == libc::MAP_FAILED {
                return Err(Error::Map {
                    len,
                    path: self.path.clone(),
                    source: io::Error::last_os_error(),
                });
            }
            let ptr = NonNull::new(raw.cast::<u8>()).ok_or_else(|| Error::Map {
                len,
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::Other, "mmap returned null"),
            })?;

            log::debug!("{}: mapped {} B", self.path.display(), len);
            self.mapping = Some(Mapping { ptr, len });
        }

        Ok(self.pixels_mut())
    }

    /// Release the mapping; no-op when nothing is mapped
    pub fn unmap(&mut self) {
        if self.mapping.take().is_some() {
            log::debug!("{}: unmapped", self.path.display());
        }
    }

    /// Unmap, then close the handle
    pub fn close(mut self) {
        self.unmap();
        log::debug!("{}: closed", self.path.display());
    }

    fn ioctl<T>(&self, request: u32, name: &'static str, arg: &mut T) -> Result<()> {
        // SAFETY: `arg` is a #[repr(C)] struct of the size the request expects
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg as *mut T) };
        if rc == -1 {
            return Err(Error::Ioctl {
                request: name,
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Surface for FramebufferDevice {
    fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        match self.mapping.as_mut() {
            Some(mapping) => mapping.as_mut_slice(),
            None => &mut [],
        }
    }
}

impl std::fmt::Debug for FramebufferDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramebufferDevice")
            .field("path", &self.path)
            .field("driver_id", &self.driver_id)
            .field("geometry", &self.geometry)
            .field("mapped", &self.mapping.as_ref().map(|m| m.len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = FramebufferDevice::open("/nonexistent/fb7").unwrap_err();
        assert!(matches!(err, Error::DeviceOpen { .. }));
        assert!(err.to_string().contains("/nonexistent/fb7"));
    }

    #[test]
    fn test_open_regular_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = FramebufferDevice::open(file.path()).unwrap_err();
        assert!(matches!(err, Error::NotCharDevice { .. }));
    }

    #[test]
    fn test_open_non_framebuffer_char_device() {
        // /dev/null is a character device that rejects fbdev ioctls
        let err = FramebufferDevice::open("/dev/null").unwrap_err();
        match err {
            Error::Ioctl { request, .. } => assert_eq!(request, "FBIOGET_FSCREENINFO"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
