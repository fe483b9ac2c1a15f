//! Device-File Physical Memory Access
//!
//! Maps physical pages through a memory device file such as `/dev/mem`,
//! where the file offset is the physical address. A "mapping" is a
//! page-bounded window onto the file: reads through it never leave the
//! page, and nothing stays resident once the window is dropped.
//!
//! # Platform Requirements
//! - A kernel that exposes the device (and does not restrict it)
//! - Privileges to open it for reading

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use super::address::PhysAddr;
use super::mapper::{MappingError, PhysMapper};

/// Default physical memory device.
pub const DEFAULT_DEVICE: &str = "/dev/mem";

/// Physical memory backed by a device file.
#[derive(Debug)]
pub struct DevMem {
    file: File,
    path: PathBuf,
}

/// Handle for a page window onto the device file.
#[derive(Debug)]
pub struct DevMemWindow {
    base: u64,
}

impl DevMem {
    /// Open the device read-only.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        log::debug!("opened physical memory device {}", path.display());
        Ok(Self { file, path })
    }

    /// Path of the underlying device.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PhysMapper for DevMem {
    type Handle = DevMemWindow;

    fn map(&self, frame: PhysAddr) -> Result<Self::Handle, MappingError> {
        // File offsets are signed on the host side.
        if i64::try_from(frame.as_u64()).is_err() {
            return Err(MappingError::InvalidFrame(frame));
        }
        Ok(DevMemWindow {
            base: frame.as_u64(),
        })
    }

    fn read(
        &self,
        handle: &Self::Handle,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<(), MappingError> {
        let pos = handle.base + offset as u64;
        self.file.read_exact_at(buf, pos).map_err(|err| {
            log::warn!("{}: read at {:#x} failed: {}", self.path.display(), pos, err);
            match err.kind() {
                io::ErrorKind::UnexpectedEof => {
                    MappingError::InvalidFrame(PhysAddr::new(handle.base))
                }
                _ => MappingError::Io {
                    code: err.raw_os_error(),
                },
            }
        })
    }

    fn unmap(&self, _handle: Self::Handle) {}
}
