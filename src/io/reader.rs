//! Corpus and template file reading.
//!
//! Files under [`MMAP_THRESHOLD`] are read into a buffer; anything larger is
//! memory mapped and decoded in place.

#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Size from which files are memory mapped (1 MiB).
pub const MMAP_THRESHOLD: u64 = 1 << 20;

/// Largest file accepted (1 GiB).
pub const MAX_FILE_SIZE: u64 = 1 << 30;

/// Raw file bytes, either mapped or owned.
enum Bytes {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => &map[..],
            Self::Buffered(buf) => buf.as_slice(),
        }
    }
}

/// An opened, size-checked file.
///
/// # Examples
///
/// ```no_run
/// use ragpipe::io::FileReader;
///
/// let reader = FileReader::open("corpus.txt").unwrap();
/// println!("{} bytes", reader.size());
/// let text = reader.read_to_string().unwrap();
/// ```
#[derive(Debug)]
pub struct FileReader {
    file: File,
    size: u64,
    path: PathBuf,
}

impl FileReader {
    /// Opens `path` and records its size.
    ///
    /// # Errors
    ///
    /// Returns `IoError::FileNotFound` for a missing path and
    /// `IoError::ReadFailed` when the file cannot be opened or exceeds
    /// [`MAX_FILE_SIZE`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(IoError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let failed = |reason: String| IoError::ReadFailed {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(&path).map_err(|e| failed(e.to_string()))?;
        let size = file.metadata().map_err(|e| failed(e.to_string()))?.len();
        if size > MAX_FILE_SIZE {
            return Err(
                failed(format!("{size} bytes exceeds the {MAX_FILE_SIZE} byte limit")).into(),
            );
        }

        Ok(Self { file, size, path })
    }

    /// Size of the file in bytes when it was opened.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decodes the whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `IoError::MmapFailed` if mapping fails and
    /// `IoError::ReadFailed` on read errors or invalid UTF-8.
    pub fn read_to_string(&self) -> Result<String> {
        let bytes = self.bytes()?;
        std::str::from_utf8(&bytes).map(str::to_owned).map_err(|e| {
            IoError::ReadFailed {
                path: self.path.display().to_string(),
                reason: format!("invalid UTF-8: {e}"),
            }
            .into()
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bytes(&self) -> Result<Bytes> {
        if self.size >= MMAP_THRESHOLD {
            // Safety: read-only mapping, dropped before the reader
            let map = unsafe { Mmap::map(&self.file) }.map_err(|e| IoError::MmapFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Bytes::Mapped(map));
        }

        let mut buf = Vec::with_capacity(self.size as usize);
        (&self.file)
            .read_to_end(&mut buf)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Bytes::Buffered(buf))
    }
}

/// Reads a UTF-8 file in one call.
///
/// # Errors
///
/// Same as [`FileReader::open`] and [`FileReader::read_to_string`].
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    FileReader::open(path)?.read_to_string()
}

/// Creates `path` and any missing parents.
///
/// # Errors
///
/// Returns `IoError::DirectoryFailed` if creation fails.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|e| {
        IoError::DirectoryFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
