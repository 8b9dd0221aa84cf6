//! Raster loading: encoded bytes or a file path in, [`PixelBuffer`] out.
//!
//! Supports PNG, JPEG, BMP and WebP (whatever the `image` crate was built
//! with). Files are read fully into memory before decoding, so the file
//! handle is released on every exit path, including decode failures.

use std::path::{Path, PathBuf};

use crate::types::{LoadError, PixelBuffer};

/// Where an encoded raster comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterSource {
    /// Encoded image bytes already in memory (e.g. an upload).
    Bytes(Vec<u8>),
    /// An image file on disk.
    Path(PathBuf),
}

impl RasterSource {
    /// Decode this source into an RGBA buffer.
    ///
    /// # Errors
    ///
    /// See [`load`].
    pub fn load(&self) -> Result<PixelBuffer, LoadError> {
        load(self)
    }
}

impl From<PathBuf> for RasterSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for RasterSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for RasterSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Load an encoded raster into an RGBA buffer.
///
/// # Errors
///
/// Returns [`LoadError::EmptyInput`] if the bytes (or file) are empty,
/// [`LoadError::Io`] if the file cannot be read, and
/// [`LoadError::ImageDecode`] if the format is unrecognized or the data
/// is corrupt.
pub fn load(source: &RasterSource) -> Result<PixelBuffer, LoadError> {
    match source {
        RasterSource::Bytes(bytes) => decode(bytes),
        RasterSource::Path(path) => load_path(path),
    }
}

/// Read and decode an image file.
///
/// # Errors
///
/// See [`load`].
pub fn load_path(path: &Path) -> Result<PixelBuffer, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    decode(&bytes)
}

/// Decode encoded image bytes into an RGBA buffer.
///
/// # Errors
///
/// Returns [`LoadError::EmptyInput`] if `bytes` is empty.
/// Returns [`LoadError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}
