//! Upload source seam.
//!
//! The HTTP layer owns multipart parsing; the store only needs the client
//! metadata and a way to move the bytes into the flash directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An uploaded file handed to the store by the transport layer.
pub trait UploadedFile {
    /// Filename as supplied by the client.
    fn client_filename(&self) -> &str;

    /// Media type as supplied by the client.
    fn client_media_type(&self) -> &str;

    /// Size of the upload in bytes.
    fn size(&self) -> u64;

    /// Moves the upload's bytes to `dest`. May be called at most once.
    fn move_to(&self, dest: &Path) -> io::Result<()>;
}

/// Upload whose bytes are already spooled to a local path.
#[derive(Debug, Clone)]
pub struct TempUpload {
    path: PathBuf,
    filename: String,
    media_type: String,
    size: u64,
}

impl TempUpload {
    pub fn new(
        path: impl Into<PathBuf>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> io::Result<Self> {
        let path = path.into();
        let size = fs::metadata(&path)?.len();

        Ok(Self {
            path,
            filename: filename.into(),
            media_type: media_type.into(),
            size,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UploadedFile for TempUpload {
    fn client_filename(&self) -> &str {
        &self.filename
    }

    fn client_media_type(&self) -> &str {
        &self.media_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn move_to(&self, dest: &Path) -> io::Result<()> {
        // rename fails across filesystems; fall back to copy + unlink.
        if fs::rename(&self.path, dest).is_ok() {
            return Ok(());
        }

        fs::copy(&self.path, dest)?;
        fs::remove_file(&self.path)
    }
}
