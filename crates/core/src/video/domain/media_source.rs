use std::path::{Path, PathBuf};

use crate::shared::constants::SUPPORTED_EXTENSIONS;
use crate::video::domain::reader_error::ReaderError;

/// A video file path whose extension is in [`SUPPORTED_EXTENSIONS`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaSource {
    path: PathBuf,
    extension: String,
}

impl MediaSource {
    /// Validates the extension of `path`. No file system access happens here.
    pub fn new(path: &Path) -> Result<Self, ReaderError> {
        let extension = dotted_extension(path);
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ReaderError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            extension,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension including the leading dot, e.g. `".mp4"`.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// `".ext"` for a path with an extension, empty string otherwise.
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
