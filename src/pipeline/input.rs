//! Input resolution: validate the user-supplied paths and load the image.
//!
//! The checks run before any network call so a typo in the image path costs
//! nothing. Missing files map to [`LetterError::FileNotFound`]. A file that
//! exists but will not decode maps to [`LetterError::InvalidImage`]. Both, and
//! [`LetterError::PermissionDenied`], count as not-found
//! ([`LetterError::is_not_found`]).

use crate::error::LetterError;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use tracing::debug;

/// Verify `path` exists and can be opened for reading.
pub fn check_readable(path: &Path) -> Result<(), LetterError> {
    if !path.exists() {
        return Err(LetterError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(LetterError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(LetterError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Load and decode the posting image.
///
/// PNG, JPEG, WebP, GIF and BMP are supported. The format is sniffed from
/// the file's leading bytes, so a PNG saved as `posting.jpg` still loads.
pub fn load_image(path: &Path) -> Result<DynamicImage, LetterError> {
    check_readable(path)?;

    let invalid = |detail: String| LetterError::InvalidImage {
        path: path.to_path_buf(),
        detail,
    };

    let img = ImageReader::open(path)
        .map_err(|e| invalid(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?
        .decode()
        .map_err(|e| invalid(e.to_string()))?;

    debug!(
        "Loaded image {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}
