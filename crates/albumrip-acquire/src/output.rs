use albumrip_model::Album;
use std::fs;

use crate::error::{AcquireError, Result};

/// File name for the cached album page.
pub const ALBUM_HTML_FILE: &str = "album.html";

/// Create the album directory and its images subdirectory.
pub fn prepare_dirs(album: &Album) -> Result<()> {
    for dir in [album.output_dir.clone(), album.images_dir()] {
        fs::create_dir_all(&dir).map_err(|e| AcquireError::io("failed to create", &dir, e))?;
    }
    tracing::info!(path = %album.output_dir.display(), "Prepared output directory");
    Ok(())
}

/// Keep the raw album page next to the downloads for later inspection.
pub fn cache_html(album: &Album, html: &str) -> Result<()> {
    let path = album.output_dir.join(ALBUM_HTML_FILE);
    fs::write(&path, html).map_err(|e| AcquireError::io("failed to write", &path, e))?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Cached raw HTML");
    Ok(())
}
