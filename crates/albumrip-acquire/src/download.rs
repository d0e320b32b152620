use albumrip_model::{DownloadOutcome, ResolvedAsset};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{AcquireError, Result};
use crate::http::{BodyStream, Fetcher, Transport};

/// Write granularity for asset bodies.
pub const CHUNK_SIZE: usize = 8 * 1024;

const PART_SUFFIX: &str = ".part";

/// Where an asset is written while it is still arriving.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(PART_SUFFIX);
    destination.with_file_name(name)
}

/// Stream `asset` to its destination unless a file is already there.
///
/// The body goes to a `.part` file that is renamed into place once complete,
/// so the destination only ever holds finished downloads. A failed request
/// creates nothing; a stream that breaks part-way removes its `.part` file.
pub async fn download<T: Transport>(
    fetcher: &Fetcher<T>,
    asset: &ResolvedAsset,
) -> Result<DownloadOutcome> {
    let destination = &asset.destination;

    let exists = fs::try_exists(destination)
        .await
        .map_err(|e| AcquireError::io("failed to check", destination, e))?;
    if exists {
        tracing::debug!(path = %destination.display(), "Already present, skipping");
        return Ok(DownloadOutcome::Skipped);
    }

    let mut body = fetcher.open_asset(&asset.url, &asset.referer).await?;

    let part = part_path(destination);
    let bytes = match write_body(body.as_mut(), &part).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&part).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %part.display(), error = %cleanup, "Failed to remove partial download");
                }
            }
            return Err(e);
        }
    };

    fs::rename(&part, destination)
        .await
        .map_err(|e| AcquireError::io("failed to move download into", destination, e))?;

    tracing::debug!(path = %destination.display(), bytes, "Downloaded");
    Ok(DownloadOutcome::Downloaded { bytes })
}

async fn write_body(body: &mut dyn BodyStream, part: &Path) -> Result<u64> {
    let file = fs::File::create(part)
        .await
        .map_err(|e| AcquireError::io("failed to create", part, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut total = 0u64;

    while let Some(chunk) = body.next_chunk().await? {
        for piece in chunk.chunks(CHUNK_SIZE) {
            writer
                .write_all(piece)
                .await
                .map_err(|e| AcquireError::io("failed to write", part, e))?;
        }
        total += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| AcquireError::io("failed to write", part, e))?;

    Ok(total)
}
