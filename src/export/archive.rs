use std::{
    io::{Cursor, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    encode::png_seq::PngSequence,
    export::session::ExportArtifacts,
    foundation::error::{CountframeError, CountframeResult},
};

/// Name of the manifest stored next to the PNG files.
pub const METADATA_FILE: &str = "metadata.json";

/// Zip a PNG sequence with stored (uncompressed) entries plus [`METADATA_FILE`].
pub fn png_archive_bytes(seq: &PngSequence) -> CountframeResult<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| CountframeError::encoding(format!("zip: {e}"));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for file in &seq.files {
        zip.start_file(file.name.as_str(), opts).map_err(zip_err)?;
        zip.write_all(&file.bytes)
            .with_context(|| format!("write '{}' to archive", file.name))?;
    }

    let manifest = serde_json::to_vec_pretty(&seq.metadata)
        .map_err(|e| CountframeError::serde(format!("serialize png metadata: {e}")))?;
    zip.start_file(METADATA_FILE, opts).map_err(zip_err)?;
    zip.write_all(&manifest).context("write metadata to archive")?;

    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CountframeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Paths written by [`write_artifacts`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    /// PNG sequence archive.
    pub png_archive: Option<PathBuf>,
    /// Video file.
    pub video: Option<PathBuf>,
}

/// Write `artifacts` into `out_dir`, naming files after `at`.
///
/// The archive is `counter-{YYYYMMDD-HHMMSS}-png.zip`; the video follows
/// [`crate::EncodedVideo::file_name`].
#[tracing::instrument(level = "info", skip(artifacts, at))]
pub fn write_artifacts<Tz>(
    artifacts: &ExportArtifacts,
    out_dir: &Path,
    at: &chrono::DateTime<Tz>,
) -> CountframeResult<WrittenArtifacts>
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut written = WrittenArtifacts::default();

    if let Some(seq) = &artifacts.png {
        let path = out_dir.join(format!("counter-{}-png.zip", at.format("%Y%m%d-%H%M%S")));
        ensure_parent_dir(&path)?;
        std::fs::write(&path, png_archive_bytes(seq)?)
            .with_context(|| format!("write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), files = seq.files.len(), "png archive written");
        written.png_archive = Some(path);
    }

    if let Some(video) = &artifacts.video {
        let path = out_dir.join(video.file_name(at));
        ensure_parent_dir(&path)?;
        std::fs::write(&path, &video.bytes)
            .with_context(|| format!("write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = video.bytes.len(), "video written");
        written.video = Some(path);
    }

    Ok(written)
}

#[cfg(test)]
#[path = "../../tests/unit/export/archive.rs"]
mod tests;
