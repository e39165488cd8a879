use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::UploadError;

pub const AUDIO_FIELD: &str = "audio";
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["mp3", "mp4", "mpeg", "mpga", "m4a", "wav", "webm"];

// Scratch copy of an upload, removed when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(dir: &Path, extension: &str) -> Self {
        Self {
            path: dir.join(format!("{}.{}", Uuid::new_v4(), extension)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Blocking unlink on the runtime thread; one small file per request.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", self.path.display(), e),
        }
    }
}

pub fn audio_extension(filename: &str) -> Result<String, UploadError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(UploadError::InvalidFileType(filename.to_string())),
    }
}

pub async fn receive_audio(
    mut payload: Multipart,
    scratch_dir: &Path,
    limit: usize,
) -> Result<ScratchFile, UploadError> {
    let mut stored: Option<ScratchFile> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let Some(filename) = filename else {
            drain(&mut field).await?;
            continue;
        };

        if name != AUDIO_FIELD || stored.is_some() {
            return Err(UploadError::UnexpectedField(name));
        }

        let extension = audio_extension(&filename)?;
        let file = ScratchFile::new(scratch_dir, &extension);
        let size = write_field(&mut field, file.path(), limit).await?;

        info!("Stored upload {} as {} ({} bytes)", filename, file.path().display(), size);
        stored = Some(file);
    }

    stored.ok_or(UploadError::MissingFile)
}

async fn write_field(field: &mut Field, path: &Path, limit: usize) -> Result<usize, UploadError> {
    let mut out = tokio::fs::File::create(path).await?;
    let mut written = 0;

    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        written += chunk.len();
        if written > limit {
            return Err(UploadError::TooLarge { limit });
        }
        out.write_all(&chunk).await?;
    }

    out.flush().await?;
    Ok(written)
}

async fn drain(field: &mut Field) -> Result<(), UploadError> {
    while field.try_next().await.map_err(multipart_error)?.is_some() {}
    Ok(())
}

fn multipart_error(e: actix_multipart::MultipartError) -> UploadError {
    UploadError::Multipart(e.to_string())
}
