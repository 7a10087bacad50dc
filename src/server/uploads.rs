//! # Upload Store
//!
//! One shared directory holds the most recent upload at fixed names:
//!
//! ```text
//! <upload_dir>/video.mp4
//! <upload_dir>/1.mp3 .. 4.mp3
//! ```
//!
//! Every upload overwrites the previous one. Files are staged as `*.part` and
//! renamed into place only after all of them were written. A failed save
//! never leaves `*.part` files behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::{MediaError, MediaResult};

/// Number of audio clips an upload must carry.
pub const AUDIO_CLIP_COUNT: usize = 4;

const VIDEO_FIELD: &str = "video";
const VIDEO_FILE_NAME: &str = "video.mp4";
const STAGING_SUFFIX: &str = ".part";

fn audio_field(index: usize) -> String {
    format!("audio{}", index)
}

/// A complete, validated upload held in memory.
#[derive(Debug, Clone)]
pub struct UploadBundle {
    pub video: Bytes,
    pub audio: [Bytes; AUDIO_CLIP_COUNT],
}

impl UploadBundle {
    /// Builds a bundle from named form fields.
    ///
    /// Fails on the first missing field, checking `video` before
    /// `audio1`..`audio4`. Extra fields are ignored.
    pub fn from_fields(mut fields: HashMap<String, Bytes>) -> MediaResult<Self> {
        let video = fields
            .remove(VIDEO_FIELD)
            .ok_or_else(|| MediaError::validation("No video file provided"))?;

        let mut audio: [Bytes; AUDIO_CLIP_COUNT] = Default::default();
        for (slot, index) in audio.iter_mut().zip(1..=AUDIO_CLIP_COUNT) {
            *slot = fields
                .remove(&audio_field(index))
                .ok_or_else(|| MediaError::validation(format!("Missing audio file {}", index)))?;
        }

        Ok(Self { video, audio })
    }

    /// Drains a multipart body and validates it.
    ///
    /// The whole body is buffered first so that a rejected upload never
    /// touches the disk.
    pub async fn from_multipart(mut multipart: Multipart) -> MediaResult<Self> {
        let mut fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| MediaError::validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if !is_upload_field(&name) {
                log::debug!("[Upload] Ignoring unexpected field {:?}", name);
                continue;
            }

            let data = field
                .bytes()
                .await
                .map_err(|e| MediaError::validation(e.body_text()))?;
            log::debug!("[Upload] Received {} ({} bytes)", name, data.len());
            fields.insert(name, data);
        }

        Self::from_fields(fields)
    }

    pub fn total_bytes(&self) -> usize {
        self.video.len() + self.audio.iter().map(Bytes::len).sum::<usize>()
    }
}

fn is_upload_field(name: &str) -> bool {
    name == VIDEO_FIELD || (1..=AUDIO_CLIP_COUNT).any(|i| name == audio_field(i))
}

/// Fixed-layout storage for the latest upload.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.join(VIDEO_FILE_NAME)
    }

    /// Path of audio clip `index`, counted from 1.
    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.mp3", index))
    }

    fn targets(&self) -> Vec<PathBuf> {
        std::iter::once(self.video_path())
            .chain((1..=AUDIO_CLIP_COUNT).map(|i| self.audio_path(i)))
            .collect()
    }

    /// Persists `bundle`, replacing whatever upload was there before.
    pub async fn save(&self, bundle: UploadBundle) -> MediaResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MediaError::from_io(&self.dir, e))?;

        let total = bundle.total_bytes();
        let contents = std::iter::once(bundle.video).chain(bundle.audio);
        let staged: Vec<(PathBuf, PathBuf)> = self
            .targets()
            .into_iter()
            .map(|target| (staging_path(&target), target))
            .collect();

        // Stage everything first; a failure here leaves the previous upload intact.
        for ((part, _), data) in staged.iter().zip(contents) {
            if let Err(e) = tokio::fs::write(part, &data).await {
                discard_staged(&staged).await;
                return Err(MediaError::from_io(part, e));
            }
        }

        for (part, target) in &staged {
            if let Err(e) = tokio::fs::rename(part, target).await {
                discard_staged(&staged).await;
                return Err(MediaError::from_io(target, e));
            }
        }

        log::info!(
            "[Upload] Stored video and {} audio clips ({} bytes) in {}",
            AUDIO_CLIP_COUNT,
            total,
            self.dir.display()
        );
        Ok(())
    }

    /// True when the video and every audio clip are present.
    pub async fn is_complete(&self) -> bool {
        for path in self.targets() {
            match tokio::fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    log::warn!("[Upload] Could not check {}: {}", path.display(), e);
                    return false;
                }
            }
        }
        true
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Removes whatever staging files are still around after a failed save.
async fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (part, _) in staged {
        match tokio::fs::remove_file(part).await {
            Ok(()) => log::debug!("[Upload] Discarded {}", part.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("[Upload] Could not remove {}: {}", part.display(), e),
        }
    }
}
