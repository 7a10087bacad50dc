//! # Configuration
//!
//! Settings come from an optional JSON file, overridden by command-line flags.
//! Every field has a default, so an empty file (or none at all) is valid:
//!
//! ```json
//! {
//!   "listen": "0.0.0.0:3000",
//!   "media_root": "/srv/chefpup",
//!   "video_path": "media/video.mp4",
//!   "looping_video_path": "media/looping.mp4",
//!   "audio_dir": "media/audio",
//!   "upload_dir": "public/uploads",
//!   "max_upload_bytes": 536870912
//! }
//! ```
//!
//! Relative paths are taken relative to `media_root`. [`MediaConfig::resolve`]
//! canonicalizes them and refuses anything that escapes the root, so route
//! handlers only ever see vetted paths.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line interface of the `chefpup` binary.
#[derive(Debug, Default, Parser)]
#[command(name = "chefpup")]
#[command(about = "Media server for the Chefpup conversation demo")]
pub struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file.
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Directory every media path must live under.
    #[arg(long)]
    pub media_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub listen: SocketAddr,
    pub media_root: PathBuf,
    /// Video served at `/video`.
    pub video_path: PathBuf,
    /// Background video served at `/looping-video`.
    pub looping_video_path: PathBuf,
    /// Directory holding `1.wav` .. `5.wav`.
    pub audio_dir: PathBuf,
    pub upload_dir: PathBuf,
    /// Upper bound on a `/upload` request body.
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            media_root: PathBuf::from("."),
            video_path: PathBuf::from("media/video.mp4"),
            looping_video_path: PathBuf::from("media/looping.mp4"),
            audio_dir: PathBuf::from("media/audio"),
            upload_dir: PathBuf::from("public/uploads"),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Canonical, validated locations derived from a [`MediaConfig`].
#[derive(Debug, Clone)]
pub struct MediaPaths {
    pub root: PathBuf,
    pub video: PathBuf,
    pub looping_video: PathBuf,
    pub audio_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl MediaConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Builds the effective configuration: file (if any), then CLI overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(listen) = cli.listen {
            config.listen = listen;
        }
        if let Some(root) = &cli.media_root {
            config.media_root = root.clone();
        }
        Ok(config)
    }

    /// Resolves every path against the media root.
    ///
    /// The videos and the audio directory must already exist. The upload
    /// directory is created on demand. All of them must end up inside the
    /// root after symlinks are followed.
    pub fn resolve(&self) -> Result<MediaPaths> {
        let root = self.media_root.canonicalize().with_context(|| {
            format!("Media root {} is not accessible", self.media_root.display())
        })?;
        ensure!(root.is_dir(), "Media root {} is not a directory", root.display());

        let video = resolve_within(&root, &self.video_path, "video")?;
        ensure!(video.is_file(), "Video {} is not a file", video.display());

        let looping_video = resolve_within(&root, &self.looping_video_path, "looping video")?;
        ensure!(
            looping_video.is_file(),
            "Looping video {} is not a file",
            looping_video.display()
        );

        let audio_dir = resolve_within(&root, &self.audio_dir, "audio directory")?;
        ensure!(
            audio_dir.is_dir(),
            "Audio directory {} is not a directory",
            audio_dir.display()
        );

        let upload_target = join_root(&root, &self.upload_dir);
        ensure_creatable_within(&root, &upload_target, "upload directory")?;
        std::fs::create_dir_all(&upload_target).with_context(|| {
            format!("Failed to create upload directory {}", upload_target.display())
        })?;
        let upload_dir = resolve_within(&root, &self.upload_dir, "upload directory")?;

        Ok(MediaPaths {
            root,
            video,
            looping_video,
            audio_dir,
            upload_dir,
        })
    }
}

fn join_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Checks that `target` would land inside `root` before anything is created.
///
/// The deepest existing ancestor is canonicalized; the missing tail may only
/// contain plain names.
fn ensure_creatable_within(root: &Path, target: &Path, what: &str) -> Result<()> {
    let existing = target
        .ancestors()
        .find(|p| p.exists())
        .with_context(|| {
            format!("Configured {} {} has no existing parent", what, target.display())
        })?;

    let tail = target.strip_prefix(existing)?;
    ensure!(
        tail.components().all(|c| matches!(c, Component::Normal(_))),
        "Configured {} {} must not use relative components",
        what,
        target.display()
    );

    let canonical = existing.canonicalize().with_context(|| {
        format!("Configured {} {} is not accessible", what, existing.display())
    })?;
    ensure!(
        canonical.starts_with(root),
        "Configured {} {} lies outside the media root {}",
        what,
        target.display(),
        root.display()
    );
    Ok(())
}

fn resolve_within(root: &Path, path: &Path, what: &str) -> Result<PathBuf> {
    let joined = join_root(root, path);
    let canonical = joined
        .canonicalize()
        .with_context(|| format!("Configured {} {} is not accessible", what, joined.display()))?;
    ensure!(
        canonical.starts_with(root),
        "Configured {} {} lies outside the media root {}",
        what,
        canonical.display(),
        root.display()
    );
    Ok(canonical)
}
