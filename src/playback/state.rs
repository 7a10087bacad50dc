use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of clips in a conversation.
pub const QUEUE_LEN: usize = 4;

/// Where the conversation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    #[default]
    Idle,
    PlayingUserVideo,
    PlayingLoop,
    Recording,
    PlayingAudio,
    /// Every clip has played. The loop keeps running until the conversation ends.
    SessionComplete,
}

/// Readiness of the main video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoStatus {
    /// A new source was set and `canplay` has not fired yet.
    #[default]
    Loading,
    /// Playable but not playing.
    Ready,
    /// A play request is in flight.
    Starting,
    Playing,
    /// Play attempts were rejected until the retry policy ran out.
    Failed,
}

/// The user's own video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserVideo {
    /// A selected file, exposed to the page through an object URL.
    File { object_url: String },
    /// A live camera stream.
    Camera,
}

/// Ordered clips plus the index of the next one to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQueue {
    clips: [String; QUEUE_LEN],
    cursor: usize,
}

impl Default for AudioQueue {
    /// Clips as stored by the upload endpoint.
    fn default() -> Self {
        Self::new(std::array::from_fn(|i| format!("/uploads/{}.mp3", i + 1)))
    }
}

impl AudioQueue {
    pub fn new(clips: [String; QUEUE_LEN]) -> Self {
        Self { clips, cursor: 0 }
    }

    /// The next clip, or `None` once every clip has played.
    pub fn current(&self) -> Option<&str> {
        self.clips.get(self.cursor).map(String::as_str)
    }

    /// Moves past the current clip. Never goes beyond the queue length.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(QUEUE_LEN);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= QUEUE_LEN
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Inputs to the controller: user actions and media element events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A video file was picked; the host already created `object_url` for it.
    FileSelected { object_url: String },
    CameraAcquired,
    CameraDenied,
    /// `canplay` on the main video element.
    VideoCanPlay,
    /// `play` on the main video element.
    VideoPlayStarted,
    /// `pause` on the main video element.
    VideoPaused,
    /// The host's play attempt was rejected (typically autoplay policy).
    VideoPlayRejected,
    /// `ended` on the main video element.
    VideoEnded,
    RetryTimerFired,
    /// The speak/stop button.
    ToggleRecording,
    AudioEnded,
    AudioPlayRejected,
    EndConversation,
}

/// Side effects the controller asks its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
    ShowUserVideo(UserVideo),
    /// Switch the main element to the looping background video.
    ShowLoopingVideo,
    PlayVideo,
    StopCamera,
    RevokeObjectUrl(String),
    PlayAudio(String),
    StopAudio,
    /// Arm the single retry timer; it replaces any timer already armed.
    ScheduleRetry(Duration),
    CancelRetry,
    ReportVideoFailure,
}

/// Read-only view of the controller, suitable for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub video: VideoStatus,
    pub cursor: usize,
    pub queue_len: usize,
    /// 1-based number of the clip being played, for the "Playing Audio n/4" badge.
    pub now_playing: Option<usize>,
    pub recording: bool,
    pub session_complete: bool,
}
