use super::retry::{PlayRetry, RetryPolicy};
use super::state::{
    AudioQueue, MediaCommand, PlaybackEvent, PlaybackSnapshot, PlaybackState, UserVideo,
    VideoStatus, QUEUE_LEN,
};

/// The conversation state machine.
///
/// Owns the playback state, the clip queue and the user's video source.
/// [`handle`](Self::handle) applies one event and returns the commands the
/// host must run, in order. The controller never blocks and never touches
/// media itself.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: PlaybackState,
    queue: AudioQueue,
    user_video: Option<UserVideo>,
    video: VideoStatus,
    retry: PlayRetry,
    retry_pending: bool,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(AudioQueue::default(), RetryPolicy::default())
    }
}

impl PlaybackController {
    pub fn new(queue: AudioQueue, policy: RetryPolicy) -> Self {
        Self {
            state: PlaybackState::Idle,
            queue,
            user_video: None,
            video: VideoStatus::Loading,
            retry: PlayRetry::new(policy),
            retry_pending: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn video_status(&self) -> VideoStatus {
        self.video
    }

    pub fn queue(&self) -> &AudioQueue {
        &self.queue
    }

    pub fn is_session_complete(&self) -> bool {
        self.state == PlaybackState::SessionComplete
    }

    /// `(clip number, total)` while a clip is playing.
    pub fn now_playing(&self) -> Option<(usize, usize)> {
        (self.state == PlaybackState::PlayingAudio).then(|| (self.queue.cursor() + 1, QUEUE_LEN))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            video: self.video,
            cursor: self.queue.cursor(),
            queue_len: QUEUE_LEN,
            now_playing: self.now_playing().map(|(n, _)| n),
            recording: self.state == PlaybackState::Recording,
            session_complete: self.is_session_complete(),
        }
    }

    /// Applies one event. Events that make no sense in the current state are
    /// ignored and produce no commands.
    pub fn handle(&mut self, event: PlaybackEvent) -> Vec<MediaCommand> {
        let mut out = Vec::new();
        let before = self.state;

        match event {
            PlaybackEvent::FileSelected { object_url } => {
                if self.state == PlaybackState::Idle {
                    self.start_user_video(UserVideo::File { object_url }, &mut out);
                } else {
                    // Nobody else will release this URL.
                    log::warn!("[Session] File selected mid-conversation, discarding it");
                    out.push(MediaCommand::RevokeObjectUrl(object_url));
                }
            }
            PlaybackEvent::CameraAcquired => {
                if self.state == PlaybackState::Idle {
                    self.start_user_video(UserVideo::Camera, &mut out);
                } else {
                    log::warn!("[Session] Camera acquired mid-conversation, ignoring it");
                }
            }
            PlaybackEvent::CameraDenied => {
                log::info!("[Session] Camera access denied");
            }
            PlaybackEvent::VideoCanPlay => {
                if self.video == VideoStatus::Loading {
                    self.video = VideoStatus::Ready;
                }
            }
            PlaybackEvent::VideoPlayStarted => {
                self.video = VideoStatus::Playing;
                self.retry.reset();
                self.cancel_retry(&mut out);
            }
            PlaybackEvent::VideoPaused => {
                if matches!(self.video, VideoStatus::Playing | VideoStatus::Starting) {
                    self.video = VideoStatus::Ready;
                }
            }
            PlaybackEvent::VideoPlayRejected => self.on_play_rejected(&mut out),
            PlaybackEvent::RetryTimerFired => {
                self.retry_pending = false;
            }
            PlaybackEvent::VideoEnded => {
                if self.state == PlaybackState::PlayingUserVideo {
                    self.switch_to_loop(&mut out);
                }
            }
            PlaybackEvent::ToggleRecording => self.toggle_recording(&mut out),
            PlaybackEvent::AudioEnded => {
                if self.state == PlaybackState::PlayingAudio {
                    self.queue.advance();
                    self.state = if self.queue.is_exhausted() {
                        PlaybackState::SessionComplete
                    } else {
                        PlaybackState::PlayingLoop
                    };
                }
            }
            PlaybackEvent::AudioPlayRejected => {
                if self.state == PlaybackState::PlayingAudio {
                    log::warn!(
                        "[Session] Clip {} was rejected, back to the loop",
                        self.queue.cursor() + 1
                    );
                    self.state = PlaybackState::PlayingLoop;
                }
            }
            PlaybackEvent::EndConversation => self.end_conversation(&mut out),
        }

        self.keep_video_alive(&mut out);

        if self.state != before {
            log::debug!("[Session] {:?} -> {:?}", before, self.state);
        }
        out
    }

    fn start_user_video(&mut self, source: UserVideo, out: &mut Vec<MediaCommand>) {
        self.reset_video(out);
        self.user_video = Some(source.clone());
        self.state = PlaybackState::PlayingUserVideo;
        out.push(MediaCommand::ShowUserVideo(source));
    }

    fn switch_to_loop(&mut self, out: &mut Vec<MediaCommand>) {
        if matches!(self.user_video, Some(UserVideo::Camera)) {
            self.user_video = None;
            out.push(MediaCommand::StopCamera);
        }
        self.reset_video(out);
        self.state = PlaybackState::PlayingLoop;
        out.push(MediaCommand::ShowLoopingVideo);
    }

    fn toggle_recording(&mut self, out: &mut Vec<MediaCommand>) {
        match self.state {
            PlaybackState::PlayingLoop if self.video != VideoStatus::Loading => {
                self.state = PlaybackState::Recording;
            }
            PlaybackState::Recording => match self.queue.current() {
                Some(clip) => {
                    out.push(MediaCommand::PlayAudio(clip.to_string()));
                    self.state = PlaybackState::PlayingAudio;
                }
                None => self.state = PlaybackState::SessionComplete,
            },
            _ => {}
        }
    }

    fn end_conversation(&mut self, out: &mut Vec<MediaCommand>) {
        if self.state == PlaybackState::Idle {
            return;
        }

        self.cancel_retry(out);
        if self.state == PlaybackState::PlayingAudio {
            out.push(MediaCommand::StopAudio);
        }
        // `take` guarantees each source is released once.
        match self.user_video.take() {
            Some(UserVideo::Camera) => out.push(MediaCommand::StopCamera),
            Some(UserVideo::File { object_url }) => {
                out.push(MediaCommand::RevokeObjectUrl(object_url))
            }
            None => {}
        }

        self.queue.reset();
        self.video = VideoStatus::Loading;
        self.retry.reset();
        self.state = PlaybackState::Idle;
        log::info!("[Session] Conversation ended");
    }

    fn on_play_rejected(&mut self, out: &mut Vec<MediaCommand>) {
        if self.video != VideoStatus::Starting {
            return;
        }
        self.video = VideoStatus::Ready;

        match self.retry.next_delay() {
            Some(delay) => {
                self.cancel_retry(out);
                out.push(MediaCommand::ScheduleRetry(delay));
                self.retry_pending = true;
            }
            None => {
                log::warn!(
                    "[Session] Video would not start after {} attempts",
                    self.retry.attempts()
                );
                self.video = VideoStatus::Failed;
                out.push(MediaCommand::ReportVideoFailure);
            }
        }
    }

    /// Requests playback whenever the video is ready but idle, unless a retry
    /// is already waiting.
    fn keep_video_alive(&mut self, out: &mut Vec<MediaCommand>) {
        if self.state != PlaybackState::Idle
            && self.video == VideoStatus::Ready
            && !self.retry_pending
        {
            self.video = VideoStatus::Starting;
            out.push(MediaCommand::PlayVideo);
        }
    }

    /// A new source starts with a fresh retry budget.
    fn reset_video(&mut self, out: &mut Vec<MediaCommand>) {
        self.cancel_retry(out);
        self.retry.reset();
        self.video = VideoStatus::Loading;
    }

    fn cancel_retry(&mut self, out: &mut Vec<MediaCommand>) {
        if self.retry_pending {
            self.retry_pending = false;
            out.push(MediaCommand::CancelRetry);
        }
    }
}
