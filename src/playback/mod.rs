//! # Playback Controller
//!
//! The conversation flow on the page, modelled as a state machine:
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Idle | file selected, camera acquired | PlayingUserVideo |
//! | PlayingUserVideo | video ended | PlayingLoop |
//! | PlayingLoop | toggle (video ready) | Recording |
//! | Recording | toggle, clips left | PlayingAudio |
//! | Recording | toggle, queue exhausted | SessionComplete |
//! | PlayingAudio | audio ended, clips left | PlayingLoop |
//! | PlayingAudio | audio ended, last clip | SessionComplete |
//! | PlayingAudio | audio rejected | PlayingLoop |
//! | any but Idle | end conversation | Idle |
//!
//! [`PlaybackController`] is pure: it takes [`PlaybackEvent`]s and returns
//! [`MediaCommand`]s for the host to execute. [`spawn_session`] wraps it in a
//! tokio task that owns the autoplay retry timer.

pub mod controller;
pub mod driver;
pub mod retry;
pub mod state;

pub use controller::PlaybackController;
pub use driver::{spawn_session, SessionHandle};
pub use retry::{PlayRetry, RetryPolicy};
pub use state::{
    AudioQueue, MediaCommand, PlaybackEvent, PlaybackSnapshot, PlaybackState, UserVideo,
    VideoStatus, QUEUE_LEN,
};
