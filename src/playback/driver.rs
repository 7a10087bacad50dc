//! Runs a [`PlaybackController`] as a single tokio task.
//!
//! ```text
//! [page events] --> mpsc<PlaybackEvent> --> [session task] --> mpsc<MediaCommand> --> [page]
//!                                                 |
//!                                                 +--> watch<PlaybackSnapshot>
//! ```
//!
//! The task owns the only retry timer. `ScheduleRetry` re-arms it,
//! `CancelRetry` disarms it, and expiry feeds `RetryTimerFired` back into
//! the controller. Neither command reaches the host.

use std::pin::Pin;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant, Sleep};

use super::controller::PlaybackController;
use super::state::{MediaCommand, PlaybackEvent, PlaybackSnapshot};

/// Handle the page side uses to talk to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<PlaybackEvent>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl SessionHandle {
    /// Queues an event. Returns `false` once the session task has stopped.
    pub fn send(&self, event: PlaybackEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that wakes on every state change.
    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawns the session task.
///
/// Commands for the host go to `commands`. The task stops once every
/// [`SessionHandle`] clone has been dropped and hands the controller back
/// through the join handle.
pub fn spawn_session(
    controller: PlaybackController,
    commands: mpsc::UnboundedSender<MediaCommand>,
) -> (SessionHandle, JoinHandle<PlaybackController>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

    let driver = SessionDriver {
        controller,
        commands,
        snapshots: snapshot_tx,
        retry_armed: false,
    };
    let task = tokio::spawn(driver.run(event_rx));

    (
        SessionHandle {
            events: event_tx,
            snapshots: snapshot_rx,
        },
        task,
    )
}

struct SessionDriver {
    controller: PlaybackController,
    commands: mpsc::UnboundedSender<MediaCommand>,
    snapshots: watch::Sender<PlaybackSnapshot>,
    retry_armed: bool,
}

impl SessionDriver {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<PlaybackEvent>) -> PlaybackController {
        let retry_timer = sleep(Duration::ZERO);
        tokio::pin!(retry_timer);

        loop {
            tokio::select! {
                () = &mut retry_timer, if self.retry_armed => {
                    self.retry_armed = false;
                    self.dispatch(PlaybackEvent::RetryTimerFired, retry_timer.as_mut());
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event, retry_timer.as_mut()),
                    None => break,
                },
            }
        }

        log::debug!("[Session] All handles dropped, stopping");
        self.controller
    }

    fn dispatch(&mut self, event: PlaybackEvent, mut retry_timer: Pin<&mut Sleep>) {
        for command in self.controller.handle(event) {
            match command {
                MediaCommand::ScheduleRetry(delay) => {
                    retry_timer.as_mut().reset(Instant::now() + delay);
                    self.retry_armed = true;
                }
                MediaCommand::CancelRetry => self.retry_armed = false,
                other => {
                    if self.commands.send(other).is_err() {
                        log::debug!("[Session] Host went away, dropping command");
                    }
                }
            }
        }
        let next = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::retry::RetryPolicy;
    use crate::playback::state::{AudioQueue, PlaybackState};

    fn file() -> PlaybackEvent {
        PlaybackEvent::FileSelected {
            object_url: "blob:test".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retry_timer_replays_the_video() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (session, task) = spawn_session(PlaybackController::default(), cmd_tx);

        session.send(file());
        session.send(PlaybackEvent::VideoCanPlay);
        assert!(matches!(cmd_rx.recv().await, Some(MediaCommand::ShowUserVideo(_))));
        assert_eq!(cmd_rx.recv().await, Some(MediaCommand::PlayVideo));

        let started = Instant::now();
        session.send(PlaybackEvent::VideoPlayRejected);
        // Paused time auto-advances to the armed deadline.
        assert_eq!(cmd_rx.recv().await, Some(MediaCommand::PlayVideo));
        assert!(started.elapsed() >= Duration::from_millis(1_000));

        drop(session);
        let controller = task.await.unwrap();
        assert_eq!(controller.state(), PlaybackState::PlayingUserVideo);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_retry_never_fires() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (session, task) = spawn_session(PlaybackController::default(), cmd_tx);

        session.send(file());
        session.send(PlaybackEvent::VideoCanPlay);
        session.send(PlaybackEvent::VideoPlayRejected);
        session.send(PlaybackEvent::EndConversation);
        drop(session);

        let controller = task.await.unwrap();
        assert_eq!(controller.state(), PlaybackState::Idle);

        let mut commands = Vec::new();
        while let Some(cmd) = cmd_rx.recv().await {
            commands.push(cmd);
        }
        let plays = commands
            .iter()
            .filter(|c| **c == MediaCommand::PlayVideo)
            .count();
        assert_eq!(plays, 1);
        assert_eq!(
            commands.last(),
            Some(&MediaCommand::RevokeObjectUrl("blob:test".into()))
        );
    }

    #[tokio::test]
    async fn snapshots_follow_the_conversation() {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let controller = PlaybackController::new(AudioQueue::default(), RetryPolicy::default());
        let (session, _task) = spawn_session(controller, cmd_tx);
        let mut updates = session.watch();

        session.send(file());
        updates.changed().await.unwrap();
        assert_eq!(
            updates.borrow_and_update().state,
            PlaybackState::PlayingUserVideo
        );

        session.send(PlaybackEvent::VideoEnded);
        updates.changed().await.unwrap();
        assert_eq!(session.snapshot().state, PlaybackState::PlayingLoop);
    }
}
