use chefpup_lib::playback::{MediaCommand, PlaybackController, PlaybackEvent, PlaybackState};

fn main() {
    println!("Verifying conversation flow...");

    // 1. Script a full conversation
    // Upload a file, let it end, then record/answer until every clip has played.
    let mut script = vec![
        PlaybackEvent::FileSelected {
            object_url: "blob:verify/video".to_string(),
        },
        PlaybackEvent::VideoCanPlay,
        PlaybackEvent::VideoPlayStarted,
        PlaybackEvent::VideoEnded,
        PlaybackEvent::VideoCanPlay,
        // Autoplay blocked once, then the retry succeeds.
        PlaybackEvent::VideoPlayRejected,
        PlaybackEvent::RetryTimerFired,
        PlaybackEvent::VideoPlayStarted,
    ];
    for _ in 0..5 {
        script.push(PlaybackEvent::ToggleRecording);
        script.push(PlaybackEvent::ToggleRecording);
        script.push(PlaybackEvent::AudioEnded);
    }
    script.push(PlaybackEvent::EndConversation);

    // 2. Run it
    let mut controller = PlaybackController::default();
    let mut clips_played = 0;
    let mut revokes = 0;

    for event in script {
        let label = format!("{:?}", event);
        let before = controller.state();
        let commands = controller.handle(event);

        for command in &commands {
            match command {
                MediaCommand::PlayAudio(_) => clips_played += 1,
                MediaCommand::RevokeObjectUrl(_) => revokes += 1,
                _ => {}
            }
        }
        println!(
            "{:<45} {:?} -> {:?} {:?}",
            label,
            before,
            controller.state(),
            commands
        );
    }

    // 3. Check the invariants
    println!("Clips played: {}, object URLs revoked: {}", clips_played, revokes);
    let ok = clips_played == 4 && revokes == 1 && controller.state() == PlaybackState::Idle;
    if ok {
        println!("SUCCESS: Conversation flow behaves as expected.");
    } else {
        println!("WARNING: Unexpected flow, inspect the transitions above.");
    }
}
