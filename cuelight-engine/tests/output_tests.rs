//! Fades, blackout and what actually goes out on the wire

mod helpers;

use std::time::Duration;

use cuelight_common::{EasingCurve, LightingEvent};
use cuelight_engine::dmx::ChannelTarget;
use cuelight_engine::engine::scene_transition_id;
use cuelight_engine::{ShowData, ShowFile, ShowLibrary};
use helpers::TestRig;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_zero_duration_fade_never_tears() {
    let rig = TestRig::new();
    rig.engine.start();
    sleep(Duration::from_millis(100)).await;

    let targets: Vec<ChannelTarget> = (1..=512).map(|c| ChannelTarget::new(1, c, 255)).collect();
    rig.engine.fade_to_scene(&targets, 0.0, "snap", None).unwrap();

    // Visible before the call returns
    assert!(rig.engine.get_universe_output(1).unwrap().iter().all(|&v| v == 255));

    sleep(Duration::from_millis(200)).await;
    let frames = rig.sink.universe_frames(1);
    assert!(frames.len() >= 8);
    for frame in &frames {
        let all_dark = frame.iter().all(|&v| v == 0);
        let all_full = frame.iter().all(|&v| v == 255);
        assert!(all_dark || all_full, "partial frame on the wire");
    }
    assert!(frames.last().unwrap().iter().all(|&v| v == 255));

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_continues_from_current_value() {
    let rig = TestRig::new();
    rig.engine.start();

    rig.engine
        .fade_to_scene(&[ChannelTarget::new(1, 1, 200)], 2.0, "a", None)
        .unwrap();
    sleep(Duration::from_secs(1)).await;

    let before = rig.channel(1);
    rig.engine
        .fade_to_scene(&[ChannelTarget::new(1, 1, 0)], 2.0, "b", None)
        .unwrap();
    let after = rig.channel(1);

    // No jump when B takes over
    assert!((95..=100).contains(&before), "{}", before);
    assert!(after.abs_diff(100) <= 1, "{}", after);

    // B only ever moves the channel down from there
    let mut last = after;
    for _ in 0..30 {
        sleep(Duration::from_millis(100)).await;
        let now = rig.channel(1);
        assert!(now <= last);
        last = now;
    }
    assert_eq!(last, 0);

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_transitions_split_ownership() {
    let rig = TestRig::new();
    rig.engine.start();

    rig.engine
        .fade_to_scene(
            &[ChannelTarget::new(1, 1, 255), ChannelTarget::new(1, 2, 255)],
            4.0,
            "wash",
            Some(EasingCurve::Linear),
        )
        .unwrap();
    sleep(Duration::from_secs(1)).await;
    rig.engine
        .fade_to_scene(&[ChannelTarget::new(1, 2, 0)], 0.0, "kill", None)
        .unwrap();

    sleep(Duration::from_secs(4)).await;
    assert_eq!(rig.channel(1), 255);
    assert_eq!(rig.channel(2), 0);

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_blackout_stops_lists_and_stays_dark() {
    let rig = TestRig::with_universes(2);
    rig.engine.start();
    let list = rig.add_cue_list(&[
        (0.0, Some(0.5), [255, 255, 255]),
        (0.0, Some(0.5), [200, 200, 200]),
        (0.0, None, [255, 255, 255]),
    ]);
    rig.engine.set_channel_value(2, 300, 180).unwrap();
    let mut events = rig.engine.subscribe();

    rig.engine.start_cue_list(list, None).unwrap();
    sleep(Duration::from_millis(200)).await;
    rig.engine.blackout(1.0).unwrap();

    sleep(Duration::from_secs(5)).await;
    for (_, data) in rig.engine.get_all_universe_outputs() {
        assert!(data.iter().all(|&v| v == 0));
    }
    assert!(!rig.engine.get_playback_status(list).is_playing);
    assert_eq!(rig.engine.get_playback_status(list).current_cue_index, None);

    let mut saw_blackout = false;
    while let Ok(event) = events.try_recv() {
        if let LightingEvent::Blackout { duration_secs, .. } = event {
            assert_eq!(duration_secs, 1.0);
            saw_blackout = true;
        }
    }
    assert!(saw_blackout);

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fade_to_black_cancels_pending_follow() {
    let rig = TestRig::new();
    rig.engine.start();
    let list = rig.add_cue_list(&[
        (0.0, Some(1.0), [255, 255, 255]),
        (0.0, None, [200, 200, 200]),
    ]);

    rig.engine.start_cue_list(list, None).unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(rig.channel(10), 255);

    rig.engine.fade_to_black(0.0).unwrap();
    sleep(Duration::from_secs(2)).await;

    assert_eq!(rig.channel(10), 0);
    assert_eq!(rig.channel(11), 0);
    let status = rig.engine.get_playback_status(list);
    assert!(!status.is_playing);
    assert_eq!(status.current_cue_index, None);

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fade_to_black_ramps_down() {
    let rig = TestRig::new();
    rig.engine.start();
    rig.engine.set_channel_value(1, 5, 200).unwrap();

    rig.engine.fade_to_black(2.0).unwrap();
    sleep(Duration::from_secs(1)).await;
    let mid = rig.channel(5);
    assert!((95..=105).contains(&mid), "{}", mid);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(rig.channel(5), 0);

    rig.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_play_scene_resolves_fixture_addresses() {
    let rig = TestRig::new();
    let scene = rig.add_scene([255, 128, 64]);

    rig.engine.play_scene(scene, 0.0, None).unwrap();

    assert_eq!(rig.channel(10), 255);
    assert_eq!(rig.channel(11), 128);
    assert_eq!(rig.channel(12), 64);
    assert_eq!(rig.channel(9), 0);
    assert_eq!(
        rig.engine.fades().progress(&scene_transition_id(scene)),
        Some(1.0)
    );
}

#[tokio::test(start_paused = true)]
async fn test_channel_values_stay_in_range() {
    let rig = TestRig::new();
    rig.engine.start();

    for (i, value) in [999_i64, -1, 256, 128, i64::MAX, i64::MIN].iter().enumerate() {
        rig.engine.set_channel_value(1, i as u16 + 1, *value).unwrap();
    }
    let data = rig.engine.get_universe_output(1).unwrap();
    assert_eq!(&data[..6], &[255, 0, 255, 128, 255, 0]);

    rig.engine
        .fade_to_scene(&[ChannelTarget::new(1, 1, 0)], 1.0, "x", Some(EasingCurve::EaseInOut))
        .unwrap();
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(rig.channel(1), 0);

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_sends_black_frames() {
    let rig = TestRig::with_universes(2);
    rig.engine.set_channel_value(1, 1, 255).unwrap();
    rig.engine.set_channel_value(2, 512, 255).unwrap();

    rig.engine.shutdown().await;

    assert_eq!(rig.sink.frame_count(), 2);
    for universe in [1, 2] {
        let frames = rig.sink.universe_frames(universe);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].iter().all(|&v| v == 0));
    }
    assert_eq!(rig.engine.transmitter_stats().frames_sent, 2);
}

#[tokio::test(start_paused = true)]
async fn test_show_file_drives_engine() {
    let rig = TestRig::new();
    let scene_id = rig.add_scene([1, 2, 3]);
    let show = ShowFile {
        fixtures: vec![rig.fixture.clone()],
        scenes: vec![rig.show.scene(scene_id).unwrap()],
        cue_lists: Vec::new(),
    };

    let json = serde_json::to_string(&show).unwrap();
    let loaded = ShowLibrary::from_show_file(serde_json::from_str(&json).unwrap());
    let scene = loaded.scene(scene_id).unwrap();
    assert_eq!(scene.fixture_values[0].values, vec![1, 2, 3]);

    rig.engine.play_scene(scene_id, 0.0, None).unwrap();
    assert_eq!(rig.channel(12), 3);
}
