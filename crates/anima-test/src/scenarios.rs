//! End-to-end scenarios over sampled trajectories

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Duration;

use anima_core::{HumanBone, MemoryRig, Rotation, Side, Skeleton};
use anima_live::{AudioChunk, FeedEvent, FeedStatus, Gaze, LiveContext, Tracking};
use anima_runtime::AnimaConfig;
use anima_speech::encode_pcm16_base64;

use crate::{FrameTiming, Simulation};

fn probs(pairs: &[(&str, f32)]) -> Option<HashMap<String, f32>> {
    Some(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
}

fn identity(rotation: Option<Rotation>) -> bool {
    rotation.map(|r| r.is_identity(1e-6)).unwrap_or(false)
}

#[test]
fn test_idle_without_signals() {
    let mut sim = Simulation::seeded(5);
    let samples = sim.run_for(7.0).to_vec();

    // breathing never stops
    let chest: Vec<Rotation> = samples.iter().filter_map(|s| s.chest).collect();
    assert_eq!(chest.len(), samples.len());
    assert!(chest
        .windows(30)
        .all(|w| w.iter().any(|r| !r.approx_eq(&w[0], 1e-5))));

    // blink interval tops out at 6 s, plus the closing phase
    let first_peak = samples
        .iter()
        .find(|s| s.blink == 1.0)
        .map(|s| s.t)
        .unwrap();
    assert!(first_peak <= 6.2, "first full blink at {first_peak}");

    assert!(samples.iter().all(|s| (0.0..=1.0).contains(&s.blink)));
    let reopened = samples
        .iter()
        .skip_while(|s| s.blink < 1.0)
        .any(|s| s.blink == 0.0);
    assert!(reopened);
}

#[test]
fn test_long_running_session_keeps_moving() {
    // a week of uptime, well past where single-precision seconds stall
    let week = Duration::from_secs(7 * 86_400);
    let mut sim = Simulation::seeded(5).resumed_at(week);
    let samples = sim.run_for(7.0).to_vec();

    assert!(samples[0].t > week.as_secs_f64());
    assert!(samples.windows(2).all(|w| w[1].t > w[0].t));
    assert!(samples.iter().any(|s| s.blink == 1.0));

    let chest: Vec<Rotation> = samples.iter().filter_map(|s| s.chest).collect();
    assert_eq!(chest.len(), samples.len());
    let moving = chest
        .windows(2)
        .filter(|w| !w[1].approx_eq(&w[0], 1e-6))
        .count();
    assert!(moving > chest.len() / 2, "chest moved on {moving} frames");

    let eyes = samples.iter().map(|s| s.eye_yaw).fold(0.0_f32, |m, y| m.max(y.abs()));
    assert!(eyes > 0.0);
}

#[test]
fn test_detach_restores_authored_pose() {
    let mut sim = Simulation::seeded(7);
    sim.run_for(1.0);
    let arm = sim.rig.rotation(HumanBone::UpperArm(Side::Left));
    assert!(!identity(arm));
    assert!(sim.last().unwrap().hips_x != 0.0);

    sim.compositor.detach(&mut sim.rig);
    assert!(identity(sim.rig.rotation(HumanBone::UpperArm(Side::Left))));
    assert!(identity(sim.rig.rotation(HumanBone::UpperArm(Side::Right))));
    let hips = sim.rig.skeleton.bone(HumanBone::Hips).map(|h| h.position.x);
    assert_eq!(hips, Some(0.0));
}

#[test]
fn test_zero_intensity_leaves_rest_pose() {
    let mut cfg = AnimaConfig::default();
    cfg.idle_body.intensity = 0.0;
    cfg.face.seed = Some(2);
    let mut sim = Simulation::new(cfg);

    for sample in sim.run_for(2.0) {
        assert!(identity(sample.spine));
        assert!(identity(sample.chest));
        assert!(identity(sample.head));
    }
}

#[test]
fn test_rest_pose_never_drifts() {
    let mut sim = Simulation::seeded(3);
    sim.context(LiveContext {
        posture: Some(anima_live::Posture {
            inclination: Some(0.3),
            ..Default::default()
        }),
        ..Default::default()
    });
    sim.run_for(3.0);

    let engine = sim.compositor.engine();
    for bone in [HumanBone::Spine, HumanBone::Chest, HumanBone::Head, HumanBone::Neck] {
        assert!(identity(engine.rest(bone)), "{bone:?} rest moved");
    }
}

#[test]
fn test_body_weight_converges_without_overshoot() {
    let mut sim = Simulation::seeded(1);
    sim.compositor.set_body_weight(1.0);
    let samples = sim.run_for(3.0);

    let mut last = 1.0;
    for s in samples {
        assert!(s.hips_scale_x >= last);
        assert!(s.hips_scale_x <= 1.25 + 1e-6);
        last = s.hips_scale_x;
    }
    assert!(last > 1.249);
}

#[test]
fn test_frame_rate_independent_convergence() {
    let run = |fps: u32| {
        let mut sim = Simulation::seeded(1).with_timing(FrameTiming::steady(fps));
        sim.compositor.set_body_weight(1.0);
        sim.context(LiveContext {
            state_confidence: Some(1.0),
            emotion_probs: probs(&[("happy", 0.8)]),
            ..Default::default()
        });
        sim.run_for(0.5);
        let last = *sim.last().unwrap();
        (last.hips_scale_x, last.happy)
    };

    let (scale_30, happy_30) = run(30);
    let (scale_144, happy_144) = run(144);
    assert!((scale_30 - scale_144).abs() < 0.02);
    assert!((happy_30 - happy_144).abs() < 0.02);
}

#[test]
fn test_jittered_frames_stay_bounded() {
    let mut sim = Simulation::seeded(8).with_timing(FrameTiming::unstable(60, 21));
    sim.event(FeedEvent::Mode("speaking".into()));
    for s in sim.run_for(5.0) {
        assert!(s.dt > 0.0 && s.dt <= 0.1);
        for w in [s.blink, s.aa, s.oh, s.happy, s.sad] {
            assert!((0.0..=1.0).contains(&w));
        }
    }
}

#[test]
fn test_gaze_suppression_recenters_eyes() {
    let mut sim = Simulation::seeded(4);
    // wait for a saccade to move the eyes off center
    let mut yaw = 0.0_f32;
    for _ in 0..600 {
        yaw = sim.step().eye_yaw;
        if yaw.abs() > 0.02 {
            break;
        }
    }
    assert!(yaw.abs() > 0.02);

    sim.context(LiveContext {
        gaze: Some(Gaze {
            score: Some(0.5),
            vector: None,
        }),
        tracking: Some(Tracking {
            visible: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    });
    for _ in 0..4 {
        sim.step();
    }
    assert!(sim.compositor.face().is_suppressed());
    let after = sim.last().unwrap().eye_yaw;
    assert!(after.abs() <= yaw.abs() * (-1.0_f32).exp() + 1e-6);
}

#[test]
fn test_zero_confidence_silences_emotions() {
    let mut sim = Simulation::seeded(6);
    sim.context(LiveContext {
        state_confidence: Some(0.0),
        emotion_probs: probs(&[("happy", 1.0), ("sad", 1.0), ("angry", 1.0), ("surprise", 1.0)]),
        tracking: Some(Tracking {
            x: Some(0.9),
            y: Some(0.1),
            visible: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    });
    sim.run_for(2.0);

    let last = sim.last().unwrap();
    for w in [last.happy, last.sad, last.angry, last.surprised] {
        assert!(w < 1e-4, "emotion weight {w}");
    }
    let state = sim.compositor.live().state();
    assert_eq!(state.look_x, 0.0);
    assert_eq!(state.look_y, 0.0);
}

#[test]
fn test_happy_energetic_snapshot() {
    let mut sim = Simulation::seeded(9);
    assert!(sim.context(LiveContext {
        state_confidence: Some(1.0),
        emotion_probs: probs(&[("happy", 1.0)]),
        energy_level: Some(1.0),
        timestamp: Some(10.0),
        ..Default::default()
    }));
    sim.run_for(2.0);

    assert!(sim.last().unwrap().happy > 0.99);
    let intensity = sim.compositor.idle_body().config().intensity;
    assert!((intensity - 1.2).abs() < 1e-3);

    // a late snapshot from before the current one is ignored
    assert!(!sim.context(LiveContext {
        timestamp: Some(9.0),
        ..Default::default()
    }));
    assert_eq!(sim.compositor.stats().dropped_snapshots, 1);
    sim.run_for(0.5);
    assert!(sim.last().unwrap().happy > 0.99);
}

#[test]
fn test_spring_fallback_shakes_hips() {
    let mut sim = Simulation::seeded(1);
    let shaken = sim.run_for(0.5).iter().any(|s| s.hips_x != 0.0);
    assert!(shaken);

    let rig = MemoryRig::humanoid().with_spring_joints(4);
    let mut cfg = AnimaConfig::default();
    cfg.face.seed = Some(1);
    let mut sim = Simulation::with_rig(cfg, rig);
    assert!(sim.run_for(0.5).iter().all(|s| s.hips_x == 0.0));
}

#[test]
fn test_speaking_mode_pulses_then_closes() {
    let mut sim = Simulation::seeded(12);
    sim.event(FeedEvent::Mode("speaking".into()));
    let open = sim.run_for(0.5).to_vec();
    assert!(open.iter().any(|s| s.aa > 0.5));
    for s in &open {
        assert!((0.0..=1.0).contains(&s.aa));
        assert!(s.oh <= s.aa);
    }

    sim.event(FeedEvent::Mode("listening".into()));
    sim.run_for(1.0);
    let last = sim.last().unwrap();
    assert!(last.aa < 1e-3);
    assert!(last.oh < 1e-3);
}

#[test]
fn test_disconnect_closes_mouth() {
    let mut sim = Simulation::seeded(12);
    sim.event(FeedEvent::Mode("speaking".into()));
    sim.run_for(0.3);
    sim.event(FeedEvent::Status(FeedStatus::Disconnected));
    sim.run_for(1.0);
    assert!(sim.last().unwrap().aa < 1e-3);
}

#[test]
fn test_streamed_speech_opens_mouth() {
    let mut sim = Simulation::seeded(13);
    let rate = 24_000;
    let tone: Vec<f32> = (0..rate)
        .map(|i| (i as f32 / rate as f32 * 220.0 * TAU).sin() * 0.5)
        .collect();
    sim.event(FeedEvent::Audio(AudioChunk {
        payload: encode_pcm16_base64(&tone),
        sample_rate: rate as u32,
    }));
    sim.event(FeedEvent::Audio(AudioChunk {
        payload: "not base64!".into(),
        sample_rate: rate as u32,
    }));

    let speaking = sim.run_for(0.5).iter().map(|s| s.aa).fold(0.0, f32::max);
    assert!(speaking > 0.0);
    assert_eq!(sim.compositor.stats().audio_chunks, 1);
    assert_eq!(sim.compositor.stats().bad_audio_chunks, 1);

    // chunk ends at 1 s; silence afterwards
    sim.run_for(1.0);
    assert!(sim.last().unwrap().aa < 1e-3);
}

#[test]
fn test_emotion_event_sets_preset() {
    let mut sim = Simulation::seeded(14);
    sim.event(FeedEvent::Emotion("surprised".into()));
    sim.run_for(2.0);
    assert!(sim.last().unwrap().surprised > 0.5);

    sim.event(FeedEvent::Emotion("bewildered".into()));
    sim.run_for(0.1);
    assert!(sim.last().unwrap().surprised > 0.5);
}

mod props {
    use super::*;
    use anima_core::Expression;
    use anima_runtime::Compositor;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn weights_stay_normalized(
            deltas in prop::collection::vec(0u64..250_000, 1..120),
            weight in -2.0f32..3.0,
            level in -1.0f32..2.0,
        ) {
            let mut cfg = AnimaConfig::default();
            cfg.face.seed = Some(1);
            let mut compositor = Compositor::new(cfg);
            let mut rig = MemoryRig::humanoid();
            compositor.set_body_weight(weight);
            compositor.speak(level);

            for us in deltas {
                let time = compositor.step(&mut rig, Duration::from_micros(us));
                prop_assert!(time.dt <= 0.1 + 1e-6);
                for e in Expression::ALL {
                    let w = rig.weight(e);
                    prop_assert!((0.0..=1.0).contains(&w), "{e:?} = {w}");
                }
                let hips = rig.skeleton.bone(HumanBone::Hips).map(|b| b.scale.x);
                prop_assert!(hips.map_or(true, |x| (1.0..=1.25 + 1e-6).contains(&x)));
            }
        }
    }
}
