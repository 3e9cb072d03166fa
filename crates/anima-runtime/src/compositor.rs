//! Frame Compositor - every motion source, one fixed order
//!
//! Each frame walks [`FRAME_ORDER`]. Bone writes go through one shared
//! [`BoneOffsetEngine`]; expression writes go into one [`ExpressionFrame`]
//! stamped by stage and are handed to the avatar in a single commit. Later
//! stages win any conflict.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anima_core::{
    AvatarRig, ExpressionFrame, FrameClock, FrameTime, MotionTime, Stage, FRAME_ORDER,
};
use anima_live::{AudioChunk, FeedEvent, FeedStatus, LiveContext, LiveContextController};
use anima_motion::{
    BodyController, BoneOffsetEngine, EmotionController, EmotionPreset, HandController,
    IdleBodyController, IdleBodyPatch, IdleFaceController, PoseController,
    SecondaryPhysicsController, TurntableController,
};
use anima_speech::{decode_pcm16_base64, LipSyncController, PlaybackQueue, ScheduledChunk};
use tracing::{debug, info, trace, warn};

use crate::AnimaConfig;

/// Backend mode during which the mouth is pulsed
const SPEAKING_MODE: &str = "speaking";

#[derive(Debug, Clone, Default)]
pub struct CompositorStats {
    pub frames: u64,
    pub snapshots: u64,
    pub dropped_snapshots: u64,
    pub audio_chunks: u64,
    pub bad_audio_chunks: u64,
    pub last_frame_duration: Duration,
}

pub struct Compositor {
    cfg: AnimaConfig,
    clock: FrameClock,
    engine: BoneOffsetEngine,
    expressions: ExpressionFrame,

    pose: Option<PoseController>,
    body: BodyController,
    live: LiveContextController,
    emotion: EmotionController,
    face: IdleFaceController,
    idle_body: IdleBodyController,
    hands: HandController,
    physics: SecondaryPhysicsController,
    lipsync: LipSyncController,
    playback: PlaybackQueue,
    turntable: TurntableController,

    stats: CompositorStats,
}

impl Compositor {
    pub fn new(cfg: AnimaConfig) -> Self {
        Self {
            clock: FrameClock::with_max_delta(cfg.render.max_delta()),
            engine: BoneOffsetEngine::new(),
            expressions: ExpressionFrame::new(),
            pose: None,
            body: BodyController::new(cfg.initial_body_weight),
            live: LiveContextController::new(cfg.live.clone()),
            emotion: EmotionController::new(),
            face: IdleFaceController::new(cfg.face.clone()),
            idle_body: IdleBodyController::new(cfg.idle_body.clone()),
            hands: HandController::new(cfg.hands.clone()),
            physics: SecondaryPhysicsController::new(cfg.physics.clone()),
            lipsync: LipSyncController::new(cfg.speech.lipsync.clone()),
            playback: PlaybackQueue::new(),
            turntable: TurntableController::new(cfg.turntable.clone()),
            stats: CompositorStats::default(),
            cfg,
        }
    }

    pub fn config(&self) -> &AnimaConfig {
        &self.cfg
    }

    /// Prepare for a newly loaded avatar: forget cached rest poses and
    /// snapshot its authored arm pose
    pub fn attach(&mut self, rig: &mut dyn AvatarRig) {
        self.engine.invalidate();
        self.expressions.clear();
        self.physics.forget();
        let parts = rig.parts();
        let pose = PoseController::new(&*parts.skeleton, self.cfg.pose);
        info!(
            posed_bones = pose.overridden(),
            springs = parts.springs.is_some(),
            "avatar attached"
        );
        self.pose = Some(pose);
    }

    /// Put the authored arm pose back before the avatar goes away
    pub fn detach(&mut self, rig: &mut dyn AvatarRig) {
        let skeleton = rig.parts().skeleton;
        self.physics.restore(&mut *skeleton);
        if let Some(pose) = self.pose.take() {
            pose.restore(skeleton);
        }
        self.engine.invalidate();
        self.expressions.clear();
        info!("avatar detached");
    }

    pub fn is_attached(&self) -> bool {
        self.pose.is_some()
    }

    /// Frame timed from the monotonic clock
    pub fn frame(&mut self, rig: &mut dyn AvatarRig) -> FrameTime {
        let time = self.clock.tick();
        self.run(rig, time)
    }

    /// Frame with an explicit delta
    pub fn step(&mut self, rig: &mut dyn AvatarRig, delta: Duration) -> FrameTime {
        let time = self.clock.advance(delta);
        self.run(rig, time)
    }

    /// Keep time moving while no avatar is loaded
    pub fn idle(&mut self) -> FrameTime {
        self.clock.tick()
    }

    /// Carry on a session that has already been running for `offset`
    pub fn resume_at(&mut self, offset: Duration) {
        self.clock.resume_at(offset);
        let t = MotionTime::from_secs(offset.as_secs_f64());
        self.face.resume_at(t);
        self.idle_body.resume_at(t);
        self.hands.resume_at(t);
        self.physics.resume_at(t);
        debug!(elapsed = offset.as_secs_f64(), "compositor resumed");
    }

    pub fn idle_step(&mut self, delta: Duration) -> FrameTime {
        self.clock.advance(delta)
    }

    fn run(&mut self, rig: &mut dyn AvatarRig, time: FrameTime) -> FrameTime {
        if self.pose.is_none() {
            self.attach(rig);
        }
        let started = Instant::now();

        for stage in FRAME_ORDER {
            if stage.writes_expressions() {
                self.expressions.enter(stage);
            }
            self.run_stage(stage, rig, time);
        }

        self.stats.frames += 1;
        self.stats.last_frame_duration = started.elapsed();
        trace!(
            frame = time.frame,
            dt = time.dt,
            took_us = self.stats.last_frame_duration.as_micros() as u64,
            "frame composed"
        );
        time
    }

    fn run_stage(&mut self, stage: Stage, rig: &mut dyn AvatarRig, time: FrameTime) {
        let dt = time.dt;
        match stage {
            Stage::BasePose => {
                if let Some(pose) = &self.pose {
                    pose.update(rig.parts().skeleton, &mut self.engine);
                }
            }
            Stage::BodyWeight => self.body.update(dt, rig.parts().skeleton),
            Stage::LiveContext => {
                let parts = rig.parts();
                self.emotion.update(dt, &mut self.expressions);
                self.live
                    .update(dt, &mut self.expressions, parts.skeleton, &mut self.engine);
            }
            Stage::IdleFace => {
                if self.live.has_context() {
                    self.face.set_live_gaze(
                        Some(self.live.gaze_strength()),
                        Some(self.live.tracking_visible()),
                    );
                } else {
                    self.face.set_live_gaze(None, None);
                }
                self.face.update(
                    dt,
                    &mut self.expressions,
                    rig.parts().skeleton,
                    &mut self.engine,
                );
            }
            Stage::IdleIntensity => {
                if self.live.has_context() {
                    let patch = IdleBodyPatch::intensity(self.live.idle_intensity());
                    self.idle_body.set_config(&patch);
                }
            }
            Stage::IdleBody => self
                .idle_body
                .update(dt, rig.parts().skeleton, &mut self.engine),
            Stage::Hands => self.hands.update(dt, rig.parts().skeleton, &mut self.engine),
            Stage::Physics => {
                let parts = rig.parts();
                self.physics.update(dt, parts.skeleton, parts.springs);
            }
            Stage::LipSync => {
                let now = time.elapsed;
                let window = self.cfg.speech.analyser_window;
                self.lipsync
                    .feed_playing(self.playback.playing_at(now, window));
                self.lipsync.update(dt, &mut self.expressions);
            }
            Stage::Commit => {
                self.expressions.commit(rig.parts().expressions);
                rig.set_root_yaw(self.turntable.update(dt));
                rig.commit(dt);
            }
            Stage::Render => rig.render(),
        }
    }

    /// Take a live snapshot; older than the current one is dropped
    pub fn set_context(&mut self, context: Arc<LiveContext>) -> bool {
        let taken = self.live.set_context(context);
        if taken {
            self.stats.snapshots += 1;
        } else {
            self.stats.dropped_snapshots += 1;
        }
        taken
    }

    pub fn apply_event(&mut self, event: &FeedEvent) {
        match event {
            FeedEvent::Status(status) => {
                if *status == FeedStatus::Disconnected {
                    // don't leave the mouth hanging open on a dropped feed
                    self.lipsync.stop();
                }
            }
            FeedEvent::Mode(mode) => {
                if mode == SPEAKING_MODE {
                    self.lipsync.trigger(self.cfg.speech.trigger_level);
                } else {
                    self.lipsync.stop();
                }
            }
            FeedEvent::Transcript(text) => debug!(chars = text.len(), "response started"),
            FeedEvent::Emotion(label) => match EmotionPreset::from_label(label) {
                Some(preset) => self.emotion.set_emotion(preset),
                None => debug!(%label, "unknown emotion label"),
            },
            FeedEvent::Audio(chunk) => {
                self.enqueue_audio(chunk);
            }
        }
    }

    /// Decode and schedule a speech chunk after whatever is playing
    pub fn enqueue_audio(&mut self, chunk: &AudioChunk) -> Option<ScheduledChunk> {
        let now = self.clock.elapsed();
        let scheduled = decode_pcm16_base64(&chunk.payload)
            .and_then(|samples| self.playback.enqueue(samples, chunk.sample_rate, now));
        match scheduled {
            Ok(slot) => {
                self.stats.audio_chunks += 1;
                Some(slot)
            }
            Err(e) => {
                self.stats.bad_audio_chunks += 1;
                warn!(error = %e, "dropping speech chunk");
                None
            }
        }
    }

    pub fn set_body_weight(&mut self, weight: f32) {
        self.body.set_body_weight(weight);
    }

    pub fn set_emotion(&mut self, preset: EmotionPreset) {
        self.emotion.set_emotion(preset);
    }

    pub fn set_idle_body(&mut self, patch: &IdleBodyPatch) {
        self.idle_body.set_config(patch);
    }

    pub fn set_hands_enabled(&mut self, enabled: bool) {
        self.hands.set_enabled(enabled);
    }

    pub fn set_wind_enabled(&mut self, enabled: bool) {
        self.physics.set_enabled(enabled);
    }

    pub fn speak(&mut self, level: f32) {
        self.lipsync.trigger(level);
    }

    pub fn stop_speaking(&mut self) {
        self.lipsync.stop();
    }

    pub fn turntable(&mut self) -> &mut TurntableController {
        &mut self.turntable
    }

    pub fn live(&self) -> &LiveContextController {
        &self.live
    }

    pub fn face(&self) -> &IdleFaceController {
        &self.face
    }

    pub fn idle_body(&self) -> &IdleBodyController {
        &self.idle_body
    }

    pub fn body(&self) -> &BodyController {
        &self.body
    }

    pub fn lipsync(&self) -> &LipSyncController {
        &self.lipsync
    }

    pub fn emotion(&self) -> &EmotionController {
        &self.emotion
    }

    pub fn playback(&self) -> &PlaybackQueue {
        &self.playback
    }

    pub fn engine(&self) -> &BoneOffsetEngine {
        &self.engine
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    pub fn stats(&self) -> &CompositorStats {
        &self.stats
    }
}
