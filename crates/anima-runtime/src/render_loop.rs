//! Render Loop - ticks the compositor on a fixed interval
//!
//! The avatar and compositor live together in a [`Scene`] behind a mutex so
//! hosts can attach an avatar, drag the turntable or change body weight
//! between frames. Feed snapshots and events are folded in as they arrive;
//! no lock is ever held across an await.

use std::sync::Arc;
use std::time::Duration;

use anima_core::{AnimaError, AnimaResult, AvatarRig, FrameTime};
use anima_live::{FeedEvent, Snapshot};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::{AnimaConfig, Compositor};

/// Compositor plus the avatar it drives, if one is loaded
pub struct Scene {
    compositor: Compositor,
    avatar: Option<Box<dyn AvatarRig>>,
}

pub type SharedScene = Arc<Mutex<Scene>>;

impl Scene {
    pub fn new(cfg: AnimaConfig) -> Self {
        Self {
            compositor: Compositor::new(cfg),
            avatar: None,
        }
    }

    pub fn shared(cfg: AnimaConfig) -> SharedScene {
        Arc::new(Mutex::new(Self::new(cfg)))
    }

    /// Swap in a new avatar; the previous one is detached and returned
    pub fn attach(&mut self, mut avatar: Box<dyn AvatarRig>) -> Option<Box<dyn AvatarRig>> {
        let previous = self.detach();
        self.compositor.attach(avatar.as_mut());
        self.avatar = Some(avatar);
        previous
    }

    pub fn detach(&mut self) -> Option<Box<dyn AvatarRig>> {
        let mut avatar = self.avatar.take()?;
        self.compositor.detach(avatar.as_mut());
        Some(avatar)
    }

    /// An avatar that failed to load; the scene keeps running without one
    pub fn avatar_failed(&mut self, error: &AnimaError) {
        warn!(%error, "avatar unavailable");
        self.detach();
    }

    pub fn has_avatar(&self) -> bool {
        self.avatar.is_some()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// One frame on the monotonic clock
    pub fn tick(&mut self) -> FrameTime {
        match self.avatar.as_mut() {
            Some(avatar) => self.compositor.frame(avatar.as_mut()),
            None => self.compositor.idle(),
        }
    }

    /// One frame with an explicit delta
    pub fn step(&mut self, delta: Duration) -> FrameTime {
        match self.avatar.as_mut() {
            Some(avatar) => self.compositor.step(avatar.as_mut(), delta),
            None => self.compositor.idle_step(delta),
        }
    }
}

/// Feed channels consumed by the loop
pub struct FeedInputs {
    pub snapshots: watch::Receiver<Snapshot>,
    pub events: broadcast::Receiver<FeedEvent>,
}

pub struct RenderLoop {
    scene: SharedScene,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RenderLoop {
    pub fn spawn(scene: SharedScene, interval: Duration, feed: Option<FeedInputs>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (snapshots, events) = match feed {
            Some(inputs) => (Some(inputs.snapshots), Some(inputs.events)),
            None => (None, None),
        };
        let worker = LoopWorker {
            scene: scene.clone(),
            interval: interval.max(Duration::from_millis(1)),
            snapshots,
            events,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());
        Self {
            scene,
            shutdown,
            task: Some(task),
        }
    }

    pub fn scene(&self) -> SharedScene {
        self.scene.clone()
    }

    /// Stop ticking and wait for the loop to exit
    pub async fn shutdown(mut self) -> AnimaResult<()> {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| AnimaError::SessionClosed)?;
        }
        Ok(())
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

struct LoopWorker {
    scene: SharedScene,
    interval: Duration,
    snapshots: Option<watch::Receiver<Snapshot>>,
    events: Option<broadcast::Receiver<FeedEvent>>,
    shutdown: watch::Receiver<bool>,
}

enum Input {
    Snapshot(Snapshot),
    Event(FeedEvent),
    Lagged(u64),
    SnapshotsClosed,
    EventsClosed,
}

async fn next_snapshot(rx: &mut Option<watch::Receiver<Snapshot>>) -> Input {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match rx.changed().await {
        Ok(()) => Input::Snapshot(rx.borrow_and_update().clone()),
        Err(_) => Input::SnapshotsClosed,
    }
}

async fn next_event(rx: &mut Option<broadcast::Receiver<FeedEvent>>) -> Input {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(event) => Input::Event(event),
        Err(broadcast::error::RecvError::Lagged(n)) => Input::Lagged(n),
        Err(broadcast::error::RecvError::Closed) => Input::EventsClosed,
    }
}

impl LoopWorker {
    async fn run(mut self) {
        info!(interval = ?self.interval, "render loop started");
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let input = tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.scene.lock().tick();
                    continue;
                }
                input = next_snapshot(&mut self.snapshots) => input,
                input = next_event(&mut self.events) => input,
            };
            self.handle(input);
        }

        info!(frames = self.scene.lock().compositor().stats().frames, "render loop stopped");
    }

    fn handle(&mut self, input: Input) {
        match input {
            Input::Snapshot(Some(ctx)) => {
                self.scene.lock().compositor_mut().set_context(ctx);
            }
            Input::Snapshot(None) => {}
            Input::Event(event) => self.scene.lock().compositor_mut().apply_event(&event),
            Input::Lagged(n) => warn!(skipped = n, "render loop fell behind the feed"),
            Input::SnapshotsClosed => self.snapshots = None,
            Input::EventsClosed => self.events = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::MemoryRig;
    use anima_live::LiveContext;

    #[test]
    fn test_scene_without_avatar_keeps_time() {
        let mut scene = Scene::new(AnimaConfig::default());
        let t = scene.step(Duration::from_millis(20));
        assert!(!scene.has_avatar());
        assert_eq!(t.frame, 1);
        assert_eq!(scene.compositor().stats().frames, 0);
    }

    #[test]
    fn test_attach_swaps_avatar() {
        let mut scene = Scene::new(AnimaConfig::default());
        assert!(scene.attach(Box::new(MemoryRig::humanoid())).is_none());
        scene.step(Duration::from_millis(16));
        assert!(scene.attach(Box::new(MemoryRig::humanoid())).is_some());
        assert!(scene.compositor().is_attached());

        scene.avatar_failed(&AnimaError::AssetUnavailable("avatar.vrm".into()));
        assert!(!scene.has_avatar());
        scene.step(Duration::from_millis(16));
    }

    #[tokio::test]
    async fn test_loop_ticks_and_consumes_feed() {
        let scene = Scene::shared(AnimaConfig::default());
        scene.lock().attach(Box::new(MemoryRig::humanoid()));

        let (snap_tx, snapshots) = watch::channel(None);
        let (event_tx, events) = broadcast::channel(8);
        let render = RenderLoop::spawn(
            scene.clone(),
            Duration::from_millis(5),
            Some(FeedInputs { snapshots, events }),
        );

        snap_tx.send_replace(Some(Arc::new(LiveContext {
            energy_level: Some(1.0),
            ..Default::default()
        })));
        event_tx.send(FeedEvent::Emotion("sad".into())).unwrap();
        time::sleep(Duration::from_millis(100)).await;
        render.shutdown().await.unwrap();

        let guard = scene.lock();
        let compositor = guard.compositor();
        assert!(compositor.stats().frames > 0);
        assert!(compositor.live().has_context());
        assert_eq!(
            compositor.emotion().emotion(),
            Some(anima_motion::EmotionPreset::Sad)
        );
    }

    #[tokio::test]
    async fn test_loop_without_feed() {
        let scene = Scene::shared(AnimaConfig::default());
        let render = RenderLoop::spawn(scene.clone(), Duration::from_millis(5), None);
        time::sleep(Duration::from_millis(30)).await;
        render.shutdown().await.unwrap();
        assert!(scene.lock().compositor().elapsed() > 0.0);
    }
}
