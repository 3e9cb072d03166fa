//! Feed Session - one live-context connection per avatar lifetime
//!
//! A background task keeps the feed alive:
//! - push first: connect through the [`FeedTransport`] and pump frames
//! - on close or failure, report `Disconnected`, poll the [`FeedPoller`]
//!   (if any) while waiting out the reconnect backoff, then try push again
//! - `shutdown()` stops the task, closing the connection and timers
//!
//! Snapshots are published whole through a `watch` channel, so readers
//! always see a complete value and only ever the latest one. Everything
//! else the feed carries (status, transcript, emotion labels, audio) goes
//! out on a `broadcast` channel.

use std::sync::Arc;
use std::time::Duration;

use anima_core::{AnimaError, AnimaResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{FeedMessage, LiveContext, OutboundMessage};

/// Latest snapshot, shared without copying
pub type Snapshot = Option<Arc<LiveContext>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Try the push channel at all
    pub push: bool,
    /// Fall back to HTTP polling while push is down
    pub poll: bool,
    pub poll_url: Option<String>,
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub reconnect_backoff_ms: u64,
    pub event_capacity: usize,
    pub outbound_capacity: usize,
    /// Sent right after every successful connect
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            push: true,
            poll: true,
            poll_url: None,
            poll_interval_ms: 200,
            poll_timeout_ms: 1000,
            reconnect_backoff_ms: 1000,
            event_capacity: 64,
            outbound_capacity: 32,
            user_id: None,
            username: None,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms.max(1))
    }

    fn handshake(&self) -> Option<OutboundMessage> {
        match (&self.user_id, &self.username) {
            (Some(user_id), Some(username)) => Some(OutboundMessage::Config {
                user_id: user_id.clone(),
                username: username.clone(),
            }),
            _ => None,
        }
    }
}

/// Connection state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Connected,
    Disconnected,
    /// Push is down, HTTP polling is active
    Polling,
    /// Session shut down
    Closed,
}

/// Base64 PCM chunk announced by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub payload: String,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Status(FeedStatus),
    /// Backend mode ("listening", "thinking", ...)
    Mode(String),
    /// Transcript of a response that starts speaking now
    Transcript(String),
    /// Discrete emotion label
    Emotion(String),
    Audio(AudioChunk),
}

/// Push channel factory (WebSocket or any other framed text stream)
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    async fn connect(&self) -> AnimaResult<Box<dyn FeedConnection>>;
}

/// One open push connection
#[async_trait]
pub trait FeedConnection: Send {
    /// Next text frame; `Ok(None)` when the peer closed
    async fn recv(&mut self) -> AnimaResult<Option<String>>;

    async fn send(&mut self, text: String) -> AnimaResult<()>;
}

/// Pull-based fallback source
#[async_trait]
pub trait FeedPoller: Send + Sync + 'static {
    async fn poll(&self) -> AnimaResult<LiveContext>;
}

/// Handle to the background feed task
pub struct FeedSession {
    snapshots: watch::Receiver<Snapshot>,
    events: broadcast::Sender<FeedEvent>,
    outbound: mpsc::Sender<OutboundMessage>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl FeedSession {
    /// Start the session on the current tokio runtime
    pub fn spawn(
        cfg: FeedConfig,
        transport: Option<Arc<dyn FeedTransport>>,
        poller: Option<Arc<dyn FeedPoller>>,
    ) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(None);
        let (events, _) = broadcast::channel(cfg.event_capacity.max(1));
        let (outbound, outbound_rx) = mpsc::channel(cfg.outbound_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let transport = if cfg.push { transport } else { None };
        let poller = if cfg.poll { poller } else { None };

        let worker = FeedWorker {
            cfg,
            transport,
            poller,
            snapshots: snapshot_tx,
            events: events.clone(),
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            status: None,
        };
        let task = tokio::spawn(worker.run());

        Self {
            snapshots,
            events,
            outbound,
            shutdown,
            task: Some(task),
        }
    }

    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Queue a message for the push connection; held until one is up
    pub fn outbound(&self) -> mpsc::Sender<OutboundMessage> {
        self.outbound.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) -> AnimaResult<()> {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| AnimaError::SessionClosed)?;
        }
        Ok(())
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

enum PumpEnd {
    Closed,
    Shutdown,
}

struct FeedWorker {
    cfg: FeedConfig,
    transport: Option<Arc<dyn FeedTransport>>,
    poller: Option<Arc<dyn FeedPoller>>,
    snapshots: watch::Sender<Snapshot>,
    events: broadcast::Sender<FeedEvent>,
    outbound: mpsc::Receiver<OutboundMessage>,
    shutdown: watch::Receiver<bool>,
    status: Option<FeedStatus>,
}

impl FeedWorker {
    async fn run(mut self) {
        info!(
            push = self.transport.is_some(),
            poll = self.poller.is_some(),
            "feed session started"
        );

        while !self.is_shutdown() {
            if let Some(transport) = self.transport.clone() {
                let connected = tokio::select! {
                    _ = self.shutdown.changed() => break,
                    result = transport.connect() => result,
                };
                match connected {
                    Ok(conn) => {
                        info!("feed connected");
                        self.set_status(FeedStatus::Connected);
                        if let PumpEnd::Shutdown = self.pump(conn).await {
                            break;
                        }
                        info!("feed disconnected");
                    }
                    Err(e) => warn!(error = %e, "feed connect failed"),
                }
                self.set_status(FeedStatus::Disconnected);
            }

            let wait = self.cfg.reconnect_backoff();
            if !self.fallback_for(wait).await {
                break;
            }
        }

        self.set_status(FeedStatus::Closed);
        info!("feed session closed");
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn set_status(&mut self, status: FeedStatus) {
        if self.status == Some(status) {
            return;
        }
        self.status = Some(status);
        let _ = self.events.send(FeedEvent::Status(status));
    }

    fn emit(&self, event: FeedEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn pump(&mut self, mut conn: Box<dyn FeedConnection>) -> PumpEnd {
        if let Some(hello) = self.cfg.handshake() {
            if let Err(e) = self.send(conn.as_mut(), &hello).await {
                warn!(error = %e, "feed handshake failed");
                return PumpEnd::Closed;
            }
        }

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => return PumpEnd::Shutdown,
                outbound = self.outbound.recv() => match outbound {
                    Some(msg) => {
                        if let Err(e) = self.send(conn.as_mut(), &msg).await {
                            warn!(error = %e, "feed send failed");
                            return PumpEnd::Closed;
                        }
                    }
                    None => return PumpEnd::Shutdown,
                },
                frame = conn.recv() => match frame {
                    Ok(Some(text)) => self.handle_text(&text),
                    Ok(None) => return PumpEnd::Closed,
                    Err(e) => {
                        warn!(error = %e, "feed receive failed");
                        return PumpEnd::Closed;
                    }
                },
            }
        }
    }

    async fn send(&self, conn: &mut dyn FeedConnection, msg: &OutboundMessage) -> AnimaResult<()> {
        conn.send(msg.to_json()?).await
    }

    /// Poll (or just wait) for `duration`; false once shut down
    async fn fallback_for(&mut self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        let Some(poller) = self.poller.clone() else {
            return self.wait_until(deadline).await;
        };

        self.set_status(FeedStatus::Polling);
        let mut ticker = time::interval(self.cfg.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let timeout = self.cfg.poll_timeout();

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => return false,
                _ = time::sleep_until(deadline) => return !self.is_shutdown(),
                _ = ticker.tick() => {
                    let polled = tokio::select! {
                        _ = self.shutdown.changed() => return false,
                        polled = time::timeout(timeout, poller.poll()) => polled,
                    };
                    match polled {
                        Ok(Ok(ctx)) => self.accept(ctx),
                        Ok(Err(e)) => warn!(error = %e, "live context poll failed"),
                        Err(_) => warn!(?timeout, "live context poll timed out"),
                    }
                }
            }
        }
    }

    async fn wait_until(&mut self, deadline: Instant) -> bool {
        tokio::select! {
            _ = self.shutdown.changed() => false,
            _ = time::sleep_until(deadline) => !self.is_shutdown(),
        }
    }

    fn handle_text(&mut self, text: &str) {
        match FeedMessage::parse(text) {
            Ok(FeedMessage::Context(ctx)) => self.accept(ctx),
            Ok(FeedMessage::Status { mode }) => self.emit(FeedEvent::Mode(mode)),
            Ok(FeedMessage::ResponseStart { text, emotion }) => {
                self.emit(FeedEvent::Transcript(text));
                if let Some(emotion) = emotion {
                    self.emit(FeedEvent::Emotion(emotion));
                }
            }
            Ok(FeedMessage::AudioChunk {
                payload,
                sample_rate,
                emotion,
            }) => {
                self.emit(FeedEvent::Audio(AudioChunk {
                    payload,
                    sample_rate,
                }));
                if let Some(emotion) = emotion {
                    self.emit(FeedEvent::Emotion(emotion));
                }
            }
            Err(e) => warn!(error = %e, "dropping malformed feed message"),
        }
    }

    /// Publish a snapshot unless it is older than the current one
    fn accept(&self, ctx: LiveContext) {
        let stale = self
            .snapshots
            .borrow()
            .as_ref()
            .is_some_and(|current| ctx.is_older_than(current));
        if stale {
            debug!(timestamp = ?ctx.timestamp, "dropping out-of-order snapshot");
            return;
        }
        self.snapshots.send_replace(Some(Arc::new(ctx)));
    }
}

/// In-process push transport; hosts bridge any socket into it
pub struct ChannelTransport {
    pending: Mutex<mpsc::UnboundedReceiver<ChannelConnection>>,
}

/// Opens connections on a [`ChannelTransport`]
#[derive(Clone)]
pub struct ChannelHandle {
    opener: mpsc::UnboundedSender<ChannelConnection>,
}

/// Host side of one channel connection; dropping `inbound` closes it
pub struct ChannelPeer {
    pub inbound: mpsc::Sender<String>,
    pub outbound: mpsc::Receiver<String>,
}

pub struct ChannelConnection {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, ChannelHandle) {
        let (opener, pending) = mpsc::unbounded_channel();
        (
            Self {
                pending: Mutex::new(pending),
            },
            ChannelHandle { opener },
        )
    }
}

impl ChannelHandle {
    /// Queue a connection for the next `connect()`
    pub fn open(&self, capacity: usize) -> AnimaResult<ChannelPeer> {
        let (in_tx, in_rx) = mpsc::channel(capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));
        self.opener
            .send(ChannelConnection {
                inbound: in_rx,
                outbound: out_tx,
            })
            .map_err(|_| AnimaError::ConnectionClosed)?;
        Ok(ChannelPeer {
            inbound: in_tx,
            outbound: out_rx,
        })
    }
}

#[async_trait]
impl FeedTransport for ChannelTransport {
    async fn connect(&self) -> AnimaResult<Box<dyn FeedConnection>> {
        match self.pending.lock().try_recv() {
            Ok(conn) => Ok(Box::new(conn)),
            Err(mpsc::error::TryRecvError::Empty) => {
                Err(AnimaError::ConnectionFailed("no peer waiting".into()))
            }
            Err(mpsc::error::TryRecvError::Disconnected) => Err(AnimaError::ConnectionClosed),
        }
    }
}

#[async_trait]
impl FeedConnection for ChannelConnection {
    async fn recv(&mut self) -> AnimaResult<Option<String>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, text: String) -> AnimaResult<()> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| AnimaError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> FeedConfig {
        FeedConfig {
            poll_interval_ms: 10,
            reconnect_backoff_ms: 50,
            ..Default::default()
        }
    }

    async fn next_snapshot(rx: &mut watch::Receiver<Snapshot>) -> Arc<LiveContext> {
        loop {
            time::timeout(WAIT, rx.changed())
                .await
                .expect("snapshot timed out")
                .expect("session gone");
            if let Some(ctx) = rx.borrow_and_update().clone() {
                return ctx;
            }
        }
    }

    async fn wait_status(events: &mut broadcast::Receiver<FeedEvent>, want: FeedStatus) {
        time::timeout(WAIT, async {
            loop {
                if let Ok(FeedEvent::Status(s)) = events.recv().await {
                    if s == want {
                        return;
                    }
                }
            }
        })
        .await
        .expect("status timed out");
    }

    struct FixedPoller {
        energy: f32,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedPoller for FixedPoller {
        async fn poll(&self) -> AnimaResult<LiveContext> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LiveContext {
                energy_level: Some(self.energy),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_push_snapshot_delivered() {
        let (transport, handle) = ChannelTransport::new();
        let peer = handle.open(8).unwrap();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut snapshots = session.snapshots();

        peer.inbound
            .send(r#"{"type":"live_context","payload":{"energy_level":0.25}}"#.into())
            .await
            .unwrap();

        let ctx = next_snapshot(&mut snapshots).await;
        assert_eq!(ctx.energy_level, Some(0.25));
        assert_eq!(session.latest().and_then(|c| c.energy_level), Some(0.25));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_keeps_last_good() {
        let (transport, handle) = ChannelTransport::new();
        let peer = handle.open(8).unwrap();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut snapshots = session.snapshots();

        peer.inbound.send(r#"{"energy_level":0.5}"#.into()).await.unwrap();
        next_snapshot(&mut snapshots).await;

        peer.inbound.send("{oops".into()).await.unwrap();
        peer.inbound.send(r#"{"type":"nope"}"#.into()).await.unwrap();
        peer.inbound.send(r#"{"energy_level":0.75}"#.into()).await.unwrap();

        let ctx = next_snapshot(&mut snapshots).await;
        assert_eq!(ctx.energy_level, Some(0.75));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_forwarded() {
        let (transport, handle) = ChannelTransport::new();
        let peer = handle.open(8).unwrap();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut events = session.events();
        wait_status(&mut events, FeedStatus::Connected).await;

        peer.inbound
            .send(r#"{"type":"response_start","text":"hello","emotion":"happy"}"#.into())
            .await
            .unwrap();
        peer.inbound
            .send(r#"{"type":"audio_chunk","payload":"AAA=","sample_rate":16000}"#.into())
            .await
            .unwrap();

        let mut seen = Vec::new();
        time::timeout(WAIT, async {
            while seen.len() < 3 {
                if let Ok(event) = events.recv().await {
                    seen.push(event);
                }
            }
        })
        .await
        .expect("events timed out");

        assert_eq!(seen[0], FeedEvent::Transcript("hello".into()));
        assert_eq!(seen[1], FeedEvent::Emotion("happy".into()));
        assert_eq!(
            seen[2],
            FeedEvent::Audio(AudioChunk {
                payload: "AAA=".into(),
                sample_rate: 16000
            })
        );
        session.shutdown().await.unwrap();
    }

    struct StalledPoller;

    #[async_trait]
    impl FeedPoller for StalledPoller {
        async fn poll(&self) -> AnimaResult<LiveContext> {
            time::sleep(Duration::from_secs(3600)).await;
            Ok(LiveContext::default())
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_slow_poll() {
        let cfg = FeedConfig {
            push: false,
            poll_timeout_ms: 60_000,
            ..fast_config()
        };
        let session = FeedSession::spawn(cfg, None, Some(Arc::new(StalledPoller)));
        let mut events = session.events();
        wait_status(&mut events, FeedStatus::Polling).await;
        // let the first poll start
        time::sleep(Duration::from_millis(50)).await;

        time::timeout(Duration::from_millis(500), session.shutdown())
            .await
            .expect("shutdown waited on the poll")
            .unwrap();
    }

    #[tokio::test]
    async fn test_poll_fallback_without_push() {
        let (transport, _handle) = ChannelTransport::new();
        let poller = Arc::new(FixedPoller {
            energy: 0.9,
            calls: AtomicUsize::new(0),
        });
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), Some(poller.clone()));
        let mut snapshots = session.snapshots();

        let ctx = next_snapshot(&mut snapshots).await;
        assert_eq!(ctx.energy_level, Some(0.9));
        assert!(poller.calls.load(Ordering::SeqCst) >= 1);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let (transport, handle) = ChannelTransport::new();
        let first = handle.open(8).unwrap();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut events = session.events();
        wait_status(&mut events, FeedStatus::Connected).await;

        drop(first);
        wait_status(&mut events, FeedStatus::Disconnected).await;

        let second = handle.open(8).unwrap();
        wait_status(&mut events, FeedStatus::Connected).await;

        let mut snapshots = session.snapshots();
        second.inbound.send(r#"{"attention":0.4}"#.into()).await.unwrap();
        let ctx = next_snapshot(&mut snapshots).await;
        assert_eq!(ctx.attention, Some(0.4));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_and_handshake() {
        let (transport, handle) = ChannelTransport::new();
        let mut peer = handle.open(8).unwrap();
        let cfg = FeedConfig {
            user_id: Some("u1".into()),
            username: Some("rafa".into()),
            ..fast_config()
        };
        let session = FeedSession::spawn(cfg, Some(Arc::new(transport)), None);

        let hello = time::timeout(WAIT, peer.outbound.recv()).await.unwrap().unwrap();
        assert_eq!(hello, r#"{"type":"config","user_id":"u1","username":"rafa"}"#);

        session
            .outbound()
            .send(OutboundMessage::Audio {
                payload: "AAA=".into(),
            })
            .await
            .unwrap();
        let sent = time::timeout(WAIT, peer.outbound.recv()).await.unwrap().unwrap();
        assert_eq!(sent, r#"{"type":"audio","payload":"AAA="}"#);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_older_snapshot_dropped() {
        let (transport, handle) = ChannelTransport::new();
        let peer = handle.open(8).unwrap();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut snapshots = session.snapshots();

        peer.inbound.send(r#"{"timestamp":10.0,"attention":0.1}"#.into()).await.unwrap();
        next_snapshot(&mut snapshots).await;
        peer.inbound.send(r#"{"timestamp":9.0,"attention":0.2}"#.into()).await.unwrap();
        peer.inbound.send(r#"{"timestamp":11.0,"attention":0.3}"#.into()).await.unwrap();

        let ctx = next_snapshot(&mut snapshots).await;
        assert_eq!(ctx.attention, Some(0.3));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes() {
        let (transport, _handle) = ChannelTransport::new();
        let session = FeedSession::spawn(fast_config(), Some(Arc::new(transport)), None);
        let mut events = session.events();
        assert!(session.is_running());

        time::timeout(WAIT, session.shutdown()).await.unwrap().unwrap();
        wait_status(&mut events, FeedStatus::Closed).await;
    }
}
