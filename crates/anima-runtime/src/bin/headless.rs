//! Headless ANIMA runner
//!
//! Drives an in-memory humanoid at the configured frame rate. Each stdin
//! line is one push-feed message; outbound feed messages go to stdout.
//! Stops on Ctrl-C or end of input.
//!
//! Usage: anima-headless [config.toml]

use std::process::ExitCode;
use std::sync::Arc;

use anima_core::{AnimaResult, MemoryRig};
use anima_live::{ChannelPeer, ChannelTransport, FeedPoller, FeedSession, HttpPoller};
use anima_runtime::{init_logging, AnimaConfig, FeedInputs, RenderLoop, Scene};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

const SPRING_JOINTS: usize = 8;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match std::env::args().nth(1) {
        Some(path) => AnimaConfig::load_or_default(path),
        None => AnimaConfig::default(),
    };
    if let Err(e) = init_logging(&cfg.logging) {
        eprintln!("anima: {e}");
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "anima stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: AnimaConfig) -> AnimaResult<()> {
    let (transport, handle) = ChannelTransport::new();
    let poller = match HttpPoller::from_config(&cfg.feed) {
        Ok(p) => p.map(|p| Arc::new(p) as Arc<dyn FeedPoller>),
        Err(e) => {
            warn!(error = %e, "live context polling disabled");
            None
        }
    };
    let ChannelPeer {
        inbound,
        mut outbound,
    } = handle.open(cfg.feed.event_capacity)?;
    let session = FeedSession::spawn(cfg.feed.clone(), Some(Arc::new(transport)), poller);

    let scene = Scene::shared(cfg.clone());
    scene
        .lock()
        .attach(Box::new(MemoryRig::humanoid().with_spring_joints(SPRING_JOINTS)));

    let render = RenderLoop::spawn(
        scene.clone(),
        cfg.render.frame_interval(),
        Some(FeedInputs {
            snapshots: session.snapshots(),
            events: session.events(),
        }),
    );

    let stdin_bridge = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            if inbound.send(line).await.is_err() {
                break;
            }
        }
    });
    let stdout_bridge = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(text) = outbound.recv().await {
            let line = format!("{text}\n");
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    info!(fps = cfg.render.fps, "anima running");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = stdin_bridge => info!("input closed"),
    }

    render.shutdown().await?;
    session.shutdown().await?;
    stdout_bridge.abort();

    let frames = scene.lock().compositor().stats().frames;
    info!(frames, "anima stopped");
    Ok(())
}
