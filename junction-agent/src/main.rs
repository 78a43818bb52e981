//! Junction agent: wires the homography, track store, and collision
//! predictor in `junction-core` into a live two-task driver — a
//! capture/analysis task that ingests detections and updates the track
//! store, and a throttled broadcast task that pushes the latest snapshot
//! downstream.

mod config;
mod detector;
mod error;
mod push;
mod video;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};

use junction_core::{
    Detection, Homography, ImagePoint, RectangleCorners, Snapshot, TrackStore, WorldPoint,
};

use crate::config::AgentConfig;
use crate::detector::{DetectionSource, StdinJsonDetectionSource};
use crate::error::AgentError;
use crate::push::{AgentControl, PushChannel, ZenohPushChannel};
use crate::video::{Frame, StaticFrameSource, VideoSource};

const BACKOFF_INITIAL_SECS: f64 = 1.0;
const BACKOFF_CEILING_SECS: f64 = 10.0;
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AgentConfig::load("junction.toml")?;
    log::info!("starting agent '{}', publishing to {}", config.agent_id, config.zenoh_key);

    let image_points = [
        ImagePoint::new(config.calibration.image_points[0][0], config.calibration.image_points[0][1]),
        ImagePoint::new(config.calibration.image_points[1][0], config.calibration.image_points[1][1]),
        ImagePoint::new(config.calibration.image_points[2][0], config.calibration.image_points[2][1]),
        ImagePoint::new(config.calibration.image_points[3][0], config.calibration.image_points[3][1]),
    ];
    let world_points = [
        WorldPoint::new(config.calibration.world_points[0][0], config.calibration.world_points[0][1]),
        WorldPoint::new(config.calibration.world_points[1][0], config.calibration.world_points[1][1]),
        WorldPoint::new(config.calibration.world_points[2][0], config.calibration.world_points[2][1]),
        WorldPoint::new(config.calibration.world_points[3][0], config.calibration.world_points[3][1]),
    ];
    let homography = Homography::from_correspondences(image_points, world_points)
        .map_err(|e| anyhow::anyhow!("camera calibration rejected: {e}"))?;
    log::info!("homography fixed from 4 calibration correspondences");

    let video_boundary = video_boundary_corners(&homography, FRAME_WIDTH, FRAME_HEIGHT);
    if video_boundary.is_none() {
        log::warn!("frame corners project to the line at infinity; video_boundary will be omitted");
    }

    let track_store = TrackStore::new(config.tracking);

    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::default()));
    let (control_tx, control_rx) = mpsc::channel::<AgentControl>(16);
    let run_flag = Arc::new(AtomicBool::new(true));

    let push_channel: Arc<dyn PushChannel> = Arc::new(ZenohPushChannel::connect(&config.zenoh_key).await?);

    let detection_source: Box<dyn DetectionSource> = Box::new(StdinJsonDetectionSource::new());

    let analysis_handle = tokio::spawn(run_analysis_task(
        detection_source,
        homography,
        track_store,
        snapshot_tx,
        control_rx,
        run_flag.clone(),
        FRAME_WIDTH,
        FRAME_HEIGHT,
        config.video_source.clone(),
    ));

    let broadcast_handle = tokio::spawn(run_broadcast_task(
        snapshot_rx,
        push_channel,
        config.broadcast_hz,
        config.agent_id.clone(),
        video_boundary,
    ));

    // Start running immediately; a real control surface would feed
    // `control_tx` from outside (HTTP/CLI), out of scope here.
    let _ = control_tx;

    let (analysis_result, broadcast_result) = tokio::join!(analysis_handle, broadcast_handle);
    analysis_result??;
    broadcast_result?;

    Ok(())
}

/// Capture/analysis loop: pulls detection batches, projects them through
/// the homography, folds them into the track store, and publishes the
/// resulting snapshot. Also drains `AgentControl` commands.
///
/// Owns the video frame slot for its whole lifetime: acquired here at task
/// start, written once per cycle as the single writer, read by the
/// `GetStatus` handler below, and dropped (released) on every exit path —
/// the early return on `SourceEof` and the early return on control-channel
/// errors alike, since both just let `video_source` fall out of scope.
async fn run_analysis_task(
    mut detection_source: Box<dyn DetectionSource>,
    homography: Homography,
    mut track_store: TrackStore,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    mut control_rx: mpsc::Receiver<AgentControl>,
    run_flag: Arc<AtomicBool>,
    frame_width: u32,
    frame_height: u32,
    video_source_name: String,
) -> Result<(), AgentError> {
    let start = Instant::now();
    let mut quality: u8 = 100;
    let video_source = StaticFrameSource::new(frame_width, frame_height);

    loop {
        while let Ok(command) = control_rx.try_recv() {
            match command {
                AgentControl::Start => run_flag.store(true, Ordering::Relaxed),
                AgentControl::Stop => run_flag.store(false, Ordering::Relaxed),
                AgentControl::SetQuality(q) => quality = q,
                AgentControl::GetStatus(reply) => {
                    let snapshot = snapshot_tx.borrow().clone();
                    let is_processing =
                        run_flag.load(Ordering::Relaxed) && video_source.latest_frame().is_some();
                    let status = junction_core::build_status_payload(
                        &snapshot,
                        is_processing,
                        video_source_name.clone(),
                    );
                    let _ = reply.send(status);
                }
            }
        }

        if !run_flag.load(Ordering::Relaxed) {
            sleep(Duration::from_millis(100)).await;
            continue;
        }

        let batch = match detection_source.next_batch().await {
            Ok(batch) => batch,
            Err(AgentError::SourceEof) => {
                log::info!("detection source closed, shutting down analysis task");
                return Ok(());
            }
            Err(e) => {
                log::warn!("detection batch dropped: {e}");
                continue;
            }
        };

        // Frame decoding itself is out of scope; this records that a frame
        // was observed for this cycle so `latest_frame()` reflects liveness.
        video_source.publish(Frame {
            width: frame_width,
            height: frame_height,
            data: Vec::new(),
        });

        let now = start.elapsed().as_secs_f64();

        let mut detections = Vec::with_capacity(batch.len());
        for raw in &batch {
            if raw.id < 0 {
                // "untracked" — the detector could not assign a stable id.
                continue;
            }
            let (px, py) = raw.bbox_center();
            let Ok(world) = homography.image_to_world(px, py) else {
                log::warn!("detection {} projects to the line at infinity, dropping", raw.id);
                continue;
            };
            detections.push(Detection {
                id: raw.id,
                lat: world.lat,
                lon: world.lon,
                class_id: raw.class_id,
                class_name: raw.class_name.clone(),
            });
        }

        let snapshot = track_store.update_from_detection(&detections, now);
        let _ = quality;
        let _ = snapshot_tx.send(Arc::new(snapshot));
    }
}

/// Throttled broadcast loop: pushes the latest snapshot at `hz`, retrying
/// transient publish failures with exponential backoff and aborting after
/// too many consecutive failures, mirroring `events.py`'s
/// `socket_update_thread` retry loop.
async fn run_broadcast_task(
    mut snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    push_channel: Arc<dyn PushChannel>,
    hz: f64,
    agent_id: String,
    video_boundary: Option<RectangleCorners>,
) {
    let period = Duration::from_secs_f64(1.0 / hz.max(0.1));
    let mut backoff = BACKOFF_INITIAL_SECS;
    let mut consecutive_failures = 0u32;

    loop {
        sleep(period).await;

        let snapshot = snapshot_rx.borrow_and_update().clone();
        let timestamp = now_iso8601();
        let payload =
            junction_core::build_map_payload(&snapshot, timestamp, true, video_boundary.as_ref());

        match push_channel.publish_map(&payload).await {
            Ok(()) => {
                backoff = BACKOFF_INITIAL_SECS;
                consecutive_failures = 0;
            }
            Err(e) => {
                consecutive_failures += 1;
                log::warn!("[{agent_id}] broadcast publish failed ({consecutive_failures}/{MAX_CONSECUTIVE_FAILURES}): {e}");
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    log::error!("[{agent_id}] too many consecutive broadcast failures, giving up");
                    return;
                }
                sleep(Duration::from_secs_f64(backoff)).await;
                backoff = (backoff * 2.0).min(BACKOFF_CEILING_SECS);
            }
        }
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Project the four frame corners through the homography to build the
/// `video_boundary` polygon, per §6's "closed polygon obtained by
/// projecting the four frame corners through H".
fn video_boundary_corners(homography: &Homography, width: u32, height: u32) -> Option<RectangleCorners> {
    let px_corners = [
        (0.0, 0.0),
        (width as f64, 0.0),
        (width as f64, height as f64),
        (0.0, height as f64),
    ];
    let mut corners = [WorldPoint::default(); 4];
    for (i, &(x, y)) in px_corners.iter().enumerate() {
        corners[i] = homography.image_to_world(x, y).ok()?;
    }
    Some(corners)
}
