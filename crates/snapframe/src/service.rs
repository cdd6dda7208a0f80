//! # Service — One Render Thread, Many Callers
//!
//! wgpu resources are not meant to be shared between request threads, and the
//! uniform block is mutable per draw. So all GPU work happens on a single
//! dedicated thread that owns the context, program, scene and renderer.
//! Request threads talk to it through a bounded queue:
//!
//! ```text
//!  caller thread(s)                         snapframe-render thread
//!  ────────────────                         ───────────────────────
//!  validate(request)
//!  camera matrices
//!  send Job ──────────► bounded queue ────► draw + read back
//!  wait on reply  ◄──────────────────────── RawFrame / FrameError
//!  encode PNG
//! ```
//!
//! Startup happens on the render thread too, and its outcome is reported
//! back before [`RenderService::start`] returns: either everything is built
//! or the service does not exist.
//!
//! A failed request only fails its own caller; the render thread keeps
//! serving. Dropping the service closes the queue, lets the thread drain
//! what is already queued, and joins it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::camera::{CameraMatrices, Projection};
use crate::config::RenderConfig;
use crate::encode::encode_png;
use crate::error::{RenderError, StartupError};
use crate::render::{FrameError, GpuContext, RawFrame, Renderer};
use crate::render3d::scene::{Scene, SceneAssets};
use crate::request::{RenderRequest, validate};
use crate::shader::{Program, SCENE_FRAGMENT_SHADER, SCENE_VERTEX_SHADER};

/// Snapshot of service counters, for logs or a JSON status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderStats {
    pub adapter: String,
    pub frames_rendered: u64,
    pub failures: u64,
    /// GPU time of the most recent frame (draw + readback), in milliseconds.
    pub last_render_ms: f64,
}

#[derive(Default)]
struct Counters {
    frames: AtomicU64,
    failures: AtomicU64,
    last_render_micros: AtomicU64,
}

struct Job {
    camera: CameraMatrices,
    width: u32,
    height: u32,
    reply: Sender<Result<RawFrame, FrameError>>,
}

/// What the render thread reports once it is ready.
struct Ready {
    adapter: String,
    device_max_dimension: u32,
}

pub struct RenderService {
    jobs: Option<Sender<Job>>,
    thread: Option<thread::JoinHandle<()>>,
    projection: Projection,
    max_dimension: u32,
    adapter: String,
    counters: Arc<Counters>,
}

impl RenderService {
    /// Spawn the render thread and build everything on it. Returns once the
    /// thread is ready to serve, or with the first error it hit.
    pub fn start(config: RenderConfig, assets: SceneAssets) -> Result<Self, StartupError> {
        config.validate()?;

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (jobs_tx, jobs_rx) = crossbeam_channel::bounded(config.queue_depth);
        let counters = Arc::new(Counters::default());
        let projection = Projection::from(&config);
        let max_dimension = config.max_dimension;

        let thread_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name("snapframe-render".into())
            .spawn(move || {
                let (gpu, renderer) = match build(&config, &assets) {
                    Ok(built) => built,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                drop(assets);
                let ready = Ready {
                    adapter: gpu.adapter_info().name.clone(),
                    device_max_dimension: gpu.max_dimension(),
                };
                if ready_tx.send(Ok(ready)).is_err() {
                    return;
                }
                serve(&gpu, renderer, &jobs_rx, &thread_counters);
            })?;

        match ready_rx.recv() {
            Ok(Ok(ready)) => {
                log::info!(
                    "render service started on \"{}\", max request {max_dimension}px",
                    ready.adapter
                );
                if ready.device_max_dimension < max_dimension {
                    log::warn!(
                        "device texture limit is {}px; larger frames will fail",
                        ready.device_max_dimension
                    );
                }
                Ok(Self {
                    jobs: Some(jobs_tx),
                    thread: Some(handle),
                    projection,
                    max_dimension,
                    adapter: ready.adapter,
                    counters,
                })
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                log::error!("render service failed to start: {err}");
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(StartupError::ThreadExited)
            }
        }
    }

    /// Render one frame and return it as PNG bytes.
    pub fn render(&self, request: RenderRequest) -> Result<Vec<u8>, RenderError> {
        let result = self.render_png(&request);
        match &result {
            Ok(png) => {
                self.counters.frames.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "rendered {}x{} ({} bytes)",
                    request.width,
                    request.height,
                    png.len()
                );
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("render request failed ({:?}): {err}", err.kind());
            }
        }
        result
    }

    /// Largest width/height that passes request validation. The device may
    /// still refuse frames above its own texture limit.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            adapter: self.adapter.clone(),
            frames_rendered: self.counters.frames.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            last_render_ms: self.counters.last_render_micros.load(Ordering::Relaxed) as f64
                / 1000.0,
        }
    }

    fn render_png(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderError> {
        validate(request, self.max_dimension)?;
        let camera = CameraMatrices::compute(request, &self.projection)?;

        let jobs = self.jobs.as_ref().ok_or(RenderError::ServiceStopped)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        jobs.send(Job {
            camera,
            width: request.width,
            height: request.height,
            reply: reply_tx,
        })
        .map_err(|_| RenderError::ServiceStopped)?;

        let frame = reply_rx.recv().map_err(|_| RenderError::ServiceStopped)??;
        Ok(encode_png(&frame)?)
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        // Closing the queue ends the serve loop.
        self.jobs.take();
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            log::error!("render thread panicked");
        }
    }
}

fn build(
    config: &RenderConfig,
    assets: &SceneAssets,
) -> Result<(GpuContext, Renderer), StartupError> {
    let gpu = GpuContext::headless(config)?;
    let program = Program::compile(&gpu, SCENE_VERTEX_SHADER, SCENE_FRAGMENT_SHADER)?;
    let scene = Scene::default_scene(&gpu, &program, assets)?;
    let renderer = Renderer::new(&gpu, program, scene, config)?;
    Ok((gpu, renderer))
}

fn serve(gpu: &GpuContext, mut renderer: Renderer, jobs: &Receiver<Job>, counters: &Counters) {
    for job in jobs.iter() {
        let started = Instant::now();
        let result = renderer.render(gpu, &job.camera, job.width, job.height);
        counters
            .last_render_micros
            .store(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        // The caller may have gone away; nothing to do then.
        let _ = job.reply.send(result);
    }
    log::info!("render queue closed, render thread exiting");
}
