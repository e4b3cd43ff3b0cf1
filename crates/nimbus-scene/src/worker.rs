//! Scene worker thread
//!
//! One cooperative worker per scene handle. The worker owns the packed splat
//! buffer; the render loop talks to it exclusively through FIFO channels
//! with ownership-moving payloads, so no shared mutable memory crosses the
//! boundary. Requests process in order; the texture for a load is emitted
//! before any order for that scene can exist.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use crate::error::{SceneError, SceneResult};
use crate::pack::PackedSplats;
use crate::sort::{DepthSorter, SplatOrder};
use crate::texture::{self, CovarianceTexture};

/// Messages from the render loop to the worker.
#[derive(Debug)]
pub enum SceneRequest {
    /// Adopt a packed scene and publish its covariance texture.
    Load { packed: PackedSplats },
    /// Update the opacity-byte cutoff in [1, 255] and force the next sort.
    SetAlphaCutoff(u8),
    /// Re-sort for a column-major view-projection matrix, unless throttled.
    Sort { view_proj: [f32; 16] },
}

/// Messages from the worker back to the render loop.
#[derive(Debug)]
pub enum SceneEvent {
    /// Covariance texture for the most recent load. Emitted exactly once per
    /// scene, before any [`SceneEvent::Order`] for it.
    Texture(CovarianceTexture),
    /// A freshly sorted splat order, front to back.
    Order(SplatOrder),
    /// Loading failed; any previously bound scene stays valid.
    LoadFailed(String),
}

/// Handle to a running scene worker. Dropping it shuts the worker down.
pub struct SceneHandle {
    requests: Sender<SceneRequest>,
    events: Receiver<SceneEvent>,
    thread: Option<JoinHandle<()>>,
}

impl SceneHandle {
    /// Spawn a worker with no scene bound.
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("splat-worker".into())
            .spawn(move || Worker::new(event_tx).run(req_rx))
            .expect("failed to spawn splat worker thread");
        Self {
            requests: req_tx,
            events: event_rx,
            thread: Some(thread),
        }
    }

    /// Hand a packed scene to the worker. Ownership moves; the covariance
    /// texture arrives as a [`SceneEvent::Texture`].
    pub fn load(&self, packed: PackedSplats) -> SceneResult<()> {
        self.send(SceneRequest::Load { packed })
    }

    pub fn set_alpha_cutoff(&self, cutoff: u8) -> SceneResult<()> {
        self.send(SceneRequest::SetAlphaCutoff(cutoff))
    }

    /// Queue a sort request; superseded requests are cheap because the
    /// throttle short-circuits them on the worker.
    pub fn request_sort(&self, view_proj: [f32; 16]) -> SceneResult<()> {
        self.send(SceneRequest::Sort { view_proj })
    }

    /// Drain all pending worker events without blocking.
    pub fn poll(&self) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Block until the next worker event, mainly useful in tests.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<SceneEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// A disconnected channel means the worker thread died.
    fn send(&self, request: SceneRequest) -> SceneResult<()> {
        self.requests
            .send(request)
            .map_err(|_| SceneError::WorkerGone)
    }
}

impl Drop for SceneHandle {
    fn drop(&mut self) {
        // Disconnect the request channel so the worker loop exits.
        let (dead_tx, _) = mpsc::channel();
        drop(std::mem::replace(&mut self.requests, dead_tx));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Worker-side state: the packed buffer plus the sorter scalars.
struct Worker {
    events: Sender<SceneEvent>,
    packed: Option<PackedSplats>,
    sorter: DepthSorter,
}

impl Worker {
    fn new(events: Sender<SceneEvent>) -> Self {
        Self {
            events,
            packed: None,
            sorter: DepthSorter::new(),
        }
    }

    fn run(mut self, requests: Receiver<SceneRequest>) {
        while let Ok(request) = requests.recv() {
            match request {
                SceneRequest::Load { packed } => self.load(packed),
                SceneRequest::SetAlphaCutoff(cutoff) => {
                    self.sorter.set_alpha_cutoff(cutoff);
                }
                SceneRequest::Sort { view_proj } => self.sort(&view_proj),
            }
        }
        tracing::debug!("splat worker shutting down");
    }

    fn load(&mut self, packed: PackedSplats) {
        let count = packed.count();
        // A failure inside covariance generation must not take the worker
        // down or unbind the previous scene.
        let texture = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            texture::generate(&packed)
        })) {
            Ok(texture) => texture,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "covariance generation failed".into());
                tracing::error!(%message, "scene load failed");
                self.emit(SceneEvent::LoadFailed(message));
                return;
            }
        };
        tracing::info!(
            splats = count,
            texture_rows = texture.height,
            "scene loaded"
        );
        self.packed = Some(packed);
        self.sorter.invalidate();
        self.emit(SceneEvent::Texture(texture));
    }

    fn sort(&mut self, view_proj: &[f32; 16]) {
        let Some(packed) = &self.packed else {
            return;
        };
        if let Some(order) = self.sorter.sort(packed, view_proj) {
            self.emit(SceneEvent::Order(order));
        }
    }

    fn emit(&self, event: SceneEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("render side dropped the event channel");
        }
    }
}
