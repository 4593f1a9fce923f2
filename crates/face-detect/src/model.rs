//! Neural-network face detector on tract
//!
//! Expects an ONNX model with one NCHW float input in [-1, 1] and one output
//! of shape `[1, N, 5]`: rows of `(x, y, w, h, score)` normalized to the
//! input frame.
//!
//! Inference runs on the blocking pool and cannot be interrupted. A job that
//! outlives the caller's timeout keeps the backend busy; until it finishes,
//! `detect` fails fast instead of starting another one.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use camera_capture::VideoFrame;
use feature_engine::FrameFeatures;
use tracing::{debug, info};
use tokio::task::JoinHandle;
use tract_onnx::prelude::*;

use crate::config::ModelConfig;
use crate::{BackendInitError, BackendKind, BoundingBox, DetectError, Detection, FaceDetect};

/// Values per output row
const ROW_LEN: usize = 5;

type Plan = TypedRunnableModel<TypedModel>;

/// Holds at most one blocking job
struct InferenceSlot<T> {
    running: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> InferenceSlot<T> {
    fn new() -> Self {
        Self { running: None }
    }

    /// Whether a previous job has not finished yet
    fn is_busy(&self) -> bool {
        self.running.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Run `job` on the blocking pool unless one is already running.
    ///
    /// If this future is dropped before the job completes, the job stays in
    /// the slot and later calls fail with [`DetectError::Busy`]. Its result
    /// is discarded.
    async fn run<F>(&mut self, job: F) -> Result<T, DetectError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_busy() {
            return Err(DetectError::Busy);
        }

        let handle = self.running.insert(tokio::task::spawn_blocking(job));
        let joined = handle.await;
        self.running = None;
        joined.map_err(|e| DetectError::Inference(format!("inference task failed: {}", e)))
    }
}

/// ONNX face detector
pub struct ModelBackend {
    plan: Arc<Plan>,
    inference: InferenceSlot<Result<Vec<f32>, DetectError>>,
    input_width: u32,
    input_height: u32,
    score_threshold: f32,
}

impl ModelBackend {
    /// Load and optimize the configured model
    pub fn load(config: &ModelConfig) -> Result<Self, BackendInitError> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| BackendInitError::Unavailable("no model path configured".into()))?;

        if config.input_width == 0 || config.input_height == 0 {
            return Err(BackendInitError::ModelLoad(format!(
                "invalid input size {}x{}",
                config.input_width, config.input_height
            )));
        }

        let start = Instant::now();
        let plan = build_plan(path, config.input_width, config.input_height)
            .map_err(|e| BackendInitError::ModelLoad(format!("{}: {:#}", path.display(), e)))?;

        info!(
            "Face model loaded from {} in {}ms",
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(Self {
            plan: Arc::new(plan),
            inference: InferenceSlot::new(),
            input_width: config.input_width,
            input_height: config.input_height,
            score_threshold: config.score_threshold,
        })
    }
}

fn build_plan(path: &Path, width: u32, height: u32) -> TractResult<Plan> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, height as usize, width as usize),
            ),
        )?
        .into_optimized()?
        .into_runnable()
}

#[async_trait]
impl FaceDetect for ModelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Model
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn detect(
        &mut self,
        frame: &VideoFrame,
        _features: &FrameFeatures,
    ) -> Result<Detection, DetectError> {
        if !frame.is_well_formed() {
            return Err(DetectError::InvalidFrame(format!(
                "{}x{} frame with {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        let input = to_nchw(frame, self.input_width, self.input_height);
        let plan = Arc::clone(&self.plan);
        let (w, h) = (self.input_width as usize, self.input_height as usize);

        let rows = self
            .inference
            .run(move || run_plan(&plan, &input, w, h))
            .await??;

        let best = best_face(
            &rows,
            self.score_threshold,
            f64::from(frame.width),
            f64::from(frame.height),
        );
        debug!(sequence = frame.sequence, found = best.is_some(), "Model inference done");

        Ok(match best {
            Some((bbox, score)) => Detection::found(f64::from(score) * 100.0, Some(bbox)),
            None => Detection::none(),
        })
    }
}

fn run_plan(plan: &Plan, input: &[f32], width: usize, height: usize) -> Result<Vec<f32>, DetectError> {
    let tensor = Tensor::from_shape(&[1, 3, height, width], input)
        .map_err(|e| DetectError::Inference(e.to_string()))?;
    let outputs = plan
        .run(tvec!(tensor.into()))
        .map_err(|e| DetectError::Inference(e.to_string()))?;
    let output = outputs
        .first()
        .ok_or_else(|| DetectError::Inference("model produced no outputs".into()))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| DetectError::Inference(e.to_string()))?;

    if view.shape().last().copied() != Some(ROW_LEN) {
        return Err(DetectError::Inference(format!(
            "unexpected output shape {:?}",
            view.shape()
        )));
    }
    Ok(view.iter().copied().collect())
}

/// Resize to the network input and lay out as normalized NCHW
fn to_nchw(frame: &VideoFrame, width: u32, height: u32) -> Vec<f32> {
    let resized = frame.resize(width, height);
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; plane * 3];

    for (i, px) in resized.data.chunks_exact(3).take(plane).enumerate() {
        for (c, value) in px.iter().enumerate() {
            data[c * plane + i] = f32::from(*value) / 127.5 - 1.0;
        }
    }
    data
}

/// Highest-scoring row at or above the threshold, scaled to frame pixels
fn best_face(rows: &[f32], threshold: f32, frame_w: f64, frame_h: f64) -> Option<(BoundingBox, f32)> {
    rows.chunks_exact(ROW_LEN)
        .filter(|r| r[4].is_finite() && r[4] >= threshold)
        .max_by(|a, b| a[4].total_cmp(&b[4]))
        .map(|r| {
            let x = f64::from(r[0]).clamp(0.0, 1.0) * frame_w;
            let y = f64::from(r[1]).clamp(0.0, 1.0) * frame_h;
            let w = (f64::from(r[2]).max(0.0) * frame_w).min(frame_w - x);
            let h = (f64::from(r[3]).max(0.0) * frame_h).min(frame_h - y);
            (BoundingBox::new(x, y, w, h), r[4].min(1.0))
        })
}
