//! OCR (Optical Character Recognition) module
//!
//! Runs the configured OCR engine on a blocking worker thread. Callers get a
//! [`RecognitionHandle`] carrying a progress stream and the final text;
//! dropping the handle cancels the run, after which nothing more is delivered.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ocr_preprocess::PreprocessedImage;
use super::profile::{GameProfile, OcrOptions};
use crate::capture::{encode_surface, OcrSurface};

/// Failures surfaced by the OCR stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    /// The engine could not be created or initialized
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),
    /// The engine failed while recognizing
    #[error("text recognition failed: {0}")]
    RecognitionFailed(String),
}

/// Phase reported alongside progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    /// Loading engine binaries and language data
    LoadingEngine,
    /// Configuring the engine for this run
    InitializingApi,
    /// Actual text recognition
    RecognizingText,
}

impl OcrStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OcrStatus::LoadingEngine => "loading engine",
            OcrStatus::InitializingApi => "initializing api",
            OcrStatus::RecognizingText => "recognizing text",
        }
    }
}

/// A single progress notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OcrProgress {
    /// Current phase
    pub status: OcrStatus,
    /// Completion of the whole run (0.0 - 1.0, never decreasing)
    pub progress: f32,
}

/// Text produced by one recognition run
#[derive(Debug, Clone)]
pub struct RecognizedText {
    /// Raw engine output
    pub text: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Progress channel handed to engines.
///
/// Clamps values to [0, 1], keeps them non-decreasing and goes silent once the
/// run is cancelled.
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<OcrProgress>,
    cancel: CancellationToken,
    last: Mutex<f32>,
}

impl ProgressSink {
    fn new(tx: mpsc::UnboundedSender<OcrProgress>, cancel: CancellationToken) -> Self {
        Self {
            tx,
            cancel,
            last: Mutex::new(0.0),
        }
    }

    /// Report progress for the current phase
    pub fn report(&self, status: OcrStatus, progress: f32) {
        if self.cancel.is_cancelled() {
            return;
        }

        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let progress = {
            let mut last = self.last.lock();
            *last = last.max(progress);
            *last
        };

        // Receiver gone means the handle was dropped
        let _ = self.tx.send(OcrProgress { status, progress });
    }

    /// Whether the caller discarded the run; engines may stop early
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// An OCR backend.
///
/// Implementations block; the invoker runs them off the async executor.
pub trait OcrEngine: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Recognize all text on the surface
    fn recognize(
        &self,
        surface: &OcrSurface,
        options: &OcrOptions,
        progress: &ProgressSink,
    ) -> Result<String, OcrError>;
}

/// Caller-held handle to a pending recognition
pub struct RecognitionHandle {
    progress: mpsc::UnboundedReceiver<OcrProgress>,
    result: oneshot::Receiver<Result<RecognizedText, OcrError>>,
    cancel: CancellationToken,
}

impl RecognitionHandle {
    /// Next progress event, `None` once the worker stops reporting
    pub async fn next_progress(&mut self) -> Option<OcrProgress> {
        self.progress.recv().await
    }

    /// Wait for the final text, ignoring progress
    pub async fn finish(self) -> Result<RecognizedText, OcrError> {
        self.finish_with(|_| Ok::<(), std::convert::Infallible>(())).await
    }

    /// Wait for the final text, forwarding every progress event to `on_progress`.
    ///
    /// A callback error is logged and recognition carries on.
    pub async fn finish_with<F, E>(mut self, mut on_progress: F) -> Result<RecognizedText, OcrError>
    where
        F: FnMut(OcrProgress) -> Result<(), E>,
        E: Display,
    {
        let mut deliver = |progress: OcrProgress| {
            if let Err(e) = on_progress(progress) {
                warn!("Progress callback failed ({}), continuing recognition", e);
            }
        };

        loop {
            tokio::select! {
                biased;
                Some(progress) = self.progress.recv() => deliver(progress),
                result = &mut self.result => {
                    while let Ok(progress) = self.progress.try_recv() {
                        deliver(progress);
                    }
                    return result.unwrap_or_else(|_| {
                        Err(OcrError::RecognitionFailed(
                            "recognition worker stopped without a result".to_string(),
                        ))
                    });
                }
            }
        }
    }

    /// Discard the run
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for RecognitionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs an [`OcrEngine`] with profile-derived options
#[derive(Clone)]
pub struct OcrInvoker {
    engine: Arc<dyn OcrEngine>,
    language_override: Option<String>,
}

impl OcrInvoker {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            language_override: None,
        }
    }

    /// Use these language packs instead of the profile's choice
    pub fn with_language_override(mut self, language: Option<String>) -> Self {
        self.language_override = language;
        self
    }

    /// Options the engine will receive for this profile
    pub fn options_for(&self, profile: GameProfile) -> OcrOptions {
        let mut options = profile.ocr_options();
        if let Some(language) = &self.language_override {
            options.language = language.clone();
        }
        options
    }

    /// Start recognition on a blocking worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn recognize(&self, image: PreprocessedImage, profile: GameProfile) -> RecognitionHandle {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let options = self.options_for(profile);
        let sink = ProgressSink::new(progress_tx, cancel.clone());

        info!(
            "Starting {} OCR for {} (lang={}, mode={:?})",
            engine.name(),
            profile.display_name(),
            options.language,
            options.segmentation
        );

        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            sink.report(OcrStatus::LoadingEngine, 0.0);

            let result = render(&image).and_then(|surface| engine.recognize(&surface, &options, &sink));

            if sink.is_cancelled() {
                debug!("Recognition discarded by caller after {:?}", start.elapsed());
                return;
            }

            let result = result.map(|text| {
                sink.report(OcrStatus::RecognizingText, 1.0);
                let processing_time_ms = start.elapsed().as_millis() as u64;
                debug!("Recognized {} chars in {} ms", text.chars().count(), processing_time_ms);
                RecognizedText {
                    text,
                    processing_time_ms,
                }
            });

            let _ = result_tx.send(result);
        });

        RecognitionHandle {
            progress: progress_rx,
            result: result_rx,
            cancel,
        }
    }
}

fn render(image: &PreprocessedImage) -> Result<OcrSurface, OcrError> {
    let dynamic = image.to_dynamic().ok_or_else(|| {
        let (w, h) = image.dimensions();
        OcrError::RecognitionFailed(format!("cannot render {}x{} image: pixel buffer does not match size", w, h))
    })?;

    encode_surface(&dynamic).map_err(|e| OcrError::RecognitionFailed(format!("{:#}", e)))
}
