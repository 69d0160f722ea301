//! Vision/OCR Layer
//!
//! Takes a result screenshot all the way to a [`MatchRecord`]:
//! preprocessing, text recognition, normalization and parsing.
//! Supported OCR backends:
//! - Tesseract (`tesseract` feature, recommended)
//! - Any other [`OcrEngine`] supplied by the host

pub mod ocr;
pub mod ocr_preprocess;
pub mod profile;
#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use ocr::{OcrEngine, OcrError, OcrInvoker, OcrProgress, OcrStatus, ProgressSink, RecognitionHandle, RecognizedText};
pub use ocr_preprocess::{ImageOpsReadiness, ImagePreprocessor, PreprocessedImage, PreprocessingDegraded, ReadinessTrigger};
pub use profile::{GameProfile, OcrOptions, Script, SegmentationMode};

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::{analyze_text, MatchRecord, TextAnalysis};
use crate::capture::RawImage;
use crate::config::{AppConfig, OcrSettings};

/// Everything produced by one pipeline run
#[derive(Debug, Clone)]
pub struct VisionResult {
    /// Raw engine output
    pub text: RecognizedText,
    /// Normalized text and parsed record
    pub analysis: TextAnalysis,
    /// OCR ran on the original image instead of the binarized one
    pub degraded: bool,
    /// Wall time of the whole run in milliseconds
    pub processing_time_ms: u64,
}

impl VisionResult {
    pub fn record(&self) -> &MatchRecord {
        &self.analysis.record
    }
}

/// Screenshot → match record
pub struct VisionPipeline {
    preprocessor: ImagePreprocessor,
    invoker: OcrInvoker,
}

impl VisionPipeline {
    pub fn new(preprocessor: ImagePreprocessor, invoker: OcrInvoker) -> Self {
        Self { preprocessor, invoker }
    }

    /// Build a pipeline from the application config
    pub fn from_config(config: &AppConfig, engine: Arc<dyn OcrEngine>, readiness: ImageOpsReadiness) -> Self {
        let preprocessor = ImagePreprocessor::new(config.preprocessing.clone(), readiness);
        let invoker = OcrInvoker::new(engine).with_language_override(config.ocr.language_override.clone());
        Self::new(preprocessor, invoker)
    }

    /// Run the full pipeline, forwarding OCR progress to `on_progress`.
    ///
    /// Preprocessing never fails; only the OCR stage can.
    pub async fn process<F, E>(
        &self,
        image: RawImage,
        profile: GameProfile,
        on_progress: F,
    ) -> Result<VisionResult, OcrError>
    where
        F: FnMut(OcrProgress) -> Result<(), E>,
        E: Display,
    {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Vision pipeline: {}x{} image, profile {}", width, height, profile);

        let preprocessor = self.preprocessor.clone();
        let prepared = tokio::task::spawn_blocking(move || preprocessor.preprocess(image))
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("preprocessing worker failed: {}", e)))?;

        let degraded = prepared.is_degraded();
        if degraded {
            warn!("Running OCR on the unprocessed image");
        }

        let text = self.invoker.recognize(prepared, profile).finish_with(on_progress).await?;
        let analysis = analyze_text(&text.text, profile);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Vision pipeline complete in {} ms: {} players, type {:?}",
            processing_time_ms,
            analysis.record.players.len(),
            analysis.record.match_type
        );

        Ok(VisionResult {
            text,
            analysis,
            degraded,
            processing_time_ms,
        })
    }
}

/// The OCR backend compiled into this build
#[cfg(feature = "tesseract")]
pub fn default_engine(settings: &OcrSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    let engine = tesseract::TesseractEngine::new(settings.tessdata_dir.as_deref());
    if !engine.is_available() {
        return Err(OcrError::OcrUnavailable(
            "Tesseract could not start; check the installation and tessdata_dir".to_string(),
        ));
    }
    info!("Using Tesseract OCR backend");
    Ok(Arc::new(engine))
}

/// The OCR backend compiled into this build
#[cfg(not(feature = "tesseract"))]
pub fn default_engine(_settings: &OcrSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    Err(OcrError::OcrUnavailable(
        "built without an OCR backend; rebuild with --features tesseract".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MatchType;
    use crate::capture::OcrSurface;
    use image::{Rgba, RgbaImage};
    use parking_lot::Mutex;

    /// Returns fixed text and remembers whether it was handed a binarized image
    struct FixedEngine {
        text: Result<String, OcrError>,
        seen_size: Mutex<Option<(u32, u32)>>,
    }

    impl FixedEngine {
        fn new(text: Result<String, OcrError>) -> Arc<Self> {
            Arc::new(Self {
                text,
                seen_size: Mutex::new(None),
            })
        }
    }

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(
            &self,
            surface: &OcrSurface,
            _options: &OcrOptions,
            progress: &ProgressSink,
        ) -> Result<String, OcrError> {
            *self.seen_size.lock() = Some((surface.width, surface.height));
            progress.report(OcrStatus::RecognizingText, 0.5);
            self.text.clone()
        }
    }

    fn screenshot() -> RawImage {
        let img = RgbaImage::from_pixel(32, 24, Rgba([200, 200, 200, 255]));
        RawImage::new(img.into_raw(), 32, 24)
    }

    fn pipeline(engine: Arc<FixedEngine>, readiness: ImageOpsReadiness) -> VisionPipeline {
        VisionPipeline::from_config(&AppConfig::default(), engine, readiness)
    }

    #[tokio::test]
    async fn test_pipeline_produces_record() {
        let engine = FixedEngine::new(Ok("Ranked 12:30\nAhri 5 / 2 / 8 3.4\nZed 1 / l0 / 2 9.1".to_string()));
        let pipeline = pipeline(engine.clone(), ImageOpsReadiness::ready());

        let mut events = Vec::new();
        let result = pipeline
            .process(screenshot(), GameProfile::WildRift, |p| {
                events.push(p);
                Ok::<(), String>(())
            })
            .await
            .unwrap();

        assert!(!result.degraded);
        assert_eq!(*engine.seen_size.lock(), Some((32, 24)));
        assert_eq!(result.analysis.normalized, "Ranked 12:30 Ahri 5/2/8 3.4 Zed 1/10/2 9.1");

        let record = result.record();
        assert_eq!(record.match_type, MatchType::Ranked);
        assert_eq!(record.duration.as_deref(), Some("12:30"));
        assert_eq!(record.players.len(), 2);
        assert_eq!(record.mvp_player().map(|p| p.kda()), Some("5/2/8".to_string()));

        assert!(!events.is_empty());
        assert_eq!(events.last().map(|p| p.progress), Some(1.0));
    }

    #[tokio::test]
    async fn test_pipeline_degrades_when_image_ops_not_ready() {
        let (_trigger, readiness) = ImageOpsReadiness::pending();
        let engine = FixedEngine::new(Ok("1/2/3".to_string()));
        let pipeline = pipeline(engine, readiness);

        let result = pipeline
            .process(screenshot(), GameProfile::Auto, |_| Ok::<(), String>(()))
            .await
            .unwrap();

        assert!(result.degraded);
        assert_eq!(result.record().players.len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_propagates_ocr_failure() {
        let engine = FixedEngine::new(Err(OcrError::RecognitionFailed("boom".to_string())));
        let pipeline = pipeline(engine, ImageOpsReadiness::ready());

        let err = pipeline
            .process(screenshot(), GameProfile::Honor, |_| Ok::<(), String>(()))
            .await
            .unwrap_err();

        assert_eq!(err, OcrError::RecognitionFailed("boom".to_string()));
    }

    #[test]
    #[cfg(not(feature = "tesseract"))]
    fn test_no_backend_compiled_in() {
        let err = default_engine(&OcrSettings::default()).err().unwrap();
        assert!(matches!(err, OcrError::OcrUnavailable(_)));
    }
}
