//! Tesseract OCR backend
//!
//! Only compiled with the `tesseract` feature, which links against the system
//! libtesseract and leptonica.

use std::path::Path;
use tesseract::{PageSegMode, Tesseract};
use tracing::debug;

use super::ocr::{OcrEngine, OcrError, OcrStatus, ProgressSink};
use super::profile::{OcrOptions, SegmentationMode};
use crate::capture::OcrSurface;

/// Tesseract engine; a fresh API instance is created per call
pub struct TesseractEngine {
    datapath: Option<String>,
}

impl TesseractEngine {
    /// Create an engine reading language packs from `tessdata_dir`
    /// (or the system default when `None`)
    pub fn new(tessdata_dir: Option<&Path>) -> Self {
        Self {
            datapath: tessdata_dir.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    /// Check whether Tesseract can start with the English pack
    pub fn is_available(&self) -> bool {
        Tesseract::new(self.datapath.as_deref(), Some("eng")).is_ok()
    }
}

fn page_seg_mode(mode: SegmentationMode) -> PageSegMode {
    match mode {
        SegmentationMode::SingleBlock => PageSegMode::PsmSingleBlock,
        SegmentationMode::SparseText => PageSegMode::PsmSparseText,
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(
        &self,
        surface: &OcrSurface,
        options: &OcrOptions,
        progress: &ProgressSink,
    ) -> Result<String, OcrError> {
        progress.report(OcrStatus::LoadingEngine, 0.05);

        let mut tesseract = Tesseract::new(self.datapath.as_deref(), Some(&options.language))
            .map_err(|e| {
                OcrError::OcrUnavailable(format!(
                    "Failed to initialize Tesseract with '{}': {}",
                    options.language, e
                ))
            })?;

        progress.report(OcrStatus::InitializingApi, 0.2);
        tesseract.set_page_seg_mode(page_seg_mode(options.segmentation));
        let tesseract = tesseract
            .set_variable("tessedit_char_whitelist", &options.whitelist)
            .map_err(|e| OcrError::RecognitionFailed(format!("Failed to set whitelist: {}", e)))?;

        if progress.is_cancelled() {
            return Err(OcrError::RecognitionFailed("cancelled".to_string()));
        }

        debug!("Tesseract: processing {}x{} surface", surface.width, surface.height);
        progress.report(OcrStatus::RecognizingText, 0.3);

        let mut tesseract = tesseract
            .set_image_from_mem(&surface.png)
            .map_err(|e| OcrError::RecognitionFailed(format!("Failed to set image: {}", e)))?
            .recognize()
            .map_err(|e| OcrError::RecognitionFailed(format!("Failed to recognize text: {}", e)))?;

        progress.report(OcrStatus::RecognizingText, 0.95);

        tesseract
            .get_text()
            .map_err(|e| OcrError::RecognitionFailed(format!("Failed to read text: {}", e)))
    }
}
