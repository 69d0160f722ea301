//! moba-stats - Match statistics from MOBA result screenshots
//!
//! Screenshot → preprocessing → OCR → normalization → structured match record.
//! The binary in `main.rs` is a thin host around [`vision::VisionPipeline`]
//! and [`analysis::analyze_text`].

pub mod analysis;
pub mod capture;
pub mod config;
pub mod vision;
