//! # cvlens
//!
//! Analyse a résumé PDF with a Vision Language Model and produce
//! structured, scored feedback.
//!
//! ## Why this crate?
//!
//! Keyword-matching résumé checkers miss what an actual screener sees:
//! layout, hierarchy, tone, the shape of the page. Instead this crate
//! rasterises page 1 into a PNG and lets a VLM read the résumé as a
//! recruiter would, returning an overall score, per-category scores (ATS
//! compatibility, tone and style, content, structure, skills, optional
//! job-description relevance), and concrete tips with before/after
//! examples.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume.pdf
//!  │
//!  ├─ 1. Validate   title present, bytes look like a PDF (no I/O yet)
//!  ├─ 2. Upload     original document → object store
//!  ├─ 3. Render     page 1 → PNG via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 4. Upload     raster image → object store
//!  ├─ 5. Persist    pending record under resume:<id>
//!  ├─ 6. Infer      vision call with image + job context instructions
//!  ├─ 7. Extract    lenient JSON recovery from the reply text
//!  └─ 8. Persist    same key, feedback attached
//! ```
//!
//! Storage and inference are trait seams ([`ObjectStore`],
//! [`KeyValueStore`], [`FeedbackProvider`]); directory-backed and
//! in-memory store implementations ship with the crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cvlens::{analyze, AnalysisConfig, Collaborators, Submission, VisionFeedbackProvider};
//! use cvlens::store::fs::{FsKeyValueStore, FsObjectStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = AnalysisConfig::default();
//!     let files = Arc::new(FsObjectStore::new("./cvlens-data"));
//!     let collab = Collaborators::new(
//!         files.clone(),
//!         Arc::new(FsKeyValueStore::new("./cvlens-data")),
//!         Arc::new(VisionFeedbackProvider::from_config(files, &config)?),
//!     );
//!
//!     let output = analyze(
//!         Submission {
//!             file_name: "resume.pdf".into(),
//!             document: std::fs::read("resume.pdf")?,
//!             job_title: "Backend Engineer".into(),
//!             company_name: None,
//!             job_description: None,
//!         },
//!         &collab,
//!         &config,
//!     )
//!     .await?;
//!
//!     let feedback = output.record.feedback.as_ref().unwrap();
//!     println!("overall: {}/100", feedback.overall_score);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cvlens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! cvlens = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod inference;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_file, AnalysisOutput, AnalysisStats, Collaborators, JobContext, Submission,
};
pub use config::{AbandonHandle, AnalysisConfig, AnalysisConfigBuilder};
pub use error::{AnalysisError, ErrorKind};
pub use extract::extract_json;
pub use inference::{FeedbackProvider, InferenceError, InferenceReply, VisionFeedbackProvider};
pub use pipeline::render::{
    rasterize_first_page, rasterize_page, PageRasterizer, PdfiumRasterizer, RasterError,
    RasterImage, DEFAULT_SCALE,
};
pub use pipeline::stage::Stage;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{record_key, CategoryFeedback, Feedback, JobRecord, Tip, TipExample, TipKind};
pub use store::{KeyValueStore, ObjectStore, StoreError, StoredObject};
