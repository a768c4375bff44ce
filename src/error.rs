//! Error types for the cvlens library.
//!
//! Every failure in the pipeline is terminal for the current submission —
//! nothing is retried by the core; retry is a caller decision (typically:
//! resubmit). [`AnalysisError`] therefore carries two things:
//!
//! * a **human-readable cause** via `Display`, suitable to show verbatim in
//!   place of the progress label, and
//! * a **machine-checkable kind** via [`AnalysisError::kind`], so callers
//!   can branch without string matching.
//!
//! Each variant also knows the [`Stage`] it aborted in
//! ([`AnalysisError::stage`]), which is what distinguishes "the upload of
//! the original failed" from "the upload of the raster failed" while both
//! report [`ErrorKind::Upload`].

use crate::pipeline::stage::Stage;
use thiserror::Error;

/// All fatal errors surfaced by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Caller input was rejected before any collaborator was contacted.
    #[error("Invalid submission: {detail}")]
    Validation { detail: String },

    /// The document bytes are not recognisable as a PDF.
    ///
    /// Raised locally during validation (before any upload) and by the
    /// rasteriser itself, so its contract holds standalone.
    #[error("Provided file is not a PDF: {detail}")]
    UnsupportedFormat { detail: String },

    /// The object store did not return a locator for an upload.
    #[error("Failed to upload {what}: {detail}")]
    Upload {
        /// What was being uploaded: `"resume"` or `"image"`.
        what: &'static str,
        detail: String,
    },

    /// Rasterisation of page 1 failed after the format check passed.
    #[error("Failed to convert PDF to image: {detail}")]
    Conversion { detail: String },

    /// A Job Record write did not complete.
    #[error("Failed to save analysis record: {detail}")]
    Persistence { stage: Stage, detail: String },

    /// The inference provider failed or returned an empty reply.
    #[error("AI feedback failed: {detail}")]
    Inference { detail: String },

    /// No structured feedback could be recovered from the reply text.
    ///
    /// The placeholder record is deliberately left in place so the caller
    /// can retry without re-uploading the document.
    #[error("Failed to parse feedback from the model reply: {detail}")]
    Parse { detail: String },

    /// The caller abandoned the submission; the pipeline stopped issuing
    /// transitions after `stage`. Already-written uploads and records are
    /// left intact.
    #[error("Analysis abandoned during {stage}")]
    Abandoned { stage: Stage },
}

/// Machine-checkable classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    UnsupportedFormat,
    Upload,
    Conversion,
    Persistence,
    Inference,
    Parse,
    Abandoned,
}

impl AnalysisError {
    /// The kind of this error, independent of its message text.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Validation { .. } => ErrorKind::Validation,
            AnalysisError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            AnalysisError::Upload { .. } => ErrorKind::Upload,
            AnalysisError::Conversion { .. } => ErrorKind::Conversion,
            AnalysisError::Persistence { .. } => ErrorKind::Persistence,
            AnalysisError::Inference { .. } => ErrorKind::Inference,
            AnalysisError::Parse { .. } => ErrorKind::Parse,
            AnalysisError::Abandoned { .. } => ErrorKind::Abandoned,
        }
    }

    /// The pipeline stage in which this error terminated the submission.
    pub fn stage(&self) -> Stage {
        match self {
            AnalysisError::Validation { .. } | AnalysisError::UnsupportedFormat { .. } => {
                Stage::Idle
            }
            AnalysisError::Upload { what: "resume", .. } => Stage::UploadingOriginal,
            AnalysisError::Upload { .. } => Stage::UploadingRaster,
            AnalysisError::Conversion { .. } => Stage::Rasterizing,
            AnalysisError::Persistence { stage, .. } => *stage,
            AnalysisError::Inference { .. } => Stage::Invoking,
            AnalysisError::Parse { .. } => Stage::ExtractingReply,
            AnalysisError::Abandoned { stage } => *stage,
        }
    }
}
