//! The analysis pipeline expressed as an explicit state machine.
//!
//! Each submission walks the same fixed sequence of stages; every stage's
//! output is a precondition for the next, so the happy path is a straight
//! line and [`Stage::next`] is a total function over it. Failure is not a
//! stage: any stage can terminate the run with a stage-tagged
//! [`crate::error::AnalysisError`], which keeps "where did it stop" out of
//! band from "what comes next".
//!
//! Status labels live here as per-stage constants so the orchestrator carries
//! no presentation strings of its own — display code (CLI spinner, web view)
//! receives them through the progress callback and never re-derives them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the document-analysis pipeline, in execution order.
///
/// The sequence is strictly linear:
///
/// ```text
/// Idle → UploadingOriginal → Rasterizing → UploadingRaster
///      → PersistingPlaceholder → Invoking → ExtractingReply
///      → PersistingFinal → Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Submission received, nothing started yet. Local validation happens here.
    Idle,
    /// Uploading the original résumé document to the object store.
    UploadingOriginal,
    /// Rasterising page 1 of the document into a preview image.
    Rasterizing,
    /// Uploading the raster image to the object store.
    UploadingRaster,
    /// Writing the pending Job Record (empty feedback) under its key.
    PersistingPlaceholder,
    /// Calling the inference provider with the image and instructions.
    Invoking,
    /// Recovering the structured feedback from the reply text.
    ExtractingReply,
    /// Overwriting the Job Record with the feedback attached.
    PersistingFinal,
    /// Terminal success state.
    Completed,
}

impl Stage {
    /// The stage that follows this one on the happy path.
    ///
    /// Returns `None` for [`Stage::Completed`], the only terminal state.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::UploadingOriginal),
            Stage::UploadingOriginal => Some(Stage::Rasterizing),
            Stage::Rasterizing => Some(Stage::UploadingRaster),
            Stage::UploadingRaster => Some(Stage::PersistingPlaceholder),
            Stage::PersistingPlaceholder => Some(Stage::Invoking),
            Stage::Invoking => Some(Stage::ExtractingReply),
            Stage::ExtractingReply => Some(Stage::PersistingFinal),
            Stage::PersistingFinal => Some(Stage::Completed),
            Stage::Completed => None,
        }
    }

    /// Human-readable progress label for this stage.
    ///
    /// Intended purely for display; labels carry no retry or control
    /// semantics and are not part of the persisted data model.
    pub fn status_label(self) -> &'static str {
        match self {
            Stage::Idle => "Preparing…",
            Stage::UploadingOriginal => "Uploading resume…",
            Stage::Rasterizing => "Converting PDF to image…",
            Stage::UploadingRaster => "Uploading image…",
            Stage::PersistingPlaceholder => "Preparing data…",
            Stage::Invoking => "Analyzing resume…",
            Stage::ExtractingReply => "Reading feedback…",
            Stage::PersistingFinal => "Saving feedback…",
            Stage::Completed => "Analysis complete",
        }
    }

    /// True once the pipeline can issue no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::UploadingOriginal => "uploading-original",
            Stage::Rasterizing => "rasterizing",
            Stage::UploadingRaster => "uploading-raster",
            Stage::PersistingPlaceholder => "persisting-placeholder",
            Stage::Invoking => "invoking",
            Stage::ExtractingReply => "extracting-reply",
            Stage::PersistingFinal => "persisting-final",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}
