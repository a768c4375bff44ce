//! The pipeline orchestrator: one submission in, one persisted record out.
//!
//! ## Why persist a placeholder before inference?
//!
//! The placeholder write is the pivot of the whole design. Once both
//! uploads and the pending record are durable, every later failure
//! (inference, extraction, final write) leaves a job that is still
//! discoverable and clearly labelled pending — the user retries without
//! re-uploading anything, and no partially-processed job can masquerade as
//! a completed analysis. Conversely, nothing is written at all until the
//! cheap local checks (title present, bytes look like a PDF) have passed,
//! so a bad submission costs no storage traffic and no inference spend.
//!
//! The stage walk is strictly sequential and single-flight: each stage's
//! output is a precondition for the next, the orchestrator suspends at
//! every collaborator call, and two stages never run concurrently for the
//! same submission. Independent submissions share nothing through this
//! module.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::extract::extract_json;
use crate::inference::FeedbackProvider;
use crate::pipeline::input::resolve_input;
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::stage::Stage;
use crate::record::{Feedback, JobRecord};
use crate::store::{KeyValueStore, ObjectStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One user submission: the document plus its job context.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Display name of the uploaded file, e.g. `resume.pdf`.
    pub file_name: String,
    /// Raw document bytes.
    pub document: Vec<u8>,
    /// Mandatory job title.
    pub job_title: String,
    /// Optional company name.
    pub company_name: Option<String>,
    /// Optional free-text job description.
    pub job_description: Option<String>,
}

/// Job context without the document, for [`analyze_file`].
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    pub job_title: String,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
}

/// The external collaborators one run needs.
///
/// Field names follow the storage surface the pipeline sees: blob files,
/// a key-value store, and an inference endpoint. The rasteriser defaults
/// to pdfium via [`Collaborators::new`]; tests substitute a stub.
#[derive(Clone)]
pub struct Collaborators {
    pub files: Arc<dyn ObjectStore>,
    pub kv: Arc<dyn KeyValueStore>,
    pub ai: Arc<dyn FeedbackProvider>,
    pub raster: Arc<dyn PageRasterizer>,
}

impl Collaborators {
    /// Wire up collaborators with the default pdfium rasteriser.
    pub fn new(
        files: Arc<dyn ObjectStore>,
        kv: Arc<dyn KeyValueStore>,
        ai: Arc<dyn FeedbackProvider>,
    ) -> Self {
        Self {
            files,
            kv,
            ai,
            raster: Arc::new(PdfiumRasterizer),
        }
    }
}

/// A completed run: the final record plus wall-clock accounting.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// The persisted record, feedback attached.
    pub record: JobRecord,
    pub stats: AnalysisStats,
}

/// Wall-clock and token accounting for one run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStats {
    /// Both uploads combined, in milliseconds.
    pub upload_ms: u64,
    pub render_ms: u64,
    pub inference_ms: u64,
    pub total_ms: u64,
    /// Token counts as reported by the provider; zero when unreported.
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Analyse a résumé document and persist the resulting record.
///
/// This is the primary entry point for the library. The returned record
/// has already been written under `resume:<id>`; ownership of it passes to
/// the key-value store and the pipeline retains no further reference.
///
/// # Errors
/// Any stage failure aborts the run with a stage-tagged
/// [`AnalysisError`]. After the placeholder write has succeeded, the
/// pending record is left in place on failure — deliberately, so the
/// caller can retry without losing the uploads.
pub async fn analyze(
    submission: Submission,
    collab: &Collaborators,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalysisError> {
    let total_start = Instant::now();
    let mut stats = AnalysisStats::default();
    info!("starting analysis for job title '{}'", submission.job_title);

    // ── Local validation (no collaborator contact) ───────────────────────
    if submission.job_title.trim().is_empty() {
        return Err(fail(
            config,
            AnalysisError::Validation {
                detail: "job title must not be empty".into(),
            },
        ));
    }
    if !render::is_pdf(&submission.document) {
        let preview: Vec<u8> = submission.document.iter().copied().take(4).collect();
        return Err(fail(
            config,
            AnalysisError::UnsupportedFormat {
                detail: format!("first bytes {preview:?}"),
            },
        ));
    }

    // ── Upload the original document ─────────────────────────────────────
    let mut stage = Stage::Idle;
    enter(&mut stage, config)?;
    let upload_start = Instant::now();
    let original = collab
        .files
        .upload(&submission.document, &submission.file_name)
        .await
        .map_err(|e| {
            fail(config, AnalysisError::Upload {
                what: "resume",
                detail: e.to_string(),
            })
        })?;
    stats.upload_ms += upload_start.elapsed().as_millis() as u64;
    debug!("original stored at {}", original.path);

    // ── Rasterise page 1 ─────────────────────────────────────────────────
    enter(&mut stage, config)?;
    let render_start = Instant::now();
    let raster = collab
        .raster
        .rasterize(&submission.document, &submission.file_name, config.scale)
        .await
        .map_err(|e| fail(config, e.into()))?;
    stats.render_ms = render_start.elapsed().as_millis() as u64;
    debug!(
        "raster ready: {} ({}x{}, {} bytes)",
        raster.file_name,
        raster.width,
        raster.height,
        raster.bytes.len()
    );

    // ── Upload the raster image ──────────────────────────────────────────
    enter(&mut stage, config)?;
    let upload_start = Instant::now();
    let image = collab
        .files
        .upload(&raster.bytes, &raster.file_name)
        .await
        .map_err(|e| {
            fail(config, AnalysisError::Upload {
                what: "image",
                detail: e.to_string(),
            })
        })?;
    stats.upload_ms += upload_start.elapsed().as_millis() as u64;

    // ── Persist the pending record ───────────────────────────────────────
    // Must be durable before inference is invoked, so a partially-processed
    // job stays discoverable and labelled pending.
    enter(&mut stage, config)?;
    let mut record = JobRecord {
        id: Uuid::new_v4().to_string(),
        company_name: submission.company_name.clone(),
        job_title: submission.job_title.clone(),
        job_description: submission.job_description.clone(),
        resume_path: original.path,
        image_path: image.path.clone(),
        feedback: None,
    };
    persist(collab, &record, stage, config).await?;

    // ── Invoke inference ─────────────────────────────────────────────────
    enter(&mut stage, config)?;
    let instructions = crate::prompts::prepare_instructions(
        &submission.job_title,
        submission.company_name.as_deref(),
        submission.job_description.as_deref(),
    );
    let inference_start = Instant::now();
    let reply = collab
        .ai
        .infer(&image.path, &instructions)
        .await
        .map_err(|e| fail(config, AnalysisError::Inference { detail: e.to_string() }))?;
    stats.inference_ms = inference_start.elapsed().as_millis() as u64;
    stats.input_tokens = reply.input_tokens;
    stats.output_tokens = reply.output_tokens;
    if reply.text.trim().is_empty() {
        return Err(fail(
            config,
            AnalysisError::Inference {
                detail: "empty feedback response".into(),
            },
        ));
    }

    // ── Extract the structured feedback ──────────────────────────────────
    enter(&mut stage, config)?;
    let value = extract_json(&reply.text).ok_or_else(|| {
        fail(config, AnalysisError::Parse {
            detail: format!(
                "no JSON value found in the model reply ({} chars)",
                reply.text.len()
            ),
        })
    })?;
    let feedback: Feedback = serde_json::from_value(value).map_err(|e| {
        fail(config, AnalysisError::Parse {
            detail: format!("reply JSON does not match the feedback shape: {e}"),
        })
    })?;

    // ── Persist the final record ─────────────────────────────────────────
    enter(&mut stage, config)?;
    record.feedback = Some(feedback);
    persist(collab, &record, stage, config).await?;

    // ── Done ─────────────────────────────────────────────────────────────
    enter(&mut stage, config)?;
    stats.total_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "analysis complete: record {} in {}ms ({} output tokens)",
        record.id, stats.total_ms, stats.output_tokens
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_completed(&record.id);
    }

    Ok(AnalysisOutput { record, stats })
}

/// Resolve a local path or URL, then [`analyze`] it.
///
/// Convenience entry point for CLI-shaped callers; `timeout_secs` bounds
/// the download when `input` is a URL.
pub async fn analyze_file(
    input: &str,
    job: JobContext,
    collab: &Collaborators,
    config: &AnalysisConfig,
    timeout_secs: u64,
) -> Result<AnalysisOutput, AnalysisError> {
    let resolved = resolve_input(input, timeout_secs).await?;
    analyze(
        Submission {
            file_name: resolved.file_name,
            document: resolved.bytes,
            job_title: job.job_title,
            company_name: job.company_name,
            job_description: job.job_description,
        },
        collab,
        config,
    )
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Advance to the next stage, honouring abandonment.
///
/// Abandonment is checked here — before every transition — so a signalled
/// caller stops the walk at the next boundary, leaving whatever was
/// already written intact.
fn enter(stage: &mut Stage, config: &AnalysisConfig) -> Result<(), AnalysisError> {
    if config.is_abandoned() {
        info!("submission abandoned during {stage}");
        return Err(AnalysisError::Abandoned { stage: *stage });
    }
    // next() is None only for Completed, which is never entered from here
    // with a further transition pending.
    if let Some(next) = stage.next() {
        *stage = next;
        debug!("entering stage {stage}");
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_start(*stage, stage.status_label());
        }
    }
    Ok(())
}

/// Serialise and write the record under its key.
async fn persist(
    collab: &Collaborators,
    record: &JobRecord,
    stage: Stage,
    config: &AnalysisConfig,
) -> Result<(), AnalysisError> {
    let json = serde_json::to_string(record).map_err(|e| {
        fail(config, AnalysisError::Persistence {
            stage,
            detail: format!("record serialisation: {e}"),
        })
    })?;
    collab
        .kv
        .set(&record.storage_key(), &json)
        .await
        .map_err(|e| {
            fail(config, AnalysisError::Persistence {
                stage,
                detail: e.to_string(),
            })
        })
}

/// Emit the failure event and hand the error back for propagation.
fn fail(config: &AnalysisConfig, err: AnalysisError) -> AnalysisError {
    warn!("analysis failed: {err}");
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_failed(err.stage(), &err.to_string());
    }
    err
}
