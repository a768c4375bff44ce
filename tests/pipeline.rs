//! End-to-end pipeline tests against in-memory collaborators.
//!
//! No pdfium library, network, or API key is required: the rasteriser is
//! replaced by a stub and the inference provider by a scripted double, so
//! these tests exercise exactly the orchestration contract — stage order,
//! what gets written when, and which failures leave which state behind.

use async_trait::async_trait;
use cvlens::store::memory::{MemoryKeyValueStore, MemoryObjectStore};
use cvlens::{
    analyze, AbandonHandle, AnalysisConfig, AnalysisProgressCallback, Collaborators, ErrorKind,
    FeedbackProvider, InferenceError, InferenceReply, JobRecord, PageRasterizer, RasterError,
    RasterImage, Stage, Submission, TipKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Rasteriser stub: applies the same format gate as the real one, then
/// returns a fixed tiny "image" instead of driving pdfium.
struct StubRasterizer;

#[async_trait]
impl PageRasterizer for StubRasterizer {
    async fn rasterize(
        &self,
        document: &[u8],
        file_name: &str,
        _scale: f32,
    ) -> Result<RasterImage, RasterError> {
        if !document.starts_with(b"%PDF") {
            return Err(RasterError::UnsupportedFormat {
                detail: "stub: not a PDF".into(),
            });
        }
        Ok(RasterImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png",
            file_name: file_name.replace(".pdf", ".png"),
            width: 1190,
            height: 1684,
        })
    }
}

/// What the scripted provider should do when called.
enum Script {
    Reply(&'static str),
    Fail(&'static str),
    Blank,
}

struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackProvider for ScriptedProvider {
    async fn infer(
        &self,
        _image_path: &str,
        _instructions: &str,
    ) -> Result<InferenceReply, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(text) => Ok(InferenceReply {
                text: text.to_string(),
                input_tokens: 900,
                output_tokens: 450,
            }),
            Script::Fail(detail) => Err(InferenceError::Api(detail.to_string())),
            Script::Blank => Ok(InferenceReply {
                text: "   ".into(),
                ..Default::default()
            }),
        }
    }
}

/// Records every status label the pipeline emits.
#[derive(Default)]
struct StatusLog {
    statuses: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl AnalysisProgressCallback for StatusLog {
    fn on_stage_start(&self, _stage: Stage, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn on_stage_failed(&self, _stage: Stage, error: &str) {
        self.failures.lock().unwrap().push(error.to_string());
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

const PDF_BYTES: &[u8] = b"%PDF-1.7 minimal fixture body";

const FEEDBACK_JSON: &str = r#"{
  "overallScore": 78,
  "ATS": {
    "score": 82,
    "tips": [
      { "type": "good", "tip": "Standard section headings" },
      {
        "type": "improve",
        "tip": "Add role keywords",
        "explanation": "Key terms from the posting are missing.",
        "example": {
          "bad": "Worked on various backend tasks",
          "better": "Built and operated Rust microservices"
        }
      }
    ]
  },
  "toneAndStyle": { "score": 70, "tips": [{ "type": "improve", "tip": "Use active verbs" }] },
  "content": { "score": 75, "tips": [] },
  "structure": { "score": 80, "tips": [] },
  "skills": { "score": 73, "tips": [] },
  "relevance": { "score": 64, "tips": [{ "type": "improve", "tip": "Mirror the posting's stack" }] }
}"#;

struct Harness {
    files: Arc<MemoryObjectStore>,
    kv: Arc<MemoryKeyValueStore>,
    ai: Arc<ScriptedProvider>,
    collab: Collaborators,
}

fn harness(script: Script) -> Harness {
    let files = Arc::new(MemoryObjectStore::new());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let ai = ScriptedProvider::new(script);
    let collab = Collaborators {
        files: files.clone(),
        kv: kv.clone(),
        ai: ai.clone(),
        raster: Arc::new(StubRasterizer),
    };
    Harness {
        files,
        kv,
        ai,
        collab,
    }
}

fn submission(job_title: &str, document: &[u8]) -> Submission {
    Submission {
        file_name: "resume.pdf".into(),
        document: document.to_vec(),
        job_title: job_title.into(),
        company_name: Some("Acme".into()),
        job_description: Some("Rust, Tokio, Postgres.".into()),
    }
}

async fn stored_record(h: &Harness, id: &str) -> JobRecord {
    use cvlens::KeyValueStore;
    let json = h
        .kv
        .get(&cvlens::record_key(id))
        .await
        .unwrap()
        .expect("record should be present");
    serde_json::from_str(&json).unwrap()
}

// ── Local validation (no collaborator contact) ───────────────────────────────

#[tokio::test]
async fn empty_title_fails_before_any_collaborator_call() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let err = analyze(submission("   ", PDF_BYTES), &h.collab, &AnalysisConfig::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.files.upload_count(), 0);
    assert_eq!(h.kv.write_count(), 0);
    assert_eq!(h.ai.call_count(), 0);
}

#[tokio::test]
async fn unsupported_document_fails_with_no_storage_or_inference_recorded() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let err = analyze(
        submission("Engineer", b"this is plain text, not a PDF"),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(h.files.upload_count(), 0);
    assert_eq!(h.kv.write_count(), 0);
    assert_eq!(h.ai.call_count(), 0);
}

#[tokio::test]
async fn empty_document_bytes_are_unsupported() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let err = analyze(
        submission("Engineer", b""),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(h.files.upload_count(), 0);
}

// ── Full success path ────────────────────────────────────────────────────────

#[tokio::test]
async fn success_path_with_fenced_reply_persists_matching_feedback() {
    // the provider wraps its JSON in fences and prose, as real models do
    let h = harness(Script::Reply(
        "Here is the analysis you requested:\n```json\n{\n  \"overallScore\": 78,\n  \"ATS\": {\n    \"score\": 82,\n    \"tips\": [\n      { \"type\": \"good\", \"tip\": \"Standard section headings\" }\n    ]\n  },\n  \"toneAndStyle\": { \"score\": 70, \"tips\": [] },\n  \"content\": { \"score\": 75, \"tips\": [] },\n  \"structure\": { \"score\": 80, \"tips\": [] },\n  \"skills\": { \"score\": 73, \"tips\": [] }\n}\n```\nGood luck!",
    ));

    let output = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap();

    let feedback = output.record.feedback.as_ref().expect("feedback attached");
    assert_eq!(feedback.overall_score, 78);
    assert_eq!(feedback.ats.score, 82);
    assert_eq!(feedback.ats.tips.len(), 1);
    assert_eq!(feedback.ats.tips[0].kind, TipKind::Good);
    assert!(feedback.relevance.is_none());

    // two uploads (original + raster), two writes (placeholder + final)
    assert_eq!(h.files.upload_count(), 2);
    assert_eq!(h.kv.write_count(), 2);
    assert_eq!(h.ai.call_count(), 1);

    // the persisted record equals the returned one, feedback included
    let stored = stored_record(&h, &output.record.id).await;
    assert_eq!(stored, output.record);
    assert!(!stored.is_pending());
}

#[tokio::test]
async fn record_paths_point_at_uploaded_objects() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let output = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        h.files.get(&output.record.resume_path).as_deref(),
        Some(PDF_BYTES)
    );
    let image = h.files.get(&output.record.image_path).expect("raster stored");
    assert!(image.starts_with(&[0x89, b'P', b'N', b'G']));
    assert!(output.record.image_path.ends_with("resume.png"));
}

#[tokio::test]
async fn success_path_reports_stats_and_statuses_in_order() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let log = Arc::new(StatusLog::default());
    let config = AnalysisConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();

    let output = analyze(submission("Engineer", PDF_BYTES), &h.collab, &config)
        .await
        .unwrap();

    assert_eq!(output.stats.input_tokens, 900);
    assert_eq!(output.stats.output_tokens, 450);

    let statuses = log.statuses.lock().unwrap().clone();
    assert_eq!(
        statuses,
        vec![
            "Uploading resume…",
            "Converting PDF to image…",
            "Uploading image…",
            "Preparing data…",
            "Analyzing resume…",
            "Reading feedback…",
            "Saving feedback…",
            "Analysis complete",
        ]
    );
    assert!(log.failures.lock().unwrap().is_empty());
}

// ── Failures after the placeholder write ─────────────────────────────────────

#[tokio::test]
async fn inference_failure_leaves_a_pending_record_behind() {
    let h = harness(Script::Fail("HTTP 500 from provider"));
    let err = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Inference);
    assert!(err.to_string().contains("HTTP 500"));

    // the placeholder write happened; the final one did not
    assert_eq!(h.kv.write_count(), 1);
    assert_eq!(h.kv.len(), 1);
    assert_eq!(h.files.upload_count(), 2);
}

#[tokio::test]
async fn blank_reply_is_an_inference_error() {
    let h = harness(Script::Blank);
    let err = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Inference);
    assert_eq!(h.kv.write_count(), 1);
}

#[tokio::test]
async fn unparseable_reply_is_a_parse_error_and_keeps_the_placeholder() {
    let h = harness(Script::Reply(
        "I'm sorry, I cannot analyze this image in the requested format.",
    ));
    let err = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(h.kv.write_count(), 1);
    assert_eq!(h.files.upload_count(), 2);
}

#[tokio::test]
async fn structurally_valid_but_incomplete_feedback_is_a_parse_error() {
    // well-formed JSON missing required categories
    let h = harness(Script::Reply(r#"{"overallScore": 50}"#));
    let err = analyze(
        submission("Engineer", PDF_BYTES),
        &h.collab,
        &AnalysisConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(h.kv.write_count(), 1);
}

// ── Abandonment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pre_abandoned_submission_issues_no_calls() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let handle = AbandonHandle::new();
    handle.abandon();
    let config = AnalysisConfig::builder()
        .abandon_handle(handle)
        .build()
        .unwrap();

    let err = analyze(submission("Engineer", PDF_BYTES), &h.collab, &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Abandoned);
    assert_eq!(h.files.upload_count(), 0);
    assert_eq!(h.kv.write_count(), 0);
    assert_eq!(h.ai.call_count(), 0);
}

/// Abandons the run as soon as the raster upload stage starts.
struct AbandonDuringRasterUpload {
    handle: AbandonHandle,
}

impl AnalysisProgressCallback for AbandonDuringRasterUpload {
    fn on_stage_start(&self, stage: Stage, _status: &str) {
        if stage == Stage::UploadingRaster {
            self.handle.abandon();
        }
    }
}

#[tokio::test]
async fn mid_run_abandonment_stops_transitions_but_keeps_written_state() {
    let h = harness(Script::Reply(FEEDBACK_JSON));
    let handle = AbandonHandle::new();
    let config = AnalysisConfig::builder()
        .abandon_handle(handle.clone())
        .progress_callback(Arc::new(AbandonDuringRasterUpload { handle }))
        .build()
        .unwrap();

    let err = analyze(submission("Engineer", PDF_BYTES), &h.collab, &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Abandoned);
    // the in-flight stage ran to completion; nothing after it started
    assert_eq!(h.files.upload_count(), 2);
    assert_eq!(h.kv.write_count(), 0);
    assert_eq!(h.ai.call_count(), 0);
}
