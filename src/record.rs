//! The persisted data model: Job Record, Feedback, and Tips.
//!
//! The wire shape is the only durable format the core defines: a Job Record
//! serialised as camelCase JSON under the key `resume:<id>`. It must
//! round-trip losslessly through serialise → deserialise, which the tests
//! below pin down for both the pending and the completed form.
//!
//! A record is **pending** while `feedback` is `null` — written right after
//! both uploads succeed, before any inference cost is incurred — and
//! **completed** once the feedback object is attached. The same key is
//! overwritten in place; nothing here ever deletes a record.

use serde::{Deserialize, Serialize};

/// One analysis run: job context, storage locators, and eventual feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Opaque unique identifier, generated client-side. Immutable.
    pub id: String,

    /// Company the job belongs to, if the user supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    /// Title of the job the résumé targets. The only mandatory context field.
    pub job_title: String,

    /// Free-text job description, if the user supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,

    /// Storage locator of the uploaded original document. Assigned once by
    /// the object store, immutable thereafter.
    pub resume_path: String,

    /// Storage locator of the derived page-1 raster image.
    pub image_path: String,

    /// `None` while the analysis is pending; populated exactly once.
    pub feedback: Option<Feedback>,
}

impl JobRecord {
    /// The key this record is persisted under.
    pub fn storage_key(&self) -> String {
        record_key(&self.id)
    }

    /// True while no feedback has been attached yet.
    ///
    /// A pending record is a valid, queryable state — it must never be
    /// presented as a completed analysis.
    pub fn is_pending(&self) -> bool {
        self.feedback.is_none()
    }
}

/// Build the key-value store key for a record id.
pub fn record_key(id: &str) -> String {
    format!("resume:{id}")
}

/// The structured result of an analysis: one overall score plus a fixed set
/// of scored categories, each with ordered tips.
///
/// Treated as immutable once attached to a [`JobRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Overall score, 0–100.
    pub overall_score: u8,

    /// Applicant-Tracking-System compatibility.
    #[serde(rename = "ATS")]
    pub ats: CategoryFeedback,

    /// Tone and writing style.
    pub tone_and_style: CategoryFeedback,

    /// Content quality and impact.
    pub content: CategoryFeedback,

    /// Document structure and layout.
    pub structure: CategoryFeedback,

    /// Skills coverage.
    pub skills: CategoryFeedback,

    /// Match against the supplied job description. Absent when the model
    /// had no job description to compare against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<CategoryFeedback>,
}

/// A scored category with its ordered tips.
///
/// Tip order is insertion order; it carries no weight beyond display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFeedback {
    /// Category score, 0–100.
    pub score: u8,
    /// Feedback items, best shown in the order the model produced them.
    pub tips: Vec<Tip>,
}

/// A single piece of feedback within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    /// Whether this praises something or asks for an improvement.
    #[serde(rename = "type")]
    pub kind: TipKind,

    /// Short label, always present.
    pub tip: String,

    /// Longer free-text explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// A flawed/improved sample pair. Only meaningful for
    /// [`TipKind::Improve`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<TipExample>,
}

/// Positive or improvement-oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

/// A before/after sample attached to an improvement tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipExample {
    /// The flawed sample as it appears on the résumé.
    pub bad: String,
    /// The improved rewrite.
    pub better: String,
}
