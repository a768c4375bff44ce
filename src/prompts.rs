//! Prompts for VLM-based résumé analysis.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the scoring behaviour (e.g.
//!    adding a category or tightening the JSON discipline) requires editing
//!    exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered instructions
//!    and the response-format skeleton directly without a live model.
//!
//! The instruction text is rebuilt per submission by
//! [`prepare_instructions`], folding the job context into natural
//! language the way the reply extractor expects it to come back: one JSON
//! object, nothing else.

use std::fmt::Write as _;

/// System prompt establishing the reviewer role.
pub const FEEDBACK_SYSTEM_PROMPT: &str = r#"You are an expert in ATS (Applicant Tracking System) screening and resume review. You are shown a rendered image of the first page of a candidate's resume.

Follow these rules precisely:

1. SCORING
   - Rate the resume overall and per category on a 0-100 scale
   - Do not inflate scores; a weak resume must receive low scores
   - Be thorough and point out every mistake or area for improvement

2. CATEGORIES
   - ATS: machine readability, parseable headings, keyword coverage
   - toneAndStyle: professional tone, active voice, concision
   - content: impact, quantified achievements, accuracy
   - structure: layout, ordering, visual hierarchy
   - skills: relevant skills present and well placed
   - relevance: match against the job description — include this category
     only when a job description was provided

3. TIPS
   - Give 3-4 tips per category, each typed "good" or "improve"
   - Keep the "tip" field short; put detail in "explanation"
   - For "improve" tips, add an "example" with a flawed sample ("bad")
     and an improved rewrite ("better") when one fits

4. OUTPUT FORMAT
   - Return ONLY a JSON object matching the provided format
   - Do NOT wrap it in ``` fences
   - Do NOT add commentary before or after the JSON"#;

/// Skeleton of the expected reply, shown to the model verbatim.
///
/// Kept as a valid JSON instance (not a pseudo-schema) so tests can assert
/// it deserialises into [`crate::record::Feedback`] — if the data model
/// drifts, the prompt fails loudly in CI instead of quietly at inference
/// time.
pub const RESPONSE_FORMAT: &str = r#"{
  "overallScore": 72,
  "ATS": {
    "score": 70,
    "tips": [
      { "type": "good", "tip": "Standard section headings" },
      {
        "type": "improve",
        "tip": "Add role keywords",
        "explanation": "The posting's key terms are missing from the summary.",
        "example": {
          "bad": "Worked on various backend tasks",
          "better": "Built and operated Rust microservices on Kubernetes"
        }
      }
    ]
  },
  "toneAndStyle": { "score": 74, "tips": [] },
  "content": { "score": 68, "tips": [] },
  "structure": { "score": 80, "tips": [] },
  "skills": { "score": 71, "tips": [] },
  "relevance": { "score": 65, "tips": [] }
}"#;

/// Fold the job context into the user instruction text.
///
/// Only the job title is guaranteed present; company and description lines
/// are omitted entirely when absent rather than rendered as empty fields.
pub fn prepare_instructions(
    job_title: &str,
    company_name: Option<&str>,
    job_description: Option<&str>,
) -> String {
    let mut text = String::with_capacity(RESPONSE_FORMAT.len() + 512);
    text.push_str(
        "Analyze and rate this resume, and suggest how to improve it. \
         The rating can be low if the resume is bad.\n",
    );

    let _ = writeln!(text, "The job title is: {job_title}");
    if let Some(company) = company_name {
        let _ = writeln!(text, "The company is: {company}");
    }
    match job_description {
        Some(description) => {
            let _ = writeln!(
                text,
                "Take this job description into consideration and include the \
                 \"relevance\" category:\n{description}"
            );
        }
        None => {
            text.push_str(
                "No job description was provided; omit the \"relevance\" category.\n",
            );
        }
    }

    let _ = writeln!(
        text,
        "Provide the feedback using the following format:\n{RESPONSE_FORMAT}"
    );
    text.push_str("Return the analysis as a JSON object, without any other text and without the backticks.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Feedback;

    #[test]
    fn response_format_matches_the_data_model() {
        let feedback: Feedback =
            serde_json::from_str(RESPONSE_FORMAT).expect("format skeleton must deserialise");
        assert_eq!(feedback.overall_score, 72);
        assert!(feedback.relevance.is_some());
    }

    #[test]
    fn instructions_mention_the_job_title() {
        let text = prepare_instructions("Platform Engineer", None, None);
        assert!(text.contains("Platform Engineer"));
        assert!(text.contains("omit the \"relevance\" category"));
    }

    #[test]
    fn job_description_switches_relevance_on() {
        let text = prepare_instructions(
            "Data Engineer",
            Some("Initech"),
            Some("Builds pipelines in Rust."),
        );
        assert!(text.contains("Initech"));
        assert!(text.contains("Builds pipelines in Rust."));
        assert!(text.contains("include the \"relevance\" category"));
    }

    #[test]
    fn instructions_embed_the_response_format() {
        let text = prepare_instructions("QA", None, None);
        assert!(text.contains("overallScore"));
        assert!(text.contains("toneAndStyle"));
    }
}
