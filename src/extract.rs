//! Lenient extraction of a JSON value from free-form model replies.
//!
//! ## Why is leniency necessary?
//!
//! Even well-prompted models occasionally wrap their JSON in prose
//! ("Here is the analysis: …"), fence it as a ` ```json ` block despite the
//! prompt saying not to, or emit a trailing comma before a closing bracket.
//! All of these are cheap to recover from, and recovering beats failing the
//! whole submission after the inference cost is already paid.
//!
//! [`extract_json`] applies a fixed sequence of attempts and returns the
//! first that yields a well-formed value — or `None`. It never returns a
//! syntactically invalid structure and never panics past its boundary:
//! absence is a recoverable condition for the caller, not a defect.
//!
//! The bracket scan is an explicit three-state automaton
//! (normal / in-string / in-string-escaped) rather than nested
//! conditionals, so the quoting edge cases stay auditable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Recover the best-effort JSON value embedded in `raw`.
///
/// Ordered attempts, first success wins:
///
/// 1. trim whitespace and strip a surrounding code fence (when both the
///    opening and closing markers are present)
/// 2. parse the whole text directly
/// 3. scan for the first balanced top-level `{…}` or `[…]` candidate,
///    honouring quoted strings and escapes, and parse that
/// 4. remove trailing commas before closing brackets and retry both the
///    direct parse and the candidate scan on the repaired text
///
/// Returns `None` when every attempt fails.
pub fn extract_json(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    let stripped = strip_fences(raw.trim());

    // Quick direct parse
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Some(value);
    }

    // First balanced top-level container
    if let Some(value) = parse_first_candidate(stripped) {
        return Some(value);
    }

    // Last resort: trailing-comma repair, then the same two attempts.
    // The repair is a no-op on text without trailing commas, so it can
    // only rescue a parse, never change one that already succeeded.
    let repaired = strip_trailing_commas(stripped);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return Some(value);
    }
    parse_first_candidate(&repaired)
}

/// Attempt step 3: parse the first balanced top-level container.
///
/// First candidate only — when it fails to parse, the attempt is aborted
/// rather than scanning on, since a second "candidate" would just be a
/// fragment of surrounding prose.
fn parse_first_candidate(text: &str) -> Option<Value> {
    let candidate = first_balanced_container(text)?;
    serde_json::from_str::<Value>(candidate).ok()
}

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```[a-z]*\s*").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());
static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\]}])").unwrap());

/// Strip a surrounding code fence, optionally naming a format
/// (` ```json `), when both markers are present.
fn strip_fences(text: &str) -> &str {
    let Some(open) = RE_FENCE_OPEN.find(text) else {
        return text;
    };
    let rest = &text[open.end()..];
    match RE_FENCE_CLOSE.find(rest) {
        Some(close) => &rest[..close.start()],
        None => text,
    }
}

/// Remove commas that directly precede a closing bracket.
///
/// A no-op on text without trailing commas, so applying it never changes a
/// parse that would already have succeeded.
fn strip_trailing_commas(text: &str) -> String {
    RE_TRAILING_COMMA.replace_all(text, "$1").to_string()
}

/// String-tracking state for the bracket scan.
enum ScanState {
    /// Outside any string literal.
    Normal,
    /// Inside a string opened by `quote` (`"` or `'`).
    InString { quote: char },
    /// Inside a string, immediately after a backslash.
    Escaped { quote: char },
}

/// Locate the first balanced top-level `{…}` or `[…]` substring.
///
/// Depth is tracked for the opener type actually found; container
/// characters inside string literals are ignored, and an escaped quote
/// does not terminate its string. Returns the candidate including both
/// bracket characters, or `None` when no opener exists or the text ends
/// before the container closes.
fn first_balanced_container(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let opener = text[start..].chars().next()?;
    let closer = match opener {
        '{' => '}',
        _ => ']',
    };

    let mut state = ScanState::Normal;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match state {
            ScanState::Escaped { quote } => {
                state = ScanState::InString { quote };
            }
            ScanState::InString { quote } => {
                if ch == '\\' {
                    state = ScanState::Escaped { quote };
                } else if ch == quote {
                    state = ScanState::Normal;
                }
            }
            ScanState::Normal => {
                if ch == '"' || ch == '\'' {
                    state = ScanState::InString { quote: ch };
                } else if ch == opener {
                    depth += 1;
                } else if ch == closer {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..start + offset + ch.len_utf8()]);
                    }
                }
            }
        }
    }

    None
}
