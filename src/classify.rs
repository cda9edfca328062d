//! Keyword classification of caller speech.
//!
//! Deliberately simple: case-insensitive substring containment, first match
//! wins, no stemming and no negation handling ("not urgent" still matches
//! "urgent"). The intake dialogue does not need more than this.

use crate::store::{Category, Urgency};

/// Placeholder values the network substitutes when caller ID is suppressed.
const HIDDEN_MARKERS: &[&str] = &["anonymous", "unknown", "private", "blocked"];

const PERSONAL_KEYWORDS: &[&str] = &["personal", "private"];
const WORK_KEYWORDS: &[&str] = &["work", "business", "job"];

const IMMEDIATE_KEYWORDS: &[&str] = &[
    "right now",
    "immediately",
    "urgent",
    "asap",
    "as soon as possible",
    "can't wait",
    "cannot wait",
    "emergency",
];

/// True if the caller's number is absent or replaced by a suppression marker.
pub fn is_hidden_number(from: &str) -> bool {
    let f = from.trim().to_lowercase();
    f.is_empty() || HIDDEN_MARKERS.iter().any(|m| f.contains(m))
}

/// Classify a caller's answer to "work or personal?".
///
/// Unclear or empty answers default to Work: ambiguous intake goes to the
/// business-relevant category.
pub fn classify_category(utterance: &str) -> Category {
    let u = utterance.to_lowercase();
    if PERSONAL_KEYWORDS.iter().any(|k| u.contains(k)) {
        return Category::Personal;
    }
    if WORK_KEYWORDS.iter().any(|k| u.contains(k)) {
        return Category::Work;
    }
    Category::Work
}

/// Classify a caller's answer to "does this need immediate attention?".
///
/// Silence is never urgent: empty or unmatched answers are CanWait.
pub fn classify_urgency(utterance: &str) -> Urgency {
    let u = utterance.to_lowercase();
    if IMMEDIATE_KEYWORDS.iter().any(|k| u.contains(k)) {
        return Urgency::Immediate;
    }
    Urgency::CanWait
}
