//! Keyword rules used when no trained model applies

use crate::models::Category;

/// Checked in order; the first rule with a matching keyword wins
const RULES: &[(&[&str], Category, f32)] = &[
    (&["invoice", "bill"], Category::Invoices, 0.6),
    (&["report", "summary"], Category::Reports, 0.6),
    (&["resume", "cv"], Category::Resumes, 0.7),
    (&["photo", "image"], Category::Photos, 0.5),
];

pub const NO_MATCH_CONFIDENCE: f32 = 0.4;

/// Case-insensitive substring match. Total over every input, including ""
pub fn rule_based(text: &str) -> (Category, f32) {
    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, category, confidence)| (*category, *confidence))
        .unwrap_or((Category::Others, NO_MATCH_CONFIDENCE))
}
