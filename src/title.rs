//! Title normalization
//!
//! The final deterministic rewrite of every emitted suggestion's title:
//! weak-prefix stripping, imperative mood, the kind prefix, delta
//! enrichment for vague project updates, and the 80-character cap at a word
//! boundary. Running the normalizer on an already-normalized title is a
//! no-op; the pipeline relies on that.

use crate::config::PipelineConfig;
use crate::rules;
use crate::suggest::{CandidateOrigin, Suggestion};
use crate::util;

pub const TITLE_MAX_CHARS: usize = 80;

/// Normalize one suggestion's title in place and refresh its content key.
pub fn normalize(suggestion: &mut Suggestion, config: &PipelineConfig) {
    let prefix = match suggestion.origin {
        CandidateOrigin::ActionItems => "Action items",
        _ => suggestion.kind.label(),
    };

    let mut base = strip_known_prefix(&suggestion.title, prefix);
    base = strip_weak_prefixes(&base);
    base = apply_imperative_stem(&base);
    base = capitalize(&base);
    if base.is_empty() {
        base = capitalize(&util::normalize_words(&suggestion.body));
    }

    // Vague project-update titles get a concrete delta token from the
    // evidence. Vague means short: long titles carried their specifics in.
    if suggestion.kind == crate::suggest::SuggestionKind::ProjectUpdate
        && is_vague(&base, config)
        && rules::extract_delta_token(&base).is_none()
    {
        if let Some(delta) = delta_from_evidence(suggestion) {
            let enriched = format!("{} ({})", base, delta);
            if prefix.chars().count() + 2 + enriched.chars().count() <= TITLE_MAX_CHARS {
                base = enriched;
            }
        }
    }

    let full = format!("{}: {}", prefix, base);
    suggestion.title = util::truncate_at_word(&full, TITLE_MAX_CHARS);
    suggestion.refresh_key();
}

fn strip_known_prefix(title: &str, prefix: &str) -> String {
    let with_colon = format!("{}: ", prefix);
    if let Some(rest) = title.strip_prefix(&with_colon) {
        return rest.to_string();
    }
    // A previously-normalized title of a different kind still sheds its
    // old label rather than stacking a second one.
    for label in ["Update", "Idea", "Risk", "Bug", "Action items"] {
        if let Some(rest) = title.strip_prefix(&format!("{}: ", label)) {
            return rest.to_string();
        }
    }
    title.to_string()
}

fn strip_weak_prefixes(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let lower = current.to_lowercase();
        let mut stripped = false;
        for weak in rules::WEAK_TITLE_PREFIXES {
            if !lower.starts_with(weak) {
                continue;
            }
            // Whole-word match only: "perhaps" must not eat "Perhapsification".
            let at_boundary = lower[weak.len()..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true);
            if !at_boundary {
                continue;
            }
            let rest = current[weak.len()..].trim_start_matches([',', ' ']).to_string();
            if !rest.is_empty() {
                current = rest;
                stripped = true;
            }
            break;
        }
        if !stripped {
            return current;
        }
    }
}

fn apply_imperative_stem(title: &str) -> String {
    let mut words = title.splitn(2, ' ');
    let first = words.next().unwrap_or("");
    let rest = words.next();
    match (rules::imperative_stem(first), rest) {
        (Some(stem), Some(rest)) => format!("{} {}", stem, rest),
        (Some(stem), None) => stem.to_string(),
        (None, _) => title.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Specificity gate: word count scaled against the configured floor.
fn is_vague(title: &str, config: &PipelineConfig) -> bool {
    let words = title.split_whitespace().count();
    let specificity = (words as f64 / 12.0).min(1.0);
    specificity < config.t_generic
}

fn delta_from_evidence(suggestion: &Suggestion) -> Option<String> {
    for line in suggestion.evidence_lines() {
        if let Some(delta) = rules::extract_delta_token(line) {
            return Some(delta);
        }
    }
    None
}
