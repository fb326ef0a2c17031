//! Semantic idea extraction and the structural bypass
//!
//! Two gate-independent strategies for conceptual content. Semantic
//! extraction keys off strategy/mechanism vocabulary; the structural bypass
//! is the last resort for well-structured sections nothing else touched.

use crate::classify::strip_list_marker;
use crate::preprocess::{LineType, Section};
use crate::rules;
use crate::util;

/// The sentence a semantic idea candidate should ground itself in.
#[derive(Debug, Clone)]
pub struct SemanticSeed {
    pub line_index: usize,
    pub sentence: String,
    pub vocab_hits: usize,
}

/// Find the best idea seed in a section with enough strategy vocabulary.
///
/// Requires at least two distinct vocabulary tokens across the section;
/// the seed is the sentence with the most tokens (earliest wins ties).
pub fn semantic_seed(section: &Section) -> Option<SemanticSeed> {
    if rules::strategy_vocab_hits(&section.full_text()) < 2 {
        return None;
    }

    let mut best: Option<SemanticSeed> = None;
    for line in section.content_lines() {
        if line.line_type == LineType::Code {
            continue;
        }
        for sentence in util::split_sentences(strip_list_marker(&line.text)) {
            let hits = rules::strategy_vocab_hits(&sentence);
            if hits == 0 {
                continue;
            }
            let better = match &best {
                Some(current) => hits > current.vocab_hits,
                None => true,
            };
            if better {
                best = Some(SemanticSeed {
                    line_index: line.index,
                    sentence,
                    vocab_hits: hits,
                });
            }
        }
    }
    best
}

/// Is this section eligible for the structural bypass? Conceptual shape,
/// real structure, no schedule content, and a heading worth keeping.
pub fn eligible_for_bypass(section: &Section) -> bool {
    let heading = match section.heading_text.as_deref() {
        Some(h) => h,
        None => return false,
    };
    section.heading_level <= 3
        && section.features.list_item_count >= 3
        && !section.features.has_timeline_token()
        && !rules::is_generic_heading(heading)
        && !rules::is_process_noise_heading(heading)
        && section.features.char_count >= 150
}

/// First 2–4 bullets of a bypass-eligible section, for the single emitted
/// idea candidate.
pub fn bypass_bullets(section: &Section) -> Vec<(usize, String)> {
    section
        .content_lines()
        .filter(|l| l.line_type == LineType::ListItem)
        .take(4)
        .map(|l| (l.index, strip_list_marker(&l.text).to_string()))
        .collect()
}
