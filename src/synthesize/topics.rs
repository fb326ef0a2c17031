//! Topic isolation and dense-paragraph splitting
//!
//! Mixed-topic sections are split into per-topic sub-sections before
//! synthesis so each topic gets isolated evidence. Dense paragraphs with no
//! structure are split into sentences, and each sentence is typed on its
//! own — inheriting the parent section's type is how cross-topic
//! contamination starts.

use once_cell::sync::Lazy;

use super::signals::SignalScanner;
use crate::preprocess::{Line, LineType, Section};
use crate::rules;
use crate::suggest::SuggestionKind;
use crate::util;

static SENTENCE_SCANNER: Lazy<SignalScanner> = Lazy::new(SignalScanner::new);

/// Heuristic for sections that cover several topics under one heading.
pub fn is_mixed_topic(section: &Section) -> bool {
    let generic = section
        .heading_text
        .as_deref()
        .map(rules::is_generic_heading)
        .unwrap_or(false);
    let bulky = section.features.list_item_count >= 5 || section.features.char_count >= 500;
    (generic || bulky) && section.features.topic_anchor_count >= 2
}

/// Split a mixed-topic section at its topic-anchor lines. Lines before the
/// first anchor stay under the parent heading as their own sub-section.
pub fn split_topics(section: &Section) -> Vec<Section> {
    let mut groups: Vec<(Option<String>, Vec<Line>)> = Vec::new();
    let mut current: (Option<String>, Vec<Line>) = (None, Vec::new());

    for line in &section.body_lines {
        if !line.is_blank() && rules::is_topic_anchor(&line.text) {
            if !current.1.iter().all(|l| l.is_blank()) {
                groups.push(std::mem::take(&mut current));
            } else {
                current.1.clear();
            }
            let anchor = line.text.trim();
            let topic = anchor.split(':').next().unwrap_or(anchor).trim().to_string();
            current = (Some(topic), vec![line.clone()]);
        } else {
            current.1.push(line.clone());
        }
    }
    if !current.1.iter().all(|l| l.is_blank()) {
        groups.push(current);
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, (topic, lines))| section.derive_sub(&format!(".t{}", i + 1), lines, topic))
        .collect()
}

/// Dense paragraphs: no bullets, no topic anchors, and either one long line
/// or enough accumulated prose to hide several distinct points.
pub fn is_dense_paragraph(section: &Section) -> bool {
    if section.features.list_item_count > 0 || section.features.topic_anchor_count > 0 {
        return false;
    }
    let prose_lines: Vec<&Line> = section
        .body_lines
        .iter()
        .filter(|l| l.line_type == LineType::Paragraph)
        .collect();
    if prose_lines.is_empty() {
        return false;
    }
    let single_long = prose_lines.len() == 1 && prose_lines[0].text.chars().count() >= 200;
    single_long || section.features.char_count >= 250
}

/// A sentence pulled out of a dense paragraph, with its source line.
#[derive(Debug, Clone)]
pub struct DenseSentence {
    pub line_index: usize,
    pub text: String,
}

/// Split a dense section into sentences, keeping each sentence tied to the
/// line it came from so evidence spans stay precise.
pub fn split_dense(section: &Section) -> Vec<DenseSentence> {
    let mut out = Vec::new();
    for line in section.content_lines() {
        if line.line_type != LineType::Paragraph {
            continue;
        }
        for sentence in util::split_sentences(&line.text) {
            out.push(DenseSentence {
                line_index: line.index,
                text: sentence,
            });
        }
    }
    out
}

/// Type a single sentence from its own content only.
///
/// Returns `None` for sentences with no extraction-worthy signal; those
/// never become candidates.
pub fn classify_sentence(sentence: &str) -> Option<(SuggestionKind, f64)> {
    if rules::has_schedule_delta(sentence)
        || (rules::has_launch_keyword(sentence)
            && (rules::has_date(sentence) || rules::has_duration(sentence)))
    {
        return Some((SuggestionKind::ProjectUpdate, 0.80));
    }

    let probe = probe_section(sentence);
    if let Some(hit) = SENTENCE_SCANNER.scan(&probe).into_iter().next() {
        return Some((hit.kind.suggestion_kind(), hit.confidence));
    }

    if rules::has_explicit_ask(sentence) {
        return Some((SuggestionKind::Idea, 0.75));
    }
    if rules::starts_with_work_verb(sentence) {
        return Some((SuggestionKind::Idea, 0.70));
    }

    None
}

/// Wrap a lone sentence in a throwaway section so the signal scanner can
/// run against it with its normal interface.
fn probe_section(sentence: &str) -> Section {
    let line = Line {
        index: 0,
        text: sentence.to_string(),
        line_type: LineType::Paragraph,
        indent_level: 0,
    };
    Section {
        section_id: "probe".to_string(),
        note_id: "probe".to_string(),
        heading_text: None,
        heading_level: 0,
        start_line: 0,
        end_line: 0,
        body_lines: vec![line],
        features: Default::default(),
        raw_text: sentence.to_string(),
        parent_id: None,
    }
}
