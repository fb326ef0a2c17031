//! Cross-candidate consolidation
//!
//! A single structured bullet list often yields several fragmented idea
//! candidates that are really one proposal. When the owning section has
//! that shape, the fragments merge into one suggestion. Risks and project
//! updates are never merged; each must stay individually visible.

use std::collections::HashMap;

use serde::Serialize;

use crate::preprocess::Section;
use crate::rules;
use crate::suggest::{EvidenceSpan, Suggestion, SuggestionKind};

const MAX_MERGED_BULLETS: usize = 4;

/// Record of one merge, for the debug ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationRecord {
    pub survivor_key: String,
    pub absorbed_keys: Vec<String>,
}

/// Does this section have the single-structured-bullet-list shape that
/// makes fragment merging safe?
fn section_qualifies(section: &Section) -> bool {
    section.heading_level <= 3
        && section.features.list_item_count >= 3
        && !section.features.has_timeline_token()
}

/// Merge fragmented same-section idea candidates.
pub fn consolidate(
    suggestions: Vec<Suggestion>,
    sections: &HashMap<String, &Section>,
) -> (Vec<Suggestion>, Vec<ConsolidationRecord>) {
    // Count mergeable ideas per qualifying section first.
    let mut idea_counts: HashMap<String, usize> = HashMap::new();
    for suggestion in &suggestions {
        if suggestion.kind != SuggestionKind::Idea {
            continue;
        }
        let qualifies = sections
            .get(&suggestion.section_id)
            .map(|s| section_qualifies(s))
            .unwrap_or(false);
        if qualifies {
            *idea_counts.entry(suggestion.section_id.clone()).or_insert(0) += 1;
        }
    }

    let mut out: Vec<Suggestion> = Vec::new();
    let mut records: Vec<ConsolidationRecord> = Vec::new();
    let mut survivor_index: HashMap<String, usize> = HashMap::new();

    for suggestion in suggestions {
        let mergeable = suggestion.kind == SuggestionKind::Idea
            && idea_counts
                .get(suggestion.section_id.as_str())
                .map(|n| *n >= 2)
                .unwrap_or(false);
        if !mergeable {
            out.push(suggestion);
            continue;
        }

        match survivor_index.get(&suggestion.section_id).copied() {
            None => {
                survivor_index.insert(suggestion.section_id.clone(), out.len());
                records.push(ConsolidationRecord {
                    survivor_key: suggestion.suggestion_key.clone(),
                    absorbed_keys: Vec::new(),
                });
                out.push(suggestion);
            }
            Some(index) => {
                let survivor = &mut out[index];
                absorb(survivor, &suggestion);
                if let Some(record) = records
                    .iter_mut()
                    .find(|r| r.survivor_key == survivor.suggestion_key)
                {
                    record.absorbed_keys.push(suggestion.suggestion_key.clone());
                }
                log::debug!(
                    "event=candidates_merged survivor={} absorbed={}",
                    survivor.suggestion_key,
                    suggestion.suggestion_key
                );
            }
        }
    }

    // Retitle survivors that actually absorbed something.
    for record in &records {
        if record.absorbed_keys.is_empty() {
            continue;
        }
        if let Some(survivor) = out
            .iter_mut()
            .find(|s| s.suggestion_key == record.survivor_key)
        {
            if let Some(section) = sections.get(&survivor.section_id) {
                survivor.title = merged_title(section);
            }
        }
    }

    // Drop the no-op records so the ledger only shows real merges.
    records.retain(|r| !r.absorbed_keys.is_empty());

    (out, records)
}

/// Extend the survivor with one absorbed fragment.
fn absorb(survivor: &mut Suggestion, absorbed: &Suggestion) {
    let segments = survivor.body.split("; ").count();
    if segments < MAX_MERGED_BULLETS {
        let fragment = absorbed
            .body
            .split("; ")
            .next()
            .unwrap_or(absorbed.body.as_str());
        if !survivor.body.contains(fragment) {
            survivor.body = format!("{}; {}", survivor.body, fragment);
        }
    }

    for span in &absorbed.evidence {
        let duplicate = survivor
            .evidence
            .iter()
            .any(|s| s.start_line == span.start_line && s.text == span.text);
        if !duplicate {
            survivor
                .evidence
                .push(EvidenceSpan::single(span.start_line, span.text.clone()));
        }
    }
}

/// Title precedence for a merged suggestion: engagement-loop phrase, then
/// the section heading, then a generic fallback.
fn merged_title(section: &Section) -> String {
    if let Some(phrase) = rules::engagement_loop_phrase(&section.full_text()) {
        return capitalize(&phrase);
    }
    if let Some(heading) = section.heading_text.as_deref() {
        if !rules::is_generic_heading(heading) {
            return heading.to_string();
        }
    }
    "Proposed improvements".to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::{preprocess, RunContext};
    use crate::suggest::{CandidateOrigin, Routing, SuggestionPayload, SuggestionScores};

    fn fixture_section(raw: &str) -> Section {
        let mut ctx = RunContext::new("n1");
        preprocess("n1", raw, &mut ctx).sections.remove(0)
    }

    fn idea(section: &Section, id: &str, body: &str, line: usize) -> Suggestion {
        Suggestion {
            suggestion_id: format!("n1:{id}"),
            note_id: "n1".into(),
            section_id: section.section_id.clone(),
            kind: SuggestionKind::Idea,
            title: format!("idea {id}"),
            body: body.to_string(),
            payload: SuggestionPayload::DraftInitiative {
                title: format!("idea {id}"),
                description: body.to_string(),
            },
            evidence: vec![EvidenceSpan::single(line, body)],
            scores: SuggestionScores::default(),
            routing: Routing::CreateNew,
            suggestion_key: format!("key-{id}"),
            origin: CandidateOrigin::SemanticIdea,
            needs_clarification: false,
            clarification_reasons: Vec::new(),
            context: None,
        }
    }

    const BULLET_SECTION: &str =
        "## Engagement Ideas\n\n- add streak rewards for daily use\n- weekly leaderboard for teams\n- referral bonus for invites\n";

    #[test]
    fn test_fragmented_ideas_merge_into_one() {
        let section = fixture_section(BULLET_SECTION);
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), &section);

        let candidates = vec![
            idea(&section, "c1", "add streak rewards for daily use", 2),
            idea(&section, "c2", "weekly leaderboard for teams", 3),
            idea(&section, "c3", "referral bonus for invites", 4),
        ];
        let (merged, records) = consolidate(candidates, &map);
        assert_eq!(merged.len(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].absorbed_keys.len(), 2);
        let survivor = &merged[0];
        assert!(survivor.body.contains("streak rewards"));
        assert!(survivor.body.contains("leaderboard"));
        assert!(survivor.body.contains("referral bonus"));
        assert_eq!(survivor.evidence.len(), 3);
        assert_eq!(survivor.title, "Engagement Ideas");
    }

    #[test]
    fn test_engagement_loop_phrase_wins_title_precedence() {
        let section = fixture_section(
            "## Retention\n\n- tighten the engagement loop on day one\n- add streak rewards\n- weekly digest email\n",
        );
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), &section);

        let candidates = vec![
            idea(&section, "c1", "tighten the engagement loop on day one", 2),
            idea(&section, "c2", "add streak rewards", 3),
        ];
        let (merged, _) = consolidate(candidates, &map);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Engagement loop");
    }

    #[test]
    fn test_project_updates_and_risks_never_merge() {
        let section = fixture_section(BULLET_SECTION);
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), &section);

        let mut update = idea(&section, "c1", "launch plan", 2);
        update.kind = SuggestionKind::ProjectUpdate;
        let mut risk = idea(&section, "c2", "qa underwater", 3);
        risk.kind = SuggestionKind::Risk;
        let (merged, records) = consolidate(vec![update, risk], &map);
        assert_eq!(merged.len(), 2);
        assert!(records.is_empty());
    }

    #[test]
    fn test_timeline_sections_do_not_merge() {
        let section = fixture_section(
            "## Launch List\n\n- launch moved to Mar 14\n- add the pricing page\n- add the press kit\n",
        );
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), &section);

        let candidates = vec![
            idea(&section, "c1", "add the pricing page", 3),
            idea(&section, "c2", "add the press kit", 4),
        ];
        let (merged, records) = consolidate(candidates, &map);
        assert_eq!(merged.len(), 2);
        assert!(records.is_empty());
    }

    #[test]
    fn test_merged_body_caps_at_four_bullets() {
        let section = fixture_section(
            "## Engagement Ideas\n\n- one\n- two\n- three\n- four\n- five\n- six\n",
        );
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), &section);

        let candidates = (0..6)
            .map(|i| idea(&section, &format!("c{i}"), &format!("bullet number {i}"), 2 + i))
            .collect();
        let (merged, _) = consolidate(candidates, &map);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].body.split("; ").count(), MAX_MERGED_BULLETS);
    }
}
