//! Confidence scoring and thresholding
//!
//! Combines the stage scores into one bounded confidence, applies the
//! clarification downgrade for sub-threshold candidates, enforces the
//! suggestion cap, and orders the surviving set. Plan mutations are never
//! dropped here: at worst they go out flagged for clarification.

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::suggest::{DropReason, DropRecord, DropStage, Suggestion, SuggestionKind};

// Weighted combination of the stage scores. Monotonic in each input and
// bounded to [0, 1] as long as the weights sum to 1.
const W_SECTION: f64 = 0.40;
const W_KIND: f64 = 0.25;
const W_SYNTHESIS: f64 = 0.35;

/// Compute the overall confidence for one candidate.
pub fn overall_score(suggestion: &Suggestion) -> f64 {
    let s = &suggestion.scores;
    (s.section_actionability * W_SECTION
        + s.kind_confidence * W_KIND
        + s.synthesis_confidence * W_SYNTHESIS)
        .clamp(0.0, 1.0)
}

/// Scoring output: the kept (re-ordered) suggestions plus cap drops.
#[derive(Debug)]
pub struct ScoringOutcome {
    pub suggestions: Vec<Suggestion>,
    pub drops: Vec<DropRecord>,
}

/// Reasons recorded on clarification-flagged suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationReason {
    OverallBelowThreshold,
    SectionBelowThreshold,
}

impl ClarificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClarificationReason::OverallBelowThreshold => "overall_below_threshold",
            ClarificationReason::SectionBelowThreshold => "section_below_threshold",
        }
    }
}

/// Score, threshold, cap, and rank the candidate set.
pub fn score_and_threshold(
    mut candidates: Vec<Suggestion>,
    config: &PipelineConfig,
) -> ScoringOutcome {
    for candidate in &mut candidates {
        candidate.scores.overall = overall_score(candidate);

        // Sub-threshold candidates are downgraded, not dropped; a project
        // update in particular must always reach the user.
        let mut reasons = Vec::new();
        if candidate.scores.overall < config.t_overall_min {
            reasons.push(ClarificationReason::OverallBelowThreshold);
        }
        if candidate.scores.section_actionability < config.t_section_min {
            reasons.push(ClarificationReason::SectionBelowThreshold);
        }
        if !reasons.is_empty() {
            candidate.needs_clarification = true;
            for reason in reasons {
                let tag = reason.as_str().to_string();
                if !candidate.clarification_reasons.contains(&tag) {
                    candidate.clarification_reasons.push(tag);
                }
            }
            log::debug!(
                "event=candidate_downgraded key={} overall={:.2}",
                candidate.suggestion_key,
                candidate.scores.overall
            );
        }
    }

    let drops = enforce_cap(&mut candidates, config);
    rank(&mut candidates);

    ScoringOutcome {
        suggestions: candidates,
        drops,
    }
}

/// The cap only ever trims idea-kind candidates, lowest score first.
/// Project updates are exempt; so are risks and bugs.
fn enforce_cap(candidates: &mut Vec<Suggestion>, config: &PipelineConfig) -> Vec<DropRecord> {
    let mut drops = Vec::new();
    if candidates.len() <= config.max_suggestions {
        return drops;
    }

    let mut idea_keys: Vec<(f64, String)> = candidates
        .iter()
        .filter(|c| c.kind == SuggestionKind::Idea)
        .map(|c| (c.scores.overall, c.suggestion_key.clone()))
        .collect();
    // Ascending score; key order breaks ties so trimming is deterministic.
    idea_keys.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut excess = candidates.len() - config.max_suggestions;
    for (_, key) in idea_keys {
        if excess == 0 {
            break;
        }
        if let Some(pos) = candidates.iter().position(|c| c.suggestion_key == key) {
            let dropped = candidates.remove(pos);
            log::warn!(
                "event=candidate_dropped stage=scoring key={} reason=suggestion_cap",
                dropped.suggestion_key
            );
            drops.push(DropRecord::new(
                &dropped,
                DropStage::Scoring,
                DropReason::SuggestionCap,
                None,
            ));
            excess -= 1;
        }
    }

    drops
}

fn kind_weight(kind: SuggestionKind) -> i64 {
    match kind {
        SuggestionKind::ProjectUpdate => 40,
        SuggestionKind::Bug => 30,
        SuggestionKind::Risk => 20,
        SuggestionKind::Idea => 10,
    }
}

/// Rank: score first, then kind weight, then document order.
fn rank(candidates: &mut [Suggestion]) {
    candidates.sort_by(|a, b| {
        let score = b
            .scores
            .overall
            .partial_cmp(&a.scores.overall)
            .unwrap_or(std::cmp::Ordering::Equal);
        if score != std::cmp::Ordering::Equal {
            return score;
        }

        let kw = kind_weight(b.kind).cmp(&kind_weight(a.kind));
        if kw != std::cmp::Ordering::Equal {
            return kw;
        }

        a.suggestion_id.cmp(&b.suggestion_id)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::{
        CandidateOrigin, EvidenceSpan, Routing, SuggestionPayload, SuggestionScores,
    };

    fn candidate(id: &str, kind: SuggestionKind, synthesis: f64) -> Suggestion {
        Suggestion {
            suggestion_id: format!("n1:{id}"),
            note_id: "n1".into(),
            section_id: "n1:s1".into(),
            kind,
            title: format!("title {id}"),
            body: "body".into(),
            payload: SuggestionPayload::AfterDescription("body".into()),
            evidence: vec![EvidenceSpan::single(1, "some evidence line")],
            scores: SuggestionScores {
                section_actionability: 0.8,
                kind_confidence: 0.7,
                synthesis_confidence: synthesis,
                overall: 0.0,
            },
            routing: Routing::CreateNew,
            suggestion_key: format!("key-{id}"),
            origin: CandidateOrigin::Canonical,
            needs_clarification: false,
            clarification_reasons: Vec::new(),
            context: None,
        }
    }

    #[test]
    fn test_overall_score_is_bounded_and_monotonic() {
        let low = candidate("a", SuggestionKind::Idea, 0.2);
        let high = candidate("b", SuggestionKind::Idea, 0.9);
        let low_score = overall_score(&low);
        let high_score = overall_score(&high);
        assert!(low_score < high_score);
        assert!((0.0..=1.0).contains(&low_score));
        assert!((0.0..=1.0).contains(&high_score));
    }

    #[test]
    fn test_low_confidence_downgrades_instead_of_dropping() {
        let mut weak = candidate("a", SuggestionKind::ProjectUpdate, 0.1);
        weak.scores.section_actionability = 0.1;
        weak.scores.kind_confidence = 0.1;
        let outcome = score_and_threshold(vec![weak], &PipelineConfig::default());
        assert_eq!(outcome.suggestions.len(), 1);
        assert!(outcome.drops.is_empty());
        let kept = &outcome.suggestions[0];
        assert!(kept.needs_clarification);
        assert!(kept
            .clarification_reasons
            .contains(&"overall_below_threshold".to_string()));
        assert!(kept
            .clarification_reasons
            .contains(&"section_below_threshold".to_string()));
    }

    #[test]
    fn test_cap_trims_only_ideas_ascending() {
        let config = PipelineConfig {
            max_suggestions: 2,
            ..PipelineConfig::default()
        };
        let candidates = vec![
            candidate("a", SuggestionKind::ProjectUpdate, 0.1),
            candidate("b", SuggestionKind::Idea, 0.9),
            candidate("c", SuggestionKind::Idea, 0.2),
            candidate("d", SuggestionKind::Bug, 0.3),
        ];
        let outcome = score_and_threshold(candidates, &config);
        // Two ideas are trimmable; the weakest goes first, and the update
        // and bug stay even though the set is still over the cap.
        assert_eq!(outcome.drops.len(), 2);
        assert!(outcome
            .drops
            .iter()
            .all(|d| d.reason == DropReason::SuggestionCap));
        let kinds: Vec<SuggestionKind> = outcome.suggestions.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&SuggestionKind::ProjectUpdate));
        assert!(kinds.contains(&SuggestionKind::Bug));
        assert!(!kinds.contains(&SuggestionKind::Idea));
    }

    #[test]
    fn test_cap_never_drops_project_updates() {
        let config = PipelineConfig {
            max_suggestions: 1,
            ..PipelineConfig::default()
        };
        let candidates = vec![
            candidate("a", SuggestionKind::ProjectUpdate, 0.2),
            candidate("b", SuggestionKind::ProjectUpdate, 0.3),
            candidate("c", SuggestionKind::ProjectUpdate, 0.4),
        ];
        let outcome = score_and_threshold(candidates, &config);
        assert_eq!(outcome.suggestions.len(), 3);
        assert!(outcome.drops.is_empty());
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let candidates = vec![
            candidate("b", SuggestionKind::Idea, 0.5),
            candidate("a", SuggestionKind::ProjectUpdate, 0.5),
        ];
        let outcome = score_and_threshold(candidates, &PipelineConfig::default());
        // Equal scores: the project update outranks the idea.
        assert_eq!(outcome.suggestions[0].kind, SuggestionKind::ProjectUpdate);
    }
}
