//! Candidate validation
//!
//! Hard pass/fail gates applied to every candidate, then a global grounding
//! recheck over the survivors. Gate failures drop the candidate with a
//! machine-readable reason; internal errors are converted to drops so one
//! malformed candidate never aborts the note.

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::config::PipelineConfig;
use crate::preprocess::Section;
use crate::rules;
use crate::suggest::{
    CandidateOrigin, DropReason, DropRecord, DropStage, Suggestion,
};
use crate::util;

/// Validation result for the whole candidate set.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub passed: Vec<Suggestion>,
    pub drops: Vec<DropRecord>,
}

/// Run the per-candidate gates, then the global grounding pass.
pub fn validate(
    candidates: Vec<Suggestion>,
    sections: &HashMap<String, &Section>,
    config: &PipelineConfig,
) -> ValidationOutcome {
    let mut passed = Vec::new();
    let mut drops = Vec::new();

    for candidate in candidates {
        match check_candidate(&candidate, sections, config) {
            Ok(None) => passed.push(candidate),
            Ok(Some((reason, detail))) => {
                log::warn!(
                    "event=candidate_dropped stage=validation key={} reason={:?}",
                    candidate.suggestion_key,
                    reason
                );
                drops.push(DropRecord::new(
                    &candidate,
                    DropStage::Validation,
                    reason,
                    detail,
                ));
            }
            Err(err) => {
                let message = util::truncate(&err.to_string(), 120);
                log::warn!(
                    "event=candidate_dropped stage=validation key={} reason=internal_error detail={}",
                    candidate.suggestion_key,
                    message
                );
                drops.push(DropRecord::new(
                    &candidate,
                    DropStage::Validation,
                    DropReason::InternalError,
                    Some(format!("internal error: {}", message)),
                ));
            }
        }
    }

    // Anti-hallucination safety net: re-check verbatim presence for the
    // grounded origins on everything that passed the gates. A violation
    // here means a gate regressed, so it is logged loudly; the candidate is
    // still dropped rather than emitted.
    let mut grounded = Vec::new();
    for candidate in passed {
        match grounding_violation(&candidate, sections) {
            None => grounded.push(candidate),
            Some(detail) => {
                log::error!(
                    "event=integrity_violation check=grounding key={} detail={}",
                    candidate.suggestion_key,
                    detail
                );
                drops.push(DropRecord::new(
                    &candidate,
                    DropStage::Grounding,
                    DropReason::UngroundedEvidence,
                    Some(detail),
                ));
            }
        }
    }

    ValidationOutcome {
        passed: grounded,
        drops,
    }
}

/// Apply the hard gates to one candidate. `Ok(None)` means pass.
fn check_candidate(
    candidate: &Suggestion,
    sections: &HashMap<String, &Section>,
    config: &PipelineConfig,
) -> Result<Option<(DropReason, Option<String>)>> {
    let section = sections
        .get(&candidate.section_id)
        .ok_or_else(|| anyhow!("candidate references unknown section {}", candidate.section_id))?;

    let heading_norm = section
        .heading_text
        .as_deref()
        .map(util::normalize_words)
        .unwrap_or_default();

    let title_norm = util::normalize_words(&candidate.title);
    let body_norm = util::normalize_words(&candidate.body);
    let has_ask = rules::has_explicit_ask(&candidate.title)
        || candidate.evidence_lines().any(rules::has_explicit_ask);

    // Anti-vacuity: a title that restates the heading over a body that adds
    // nothing is a card nobody can act on.
    if !heading_norm.is_empty()
        && title_norm == heading_norm
        && (body_norm.is_empty() || body_norm == heading_norm)
        && !has_ask
    {
        return Ok(Some((DropReason::VacuousTitle, None)));
    }

    // Evidence sanity: spans must exist, carry real text, and sit inside
    // the owning section's line range.
    let meaningful_spans: Vec<_> = candidate
        .evidence
        .iter()
        .filter(|span| span.text.trim().chars().count() >= config.min_evidence_chars)
        .collect();
    if meaningful_spans.is_empty() {
        return Ok(Some((DropReason::EmptyEvidence, None)));
    }
    for span in &meaningful_spans {
        if span.start_line > span.end_line
            || span.start_line < section.start_line
            || span.end_line > section.end_line
        {
            return Ok(Some((
                DropReason::EvidenceOutOfBounds,
                Some(format!(
                    "span {}..{} outside section {}..{}",
                    span.start_line, span.end_line, section.start_line, section.end_line
                )),
            )));
        }
    }

    // Heading-only suppression: evidence that never leaves the heading text
    // is no evidence, unless an explicit ask or the structural bypass says
    // otherwise.
    let has_non_heading_evidence = candidate
        .evidence_lines()
        .any(|line| util::normalize_words(line) != heading_norm);
    if !has_non_heading_evidence
        && !has_ask
        && candidate.origin != CandidateOrigin::StructuralBypass
    {
        return Ok(Some((DropReason::HeadingOnlyAnchor, None)));
    }

    if let Some(detail) = grounding_violation(candidate, sections) {
        return Ok(Some((DropReason::UngroundedEvidence, Some(detail))));
    }

    Ok(None)
}

/// Case-insensitive verbatim check for origins that require it. Returns the
/// offending line on violation.
fn grounding_violation(
    candidate: &Suggestion,
    sections: &HashMap<String, &Section>,
) -> Option<String> {
    if !candidate.origin.requires_verbatim_evidence() {
        return None;
    }
    let section = sections.get(&candidate.section_id)?;
    let haystack = section.raw_text.to_lowercase();
    for line in candidate.evidence_lines() {
        if !haystack.contains(&line.to_lowercase()) {
            return Some(format!("evidence not in section text: {}", util::truncate(line, 80)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_section;
    use crate::preprocess::{preprocess, RunContext};
    use crate::suggest::{
        EvidenceSpan, Routing, SuggestionKind, SuggestionPayload, SuggestionScores,
    };

    fn fixture_section(raw: &str) -> Section {
        let mut ctx = RunContext::new("n1");
        let pre = preprocess("n1", raw, &mut ctx);
        pre.sections.into_iter().next().unwrap()
    }

    fn candidate_for(section: &Section, origin: CandidateOrigin, title: &str, evidence: Vec<EvidenceSpan>) -> Suggestion {
        Suggestion {
            suggestion_id: "n1:c1".into(),
            note_id: section.note_id.clone(),
            section_id: section.section_id.clone(),
            kind: SuggestionKind::Idea,
            title: title.to_string(),
            body: "some body".into(),
            payload: SuggestionPayload::DraftInitiative {
                title: title.to_string(),
                description: "some body".into(),
            },
            evidence,
            scores: SuggestionScores::default(),
            routing: Routing::CreateNew,
            suggestion_key: Suggestion::make_key(
                &section.note_id,
                &section.section_id,
                SuggestionKind::Idea,
                title,
            ),
            origin,
            needs_clarification: false,
            clarification_reasons: Vec::new(),
            context: None,
        }
    }

    fn section_map(section: &Section) -> HashMap<String, &Section> {
        let mut map = HashMap::new();
        map.insert(section.section_id.clone(), section);
        map
    }

    #[test]
    fn test_grounded_candidate_passes() {
        let section = fixture_section("## Feedback\n\nThe export button is broken on Safari.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::SignalSeeded,
            "Fix the export button",
            vec![EvidenceSpan::single(2, "The export button is broken on Safari.")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert_eq!(outcome.passed.len(), 1);
        assert!(outcome.drops.is_empty());
    }

    #[test]
    fn test_fabricated_evidence_is_dropped() {
        let section = fixture_section("## Feedback\n\nThe export button is broken on Safari.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::SignalSeeded,
            "Fix the import flow",
            vec![EvidenceSpan::single(2, "The import flow corrupts data nightly.")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::UngroundedEvidence);
    }

    #[test]
    fn test_verbatim_check_is_case_insensitive() {
        let section = fixture_section("## Feedback\n\nThe Export Button Is Broken on Safari.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::DenseParagraph,
            "Fix the export button",
            vec![EvidenceSpan::single(2, "the export button is broken on safari.")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert_eq!(outcome.passed.len(), 1);
    }

    #[test]
    fn test_canonical_evidence_is_not_verbatim_checked() {
        // Canonical bodies are templated; only signal/dense origins carry
        // the verbatim obligation.
        let section = fixture_section("## Feedback\n\nUsers keep asking for exports.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Add export support",
            vec![EvidenceSpan::single(2, "Users keep asking for exports, daily.")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert_eq!(outcome.passed.len(), 1);
    }

    #[test]
    fn test_vacuous_heading_restatement_is_dropped() {
        let section = fixture_section("## Dashboard Cleanup\n\n- tidy widgets\n- align cards\n");
        let mut candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Dashboard Cleanup",
            vec![EvidenceSpan::single(2, "Dashboard Cleanup")],
        );
        candidate.body = "Dashboard cleanup".into();
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::VacuousTitle);
    }

    #[test]
    fn test_empty_evidence_is_dropped() {
        let section = fixture_section("## Feedback\n\nUsers keep asking for exports.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Add export support",
            vec![EvidenceSpan::single(2, "short")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::EmptyEvidence);
    }

    #[test]
    fn test_out_of_bounds_evidence_is_dropped() {
        let section = fixture_section("## Feedback\n\nUsers keep asking for exports.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Add export support",
            vec![EvidenceSpan::single(99, "Users keep asking for exports.")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::EvidenceOutOfBounds);
    }

    #[test]
    fn test_heading_only_anchor_is_dropped() {
        let section = fixture_section("## Observability Gaps\n\nSome context paragraph here.\n");
        let candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Close observability gaps",
            vec![EvidenceSpan::single(2, "Observability Gaps")],
        );
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::HeadingOnlyAnchor);
    }

    #[test]
    fn test_unknown_section_becomes_internal_error_drop() {
        let section = fixture_section("## Feedback\n\nUsers keep asking for exports.\n");
        let mut candidate = candidate_for(
            &section,
            CandidateOrigin::Canonical,
            "Add export support",
            vec![EvidenceSpan::single(2, "Users keep asking for exports.")],
        );
        candidate.section_id = "n1:s99".into();
        let outcome = validate(vec![candidate], &section_map(&section), &PipelineConfig::default());
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.drops[0].reason, DropReason::InternalError);
        assert!(outcome.drops[0]
            .detail
            .as_deref()
            .unwrap()
            .starts_with("internal error:"));
    }
}
