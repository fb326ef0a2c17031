//! Decision ledger
//!
//! A parallel, purely data-derived trace of everything the pipeline
//! decided: per-section classification, per-candidate outcomes, drops, and
//! merges. Built from the same values the pipeline acted on, never from a
//! side channel that could drift from the real decision path.

use serde::Serialize;

use crate::classify::{ClassifiedSection, IntentScores};
use crate::consolidate::ConsolidationRecord;
use crate::rules;
use crate::suggest::{CandidateOrigin, DropRecord, Suggestion, SuggestionKind, SuggestionScores};
use crate::synthesize::SectionDisposition;

/// One classified section, as the pipeline saw it.
#[derive(Debug, Clone, Serialize)]
pub struct SectionTrace {
    pub section_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub intent: IntentScores,
    pub is_actionable: bool,
    pub actionable_signal: f64,
    pub out_of_scope_signal: f64,
    pub disposition: SectionDisposition,
}

/// One candidate's journey, whether or not it survived.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateTrace {
    pub suggestion_id: String,
    pub suggestion_key: String,
    pub section_id: String,
    pub origin: CandidateOrigin,
    pub kind: SuggestionKind,
    pub scores: SuggestionScores,
    pub needs_clarification: bool,
    pub emitted: bool,
}

/// The full per-note ledger, emitted when `enable_debug` is set.
#[derive(Debug, Clone, Serialize)]
pub struct DebugLedger {
    pub rules_version: &'static str,
    pub sections: Vec<SectionTrace>,
    pub candidates: Vec<CandidateTrace>,
    pub drops: Vec<DropRecord>,
    pub consolidations: Vec<ConsolidationRecord>,
}

impl DebugLedger {
    pub fn build(
        units: &[ClassifiedSection],
        dispositions: &[(String, SectionDisposition)],
        emitted: &[Suggestion],
        all_candidates: &[CandidateTrace],
        drops: Vec<DropRecord>,
        consolidations: Vec<ConsolidationRecord>,
    ) -> Self {
        let sections = units
            .iter()
            .map(|unit| {
                let disposition = dispositions
                    .iter()
                    .find(|(id, _)| {
                        *id == unit.section.section_id
                            || unit
                                .section
                                .parent_id
                                .as_deref()
                                .map(|p| p == id)
                                .unwrap_or(false)
                    })
                    .map(|(_, d)| *d)
                    .unwrap_or(SectionDisposition::Processed);
                SectionTrace {
                    section_id: unit.section.section_id.clone(),
                    heading: unit.section.heading_text.clone(),
                    intent: unit.intent,
                    is_actionable: unit.is_actionable,
                    actionable_signal: unit.actionable_signal,
                    out_of_scope_signal: unit.out_of_scope_signal,
                    disposition,
                }
            })
            .collect();

        // Titles (and with them content keys) are rewritten after tracing,
        // so emission is matched on the stable suggestion id.
        let mut candidates = all_candidates.to_vec();
        for trace in &mut candidates {
            trace.emitted = emitted
                .iter()
                .any(|s| s.suggestion_id == trace.suggestion_id);
        }

        DebugLedger {
            rules_version: rules::RULES_VERSION,
            sections,
            candidates,
            drops,
            consolidations,
        }
    }
}

/// Snapshot a candidate into a trace row (emitted flag filled in later).
pub fn trace_candidate(suggestion: &Suggestion) -> CandidateTrace {
    CandidateTrace {
        suggestion_id: suggestion.suggestion_id.clone(),
        suggestion_key: suggestion.suggestion_key.clone(),
        section_id: suggestion.section_id.clone(),
        origin: suggestion.origin,
        kind: suggestion.kind,
        scores: suggestion.scores.clone(),
        needs_clarification: suggestion.needs_clarification,
        emitted: false,
    }
}
