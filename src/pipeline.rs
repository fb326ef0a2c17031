//! Pipeline entry point
//!
//! Wires the stages together: preprocess, classify, synthesize, validate,
//! score, consolidate, route, normalize titles. Pure and synchronous; one
//! invocation processes one note, with all id state scoped to the run.

use std::collections::HashMap;

use serde::Serialize;

use crate::classify::{classify_section, ClassifiedSection, IntentHint, IntentLabel};
use crate::config::PipelineConfig;
use crate::consolidate::consolidate;
use crate::ledger::{trace_candidate, CandidateTrace, DebugLedger};
use crate::note::{InitiativeSnapshot, NoteInput};
use crate::preprocess::{preprocess, RunContext, Section};
use crate::route::{route, InitiativeMatcher, TokenOverlapMatcher};
use crate::score::score_and_threshold;
use crate::suggest::{Suggestion, SuggestionContext, SuggestionKind};
use crate::synthesize::synthesize;
use crate::title;
use crate::util;
use crate::validate::validate;

const EVIDENCE_PREVIEW_LINES: usize = 3;
const EVIDENCE_PREVIEW_CHARS: usize = 120;

/// Final pipeline output: the ranked suggestion list plus the optional
/// decision ledger.
#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugLedger>,
}

/// Run the pipeline with the built-in routing matcher and no intent hint.
pub fn run(
    note: &NoteInput,
    initiatives: &[InitiativeSnapshot],
    config: &PipelineConfig,
) -> PipelineOutput {
    run_with_hooks(note, initiatives, config, None, &TokenOverlapMatcher)
}

/// Run the pipeline with an optional auxiliary intent classifier and a
/// custom initiative matcher.
pub fn run_with_hooks(
    note: &NoteInput,
    initiatives: &[InitiativeSnapshot],
    config: &PipelineConfig,
    hint: Option<&dyn IntentHint>,
    matcher: &dyn InitiativeMatcher,
) -> PipelineOutput {
    let mut ctx = RunContext::new(&note.note_id);

    let pre = preprocess(&note.note_id, &note.raw_markdown, &mut ctx);
    let classified: Vec<ClassifiedSection> = pre
        .sections
        .into_iter()
        .map(|section| classify_section(section, config, hint))
        .collect();

    let synth = synthesize(classified, config, hint, &mut ctx);
    let section_map: HashMap<String, &Section> = synth
        .units
        .iter()
        .map(|unit| (unit.section.section_id.clone(), &unit.section))
        .collect();

    let mut drops = synth.drops;

    let validated = validate(synth.candidates, &section_map, config);
    drops.extend(validated.drops);

    let scored = score_and_threshold(validated.passed, config);
    drops.extend(scored.drops);
    let suggestions = scored.suggestions;

    check_plan_change_invariant(&synth.units, &suggestions);

    let traces: Vec<CandidateTrace> = suggestions.iter().map(trace_candidate).collect();

    let (mut suggestions, consolidations) = consolidate(suggestions, &section_map);
    route(&mut suggestions, initiatives, config, matcher);
    for suggestion in &mut suggestions {
        title::normalize(suggestion, config);
    }
    attach_context(&mut suggestions, &section_map);

    check_actionable_emitted(&synth.units, &suggestions);

    let debug = config.enable_debug.then(|| {
        DebugLedger::build(
            &synth.units,
            &synth.dispositions,
            &suggestions,
            &traces,
            drops,
            consolidations,
        )
    });

    PipelineOutput { suggestions, debug }
}

/// Standing invariant: a section classified as a plan change must still be
/// represented in the output. Retyping into an idea by arbitration is the
/// one documented exception; silent disappearance is an integrity error.
fn check_plan_change_invariant(units: &[ClassifiedSection], emitted: &[Suggestion]) {
    for unit in units {
        if unit.argmax != IntentLabel::PlanChange {
            continue;
        }
        let section_id = &unit.section.section_id;
        let as_update = emitted
            .iter()
            .any(|s| s.section_id == *section_id && s.kind == SuggestionKind::ProjectUpdate);
        if as_update {
            continue;
        }
        let as_other = emitted.iter().any(|s| s.section_id == *section_id);
        if as_other {
            log::debug!(
                "event=plan_change_retyped section={} detail=emitted_as_non_update",
                section_id
            );
        } else {
            log::error!(
                "event=integrity_violation check=plan_change_emission section={}",
                section_id
            );
        }
    }
}

/// Every actionable section must put at least one card in front of the
/// user. A miss is a logic regression, logged loudly, never a crash.
fn check_actionable_emitted(units: &[ClassifiedSection], emitted: &[Suggestion]) {
    for unit in units {
        if !unit.is_actionable {
            continue;
        }
        let section_id = &unit.section.section_id;
        if !emitted.iter().any(|s| s.section_id == *section_id) {
            log::error!(
                "event=integrity_violation check=actionable_emission section={}",
                section_id
            );
        }
    }
}

fn attach_context(suggestions: &mut [Suggestion], sections: &HashMap<String, &Section>) {
    for suggestion in suggestions.iter_mut() {
        let heading = sections
            .get(&suggestion.section_id)
            .and_then(|s| s.heading_text.clone());
        let evidence_preview = suggestion
            .evidence
            .iter()
            .take(EVIDENCE_PREVIEW_LINES)
            .map(|span| util::truncate(span.text.trim(), EVIDENCE_PREVIEW_CHARS))
            .collect();
        suggestion.context = Some(SuggestionContext {
            title: suggestion.title.clone(),
            body: suggestion.body.clone(),
            evidence_preview,
            source_section_id: suggestion.section_id.clone(),
            source_heading: heading,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::Routing;

    fn debug_config() -> PipelineConfig {
        PipelineConfig {
            enable_debug: true,
            ..PipelineConfig::default()
        }
    }

    fn run_note(markdown: &str) -> PipelineOutput {
        let note = NoteInput::new("note-1", markdown);
        run(&note, &[], &debug_config())
    }

    #[test]
    fn test_scenario_single_idea_section() {
        let output = run_note(
            "# Dashboard Issues\n\n## Error Visibility\n\nUsers don't notice failures unless they dig into logs.\n\nAdd inline alert banners for critical errors.",
        );
        let ledger = output.debug.as_ref().unwrap();
        assert_eq!(ledger.sections.len(), 1);
        assert!(ledger.sections[0].is_actionable);

        assert_eq!(output.suggestions.len(), 1);
        let suggestion = &output.suggestions[0];
        assert_eq!(suggestion.kind, SuggestionKind::Idea);
        assert!(suggestion.body.contains("inline alert banners"));
        assert!(suggestion.title.starts_with("Idea: "));
    }

    #[test]
    fn test_scenario_next_steps_with_role_assignments() {
        let output = run_note("## Next Steps\n\n- PM to document requirements\n- Design to update mocks\n");
        assert_eq!(output.suggestions.len(), 1);
        let suggestion = &output.suggestions[0];
        assert!(suggestion.title.starts_with("Action items:"));
        assert!(suggestion.body.contains("PM to document requirements"));
        assert!(!suggestion.title.contains("Review: Next Steps"));
    }

    #[test]
    fn test_scenario_two_project_delays_do_not_leak() {
        let output = run_note(
            "## Checkout Revamp\n\nLaunch moved to Mar 14 because of payment vendor delays.\n\n## Search Upgrade\n\nRollout delayed by 3 days for the index rebuild.\n",
        );
        let updates: Vec<&Suggestion> = output
            .suggestions
            .iter()
            .filter(|s| s.kind == SuggestionKind::ProjectUpdate)
            .collect();
        assert_eq!(updates.len(), 2);

        let checkout = updates
            .iter()
            .find(|s| s.body.contains("Mar 14"))
            .expect("checkout update");
        let search = updates
            .iter()
            .find(|s| s.body.contains("3 days"))
            .expect("search update");
        assert!(!checkout.body.contains("index rebuild"));
        assert!(!search.body.contains("payment vendor"));
        assert_ne!(checkout.section_id, search.section_id);
    }

    #[test]
    fn test_scenario_pure_status_note_yields_nothing() {
        let output = run_note("## Status Update\n\nEverything is on track.");
        assert!(output.suggestions.is_empty());
    }

    #[test]
    fn test_empty_and_malformed_markdown_yield_empty_output() {
        assert!(run_note("").suggestions.is_empty());
        assert!(run_note("\n\n\n").suggestions.is_empty());
        assert!(run_note("```\nunclosed fence\n").suggestions.is_empty());
    }

    #[test]
    fn test_determinism_across_repeated_runs() {
        let markdown = "## Checkout Revamp\n\nLaunch moved to Mar 14 because of payment vendor delays.\n\n## Feedback\n\nCustomers keep asking for CSV export. The export button is broken on Safari.\n\n## Growth Strategy\n\n- double down on the referral incentive\n- add streak rewards to the engagement loop\n- weekly digest email for inactive teams\n";
        let note = NoteInput::new("note-1", markdown);
        let config = debug_config();
        let first = serde_json::to_value(run(&note, &[], &config)).unwrap();
        let second = serde_json::to_value(run(&note, &[], &config)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grounding_of_signal_and_dense_evidence() {
        let markdown = "## Feedback\n\nCustomers keep asking for CSV export and the export button is broken on Safari.\n";
        let output = run_note(markdown);
        let haystack = markdown.to_lowercase();
        for suggestion in &output.suggestions {
            if !suggestion.origin.requires_verbatim_evidence() {
                continue;
            }
            for line in suggestion.evidence_lines() {
                assert!(
                    haystack.contains(&line.to_lowercase()),
                    "ungrounded evidence escaped: {}",
                    line
                );
            }
        }
    }

    #[test]
    fn test_plan_change_survives_a_tight_cap() {
        let config = PipelineConfig {
            max_suggestions: 1,
            ..PipelineConfig::default()
        };
        let markdown = "## Timeline\n\nBeta launch moved to Mar 14.\n\n## Ideas\n\nWe should add streak rewards for the engagement loop. We should add a referral incentive for invites too, plus a weekly digest email so inactive teams come back to the product regularly.\n";
        let note = NoteInput::new("note-1", markdown);
        let output = run(&note, &[], &config);
        assert!(output
            .suggestions
            .iter()
            .any(|s| s.kind == SuggestionKind::ProjectUpdate));
        assert!(output.suggestions.len() <= 1 + 1); // the update is cap-exempt
    }

    #[test]
    fn test_actionable_sections_always_emit() {
        let markdown = "## Error Visibility\n\nAdd inline alert banners for critical errors.\n\n## Timeline\n\nBeta launch moved to Mar 14.\n";
        let output = run_note(markdown);
        let ledger = output.debug.as_ref().unwrap();
        for section in &ledger.sections {
            if section.is_actionable {
                assert!(
                    output
                        .suggestions
                        .iter()
                        .any(|s| s.section_id == section.section_id),
                    "actionable section {} emitted nothing",
                    section.section_id
                );
            }
        }
    }

    #[test]
    fn test_no_cross_run_leakage() {
        let note_a = NoteInput::new("note-a", "## Plan\n\nLaunch moved to Mar 14.\n");
        let note_b = NoteInput::new("note-b", "## Plan\n\nLaunch moved to Mar 14.\n");
        let config = debug_config();
        let out_a = run(&note_a, &[], &config);
        let out_b = run(&note_b, &[], &config);

        for b in &out_b.suggestions {
            assert_eq!(b.note_id, "note-b");
            for a in &out_a.suggestions {
                assert_ne!(a.suggestion_id, b.suggestion_id);
                assert_ne!(a.section_id, b.section_id);
            }
        }
    }

    #[test]
    fn test_routing_attaches_to_similar_initiative() {
        let note = NoteInput::new(
            "note-1",
            "## Checkout\n\nWe should reduce checkout flow latency on mobile.\n",
        );
        let initiatives = vec![InitiativeSnapshot::new(
            "init-7",
            "Checkout latency",
            "reduce checkout flow latency for mobile users",
        )];
        let output = run(&note, &initiatives, &PipelineConfig::default());
        assert!(!output.suggestions.is_empty());
        assert!(output.suggestions.iter().any(|s| matches!(
            &s.routing,
            Routing::AttachTo { initiative_id } if initiative_id == "init-7"
        )));
    }

    #[test]
    fn test_output_serializes_with_stable_shape() {
        let output = run_note("## Timeline\n\nBeta launch moved to Mar 14.\n");
        let json = serde_json::to_value(&output).unwrap();
        let first = &json["suggestions"][0];
        assert_eq!(first["kind"], "project_update");
        assert!(first["suggestion_key"].is_string());
        assert!(first["evidence"].is_array());
        assert!(first["context"]["source_heading"].is_string());
    }

    #[test]
    fn test_debug_ledger_is_absent_by_default() {
        let note = NoteInput::new("note-1", "## Timeline\n\nBeta launch moved to Mar 14.\n");
        let output = run(&note, &[], &PipelineConfig::default());
        assert!(output.debug.is_none());
    }

    #[test]
    fn test_debug_ledger_records_drops_and_emission() {
        let output = run_note(
            "## Feedback\n\nCustomers keep asking for CSV export and the export button is broken on Safari.\n",
        );
        let ledger = output.debug.as_ref().unwrap();
        assert!(!ledger.sections.is_empty());
        for trace in &ledger.candidates {
            if trace.emitted {
                assert!(output
                    .suggestions
                    .iter()
                    .any(|s| s.suggestion_id == trace.suggestion_id));
            }
        }
    }
}
