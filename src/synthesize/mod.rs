//! Candidate synthesis
//!
//! Runs the extraction strategies over each classified section, in a fixed
//! order, threading an accumulator of produced candidates plus the set of
//! evidence text already covered. Later strategies only fill gaps earlier
//! ones left; the structural bypass fires only on totally untouched
//! sections.

pub mod semantic;
pub mod signals;
pub mod topics;

use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use crate::classify::{classify_section, strip_list_marker, ClassifiedSection, IntentHint};
use crate::config::PipelineConfig;
use crate::preprocess::{LineType, RunContext};
use crate::rules;
use crate::suggest::{
    CandidateOrigin, DropReason, DropRecord, DropStage, EvidenceSpan, Routing, Suggestion,
    SuggestionKind, SuggestionPayload, SuggestionScores,
};
use crate::util;

const MAX_BODY_CHARS: usize = 300;
const SIGNAL_RESCUE_MIN_CONFIDENCE: f64 = 0.65;

/// Why a whole section was set aside before any strategy ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionDisposition {
    Processed,
    SuppressedProcessNoise,
    SuppressedDerivative,
}

/// Everything synthesis produced for one note.
#[derive(Debug)]
pub struct SynthesisOutcome {
    /// All synthesis units, including derived sub-sections. Validation
    /// resolves evidence against these.
    pub units: Vec<ClassifiedSection>,
    pub candidates: Vec<Suggestion>,
    pub drops: Vec<DropRecord>,
    pub dispositions: Vec<(String, SectionDisposition)>,
}

/// Run all strategies over the classified sections.
pub fn synthesize(
    sections: Vec<ClassifiedSection>,
    config: &PipelineConfig,
    hint: Option<&dyn IntentHint>,
    ctx: &mut RunContext,
) -> SynthesisOutcome {
    let scanner = signals::SignalScanner::new();
    let mut outcome = SynthesisOutcome {
        units: Vec::new(),
        candidates: Vec::new(),
        drops: Vec::new(),
        dispositions: Vec::new(),
    };
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut earlier_texts: Vec<String> = Vec::new();

    for classified in sections {
        let section_id = classified.section.section_id.clone();

        // A section that mostly restates an earlier concrete section is a
        // meeting-notes summary; extracting from it would double-emit.
        let is_derivative = earlier_texts
            .iter()
            .any(|earlier| util::word_overlap(&classified.section.raw_text, earlier) >= 0.70);
        if is_derivative {
            log::debug!(
                "event=section_suppressed section={} cause=derivative",
                section_id
            );
            outcome
                .dispositions
                .push((section_id, SectionDisposition::SuppressedDerivative));
            continue;
        }

        let is_noise = classified
            .section
            .heading_text
            .as_deref()
            .map(rules::is_process_noise_heading)
            .unwrap_or(false);
        if is_noise {
            let role_lines = collect_role_lines(&classified);
            if role_lines.is_empty() {
                log::debug!(
                    "event=section_suppressed section={} cause=process_noise",
                    section_id
                );
                outcome
                    .dispositions
                    .push((section_id, SectionDisposition::SuppressedProcessNoise));
            } else {
                let candidate = action_items_candidate(&classified, &role_lines, ctx);
                push_candidate(candidate, &mut seen_keys, &mut outcome);
                outcome
                    .dispositions
                    .push((section_id, SectionDisposition::Processed));
                outcome.units.push(classified);
            }
            continue;
        }

        earlier_texts.push(classified.section.raw_text.clone());
        outcome
            .dispositions
            .push((section_id, SectionDisposition::Processed));

        // Mixed-topic sections split before synthesis so every candidate's
        // evidence stays inside its own topic.
        let units: Vec<ClassifiedSection> = if topics::is_mixed_topic(&classified.section) {
            topics::split_topics(&classified.section)
                .into_iter()
                .map(|sub| classify_section(sub, config, hint))
                .collect()
        } else {
            vec![classified]
        };

        for unit in units {
            synthesize_unit(&unit, config, &scanner, ctx, &mut seen_keys, &mut outcome);
            outcome.units.push(unit);
        }
    }

    outcome
}

/// The per-unit strategy fold. `covered` accumulates normalized evidence
/// text; each strategy consults it before emitting.
fn synthesize_unit(
    unit: &ClassifiedSection,
    config: &PipelineConfig,
    scanner: &signals::SignalScanner,
    ctx: &mut RunContext,
    seen_keys: &mut HashSet<String>,
    outcome: &mut SynthesisOutcome,
) {
    let mut covered: HashSet<String> = HashSet::new();

    let strategies: [(&str, StrategyFn); 5] = [
        ("canonical", canonical_strategy),
        ("dense_paragraph", dense_strategy),
        ("signal_seeded", signal_strategy),
        ("semantic_idea", semantic_strategy),
        ("structural_bypass", bypass_strategy),
    ];

    for (name, strategy) in strategies {
        let scx = StrategyCx {
            unit,
            config,
            scanner,
        };
        match strategy(&scx, &covered, ctx) {
            Ok(candidates) => {
                for candidate in candidates {
                    for line in candidate.evidence_lines() {
                        covered.insert(util::normalize_words(line));
                        for sentence in util::split_sentences(line) {
                            covered.insert(util::normalize_words(&sentence));
                        }
                    }
                    log::debug!(
                        "event=candidate_synthesized section={} strategy={} key={}",
                        unit.section.section_id,
                        name,
                        candidate.suggestion_key
                    );
                    push_candidate(candidate, seen_keys, outcome);
                }
            }
            Err(err) => {
                // One broken strategy never takes down its siblings.
                log::warn!(
                    "event=strategy_failed section={} strategy={} error={}",
                    unit.section.section_id,
                    name,
                    util::truncate(&err.to_string(), 120)
                );
                outcome.drops.push(DropRecord {
                    suggestion_key: util::hash_str(&format!(
                        "{}|{}",
                        unit.section.section_id, name
                    )),
                    section_id: unit.section.section_id.clone(),
                    stage: DropStage::Synthesis,
                    reason: DropReason::InternalError,
                    detail: Some(util::truncate(&err.to_string(), 120)),
                });
            }
        }
    }
}

struct StrategyCx<'a> {
    unit: &'a ClassifiedSection,
    config: &'a PipelineConfig,
    scanner: &'a signals::SignalScanner,
}

type StrategyFn = fn(&StrategyCx, &HashSet<String>, &mut RunContext) -> Result<Vec<Suggestion>>;

fn push_candidate(
    candidate: Suggestion,
    seen_keys: &mut HashSet<String>,
    outcome: &mut SynthesisOutcome,
) {
    if seen_keys.contains(&candidate.suggestion_key) {
        outcome.drops.push(DropRecord::new(
            &candidate,
            DropStage::Synthesis,
            DropReason::DuplicateKey,
            None,
        ));
        return;
    }
    seen_keys.insert(candidate.suggestion_key.clone());
    outcome.candidates.push(candidate);
}

// ---------------------------------------------------------------------------
// Strategy 1: canonical per-section synthesis
// ---------------------------------------------------------------------------

fn canonical_strategy(
    scx: &StrategyCx,
    _covered: &HashSet<String>,
    ctx: &mut RunContext,
) -> Result<Vec<Suggestion>> {
    let unit = scx.unit;
    if !unit.is_actionable {
        return Ok(Vec::new());
    }
    // Dense paragraphs belong to sentence extraction: stamping the
    // section-level kind onto one sentence of a mixed paragraph is exactly
    // the type contamination the per-sentence pass exists to prevent.
    if topics::is_dense_paragraph(&unit.section) {
        return Ok(Vec::new());
    }

    let Some(anchor) = select_anchor(unit, scx.config) else {
        return Ok(Vec::new());
    };

    let anchor_text = rules::normalize_decision_line(&anchor.sentence);
    let title = trim_sentence_end(&anchor_text);
    let anchor_decision = util::normalize_words(&anchor_text);

    // Evidence is the anchor sentence plus at most one supporting line.
    let mut evidence = vec![EvidenceSpan::single(anchor.line_index, anchor.sentence.clone())];
    let mut body = anchor_text;
    if let Some(support) = supporting_line(unit, anchor.line_index) {
        let support_text = rules::normalize_decision_line(&support.1);
        if util::normalize_words(&support_text) != anchor_decision {
            body = format!("{} {}", body, support_text);
            evidence.push(EvidenceSpan::single(support.0, support.1));
        }
    }
    let body = util::truncate_at_word(&body, MAX_BODY_CHARS);

    Ok(vec![build_candidate(
        unit,
        unit.suggested_kind,
        CandidateOrigin::Canonical,
        title,
        body,
        evidence,
        anchor.confidence,
        unit.kind_confidence,
        ctx,
    )])
}

struct Anchor {
    line_index: usize,
    sentence: String,
    confidence: f64,
}

/// Pick the strongest anchor line for canonical synthesis.
///
/// Explicit asks beat imperatives and schedule deltas, which beat the plain
/// first substantive line. Hedged concern lines are skipped unless they also
/// carry an ask marker or a work verb. Duplicate decision rows collapse to
/// their first occurrence.
fn select_anchor(unit: &ClassifiedSection, config: &PipelineConfig) -> Option<Anchor> {
    let mut best: Option<(u8, Anchor)> = None;
    let mut seen_decisions: HashSet<String> = HashSet::new();

    for line in unit.section.content_lines() {
        if line.line_type == LineType::Code || line.line_type == LineType::Blank {
            continue;
        }
        let stripped = strip_list_marker(&line.text);

        let has_work_verb = stripped
            .split_whitespace()
            .any(|w| rules::is_work_verb(w.trim_matches(|c: char| !c.is_alphanumeric())));
        if rules::is_hedged_concern(stripped) && !rules::has_explicit_ask(stripped) && !has_work_verb
        {
            continue;
        }

        let decision_key = util::normalize_words(&rules::normalize_decision_line(stripped));
        if !decision_key.is_empty() && !seen_decisions.insert(decision_key) {
            continue;
        }

        for sentence in util::split_sentences(stripped) {
            let rank = if rules::has_explicit_ask(&sentence) {
                3
            } else if rules::starts_with_work_verb(&sentence)
                || rules::has_schedule_delta(&sentence)
            {
                2
            } else {
                0
            };
            if rank == 0 {
                continue;
            }
            let replace = match &best {
                Some((best_rank, _)) => rank > *best_rank,
                None => true,
            };
            if replace {
                let confidence = if rank == 3 { 0.85 } else { 0.75 };
                best = Some((
                    rank,
                    Anchor {
                        line_index: line.index,
                        sentence,
                        confidence,
                    },
                ));
            }
        }
    }

    if best.is_none() {
        // Actionable sections must still yield a candidate; fall back to
        // the first substantive line at reduced confidence.
        for line in unit.section.content_lines() {
            if line.line_type == LineType::Code {
                continue;
            }
            let stripped = strip_list_marker(&line.text);
            if stripped.chars().count() < config.min_evidence_chars {
                continue;
            }
            if rules::is_hedged_concern(stripped) {
                continue;
            }
            let sentence = util::split_sentences(stripped)
                .into_iter()
                .next()
                .unwrap_or_else(|| stripped.to_string());
            best = Some((
                1,
                Anchor {
                    line_index: line.index,
                    sentence,
                    confidence: 0.55,
                },
            ));
            break;
        }
    }

    best.map(|(_, anchor)| anchor)
}

/// One extra line of context after (or before) the anchor.
fn supporting_line(unit: &ClassifiedSection, anchor_index: usize) -> Option<(usize, String)> {
    let mut before: Option<(usize, String)> = None;
    for line in unit.section.content_lines() {
        if line.line_type == LineType::Code {
            continue;
        }
        if line.index > anchor_index {
            return Some((line.index, line.text.trim().to_string()));
        }
        if line.index < anchor_index {
            before = Some((line.index, line.text.trim().to_string()));
        }
    }
    before
}

// ---------------------------------------------------------------------------
// Strategy 2: dense-paragraph sentence extraction
// ---------------------------------------------------------------------------

fn dense_strategy(
    scx: &StrategyCx,
    covered: &HashSet<String>,
    ctx: &mut RunContext,
) -> Result<Vec<Suggestion>> {
    let unit = scx.unit;
    if !topics::is_dense_paragraph(&unit.section) {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for sentence in topics::split_dense(&unit.section) {
        if covered.contains(&util::normalize_words(&sentence.text)) {
            continue;
        }
        // Each sentence is typed from its own words only; the parent
        // section's kind never leaks in.
        let Some((kind, confidence)) = topics::classify_sentence(&sentence.text) else {
            continue;
        };
        let title = trim_sentence_end(&sentence.text);
        out.push(build_candidate(
            unit,
            kind,
            CandidateOrigin::DenseParagraph,
            title,
            sentence.text.clone(),
            vec![EvidenceSpan::single(sentence.line_index, sentence.text)],
            confidence,
            confidence,
            ctx,
        ));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Strategy 3: signal-seeded candidates
// ---------------------------------------------------------------------------

fn signal_strategy(
    scx: &StrategyCx,
    covered: &HashSet<String>,
    ctx: &mut RunContext,
) -> Result<Vec<Suggestion>> {
    let unit = scx.unit;
    let mut out = Vec::new();
    for hit in scx.scanner.scan(&unit.section) {
        if hit.confidence < SIGNAL_RESCUE_MIN_CONFIDENCE {
            continue;
        }
        let stripped = strip_list_marker(&hit.line_text);
        let sentence = util::split_sentences(stripped)
            .into_iter()
            .find(|s| {
                let probe_kind = topics::classify_sentence(s).map(|(k, _)| k);
                probe_kind == Some(hit.kind.suggestion_kind())
            })
            .unwrap_or_else(|| stripped.to_string());
        if covered.contains(&util::normalize_words(&hit.line_text))
            || covered.contains(&util::normalize_words(&sentence))
        {
            continue;
        }
        let title = trim_sentence_end(&sentence);
        out.push(build_candidate(
            unit,
            hit.kind.suggestion_kind(),
            CandidateOrigin::SignalSeeded,
            title,
            sentence,
            vec![EvidenceSpan::single(hit.line_index, hit.line_text.clone())],
            hit.confidence,
            hit.confidence,
            ctx,
        ));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Strategy 4: semantic idea extraction
// ---------------------------------------------------------------------------

fn semantic_strategy(
    scx: &StrategyCx,
    covered: &HashSet<String>,
    ctx: &mut RunContext,
) -> Result<Vec<Suggestion>> {
    let unit = scx.unit;
    let Some(seed) = semantic::semantic_seed(&unit.section) else {
        return Ok(Vec::new());
    };
    if covered.contains(&util::normalize_words(&seed.sentence)) {
        return Ok(Vec::new());
    }
    let title = trim_sentence_end(&seed.sentence);
    Ok(vec![build_candidate(
        unit,
        SuggestionKind::Idea,
        CandidateOrigin::SemanticIdea,
        title,
        seed.sentence.clone(),
        vec![EvidenceSpan::single(seed.line_index, seed.sentence)],
        0.70,
        unit.kind_confidence,
        ctx,
    )])
}

// ---------------------------------------------------------------------------
// Strategy 5: structural idea bypass
// ---------------------------------------------------------------------------

fn bypass_strategy(
    scx: &StrategyCx,
    covered: &HashSet<String>,
    ctx: &mut RunContext,
) -> Result<Vec<Suggestion>> {
    let unit = scx.unit;
    if !covered.is_empty() || !semantic::eligible_for_bypass(&unit.section) {
        return Ok(Vec::new());
    }
    let bullets = semantic::bypass_bullets(&unit.section);
    if bullets.len() < 2 {
        return Ok(Vec::new());
    }

    let heading = unit
        .section
        .heading_text
        .clone()
        .unwrap_or_else(|| "Structured proposal".to_string());
    let body = bullets
        .iter()
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let evidence = bullets
        .iter()
        .map(|(index, text)| EvidenceSpan::single(*index, text.clone()))
        .collect();

    Ok(vec![build_candidate(
        unit,
        SuggestionKind::Idea,
        CandidateOrigin::StructuralBypass,
        heading,
        util::truncate_at_word(&body, MAX_BODY_CHARS),
        evidence,
        0.60,
        unit.kind_confidence,
        ctx,
    )])
}

// ---------------------------------------------------------------------------
// Action-items rescue for process-noise sections
// ---------------------------------------------------------------------------

fn collect_role_lines(classified: &ClassifiedSection) -> Vec<(usize, String)> {
    classified
        .section
        .content_lines()
        .filter_map(|line| {
            let stripped = strip_list_marker(&line.text);
            if rules::is_role_assignment(stripped) {
                Some((line.index, stripped.to_string()))
            } else {
                None
            }
        })
        .collect()
}

fn action_items_candidate(
    classified: &ClassifiedSection,
    role_lines: &[(usize, String)],
    ctx: &mut RunContext,
) -> Suggestion {
    let first = &role_lines[0].1;
    let title = if role_lines.len() > 1 {
        format!("Action items: {} (+{} more)", first, role_lines.len() - 1)
    } else {
        format!("Action items: {}", first)
    };
    let body = role_lines
        .iter()
        .take(4)
        .map(|(_, text)| text.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let evidence = role_lines
        .iter()
        .map(|(index, text)| EvidenceSpan::single(*index, text.clone()))
        .collect();

    build_candidate(
        classified,
        SuggestionKind::Idea,
        CandidateOrigin::ActionItems,
        title,
        util::truncate_at_word(&body, MAX_BODY_CHARS),
        evidence,
        0.70,
        classified.kind_confidence,
        ctx,
    )
}

// ---------------------------------------------------------------------------
// Shared candidate assembly
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn build_candidate(
    unit: &ClassifiedSection,
    kind: SuggestionKind,
    origin: CandidateOrigin,
    title: String,
    body: String,
    evidence: Vec<EvidenceSpan>,
    synthesis_confidence: f64,
    kind_confidence: f64,
    ctx: &mut RunContext,
) -> Suggestion {
    let section = &unit.section;
    let payload = match kind {
        SuggestionKind::Idea => SuggestionPayload::DraftInitiative {
            title: title.clone(),
            description: body.clone(),
        },
        _ => SuggestionPayload::AfterDescription(body.clone()),
    };
    let suggestion_key = Suggestion::make_key(&section.note_id, &section.section_id, kind, &title);

    Suggestion {
        suggestion_id: ctx.next_suggestion_id(),
        note_id: section.note_id.clone(),
        section_id: section.section_id.clone(),
        kind,
        title,
        body,
        payload,
        evidence,
        scores: SuggestionScores {
            section_actionability: unit.actionable_signal,
            kind_confidence,
            synthesis_confidence,
            overall: 0.0,
        },
        routing: Routing::CreateNew,
        suggestion_key,
        origin,
        needs_clarification: false,
        clarification_reasons: Vec::new(),
        context: None,
    }
}

fn trim_sentence_end(s: &str) -> String {
    s.trim().trim_end_matches(['.', '!', '…']).trim().to_string()
}
