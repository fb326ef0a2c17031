//! Section intent classification
//!
//! Scores each section against a closed label set, decides actionability,
//! and picks a provisional suggestion kind. Classification happens once per
//! section; later stages read the result but never write back.

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::preprocess::{LineType, Section};
use crate::rules;
use crate::suggest::SuggestionKind;
use crate::util;

/// Closed intent label set. Order matters: argmax ties resolve to the
/// earlier label, so the order here is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    PlanChange,
    NewWorkstream,
    StatusInformational,
    Communication,
    Research,
    Calendar,
    MicroTasks,
}

pub const INTENT_LABELS: [IntentLabel; 7] = [
    IntentLabel::PlanChange,
    IntentLabel::NewWorkstream,
    IntentLabel::StatusInformational,
    IntentLabel::Communication,
    IntentLabel::Research,
    IntentLabel::Calendar,
    IntentLabel::MicroTasks,
];

/// Per-label scores in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IntentScores {
    pub plan_change: f64,
    pub new_workstream: f64,
    pub status_informational: f64,
    pub communication: f64,
    pub research: f64,
    pub calendar: f64,
    pub micro_tasks: f64,
}

impl IntentScores {
    pub fn get(&self, label: IntentLabel) -> f64 {
        match label {
            IntentLabel::PlanChange => self.plan_change,
            IntentLabel::NewWorkstream => self.new_workstream,
            IntentLabel::StatusInformational => self.status_informational,
            IntentLabel::Communication => self.communication,
            IntentLabel::Research => self.research,
            IntentLabel::Calendar => self.calendar,
            IntentLabel::MicroTasks => self.micro_tasks,
        }
    }

    pub fn set(&mut self, label: IntentLabel, value: f64) {
        let slot = match label {
            IntentLabel::PlanChange => &mut self.plan_change,
            IntentLabel::NewWorkstream => &mut self.new_workstream,
            IntentLabel::StatusInformational => &mut self.status_informational,
            IntentLabel::Communication => &mut self.communication,
            IntentLabel::Research => &mut self.research,
            IntentLabel::Calendar => &mut self.calendar,
            IntentLabel::MicroTasks => &mut self.micro_tasks,
        };
        *slot = value.clamp(0.0, 1.0);
    }

    /// Highest-scoring label; ties go to the earlier label in INTENT_LABELS.
    pub fn argmax(&self) -> (IntentLabel, f64) {
        let mut best = (INTENT_LABELS[0], self.get(INTENT_LABELS[0]));
        for label in INTENT_LABELS.iter().skip(1) {
            let score = self.get(*label);
            if score > best.1 {
                best = (*label, score);
            }
        }
        best
    }

    /// Margin between the top label and the runner-up.
    pub fn margin(&self) -> f64 {
        let (top_label, top) = self.argmax();
        let runner_up = INTENT_LABELS
            .iter()
            .filter(|l| **l != top_label)
            .map(|l| self.get(*l))
            .fold(0.0_f64, f64::max);
        top - runner_up
    }

    fn blend(rule: IntentScores, hint: IntentScores, hint_weight: f64) -> IntentScores {
        let mut out = IntentScores::default();
        for label in INTENT_LABELS {
            let blended =
                rule.get(label) * (1.0 - hint_weight) + hint.get(label) * hint_weight;
            out.set(label, blended);
        }
        out
    }
}

/// Optional auxiliary classifier hook. When a host wires an LLM classifier
/// in, its scores are blended into the rule-based scores at a fixed weight;
/// the pipeline is fully functional without one.
pub trait IntentHint {
    fn intent_scores(&self, section: &Section) -> Option<IntentScores>;
}

const HINT_BLEND_WEIGHT: f64 = 0.3;

/// A section plus its classification outcome. Built once, read-only after.
#[derive(Debug, Clone)]
pub struct ClassifiedSection {
    pub section: Section,
    pub intent: IntentScores,
    /// Dominant label after the all-zero correction below.
    pub argmax: IntentLabel,
    pub is_actionable: bool,
    pub actionable_signal: f64,
    pub out_of_scope_signal: f64,
    pub suggested_kind: SuggestionKind,
    pub kind_confidence: f64,
}

/// Classify one section.
pub fn classify_section(
    section: Section,
    config: &PipelineConfig,
    hint: Option<&dyn IntentHint>,
) -> ClassifiedSection {
    let mut intent = rule_scores(&section);
    if let Some(hint) = hint {
        if let Some(hint_scores) = hint.intent_scores(&section) {
            intent = IntentScores::blend(intent, hint_scores, HINT_BLEND_WEIGHT);
        }
    }

    let has_imperative = section_has_imperative(&section);
    let dominated = intent.communication >= config.t_out_of_scope
        || intent.calendar >= config.t_out_of_scope;

    let mut actionable_signal = base_actionable_signal(&section, &intent);
    // Imperative floor: a sentence opening with a work verb floors the
    // signal at 0.9. The dominance gate is the one thing that beats it;
    // the floor beating everything else is deliberate asymmetry.
    if has_imperative && !dominated {
        actionable_signal = actionable_signal.max(0.9);
    }

    let out_of_scope_signal = intent.communication.max(intent.calendar);
    let (argmax_label, argmax_score) = intent.argmax();
    // A section no family scored at all is inert prose, not a plan change;
    // the all-zero tie must not land on the first label.
    let argmax_label = if argmax_score <= f64::EPSILON {
        IntentLabel::StatusInformational
    } else {
        argmax_label
    };

    let is_actionable = match argmax_label {
        // Plan-change argmax is always actionable, however thin the signal.
        IntentLabel::PlanChange => true,
        IntentLabel::Communication | IntentLabel::Calendar => {
            has_imperative && !dominated && actionable_signal >= config.t_action
        }
        IntentLabel::StatusInformational | IntentLabel::MicroTasks => false,
        _ => actionable_signal >= config.t_action,
    };

    let (suggested_kind, kind_confidence) = arbitrate_kind(&section, &intent, argmax_label);

    log::debug!(
        "event=section_classified section={} label={:?} actionable={} signal={:.2}",
        section.section_id,
        argmax_label,
        is_actionable,
        actionable_signal
    );

    ClassifiedSection {
        section,
        intent,
        argmax: argmax_label,
        is_actionable,
        actionable_signal,
        out_of_scope_signal,
        suggested_kind,
        kind_confidence,
    }
}

fn family_score(hits: usize, per_hit: f64) -> f64 {
    (hits as f64 * per_hit).min(1.0)
}

fn rule_scores(section: &Section) -> IntentScores {
    let text = section.full_text();
    let features = &section.features;

    let timeline = rules::count_family_hits(&text, rules::TIMELINE_KEYWORDS);
    let scope = rules::count_family_hits(&text, rules::SCOPE_KEYWORDS);
    let ownership = rules::count_family_hits(&text, rules::OWNERSHIP_KEYWORDS);
    let priority = rules::count_family_hits(&text, rules::PRIORITY_KEYWORDS);
    let dependency = rules::count_family_hits(&text, rules::DEPENDENCY_KEYWORDS);
    let risk = rules::count_family_hits(&text, rules::RISK_KEYWORDS);
    let status = rules::count_family_hits(&text, rules::STATUS_KEYWORDS);
    let decision = rules::count_family_hits(&text, rules::DECISION_KEYWORDS);
    let communication = rules::count_family_hits(&text, rules::COMMUNICATION_KEYWORDS);
    let calendar = rules::count_family_hits(&text, rules::CALENDAR_KEYWORDS);
    let research = rules::count_family_hits(&text, rules::RESEARCH_KEYWORDS);

    let mut scores = IntentScores::default();

    let mut plan_change = family_score(timeline, 0.30)
        + family_score(scope, 0.30)
        + family_score(ownership, 0.15)
        + family_score(priority, 0.15)
        + family_score(dependency, 0.15)
        + family_score(decision, 0.20);
    if features.has_schedule_delta {
        plan_change += 0.35;
    }
    scores.set(IntentLabel::PlanChange, plan_change);

    let work_verb_sentences = count_work_verb_sentences(section);
    let mut new_workstream = family_score(work_verb_sentences, 0.30);
    if rules::has_explicit_ask(&text) {
        new_workstream += 0.35;
    }
    new_workstream += family_score(rules::strategy_vocab_hits(&text), 0.10);
    if features.list_item_count >= 3 && !features.has_timeline_token() {
        new_workstream += 0.10;
    }
    scores.set(IntentLabel::NewWorkstream, new_workstream);

    let mut status_score = family_score(status, 0.30);
    if features.has_metric && timeline == 0 && scope == 0 {
        status_score += 0.10;
    }
    scores.set(IntentLabel::StatusInformational, status_score);

    scores.set(
        IntentLabel::Communication,
        family_score(communication, 0.35),
    );

    let mut calendar_score = family_score(calendar, 0.35);
    if features.has_date && calendar > 0 {
        calendar_score += 0.15;
    }
    scores.set(IntentLabel::Calendar, calendar_score);

    scores.set(IntentLabel::Research, family_score(research, 0.35));

    let role_lines = section
        .content_lines()
        .filter(|l| rules::is_role_assignment(strip_list_marker(&l.text)))
        .count();
    let mut micro = family_score(role_lines, 0.35);
    if role_lines > 0 && features.line_count <= role_lines + 1 {
        micro += 0.15;
    }
    scores.set(IntentLabel::MicroTasks, micro);

    // Risk phrasing nudges plan-change (risks endanger plans) unless the
    // section is hedged-only; the risk signal scanner owns risk emission.
    if risk > 0 && (timeline > 0 || dependency > 0) {
        scores.set(
            IntentLabel::PlanChange,
            scores.plan_change + family_score(risk, 0.10),
        );
    }

    scores
}

fn base_actionable_signal(section: &Section, intent: &IntentScores) -> f64 {
    let text = section.full_text();
    let mut signal: f64 = 0.0;

    if rules::has_explicit_ask(&text) {
        signal += 0.45;
    }
    if count_work_verb_sentences(section) > 0 {
        signal += 0.30;
    }
    if section.features.list_item_count >= 3 {
        signal += 0.15;
    }
    if section.features.has_schedule_delta {
        signal += 0.30;
    }
    signal += intent.plan_change * 0.25;

    signal.clamp(0.0, 1.0)
}

/// Count sentences (across all content lines) that open with a work verb.
fn count_work_verb_sentences(section: &Section) -> usize {
    section
        .content_lines()
        .filter(|l| l.line_type != LineType::Code)
        .flat_map(|l| util::split_sentences(strip_list_marker(&l.text)))
        .filter(|s| rules::starts_with_work_verb(s))
        .count()
}

fn section_has_imperative(section: &Section) -> bool {
    count_work_verb_sentences(section) > 0
}

pub(crate) fn strip_list_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    let rest = trimmed
        .strip_prefix("- [ ] ")
        .or_else(|| trimmed.strip_prefix("- [x] "))
        .or_else(|| trimmed.strip_prefix("- "))
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "));
    if let Some(rest) = rest {
        return rest;
    }
    // Numbered markers: "3. step"
    if let Some(dot) = trimmed.find(". ") {
        if dot > 0 && trimmed[..dot].chars().all(|c| c.is_ascii_digit()) {
            return &trimmed[dot + 2..];
        }
    }
    trimmed
}

/// Pick the provisional suggestion kind for a section.
///
/// Precedence: a concrete schedule delta or launch keyword wins and yields
/// ProjectUpdate; strategic-narrative and specification-like sections are
/// forced to Idea regardless of intent scores; otherwise the argmax label
/// maps directly.
fn arbitrate_kind(
    section: &Section,
    intent: &IntentScores,
    argmax_label: IntentLabel,
) -> (SuggestionKind, f64) {
    let features = &section.features;
    let heading = section.heading_text.as_deref().unwrap_or("");
    let text = section.full_text();

    let has_delta_evidence = features.has_schedule_delta || features.has_launch_keyword;

    // Strategic narrative must never masquerade as a plan mutation: a
    // strategy-style heading over a bullet list with no concrete delta is
    // an idea even when plan-change intent dominates.
    let strategy_shaped = rules::is_strategy_heading(heading)
        && features.list_item_count >= 3
        && !features.has_schedule_delta;
    if strategy_shaped {
        return (SuggestionKind::Idea, 0.85);
    }

    // Specification/framework sections describe how decisions are made, not
    // what changed; they are never a project update.
    let framework_like = (rules::framework_vocab_hits(heading) >= 1 || rules::framework_vocab_hits(&text) >= 2)
        && !features.has_timeline_token()
        && rules::count_family_hits(&text, rules::STATUS_KEYWORDS) == 0;
    if framework_like {
        return (SuggestionKind::Idea, 0.80);
    }

    if has_delta_evidence {
        return (SuggestionKind::ProjectUpdate, 0.75 + intent.plan_change * 0.25);
    }

    let confidence = (0.55 + intent.margin()).clamp(0.0, 1.0);
    let kind = match argmax_label {
        IntentLabel::PlanChange => SuggestionKind::ProjectUpdate,
        _ => SuggestionKind::Idea,
    };
    (kind, confidence)
}
