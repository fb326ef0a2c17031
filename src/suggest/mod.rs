//! Suggestion model
//!
//! The candidate type threaded through synthesis, validation, scoring,
//! consolidation, routing, and title normalization. Candidates are created
//! by exactly one synthesis strategy, annotated by later stages, and only
//! ever removed with a drop record — never mutated into an invalid state.

use serde::Serialize;

use crate::util;

/// What a suggestion proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// A mutation to an existing plan (schedule/scope/ownership change)
    ProjectUpdate,
    /// A new-initiative or improvement idea
    Idea,
    /// A surfaced risk
    Risk,
    /// A reported defect
    Bug,
}

impl SuggestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SuggestionKind::ProjectUpdate => "Update",
            SuggestionKind::Idea => "Idea",
            SuggestionKind::Risk => "Risk",
            SuggestionKind::Bug => "Bug",
        }
    }
}

/// Which extraction strategy created a candidate. Grounding enforcement is
/// scoped by origin: signal-seeded and dense-paragraph evidence must appear
/// verbatim in the source section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    Canonical,
    DenseParagraph,
    SignalSeeded,
    SemanticIdea,
    StructuralBypass,
    ActionItems,
}

impl CandidateOrigin {
    /// Origins whose evidence must be verbatim-present in the section.
    pub fn requires_verbatim_evidence(&self) -> bool {
        matches!(
            self,
            CandidateOrigin::SignalSeeded | CandidateOrigin::DenseParagraph
        )
    }
}

/// Type-specific payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPayload {
    /// For plan mutations: the proposed after-state, extractively assembled.
    AfterDescription(String),
    /// For ideas: a draft initiative the user can accept as-is.
    DraftInitiative { title: String, description: String },
}

/// A contiguous evidence span inside the owning section.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceSpan {
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

impl EvidenceSpan {
    pub fn single(line: usize, text: impl Into<String>) -> Self {
        Self {
            start_line: line,
            end_line: line,
            text: text.into(),
        }
    }
}

/// Stage scores plus the final combined confidence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionScores {
    pub section_actionability: f64,
    pub kind_confidence: f64,
    pub synthesis_confidence: f64,
    pub overall: f64,
}

/// Routing outcome for a surviving suggestion.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    #[default]
    CreateNew,
    AttachTo {
        initiative_id: String,
    },
}

/// Card-preview context assembled for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionContext {
    pub title: String,
    pub body: String,
    pub evidence_preview: Vec<String>,
    pub source_section_id: String,
    pub source_heading: Option<String>,
}

/// A proposed plan change, idea, risk, or bug derived from one section.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub suggestion_id: String,
    pub note_id: String,
    pub section_id: String,
    pub kind: SuggestionKind,
    pub title: String,
    pub body: String,
    pub payload: SuggestionPayload,
    pub evidence: Vec<EvidenceSpan>,
    pub scores: SuggestionScores,
    pub routing: Routing,
    /// Content-addressed deduplication key, stable across runs.
    pub suggestion_key: String,
    pub origin: CandidateOrigin,
    pub needs_clarification: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clarification_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SuggestionContext>,
}

impl Suggestion {
    /// Derive the content-addressed key: note, section, kind, and the title
    /// normalized down to its words. Two strategies emitting the same claim
    /// from the same section collide here, which is the point.
    pub fn make_key(note_id: &str, section_id: &str, kind: SuggestionKind, title: &str) -> String {
        let normalized = util::normalize_words(title);
        util::hash_str(&format!("{note_id}|{section_id}|{:?}|{normalized}", kind))
    }

    pub fn refresh_key(&mut self) {
        self.suggestion_key =
            Self::make_key(&self.note_id, &self.section_id, self.kind, &self.title);
    }

    /// Non-empty evidence lines, flattened for grounding checks.
    pub fn evidence_lines(&self) -> impl Iterator<Item = &str> {
        self.evidence
            .iter()
            .flat_map(|span| span.text.lines())
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Pipeline stage at which a candidate was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropStage {
    Synthesis,
    Validation,
    Grounding,
    Scoring,
}

/// Machine-readable drop cause. Closed set; regression tests assert on
/// these, so free text only ever rides along in `DropRecord::detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    DuplicateKey,
    VacuousTitle,
    HeadingOnlyAnchor,
    EmptyEvidence,
    EvidenceOutOfBounds,
    UngroundedEvidence,
    SuggestionCap,
    InternalError,
}

/// One removed candidate, with enough context to debug the removal.
#[derive(Debug, Clone, Serialize)]
pub struct DropRecord {
    pub suggestion_key: String,
    pub section_id: String,
    pub stage: DropStage,
    pub reason: DropReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DropRecord {
    pub fn new(
        suggestion: &Suggestion,
        stage: DropStage,
        reason: DropReason,
        detail: Option<String>,
    ) -> Self {
        Self {
            suggestion_key: suggestion.suggestion_key.clone(),
            section_id: suggestion.section_id.clone(),
            stage,
            reason,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_key_is_deterministic() {
        let a = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Idea, "Add alert banners");
        let b = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Idea, "Add alert banners");
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggestion_key_ignores_title_punctuation() {
        let a = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Idea, "Add alert banners!");
        let b = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Idea, "add  alert banners");
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggestion_key_varies_by_kind_and_section() {
        let idea = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Idea, "Add banners");
        let bug = Suggestion::make_key("n1", "n1:s1", SuggestionKind::Bug, "Add banners");
        let other = Suggestion::make_key("n1", "n1:s2", SuggestionKind::Idea, "Add banners");
        assert_ne!(idea, bug);
        assert_ne!(idea, other);
    }

    #[test]
    fn test_drop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&DropReason::UngroundedEvidence).unwrap();
        assert_eq!(json, r#""ungrounded_evidence""#);
    }
}
