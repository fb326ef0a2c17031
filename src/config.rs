//! Pipeline configuration
//!
//! Thresholds and caps for the extraction pipeline. Hosts deserialize this
//! from their own settings store; every field has a tuned default so a
//! partial config is always valid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum actionable signal for a section to pass the actionability gate
    pub t_action: f64,
    /// Communication/calendar dominance level that overrides the imperative floor
    pub t_out_of_scope: f64,
    /// Overall score below which a suggestion is flagged for clarification
    pub t_overall_min: f64,
    /// Section actionability below which a suggestion is flagged for clarification
    pub t_section_min: f64,
    /// Title-specificity floor; vaguer titles get evidence enrichment
    pub t_generic: f64,
    /// Minimum similarity for attaching a suggestion to an existing initiative
    pub t_attach: f64,
    /// Evidence spans shorter than this are treated as empty
    pub min_evidence_chars: usize,
    /// Hard cap on emitted idea-kind suggestions per note
    pub max_suggestions: usize,
    /// Emit the per-section/per-candidate decision ledger alongside output
    pub enable_debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            t_action: 0.45,
            t_out_of_scope: 0.75,
            t_overall_min: 0.40,
            t_section_min: 0.35,
            t_generic: 0.50,
            t_attach: 0.30,
            min_evidence_chars: 12,
            max_suggestions: 15,
            enable_debug: false,
        }
    }
}
