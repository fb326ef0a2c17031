//! Initiative routing
//!
//! Attaches each surviving suggestion to the most similar existing
//! initiative, or marks it for new-initiative creation. The similarity
//! computation is host business logic behind a trait; the built-in matcher
//! is a deterministic token-overlap baseline.

use crate::config::PipelineConfig;
use crate::note::InitiativeSnapshot;
use crate::suggest::{Routing, Suggestion};
use crate::util;

/// Matching contract: candidate text against the initiative list, yielding
/// the best match and its similarity in [0, 1].
pub trait InitiativeMatcher {
    fn best_match(
        &self,
        candidate_text: &str,
        initiatives: &[InitiativeSnapshot],
    ) -> Option<(String, f64)>;
}

/// Baseline matcher: Jaccard similarity over distinct words of the
/// suggestion text and each initiative's title plus summary.
pub struct TokenOverlapMatcher;

impl InitiativeMatcher for TokenOverlapMatcher {
    fn best_match(
        &self,
        candidate_text: &str,
        initiatives: &[InitiativeSnapshot],
    ) -> Option<(String, f64)> {
        let mut best: Option<(String, f64)> = None;
        for initiative in initiatives {
            let initiative_text = format!("{} {}", initiative.title, initiative.summary);
            let similarity = util::token_similarity(candidate_text, &initiative_text);
            let better = match &best {
                Some((_, current)) => similarity > *current,
                None => true,
            };
            if better {
                best = Some((initiative.initiative_id.clone(), similarity));
            }
        }
        best
    }
}

/// Route every suggestion. Mutates routing in place.
pub fn route(
    suggestions: &mut [Suggestion],
    initiatives: &[InitiativeSnapshot],
    config: &PipelineConfig,
    matcher: &dyn InitiativeMatcher,
) {
    for suggestion in suggestions.iter_mut() {
        let text = format!("{} {}", suggestion.title, suggestion.body);
        suggestion.routing = match matcher.best_match(&text, initiatives) {
            Some((initiative_id, similarity)) if similarity >= config.t_attach => {
                log::debug!(
                    "event=suggestion_routed key={} initiative={} similarity={:.2}",
                    suggestion.suggestion_key,
                    initiative_id,
                    similarity
                );
                Routing::AttachTo { initiative_id }
            }
            _ => Routing::CreateNew,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::{
        CandidateOrigin, EvidenceSpan, SuggestionKind, SuggestionPayload, SuggestionScores,
    };

    fn suggestion(title: &str, body: &str) -> Suggestion {
        Suggestion {
            suggestion_id: "n1:c1".into(),
            note_id: "n1".into(),
            section_id: "n1:s1".into(),
            kind: SuggestionKind::Idea,
            title: title.to_string(),
            body: body.to_string(),
            payload: SuggestionPayload::DraftInitiative {
                title: title.to_string(),
                description: body.to_string(),
            },
            evidence: vec![EvidenceSpan::single(1, body)],
            scores: SuggestionScores::default(),
            routing: Routing::CreateNew,
            suggestion_key: "key-1".into(),
            origin: CandidateOrigin::Canonical,
            needs_clarification: false,
            clarification_reasons: Vec::new(),
            context: None,
        }
    }

    #[test]
    fn test_similar_suggestion_attaches() {
        let initiatives = vec![
            InitiativeSnapshot::new("init-1", "Checkout latency", "reduce checkout flow latency"),
            InitiativeSnapshot::new("init-2", "Mobile onboarding", "revamp mobile onboarding"),
        ];
        let mut suggestions = vec![suggestion(
            "Reduce checkout flow latency",
            "reduce checkout latency further",
        )];
        route(
            &mut suggestions,
            &initiatives,
            &PipelineConfig::default(),
            &TokenOverlapMatcher,
        );
        match &suggestions[0].routing {
            Routing::AttachTo { initiative_id } => assert_eq!(initiative_id, "init-1"),
            Routing::CreateNew => panic!("expected attachment"),
        }
    }

    #[test]
    fn test_dissimilar_suggestion_creates_new() {
        let initiatives = vec![InitiativeSnapshot::new(
            "init-1",
            "Checkout latency",
            "reduce checkout flow latency",
        )];
        let mut suggestions = vec![suggestion(
            "Add streak rewards",
            "gamified streak rewards for daily usage",
        )];
        route(
            &mut suggestions,
            &initiatives,
            &PipelineConfig::default(),
            &TokenOverlapMatcher,
        );
        assert!(matches!(suggestions[0].routing, Routing::CreateNew));
    }

    #[test]
    fn test_empty_initiative_list_creates_new() {
        let mut suggestions = vec![suggestion("Anything", "anything at all")];
        route(
            &mut suggestions,
            &[],
            &PipelineConfig::default(),
            &TokenOverlapMatcher,
        );
        assert!(matches!(suggestions[0].routing, Routing::CreateNew));
    }
}
