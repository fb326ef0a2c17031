//! Signal-seeded candidate patterns
//!
//! Fixed pattern families (feature demand, bug reports, risk phrasing) that
//! scan section text independently of the actionability gate. A confident
//! hit can rescue a section the classifier wrote off.

use regex::Regex;

use crate::classify::strip_list_marker;
use crate::preprocess::{LineType, Section};
use crate::suggest::SuggestionKind;

/// Family of a matched signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    FeatureDemand,
    BugReport,
    RiskFlag,
}

impl SignalKind {
    pub fn suggestion_kind(&self) -> SuggestionKind {
        match self {
            SignalKind::FeatureDemand => SuggestionKind::Idea,
            SignalKind::BugReport => SuggestionKind::Bug,
            SignalKind::RiskFlag => SuggestionKind::Risk,
        }
    }
}

/// One matched line.
#[derive(Debug, Clone)]
pub struct SignalHit {
    pub kind: SignalKind,
    pub pattern_name: &'static str,
    pub confidence: f64,
    /// Note-level line index of the matching line.
    pub line_index: usize,
    /// The matching line, verbatim as it appears in the section.
    pub line_text: String,
}

struct SignalPattern {
    name: &'static str,
    kind: SignalKind,
    confidence: f64,
    regex: Regex,
}

/// Scans section lines for signal-family matches.
pub struct SignalScanner {
    patterns: Vec<SignalPattern>,
}

impl SignalScanner {
    pub fn new() -> Self {
        let patterns = vec![
            SignalPattern {
                name: "feature_request_phrase",
                kind: SignalKind::FeatureDemand,
                confidence: 0.80,
                regex: Regex::new(r"(?i)\bfeature request\b").unwrap(),
            },
            SignalPattern {
                name: "user_demand",
                kind: SignalKind::FeatureDemand,
                confidence: 0.75,
                regex: Regex::new(
                    r"(?i)\b(users?|customers?|teams?|clients?)\s+(want|need|keep asking for|requested|asked for)\b",
                )
                .unwrap(),
            },
            SignalPattern {
                name: "soft_demand",
                kind: SignalKind::FeatureDemand,
                confidence: 0.65,
                regex: Regex::new(r"(?i)\bwould (love|really like)\b").unwrap(),
            },
            SignalPattern {
                name: "broken_behavior",
                kind: SignalKind::BugReport,
                confidence: 0.85,
                regex: Regex::new(
                    r"(?i)\b(is broken|crashes?|doesn'?t work|does not work|fails (to|when|on)|throwing errors?|regression)\b",
                )
                .unwrap(),
            },
            SignalPattern {
                name: "error_rate",
                kind: SignalKind::BugReport,
                confidence: 0.70,
                regex: Regex::new(r"(?i)\b(error rate|5\d\d errors?|timeouts?\s+(spik|increas))\b")
                    .unwrap(),
            },
            SignalPattern {
                name: "at_risk",
                kind: SignalKind::RiskFlag,
                confidence: 0.75,
                regex: Regex::new(r"(?i)\b(at risk|risk of|might slip|could slip|in jeopardy)\b")
                    .unwrap(),
            },
            SignalPattern {
                name: "hard_blocker",
                kind: SignalKind::RiskFlag,
                confidence: 0.70,
                regex: Regex::new(r"(?i)\b(blocked on|hard blocker|single point of failure)\b")
                    .unwrap(),
            },
        ];
        Self { patterns }
    }

    /// Scan a section's content lines. At most one hit per line — the
    /// highest-confidence matching pattern wins; earlier table position
    /// breaks ties so output stays deterministic.
    pub fn scan(&self, section: &Section) -> Vec<SignalHit> {
        let mut hits = Vec::new();
        for line in section.content_lines() {
            if line.line_type == LineType::Code {
                continue;
            }
            let text = strip_list_marker(&line.text);
            let mut best: Option<&SignalPattern> = None;
            for pattern in &self.patterns {
                if pattern.regex.is_match(text) {
                    let better = match best {
                        Some(current) => pattern.confidence > current.confidence,
                        None => true,
                    };
                    if better {
                        best = Some(pattern);
                    }
                }
            }
            if let Some(pattern) = best {
                hits.push(SignalHit {
                    kind: pattern.kind,
                    pattern_name: pattern.name,
                    confidence: pattern.confidence,
                    line_index: line.index,
                    line_text: line.text.trim().to_string(),
                });
            }
        }
        hits
    }
}

impl Default for SignalScanner {
    fn default() -> Self {
        Self::new()
    }
}
