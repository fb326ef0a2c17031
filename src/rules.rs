//! Canonical rule tables
//!
//! Every keyword family, marker vocabulary, and shared pattern the pipeline
//! matches against lives here, once. Classification and synthesis must pull
//! from the same tables; keeping a second copy of any of these lists is how
//! drift starts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bumped whenever a table changes in a way that can alter emitted output.
pub const RULES_VERSION: &str = "2026-06";

/// Work verbs recognized both as imperative sentence openers (classification)
/// and as explicit-ask verbs (synthesis). One table, two consumers.
pub const WORK_VERBS: &[&str] = &[
    "add",
    "implement",
    "build",
    "fix",
    "enable",
    "create",
    "support",
    "introduce",
    "integrate",
    "automate",
    "expose",
    "extend",
    "simplify",
    "improve",
    "migrate",
    "refactor",
    "reduce",
    "streamline",
    "consolidate",
    "document",
    "instrument",
];

/// Check whether a word is a recognized work verb (case-insensitive).
pub fn is_work_verb(word: &str) -> bool {
    let lower = word.to_lowercase();
    WORK_VERBS.iter().any(|v| *v == lower)
}

/// Does this sentence open with an imperative work verb?
pub fn starts_with_work_verb(sentence: &str) -> bool {
    sentence
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .next()
        .map(is_work_verb)
        .unwrap_or(false)
}

/// Explicit-ask markers: phrasing that turns a line into a direct request.
///
/// Known gap carried over from the tuned rule set: "requirement to add X" /
/// "requirement to build X" phrasings are absent. Tests pin the current
/// behavior; widening this table changes emission for existing notes.
pub static EXPLICIT_ASK_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let verbs = WORK_VERBS.join("|");
    vec![
        Regex::new(r"(?i)\bwe should\b").unwrap(),
        Regex::new(r"(?i)\bsuggestion:\s*").unwrap(),
        Regex::new(&format!(r"(?i)\brequest to ({verbs})\b")).unwrap(),
        Regex::new(&format!(r"(?i)\bneed(s)? to ({verbs})\b")).unwrap(),
        Regex::new(&format!(r"(?i)\blet'?s ({verbs})\b")).unwrap(),
        Regex::new(r"(?i)\bit would be (great|good|useful) to\b").unwrap(),
        Regex::new(r"(?i)\bproposal:\s*").unwrap(),
    ]
});

/// True when a line carries an explicit ask marker.
pub fn has_explicit_ask(text: &str) -> bool {
    EXPLICIT_ASK_RES.iter().any(|re| re.is_match(text))
}

// ---------------------------------------------------------------------------
// Intent keyword families, one per classification dimension
// ---------------------------------------------------------------------------

pub const TIMELINE_KEYWORDS: &[&str] = &[
    "delayed",
    "moved",
    "pushed",
    "slipped",
    "postponed",
    "rescheduled",
    "now targeting",
    "new target",
    "deadline",
    "timeline",
    "behind schedule",
    "ahead of schedule",
];

pub const SCOPE_KEYWORDS: &[&str] = &[
    "descope",
    "descoped",
    "cut from scope",
    "out of scope",
    "added to scope",
    "expand scope",
    "reduce scope",
    "scope change",
    "dropping",
];

pub const OWNERSHIP_KEYWORDS: &[&str] = &[
    "owner",
    "owns",
    "assigned to",
    "taking over",
    "handing off",
    "handoff",
    "responsible for",
];

pub const PRIORITY_KEYWORDS: &[&str] = &[
    "prioritize",
    "deprioritize",
    "deprioritized",
    "top priority",
    "p0",
    "p1",
    "urgent",
    "critical path",
];

pub const DEPENDENCY_KEYWORDS: &[&str] = &[
    "blocked",
    "blocker",
    "depends on",
    "waiting on",
    "prerequisite",
    "unblocked",
];

pub const RISK_KEYWORDS: &[&str] = &[
    "risk",
    "at risk",
    "concern",
    "worried",
    "jeopardy",
    "might slip",
    "could slip",
];

pub const STATUS_KEYWORDS: &[&str] = &[
    "on track",
    "completed",
    "complete",
    "done",
    "shipped",
    "no changes",
    "progress",
    "status",
    "update",
    "green",
    "as planned",
    "going well",
];

pub const DECISION_KEYWORDS: &[&str] = &[
    "decided",
    "decision",
    "agreed",
    "approved",
    "aligned",
    "sign-off",
    "signed off",
    "go with",
    "we will",
];

pub const COMMUNICATION_KEYWORDS: &[&str] = &[
    "email",
    "reach out",
    "announce",
    "announcement",
    "share with",
    "loop in",
    "follow up with",
    "send out",
    "notify",
    "present to",
    "circulate",
];

pub const CALENDAR_KEYWORDS: &[&str] = &[
    "meeting",
    "schedule a",
    "invite",
    "calendar",
    "book a room",
    "standup",
    "1:1",
    "offsite",
    "reschedule the",
];

pub const RESEARCH_KEYWORDS: &[&str] = &[
    "investigate",
    "research",
    "look into",
    "explore whether",
    "dig into",
    "evaluate options",
    "spike on",
    "benchmark",
];

/// Count how many keywords of a family appear in the text (case-insensitive).
pub fn count_family_hits(text: &str, family: &[&str]) -> usize {
    let lower = text.to_lowercase();
    family.iter().filter(|k| lower.contains(*k)).count()
}

// ---------------------------------------------------------------------------
// Schedule / delta detection
// ---------------------------------------------------------------------------

pub const SCHEDULE_EVENT_KEYWORDS: &[&str] = &[
    "launch", "deploy", "ship", "eta", "milestone", "release", "rollout", "go-live",
];

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b
        | \b\d{4}-\d{2}-\d{2}\b
        | \b\d{1,2}/\d{1,2}(/\d{2,4})?\b
        ",
    )
    .unwrap()
});

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\s+(day|week|month|sprint)s?\b").unwrap());

static QUARTER_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(q[1-4](\s+\d{4})?|v\d+(\.\d+)*)\b").unwrap());

static METRIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+(\.\d+)?\s*(%|percent|ms|s\b|x\b|pts?\b)").unwrap());

/// A concrete schedule delta: a move/delay verb in the company of a date or
/// duration, or a bare "by N days/weeks" style shift.
static SCHEDULE_DELTA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(moved|delayed|pushed|slipped|postponed|rescheduled)\b").unwrap()
});

pub fn has_date(text: &str) -> bool {
    DATE_RE.is_match(text)
}

pub fn has_duration(text: &str) -> bool {
    DURATION_RE.is_match(text)
}

pub fn has_quarter_or_version(text: &str) -> bool {
    QUARTER_VERSION_RE.is_match(text)
}

pub fn has_metric(text: &str) -> bool {
    METRIC_RE.is_match(text)
}

pub fn has_launch_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCHEDULE_EVENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A concrete schedule delta requires both a movement verb and an anchor
/// (date, duration, quarter, or version) somewhere in the same text.
pub fn has_schedule_delta(text: &str) -> bool {
    SCHEDULE_DELTA_RE.is_match(text)
        && (has_date(text) || has_duration(text) || has_quarter_or_version(text))
}

/// Extract the most concrete delta token from text, preferring explicit
/// dates over durations over quarter/version references.
pub fn extract_delta_token(text: &str) -> Option<String> {
    if let Some(m) = DATE_RE.find(text) {
        return Some(m.as_str().to_string());
    }
    if let Some(m) = DURATION_RE.find(text) {
        return Some(m.as_str().to_string());
    }
    QUARTER_VERSION_RE.find(text).map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Heading vocabularies
// ---------------------------------------------------------------------------

/// Meeting-process headings that produce noise, not content.
pub const PROCESS_NOISE_HEADINGS: &[&str] = &[
    "next steps",
    "action items",
    "summary",
    "recap",
    "tl;dr",
    "tldr",
    "agenda",
    "attendees",
    "housekeeping",
    "follow ups",
    "follow-ups",
];

/// Headings too generic to title a suggestion on their own.
pub const GENERIC_HEADINGS: &[&str] = &[
    "discussion",
    "discussion details",
    "notes",
    "misc",
    "other",
    "general",
    "updates",
    "context",
    "background",
];

static STRATEGY_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(strategy|approach|framework|system|playbook|principles|model)\b").unwrap()
});

/// Specification/framework vocabulary. Sections dominated by these tokens
/// describe how something is decided, not what changed.
pub const FRAMEWORK_VOCAB: &[&str] = &[
    "scoring",
    "eligibility",
    "framework",
    "weighting",
    "additionality",
    "prioritization",
    "rubric",
    "criteria",
    "formula",
    "thresholds",
];

/// Strategy/mechanism/feature vocabulary used by semantic idea extraction.
pub const STRATEGY_VOCAB: &[&str] = &[
    "strategy",
    "mechanism",
    "feature",
    "loop",
    "flywheel",
    "incentive",
    "gamification",
    "leaderboard",
    "streak",
    "referral",
    "onboarding",
    "retention",
    "personalization",
    "recommendation",
    "engagement",
    "habit",
];

/// Strip emoji and decoration so "🚀 Next Steps 🚀" matches "next steps".
pub fn normalize_heading(heading: &str) -> String {
    heading
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == ';' || *c == '-')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_process_noise_heading(heading: &str) -> bool {
    let normalized = normalize_heading(heading);
    PROCESS_NOISE_HEADINGS.iter().any(|h| normalized == *h)
}

pub fn is_generic_heading(heading: &str) -> bool {
    let normalized = normalize_heading(heading);
    GENERIC_HEADINGS.iter().any(|h| normalized == *h)
}

pub fn is_strategy_heading(heading: &str) -> bool {
    STRATEGY_HEADING_RE.is_match(heading)
}

/// Count distinct framework-vocabulary tokens present in the text.
pub fn framework_vocab_hits(text: &str) -> usize {
    let lower = text.to_lowercase();
    FRAMEWORK_VOCAB.iter().filter(|k| lower.contains(*k)).count()
}

/// Count distinct strategy-vocabulary tokens present in the text.
pub fn strategy_vocab_hits(text: &str) -> usize {
    let lower = text.to_lowercase();
    STRATEGY_VOCAB.iter().filter(|k| lower.contains(*k)).count()
}

// ---------------------------------------------------------------------------
// Line-shape patterns shared across stages
// ---------------------------------------------------------------------------

/// Hedged risk phrasing. Excluded from anchor selection unless the line also
/// carries an ask marker or a work verb.
static CONCERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(concern|concerned|worried|risk)\s+that\b").unwrap());

pub fn is_hedged_concern(text: &str) -> bool {
    CONCERN_RE.is_match(text)
}

/// Role-assignment lines: "PM to document requirements", "Dana to own rollout".
static ROLE_ASSIGNMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z]*(?:\s[A-Z][A-Za-z]*)?\s+to\s+[a-z]+").unwrap()
});

pub fn is_role_assignment(line: &str) -> bool {
    ROLE_ASSIGNMENT_RE.is_match(line.trim())
}

/// Topic anchors inside mixed sections: "Project Timelines:" style lead-ins.
static TOPIC_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9 /&'-]{2,40}:(\s|$)").unwrap());

pub fn is_topic_anchor(line: &str) -> bool {
    let trimmed = line.trim();
    TOPIC_ANCHOR_RE.is_match(trimmed) && !is_role_assignment(trimmed)
}

/// Trailing decision-status markers on table rows and decision lines.
static STATUS_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[-–—:]?\s*\b(approved|aligned|pending|agreed|signed off)\s*$").unwrap()
});

/// Strip a trailing status marker; for pipe-delimited rows keep only the
/// first (decision) column.
pub fn normalize_decision_line(line: &str) -> String {
    let first_col = match line.trim().trim_matches('|').split('|').next() {
        Some(col) => col.trim(),
        None => line.trim(),
    };
    STATUS_MARKER_RE.replace(first_col, "").trim().to_string()
}

static ENGAGEMENT_LOOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(engagement|retention|habit|game)\s+loop\b").unwrap()
});

// ---------------------------------------------------------------------------
// Title normalization tables
// ---------------------------------------------------------------------------

/// Hedging lead-ins stripped from titles. Order matters: longer phrases
/// first so "maybe we could" never leaves a dangling "could".
pub const WEAK_TITLE_PREFIXES: &[&str] = &[
    "maybe we could",
    "maybe we should",
    "i think we should",
    "it would be great to",
    "it would be good to",
    "it would be useful to",
    "we should probably",
    "we should",
    "we could",
    "suggestion:",
    "proposal:",
    "let's",
    "lets",
    "maybe",
    "perhaps",
];

/// Non-imperative verb forms mapped to their imperative stem. Applied only
/// to the first word of a title, so "fixed the fixed-width layout" is safe.
pub const VERB_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("adding", "add"),
    ("adds", "add"),
    ("added", "add"),
    ("implementing", "implement"),
    ("implements", "implement"),
    ("implemented", "implement"),
    ("building", "build"),
    ("builds", "build"),
    ("built", "build"),
    ("fixing", "fix"),
    ("fixes", "fix"),
    ("fixed", "fix"),
    ("enabling", "enable"),
    ("enables", "enable"),
    ("enabled", "enable"),
    ("creating", "create"),
    ("creates", "create"),
    ("created", "create"),
    ("improving", "improve"),
    ("improves", "improve"),
    ("improved", "improve"),
    ("supporting", "support"),
    ("supports", "support"),
    ("integrating", "integrate"),
    ("integrates", "integrate"),
    ("reducing", "reduce"),
    ("reduces", "reduce"),
];

/// Imperative stem for a title's first word, if the table knows it.
pub fn imperative_stem(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    VERB_SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == lower)
        .map(|(_, to)| *to)
}

pub fn engagement_loop_phrase(text: &str) -> Option<String> {
    ENGAGEMENT_LOOP_RE.find(text).map(|m| m.as_str().to_string())
}
