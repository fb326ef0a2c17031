//! Markdown preprocessing
//!
//! Splits a raw note into classified lines, then groups lines into sections
//! at heading boundaries. Sections carry precomputed structural features and
//! a `raw_text` that downstream grounding checks compare against verbatim.

use serde::Serialize;

use crate::rules;

/// Classification of a single normalized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Heading,
    ListItem,
    Paragraph,
    Code,
    Blank,
}

/// One line of the normalized note. Derived once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
    pub line_type: LineType,
    pub indent_level: usize,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.line_type == LineType::Blank
    }
}

/// Precomputed structural signal bag for a section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuralFeatures {
    pub line_count: usize,
    pub list_item_count: usize,
    pub char_count: usize,
    pub has_date: bool,
    pub has_duration: bool,
    pub has_metric: bool,
    pub has_quarter_or_version: bool,
    pub has_launch_keyword: bool,
    pub has_schedule_delta: bool,
    pub topic_anchor_count: usize,
    /// Fraction of non-blank lines mentioning initiative-style phrasing.
    pub initiative_phrase_density: f64,
}

const INITIATIVE_PHRASES: &[&str] = &["initiative", "workstream", "project", "effort", "program"];

impl StructuralFeatures {
    pub fn compute(body_lines: &[Line], raw_text: &str) -> Self {
        let non_blank: Vec<&Line> = body_lines.iter().filter(|l| !l.is_blank()).collect();
        let list_item_count = non_blank
            .iter()
            .filter(|l| l.line_type == LineType::ListItem)
            .count();
        let topic_anchor_count = non_blank
            .iter()
            .filter(|l| rules::is_topic_anchor(&l.text))
            .count();

        let initiative_lines = non_blank
            .iter()
            .filter(|l| {
                let lower = l.text.to_lowercase();
                INITIATIVE_PHRASES.iter().any(|p| lower.contains(p))
            })
            .count();
        let initiative_phrase_density = if non_blank.is_empty() {
            0.0
        } else {
            initiative_lines as f64 / non_blank.len() as f64
        };

        Self {
            line_count: non_blank.len(),
            list_item_count,
            char_count: raw_text.chars().count(),
            has_date: rules::has_date(raw_text),
            has_duration: rules::has_duration(raw_text),
            has_metric: rules::has_metric(raw_text),
            has_quarter_or_version: rules::has_quarter_or_version(raw_text),
            has_launch_keyword: rules::has_launch_keyword(raw_text),
            has_schedule_delta: rules::has_schedule_delta(raw_text),
            topic_anchor_count,
            initiative_phrase_density,
        }
    }

    /// Any concrete timeline/delta token present at all.
    pub fn has_timeline_token(&self) -> bool {
        self.has_date || self.has_duration || self.has_quarter_or_version || self.has_schedule_delta
    }
}

/// A heading-delimited block of the note.
///
/// `raw_text` is exactly the newline-join of the section's source body
/// lines; grounding checks depend on that being byte-for-byte faithful.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub section_id: String,
    pub note_id: String,
    pub heading_text: Option<String>,
    pub heading_level: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub body_lines: Vec<Line>,
    pub features: StructuralFeatures,
    pub raw_text: String,
    /// Set on derived sub-sections; points at the parent section's id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Section {
    /// Derive a read-only sub-section over a slice of this section's body.
    /// The child id is `parent_id + marker`, and the child keeps a back
    /// reference so evidence still resolves against a real line range.
    pub fn derive_sub(&self, marker: &str, body_lines: Vec<Line>, heading_text: Option<String>) -> Section {
        let raw_text = join_lines(&body_lines);
        let start_line = body_lines.first().map(|l| l.index).unwrap_or(self.start_line);
        let end_line = body_lines.last().map(|l| l.index).unwrap_or(self.end_line);
        let features = StructuralFeatures::compute(&body_lines, &raw_text);
        Section {
            section_id: format!("{}{}", self.section_id, marker),
            note_id: self.note_id.clone(),
            heading_text: heading_text.or_else(|| self.heading_text.clone()),
            heading_level: self.heading_level,
            start_line,
            end_line,
            body_lines,
            features,
            raw_text,
            parent_id: Some(self.section_id.clone()),
        }
    }

    /// Non-blank body lines in order.
    pub fn content_lines(&self) -> impl Iterator<Item = &Line> {
        self.body_lines.iter().filter(|l| !l.is_blank())
    }

    /// Heading plus body, for matching that should see both.
    pub fn full_text(&self) -> String {
        match &self.heading_text {
            Some(h) => format!("{}\n{}", h, self.raw_text),
            None => self.raw_text.clone(),
        }
    }
}

fn join_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-invocation id arena. A fresh context per note guarantees two runs
/// never share section or suggestion ids.
#[derive(Debug)]
pub struct RunContext {
    note_id: String,
    section_seq: usize,
    suggestion_seq: usize,
}

impl RunContext {
    pub fn new(note_id: &str) -> Self {
        Self {
            note_id: note_id.to_string(),
            section_seq: 0,
            suggestion_seq: 0,
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn next_section_id(&mut self) -> String {
        self.section_seq += 1;
        format!("{}:s{}", self.note_id, self.section_seq)
    }

    pub fn next_suggestion_id(&mut self) -> String {
        self.suggestion_seq += 1;
        format!("{}:c{}", self.note_id, self.suggestion_seq)
    }
}

/// Preprocessor output: the full line list plus grouped sections.
#[derive(Debug)]
pub struct Preprocessed {
    pub lines: Vec<Line>,
    pub sections: Vec<Section>,
}

/// Split raw markdown into classified lines and heading-bounded sections.
pub fn preprocess(note_id: &str, raw_markdown: &str, ctx: &mut RunContext) -> Preprocessed {
    let lines = classify_lines(raw_markdown);
    let sections = group_sections(note_id, &lines, ctx);
    Preprocessed { lines, sections }
}

fn classify_lines(raw: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut in_code_block = false;
    let mut prev_nonblank_type: Option<LineType> = None;
    let mut prev_nonblank_ends_colon = false;

    for (index, text) in raw.lines().enumerate() {
        let indent_level = leading_indent(text);
        let trimmed = text.trim();

        let line_type = if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            LineType::Code
        } else if in_code_block {
            LineType::Code
        } else if trimmed.is_empty() {
            LineType::Blank
        } else if trimmed.starts_with('#') {
            LineType::Heading
        } else if is_bullet_item(trimmed) {
            LineType::ListItem
        } else if is_numbered_item(trimmed) {
            // A numbered line is a heading only at column 0; indented, it is
            // an outline item. At column 0 it still continues a list when the
            // previous line was a list item or a lead-in ending with a colon.
            if indent_level > 0
                || prev_nonblank_type == Some(LineType::ListItem)
                || prev_nonblank_ends_colon
            {
                LineType::ListItem
            } else {
                LineType::Heading
            }
        } else {
            LineType::Paragraph
        };

        if line_type != LineType::Blank {
            prev_nonblank_type = Some(line_type);
            prev_nonblank_ends_colon = trimmed.ends_with(':');
        }

        lines.push(Line {
            index,
            text: text.to_string(),
            line_type,
            indent_level,
        });
    }

    lines
}

fn leading_indent(text: &str) -> usize {
    let mut indent = 0;
    for c in text.chars() {
        match c {
            ' ' => indent += 1,
            '\t' => indent += 4,
            _ => break,
        }
    }
    indent
}

fn is_bullet_item(trimmed: &str) -> bool {
    trimmed.starts_with("- ")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("+ ")
        || trimmed.starts_with("- [")
}

fn is_numbered_item(trimmed: &str) -> bool {
    let Some(dot) = trimmed.find(". ") else {
        return false;
    };
    dot > 0 && trimmed[..dot].chars().all(|c| c.is_ascii_digit())
}

fn heading_level(line: &Line) -> usize {
    let trimmed = line.text.trim();
    if trimmed.starts_with('#') {
        trimmed.chars().take_while(|c| *c == '#').count()
    } else {
        // Numbered headings sit below any markdown `#` structure
        2
    }
}

fn heading_text(line: &Line) -> String {
    let trimmed = line.text.trim();
    if trimmed.starts_with('#') {
        trimmed.trim_start_matches('#').trim().to_string()
    } else if let Some(dot) = trimmed.find(". ") {
        trimmed[dot + 2..].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

fn group_sections(note_id: &str, lines: &[Line], ctx: &mut RunContext) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_heading: Option<&Line> = None;
    let mut body: Vec<Line> = Vec::new();

    let flush = |heading: Option<&Line>, body: &mut Vec<Line>, ctx: &mut RunContext, out: &mut Vec<Section>| {
        if body.iter().all(|l| l.is_blank()) {
            body.clear();
            return;
        }
        let raw_text = join_lines(body);
        let features = StructuralFeatures::compute(body, &raw_text);
        let start_line = body.first().map(|l| l.index).unwrap_or(0);
        let end_line = body.last().map(|l| l.index).unwrap_or(start_line);
        out.push(Section {
            section_id: ctx.next_section_id(),
            note_id: note_id.to_string(),
            heading_text: heading.map(heading_text),
            heading_level: heading.map(heading_level).unwrap_or(0),
            start_line,
            end_line,
            body_lines: std::mem::take(body),
            features,
            raw_text,
            parent_id: None,
        });
    };

    for line in lines {
        if line.line_type == LineType::Heading {
            flush(current_heading, &mut body, ctx, &mut sections);
            current_heading = Some(line);
        } else {
            body.push(line.clone());
        }
    }
    flush(current_heading, &mut body, ctx, &mut sections);

    sections
}
