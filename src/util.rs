use std::collections::HashSet;

pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Truncate at a word boundary, never mid-word. The result is at most `max`
/// characters and re-truncating an already-truncated string is a no-op.
pub fn truncate_at_word(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    match head.rfind(char::is_whitespace) {
        Some(cut) if cut > 0 => head[..cut].trim_end().to_string(),
        _ => head,
    }
}

/// Compute a stable hash of a byte string (FNV-1a 64-bit).
pub fn hash_bytes(content: &[u8]) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in content {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{:016x}", hash)
}

pub fn hash_str(content: &str) -> String {
    hash_bytes(content.as_bytes())
}

/// Lowercase, strip punctuation, collapse whitespace. Used wherever two
/// pieces of note text must compare as "the same words".
pub fn normalize_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Split free text into sentences. Periods, exclamation marks, question
/// marks, and ellipses all end a sentence; abbreviation handling is not
/// attempted since note text rarely needs it.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '…') {
            // Swallow runs of terminators ("...", "?!") into one boundary
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '…') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Fraction of `a`'s distinct words that also appear in `b`, in [0, 1].
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let a_words: HashSet<&str> = normalize_words_set(a);
    if a_words.is_empty() {
        return 0.0;
    }
    let b_words: HashSet<&str> = normalize_words_set(b);
    let shared = a_words.iter().filter(|w| b_words.contains(**w)).count();
    shared as f64 / a_words.len() as f64
}

fn normalize_words_set(s: &str) -> HashSet<&str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .collect()
}

/// Symmetric token similarity (Jaccard) over distinct words, in [0, 1].
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let a_norm = normalize_words(a);
    let b_norm = normalize_words(b);
    let a_words: HashSet<&str> = a_norm.split(' ').filter(|w| w.len() >= 3).collect();
    let b_words: HashSet<&str> = b_norm.split(' ').filter(|w| w.len() >= 3).collect();
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let shared = a_words.intersection(&b_words).count();
    let union = a_words.union(&b_words).count();
    shared as f64 / union as f64
}
