//! Prompt rendering and response parsing shared by the checkers.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::errors::CheckError;
use crate::retrieval::{rank_by_score, EvidenceChunk};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]").expect("valid token regex"));

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(evidence|hypothesis|samples)\}").expect("valid placeholder regex"));

static LEADING_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^[^\p{L}\p{N}]*([\p{L}\p{N}]+)(.*)$").expect("valid leading word regex")
});

static NUMBERED_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[\(\[#]?(\d+)[\)\]]?\s*[:.)\-]?\s*(.*)$").expect("valid numbered line regex")
});

const AFFIRMATIVE: &[&str] = &["yes"];
const NEGATIVE: &[&str] = &["no"];

/// Approximate token count: word runs plus individual punctuation marks.
pub fn estimate_tokens(text: &str) -> usize {
    TOKEN_RE.find_iter(text).count()
}

/// Cut `text` after its first `max_tokens` tokens.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    if max_tokens == 0 {
        return "";
    }
    match TOKEN_RE.find_iter(text).nth(max_tokens - 1) {
        Some(last) => &text[..last.end()],
        None => text,
    }
}

/// Context block built from the top-ranked evidence
#[derive(Debug, Clone, PartialEq)]
pub struct PackedEvidence {
    pub context: String,
    pub chunks_used: usize,
    pub tokens: usize,
    pub truncated: bool,
}

impl PackedEvidence {
    pub fn is_empty(&self) -> bool {
        self.context.trim().is_empty()
    }
}

/// Concatenate the highest-scoring chunks while they fit in `token_budget`.
///
/// Packing stops at the first chunk that does not fit. When even the top chunk
/// is over budget it is truncated to the budget instead of dropped.
pub fn pack_evidence(chunks: &[EvidenceChunk], token_budget: usize) -> PackedEvidence {
    let mut parts: Vec<&str> = Vec::new();
    let mut tokens = 0;
    let mut truncated = false;

    for chunk in rank_by_score(chunks) {
        let text = chunk.text.trim();
        if text.is_empty() {
            continue;
        }

        let chunk_tokens = estimate_tokens(text);
        if tokens + chunk_tokens <= token_budget {
            parts.push(text);
            tokens += chunk_tokens;
        } else {
            if parts.is_empty() {
                parts.push(truncate_to_tokens(text, token_budget));
                tokens = token_budget.min(chunk_tokens);
                truncated = true;
            }
            break;
        }
    }

    PackedEvidence {
        chunks_used: parts.len(),
        context: parts.join("\n"),
        tokens,
        truncated,
    }
}

/// Substitute `{evidence}`, `{hypothesis}` and `{samples}` in a single pass, so
/// placeholder-looking text inside the values is left alone.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let lookup: HashMap<&str, &str> = values.iter().copied().collect();
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match lookup.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Number samples one per line for the batched consistency prompt.
pub fn format_numbered_samples(samples: &[String]) -> String {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}: {}", i + 1, s.split_whitespace().collect::<Vec<_>>().join(" ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Yes/no answer extracted from a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YesNo {
    pub affirmative: bool,
    pub rationale: Option<String>,
}

/// Read the leading yes/no token of a completion.
///
/// Case and surrounding punctuation are ignored. Whatever follows the token is
/// kept as the rationale. Any other leading word is a parse failure.
pub fn parse_yes_no(response: &str) -> Result<YesNo, CheckError> {
    let normalized: String = response.nfkc().collect();
    let parse_error = || CheckError::Parse { response: response.to_string() };

    let caps = LEADING_WORD_RE.captures(normalized.trim()).ok_or_else(parse_error)?;
    let token = caps[1].to_lowercase();

    let affirmative = if AFFIRMATIVE.contains(&token.as_str()) {
        true
    } else if NEGATIVE.contains(&token.as_str()) {
        false
    } else {
        return Err(parse_error());
    };

    let rest = caps[2].trim_start_matches(|c: char| !c.is_alphanumeric()).trim();
    let rationale = if rest.is_empty() { None } else { Some(rest.to_string()) };

    Ok(YesNo { affirmative, rationale })
}

/// Parse a batched answer of `<n>: yes|no` lines into one flag per sample.
///
/// Entries that are missing, malformed, out of range or given twice with
/// different answers come back as `None`.
pub fn parse_numbered_yes_no(response: &str, expected: usize) -> Vec<Option<bool>> {
    let normalized: String = response.nfkc().collect();
    let mut flags: Vec<Option<bool>> = vec![None; expected];
    let mut seen = vec![false; expected];
    let mut conflicted = vec![false; expected];

    for line in normalized.lines() {
        let Some(caps) = NUMBERED_LINE_RE.captures(line) else { continue };
        let Ok(index) = caps[1].parse::<usize>() else { continue };
        if index == 0 || index > expected {
            continue;
        }
        let Ok(answer) = parse_yes_no(&caps[2]) else { continue };

        let slot = index - 1;
        if seen[slot] {
            if flags[slot] != Some(answer.affirmative) {
                conflicted[slot] = true;
            }
        } else {
            seen[slot] = true;
            flags[slot] = Some(answer.affirmative);
        }
    }

    for (flag, conflict) in flags.iter_mut().zip(conflicted) {
        if conflict {
            *flag = None;
        }
    }
    flags
}
