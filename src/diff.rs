//! Word-level text diff and whitespace-insensitive matching.
//!
//! Used for rendering recommendation previews and for deciding whether a
//! proposed `modify` edit actually changes anything. Pure functions, no
//! state.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// How a span relates the before-text to the after-text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Unchanged,
    Added,
    Removed,
}

/// One contiguous run of words sharing a diff op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpan {
    pub op: DiffOp,
    pub text: String,
}

/// Word-granularity diff between two text blobs.
///
/// Identical inputs (after whitespace normalization) yield a single
/// `unchanged` span covering the whole before-text; two empty inputs yield
/// no spans. Span text is whitespace-normalized: words joined by single
/// spaces.
pub fn diff_words(before: &str, after: &str) -> Vec<DiffSpan> {
    let a: Vec<&str> = before.split_whitespace().collect();
    let b: Vec<&str> = after.split_whitespace().collect();

    if a == b {
        if a.is_empty() {
            return vec![];
        }
        return vec![DiffSpan {
            op: DiffOp::Unchanged,
            text: before.trim().to_string(),
        }];
    }

    // Longest common subsequence over words.
    let n = a.len();
    let m = b.len();
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    // Walk the table, emitting one op per word, then coalesce runs.
    let mut words: Vec<(DiffOp, &str)> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            words.push((DiffOp::Unchanged, a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            words.push((DiffOp::Removed, a[i]));
            i += 1;
        } else {
            words.push((DiffOp::Added, b[j]));
            j += 1;
        }
    }
    while i < n {
        words.push((DiffOp::Removed, a[i]));
        i += 1;
    }
    while j < m {
        words.push((DiffOp::Added, b[j]));
        j += 1;
    }

    let mut spans: Vec<DiffSpan> = Vec::new();
    for (op, word) in words {
        match spans.last_mut() {
            Some(span) if span.op == op => {
                span.text.push(' ');
                span.text.push_str(word);
            }
            _ => spans.push(DiffSpan {
                op,
                text: word.to_string(),
            }),
        }
    }
    spans
}

/// True if `from` -> `to` is a real edit: the word diff has at least one
/// added or removed span after whitespace normalization.
pub fn is_effective_change(from: &str, to: &str) -> bool {
    diff_words(from, to)
        .iter()
        .any(|s| s.op != DiffOp::Unchanged)
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize whitespace while recording, for every byte of the normalized
/// string, the byte offset it came from in the original.
fn normalize_with_map(s: &str) -> (String, Vec<usize>) {
    let mut out = String::with_capacity(s.len());
    let mut map = Vec::with_capacity(s.len());
    let mut pending_space: Option<usize> = None;

    for (i, ch) in s.char_indices() {
        if ch.is_whitespace() {
            if !out.is_empty() && pending_space.is_none() {
                pending_space = Some(i);
            }
        } else {
            if let Some(ws_at) = pending_space.take() {
                out.push(' ');
                map.push(ws_at);
            }
            out.push(ch);
            for _ in 0..ch.len_utf8() {
                map.push(i);
            }
        }
    }

    (out, map)
}

/// Locate the first occurrence of `needle` in `haystack`, ignoring
/// differences in whitespace. Returns the byte range of the match in the
/// original (un-normalized) haystack, or `None` if the needle is empty or
/// absent.
pub fn find_normalized(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let needle_norm = normalize_ws(needle);
    if needle_norm.is_empty() {
        return None;
    }
    let (hay_norm, map) = normalize_with_map(haystack);
    let pos = hay_norm.find(&needle_norm)?;

    let start = map[pos];
    let last_byte = pos + needle_norm.len() - 1;
    // End of match: the original byte after the char that produced the last
    // normalized byte.
    let last_orig = map[last_byte];
    let ch = haystack[last_orig..].chars().next()?;
    Some(start..last_orig + ch.len_utf8())
}
