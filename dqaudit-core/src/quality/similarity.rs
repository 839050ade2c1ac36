//! String similarity scorers used by fuzzy duplicate detection.
//!
//! All scorers return a percentage in `[0, 100]` and work on characters,
//! not bytes. The ensemble combines four Indel-based scorers:
//!
//! | scorer             | weight |
//! |--------------------|--------|
//! | `ratio`            | 0.15   |
//! | `partial_ratio`    | 0.20   |
//! | `token_sort_ratio` | 0.30   |
//! | `token_set_ratio`  | 0.35   |
//!
//! The scalar backend is a Ratcliff/Obershelp matching ratio.

use std::collections::HashMap;

use crate::models::classify_cell;

use super::config::ScorerBackend;

/// Weight of [`ratio`] in the ensemble.
pub const RATIO_WEIGHT: f64 = 0.15;
/// Weight of [`partial_ratio`] in the ensemble.
pub const PARTIAL_RATIO_WEIGHT: f64 = 0.20;
/// Weight of [`token_sort_ratio`] in the ensemble.
pub const TOKEN_SORT_WEIGHT: f64 = 0.30;
/// Weight of [`token_set_ratio`] in the ensemble.
pub const TOKEN_SET_WEIGHT: f64 = 0.35;

/// Bit-parallel longest-common-subsequence matcher for a fixed pattern.
struct LcsPattern {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl LcsPattern {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64).max(1);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (i, c) in pattern.iter().enumerate() {
            let mask = masks.entry(*c).or_insert_with(|| vec![0; words]);
            mask[i / 64] |= 1u64 << (i % 64);
        }
        Self {
            len: pattern.len(),
            words,
            masks,
        }
    }

    /// LCS length between the pattern and `text`.
    fn lcs(&self, text: &[char]) -> usize {
        if self.len == 0 || text.is_empty() {
            return 0;
        }
        let mut v = vec![u64::MAX; self.words];
        for c in text {
            let Some(mask) = self.masks.get(c) else {
                continue;
            };
            let mut carry = 0u64;
            for (word, m) in v.iter_mut().zip(mask) {
                let u = *word & m;
                let (sum, overflow_a) = word.overflowing_add(u);
                let (sum, overflow_b) = sum.overflowing_add(carry);
                carry = u64::from(overflow_a || overflow_b);
                *word = sum | (*word & !u);
            }
        }

        let mut zeros = 0usize;
        for (index, word) in v.iter().enumerate() {
            let bits_in_word = (self.len - index * 64).min(64);
            let valid = if bits_in_word == 64 {
                u64::MAX
            } else {
                (1u64 << bits_in_word) - 1
            };
            zeros += (!word & valid).count_ones() as usize;
        }
        zeros
    }
}

fn indel_ratio(lcs: usize, len_a: usize, len_b: usize) -> f64 {
    let total = len_a + len_b;
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs as f64 / total as f64
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    indel_ratio(LcsPattern::new(short).lcs(long), a.len(), b.len())
}

/// Best ratio of `short` against every alignment in `long`, where
/// `short.len() <= long.len()`.
fn partial_ratio_impl(short: &[char], long: &[char]) -> f64 {
    let m = short.len();
    let n = long.len();
    let pattern = LcsPattern::new(short);
    let score = |window: &[char]| indel_ratio(pattern.lcs(window), m, window.len());

    let mut best = 0.0f64;
    for end in 1..m {
        best = best.max(score(&long[..end]));
    }
    for start in 0..=(n - m) {
        best = best.max(score(&long[start..start + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    for len in 1..m {
        best = best.max(score(&long[n - len..]));
    }
    best
}

fn partial_ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 100.0 } else { 0.0 };
    }
    if a.len() < b.len() {
        partial_ratio_impl(a, b)
    } else if b.len() < a.len() {
        partial_ratio_impl(b, a)
    } else {
        partial_ratio_impl(a, b).max(partial_ratio_impl(b, a))
    }
}

fn chars(value: &str) -> Vec<char> {
    value.chars().collect()
}

fn sorted_tokens(value: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn token_set_chars(tokens_a: &[String], tokens_b: &[String]) -> f64 {
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut intersection = Vec::new();
    let mut only_a = Vec::new();
    let mut only_b = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < tokens_a.len() && j < tokens_b.len() {
        match tokens_a[i].cmp(&tokens_b[j]) {
            std::cmp::Ordering::Equal => {
                intersection.push(tokens_a[i].as_str());
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                only_a.push(tokens_a[i].as_str());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                only_b.push(tokens_b[j].as_str());
                j += 1;
            }
        }
    }
    only_a.extend(tokens_a[i..].iter().map(String::as_str));
    only_b.extend(tokens_b[j..].iter().map(String::as_str));

    if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let diff_ab = only_a.join(" ");
    let diff_ba = only_b.join(" ");
    let join = |tail: &str| {
        if sect.is_empty() {
            tail.to_string()
        } else {
            format!("{} {}", sect, tail)
        }
    };
    let sect_ab = chars(&join(&diff_ab));
    let sect_ba = chars(&join(&diff_ba));

    let mut best = ratio_chars(&sect_ab, &sect_ba);
    if !sect.is_empty() {
        let sect = chars(&sect);
        best = best
            .max(ratio_chars(&sect, &sect_ab))
            .max(ratio_chars(&sect, &sect_ba));
    }
    best
}

fn unique_sorted_tokens(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = sorted_tokens(value)
        .into_iter()
        .map(str::to_string)
        .collect();
    tokens.dedup();
    tokens
}

/// Indel similarity of two strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    ratio_chars(&chars(a), &chars(b))
}

/// Best [`ratio`] of the shorter string against any same-length alignment
/// inside the longer one, including partial overlaps at both ends.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    partial_ratio_chars(&chars(a), &chars(b))
}

/// [`ratio`] after sorting whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

/// Set-based token similarity: common tokens are compared against each
/// side's remainder. Returns 100 when one token set contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    token_set_chars(&unique_sorted_tokens(a), &unique_sorted_tokens(b))
}

/// Weighted four-scorer ensemble.
pub fn ensemble_score(a: &str, b: &str) -> f64 {
    PreparedCell::from_normalized(a).ensemble(&PreparedCell::from_normalized(b))
}

/// Ratcliff/Obershelp matching ratio, in percent.
///
/// Repeatedly takes the longest common block (leftmost on ties) and recurses
/// on the unmatched pieces on either side of it.
pub fn sequence_matcher_ratio(a: &str, b: &str) -> f64 {
    let a = chars(a);
    let b = chars(b);
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let mut matched = 0usize;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, k) = longest_common_block(&a[a_lo..a_hi], &b[b_lo..b_hi]);
        if k == 0 {
            continue;
        }
        matched += k;
        let (i, j) = (a_lo + i, b_lo + j);
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + k < a_hi && j + k < b_hi {
            pending.push((i + k, a_hi, j + k, b_hi));
        }
    }
    200.0 * matched as f64 / total as f64
}

/// Longest common contiguous block as `(start_a, start_b, len)`; ties go to
/// the smallest `start_a`, then the smallest `start_b`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb { previous[j] + 1 } else { 0 };
            let k = current[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

/// A cell normalized once for repeated comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCell {
    normalized: Option<String>,
    chars: Vec<char>,
    sorted: Vec<char>,
    token_set: Vec<String>,
}

impl PreparedCell {
    /// Prepares a raw cell: absent cells stay absent, others are trimmed and
    /// lowercased.
    pub fn new(raw: &str) -> Self {
        match classify_cell(raw).as_present() {
            Some(value) => Self::from_normalized(&value.to_lowercase()),
            None => Self {
                normalized: None,
                chars: Vec::new(),
                sorted: Vec::new(),
                token_set: Vec::new(),
            },
        }
    }

    fn from_normalized(value: &str) -> Self {
        Self {
            normalized: Some(value.to_string()),
            chars: chars(value),
            sorted: chars(&sorted_tokens(value).join(" ")),
            token_set: unique_sorted_tokens(value),
        }
    }

    /// Returns true if the underlying cell was absent.
    pub fn is_absent(&self) -> bool {
        self.normalized.is_none()
    }

    /// Normalized value, if present.
    pub fn normalized(&self) -> Option<&str> {
        self.normalized.as_deref()
    }

    fn ensemble(&self, other: &Self) -> f64 {
        let score = RATIO_WEIGHT * ratio_chars(&self.chars, &other.chars)
            + PARTIAL_RATIO_WEIGHT * partial_ratio_chars(&self.chars, &other.chars)
            + TOKEN_SORT_WEIGHT * ratio_chars(&self.sorted, &other.sorted)
            + TOKEN_SET_WEIGHT * token_set_chars(&self.token_set, &other.token_set);
        score.clamp(0.0, 100.0)
    }

    /// Cell similarity in percent.
    ///
    /// Both absent: 100. One absent: 0. Equal normalized values: 100.
    pub fn similarity(&self, other: &Self, backend: ScorerBackend) -> f64 {
        match (&self.normalized, &other.normalized) {
            (None, None) => 100.0,
            (None, Some(_)) | (Some(_), None) => 0.0,
            (Some(a), Some(b)) if a == b => 100.0,
            (Some(a), Some(b)) => match backend {
                ScorerBackend::Ensemble => self.ensemble(other),
                ScorerBackend::Scalar => sequence_matcher_ratio(a, b),
            },
        }
    }
}

/// Similarity of two raw cells in percent.
pub fn cell_similarity(a: &str, b: &str, backend: ScorerBackend) -> f64 {
    PreparedCell::new(a).similarity(&PreparedCell::new(b), backend)
}
