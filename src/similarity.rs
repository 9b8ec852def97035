// src/similarity.rs
use std::collections::BTreeSet;

/// Scores how alike two strings are, from 0 (nothing in common) to 100 (identical).
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

const UNBASE_SCALE: f64 = 0.95;

#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedRatio;

impl Similarity for WeightedRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = preprocess(a);
        let b = preprocess(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let (short, long) = if a_chars.len() <= b_chars.len() {
            (a_chars.len(), b_chars.len())
        } else {
            (b_chars.len(), a_chars.len())
        };
        let len_ratio = long as f64 / short as f64;

        let base = ratio(&a_chars, &b_chars);
        if len_ratio < 1.5 {
            return base.max(token_ratio(&a, &b) * UNBASE_SCALE);
        }

        let partial_scale = if len_ratio <= 8.0 { 0.9 } else { 0.6 };
        base.max(partial_ratio(&a_chars, &b_chars) * partial_scale)
            .max(partial_token_ratio(&a, &b) * UNBASE_SCALE * partial_scale)
    }
}

/// Lowercases, turns every non-alphanumeric character into a space and trims.
pub fn preprocess(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

/// Normalized indel similarity.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    100.0 * (2 * lcs_len(a, b)) as f64 / total as f64
}

fn ratio_str(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio(&a, &b)
}

/// Best ratio of the shorter string against every alignment on the longer one,
/// including the partial overlaps at both ends.
fn partial_ratio(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }
    if short.len() == long.len() {
        return ratio(short, long);
    }

    let m = short.len();
    let n = long.len();
    let mut best: f64 = 0.0;

    let windows = (1..m)
        .map(move |end| &long[..end])
        .chain((0..=n - m).map(move |start| &long[start..start + m]))
        .chain((n - m + 1..n).map(move |start| &long[start..]));

    for window in windows {
        best = best.max(ratio(short, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn partial_ratio_str(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    partial_ratio(&a, &b)
}

fn tokens(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn sorted_tokens(s: &str) -> String {
    let mut parts: Vec<&str> = s.split_whitespace().collect();
    parts.sort_unstable();
    parts.join(" ")
}

fn join(set: &BTreeSet<&str>) -> String {
    set.iter().copied().collect::<Vec<_>>().join(" ")
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio_str(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let common: BTreeSet<&str> = ta.intersection(&tb).copied().collect();
    let only_a: BTreeSet<&str> = ta.difference(&tb).copied().collect();
    let only_b: BTreeSet<&str> = tb.difference(&ta).copied().collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = join(&common);
    let with_a = format!("{} {}", sect, join(&only_a)).trim().to_string();
    let with_b = format!("{} {}", sect, join(&only_b)).trim().to_string();

    let mut best = ratio_str(&with_a, &with_b);
    if !sect.is_empty() {
        best = best
            .max(ratio_str(&sect, &with_a))
            .max(ratio_str(&sect, &with_b));
    }
    best
}

fn token_ratio(a: &str, b: &str) -> f64 {
    token_sort_ratio(a, b).max(token_set_ratio(a, b))
}

fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let only_a: BTreeSet<&str> = ta.difference(&tb).copied().collect();
    let only_b: BTreeSet<&str> = tb.difference(&ta).copied().collect();
    let shares_token = ta.intersection(&tb).next().is_some();

    if shares_token && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let best = partial_ratio_str(&sorted_tokens(a), &sorted_tokens(b));
    if only_a.len() == ta.len() && only_b.len() == tb.len() {
        // no shared tokens, the diff strings are the sorted strings again
        return best;
    }
    best.max(partial_ratio_str(&join(&only_a), &join(&only_b)))
}
