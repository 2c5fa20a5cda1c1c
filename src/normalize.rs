// 🔤 Name Normalizer + Similarity Scorer
// Pure string helpers shared by the resolver and the duplicate finder
//
// normalize():  "  BMW  4-Series! " → "bmw 4-series"
// similarity(): 1 - levenshtein / max(len)  (over normalized strings)

use strsim::levenshtein;

// ============================================================================
// NAME NORMALIZER
// ============================================================================

/// Normalize a vehicle name for comparison
///
/// - Lowercase
/// - Strip punctuation and symbols (hyphens are kept: "4-Series" stays one token)
/// - Collapse whitespace runs to a single space
/// - Trim
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a normalized name into keyword tokens
///
/// Tokens split on whitespace and hyphens, must be longer than one
/// character and not a stop word.
pub fn keyword_tokens(name: &str, stop_words: &[String]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for token in normalize_name(name).split(|c: char| c.is_whitespace() || c == '-') {
        if token.chars().count() <= 1 {
            continue;
        }
        if stop_words.iter().any(|w| w == token) {
            continue;
        }
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }

    tokens
}

// ============================================================================
// SIMILARITY SCORER
// ============================================================================

/// Edit distance between two names (after normalization)
pub fn distance(a: &str, b: &str) -> usize {
    levenshtein(&normalize_name(a), &normalize_name(b))
}

/// Normalized similarity in [0, 1]
///
/// similarity("", "") = 1.0
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

// ============================================================================
// TESTS
// ============================================================================
