//! # Fuzzy Search Clause Generation
//!
//! Builds word-order independent `LIKE` predicates so that "milk choco"
//! finds "chocolate milk" without a dedicated text index.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input: "red shirt", columns [name, description]                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Tokens:        [red, shirt]                                            │
//! │  Permutations:  "red shirt", "shirt red"                   (N! of them) │
//! │  Patterns:      "%red shirt%", "%shirt red%"                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  name LIKE ? OR name LIKE ? OR description LIKE ? OR description LIKE ? │
//! │  params: [%red shirt%, %shirt red%, %red shirt%, %shirt red%]           │
//! │          (columns outer loop, patterns inner loop)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scaling Limit
//! Permutations grow factorially. Phrases with more than
//! `max_permuted_tokens` words switch to a linear form: per column, every
//! token must appear somewhere (`col LIKE %a% AND col LIKE %b% ...`). Any row
//! matched by a permutation pattern is also matched by that form.

/// Default number of words that still get full permutation treatment.
/// 5 words = 120 patterns per column.
pub const DEFAULT_MAX_PERMUTED_TOKENS: usize = 5;

/// A disjunctive `LIKE` clause plus its positional parameters.
///
/// An empty clause means "no constraint" and must not be embedded in SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeClause {
    pub clause: String,
    pub params: Vec<String>,
}

impl LikeClause {
    /// Returns true when the clause contributes no predicate.
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// Splits free text into search tokens, dropping empty ones.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Returns every ordering of `tokens`, each joined with a single space.
///
/// Orderings are positional: repeated tokens yield repeated phrases, so the
/// result always has exactly `tokens.len()!` entries (none for no tokens).
pub fn permutations(tokens: &[&str]) -> Vec<String> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = Vec::with_capacity(tokens.len());
    let mut used = vec![false; tokens.len()];
    permute(tokens, &mut used, &mut current, &mut out);
    out
}

fn permute<'a>(
    tokens: &[&'a str],
    used: &mut [bool],
    current: &mut Vec<&'a str>,
    out: &mut Vec<String>,
) {
    if current.len() == tokens.len() {
        out.push(current.join(" "));
        return;
    }

    for i in 0..tokens.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        current.push(tokens[i]);
        permute(tokens, used, current, out);
        current.pop();
        used[i] = false;
    }
}

/// Builds the exhaustive `LIKE` clause with the default permutation cap.
pub fn exhaust_like(text: &str, columns: &[&str]) -> LikeClause {
    exhaust_like_capped(text, columns, DEFAULT_MAX_PERMUTED_TOKENS)
}

/// Builds the exhaustive `LIKE` clause, permuting at most `max_tokens` words.
pub fn exhaust_like_capped(text: &str, columns: &[&str], max_tokens: usize) -> LikeClause {
    let tokens = tokenize(text);
    if tokens.is_empty() || columns.is_empty() {
        return LikeClause::default();
    }

    if tokens.len() > max_tokens.max(1) {
        return all_tokens_like(&tokens, columns);
    }

    let patterns: Vec<String> = permutations(&tokens)
        .into_iter()
        .map(|phrase| format!("%{}%", phrase))
        .collect();

    let mut fragments = Vec::with_capacity(columns.len() * patterns.len());
    let mut params = Vec::with_capacity(columns.len() * patterns.len());
    for column in columns {
        for pattern in &patterns {
            fragments.push(format!("{} LIKE ?", column));
            params.push(pattern.clone());
        }
    }

    LikeClause {
        clause: fragments.join(" OR "),
        params,
    }
}

fn all_tokens_like(tokens: &[&str], columns: &[&str]) -> LikeClause {
    let mut groups = Vec::with_capacity(columns.len());
    let mut params = Vec::with_capacity(columns.len() * tokens.len());
    for column in columns {
        let group: Vec<String> = tokens
            .iter()
            .map(|token| {
                params.push(format!("%{}%", token));
                format!("{} LIKE ?", column)
            })
            .collect();
        groups.push(format!("({})", group.join(" AND ")));
    }

    LikeClause {
        clause: groups.join(" OR "),
        params,
    }
}

/// Turns free text into an FTS5 prefix query: `milk cho` → `"milk"* "cho"*`.
///
/// Tokens are quoted so punctuation in user input cannot break the MATCH
/// syntax. Returns `None` when the text has no tokens.
pub fn fts_prefix_query(text: &str) -> Option<String> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return None;
    }

    let query = tokens
        .iter()
        .map(|token| format!("\"{}\"*", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ");
    Some(query)
}
