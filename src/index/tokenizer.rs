use lazy_static::lazy_static;
use regex::Regex;

/// Tokens shorter than this (in characters) carry no signal in the corpus.
pub const MIN_TOKEN_CHARS: usize = 2;

lazy_static! {
    static ref SEPARATOR: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}


/// Lower-cases, splits on anything that is not a letter or digit and drops
/// short tokens. There is no stopword list; domain terms stay intact.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    SEPARATOR
        .split(&lowered)
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}
