//! Query text normalization and tokenization.
//!
//! Two flavours exist because the store can only lower-case text: `normalize` and
//! `tokenize` produce what is sent to the store, while `fold` and `fold_tokens` also strip
//! diacritics and are applied to both sides of in-process scoring.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;

pub const LIKE_ESCAPE: char = '\\';

/// Trim, lower-case and collapse inner whitespace.
pub fn normalize(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for word in text.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.extend(word.chars().flat_map(char::to_lowercase));
	}

	out
}

/// `normalize` plus diacritic stripping ("Café" -> "cafe").
pub fn fold(text: &str) -> String {
	let stripped: String = text.nfd().filter(|ch| !is_combining_mark(*ch)).collect();

	normalize(&stripped)
}

/// Word tokens of the normalized text. Punctuation-only segments are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
	normalize(text).unicode_words().map(str::to_string).collect()
}

/// Word tokens of the folded text.
pub fn fold_tokens(text: &str) -> Vec<String> {
	fold(text).unicode_words().map(str::to_string).collect()
}

/// Escape `LIKE` metacharacters so the token matches literally.
pub fn escape_like(token: &str) -> String {
	let mut out = String::with_capacity(token.len() + 2);

	for ch in token.chars() {
		if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
			out.push(LIKE_ESCAPE);
		}

		out.push(ch);
	}

	out
}

/// Substring pattern for a `LIKE ... ESCAPE '\'` predicate.
pub fn wildcard_match(token: &str) -> String {
	format!("%{}%", escape_like(token))
}

#[cfg(test)]
mod tests {
	use crate::text::{escape_like, fold, fold_tokens, normalize, tokenize, wildcard_match};

	#[test]
	fn normalize_trims_lowercases_and_collapses() {
		assert_eq!(normalize("  Orders   Q\tREPORT \n"), "orders q report");
		assert_eq!(normalize("   "), "");
	}

	#[test]
	fn fold_strips_diacritics() {
		assert_eq!(fold("Café  Crème"), "cafe creme");
		assert_eq!(fold("Ångström"), "angstrom");
	}

	#[test]
	fn tokenize_drops_punctuation_and_blanks() {
		assert_eq!(tokenize("Orders, revenue & churn!"), vec!["orders", "revenue", "churn"]);
		assert_eq!(tokenize("q1_2024 report"), vec!["q1_2024", "report"]);
		assert!(tokenize(" \t ").is_empty());
		assert!(tokenize("?!").is_empty());
	}

	#[test]
	fn fold_tokens_match_accented_and_plain() {
		assert_eq!(fold_tokens("Résumé orders"), fold_tokens("resume ORDERS"));
	}

	#[test]
	fn wildcard_match_escapes_metacharacters() {
		assert_eq!(wildcard_match("orders"), "%orders%");
		assert_eq!(wildcard_match("50%_off"), "%50\\%\\_off%");
		assert_eq!(escape_like("a\\b"), "a\\\\b");
	}
}
