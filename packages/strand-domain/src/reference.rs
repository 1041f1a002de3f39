use std::sync::LazyLock;

use regex::Regex;

pub const AMBIGUOUS_PRONOUNS: [&str; 5] = ["it", "that", "this", "those", "them"];

static AMBIGUOUS_REFERENCE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)\b(it|that|this|those|them)\b").ok());

/// Returns true when the text leans on a back-reference such as "it" or "those" as a whole word.
pub fn detect_ambiguous_reference(text: &str) -> bool {
	find_ambiguous_reference(text).is_some()
}

/// First ambiguous pronoun in the text, lowercased.
pub fn find_ambiguous_reference(text: &str) -> Option<&'static str> {
	let re = AMBIGUOUS_REFERENCE.as_ref()?;
	let captures = re.captures(text)?;
	let matched = captures.get(1)?.as_str().to_ascii_lowercase();

	AMBIGUOUS_PRONOUNS.into_iter().find(|pronoun| *pronoun == matched)
}
