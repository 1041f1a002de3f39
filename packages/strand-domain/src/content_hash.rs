use unicode_normalization::UnicodeNormalization;

/// NFKC-normalizes the text, trims it, and collapses inner whitespace runs to one space.
pub fn normalize_message_text(text: &str) -> String {
	let composed: String = text.nfkc().collect();

	composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Duplicate-detection key for a user's message. `None` when the text is blank.
pub fn content_hash(user_id: &str, text: &str) -> Option<String> {
	let normalized = normalize_message_text(text);

	if normalized.is_empty() {
		return None;
	}

	let mut hasher = blake3::Hasher::new();

	hasher.update(user_id.as_bytes());
	hasher.update(b"::");
	hasher.update(normalized.as_bytes());

	Some(hasher.finalize().to_hex().to_string())
}
