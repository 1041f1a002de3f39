use std::collections::HashSet;

/// Trims labels, drops blanks, and removes repeats while keeping first-seen order.
pub fn normalize_subtopics<I, S>(subtopics: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for subtopic in subtopics {
		let trimmed = subtopic.as_ref().trim();

		if trimmed.is_empty() {
			continue;
		}
		if seen.insert(trimmed.to_string()) {
			out.push(trimmed.to_string());
		}
	}

	out
}

/// Size of the set intersection of two subtopic lists.
pub fn count_overlap(current: &[String], previous: &[String]) -> usize {
	let current: HashSet<&str> = current.iter().map(String::as_str).collect();
	let previous: HashSet<&str> = previous.iter().map(String::as_str).collect();

	current.intersection(&previous).count()
}

/// Subtopics present in both lists, in the order they appear in `current`.
pub fn shared_subtopics<'a>(current: &'a [String], previous: &[String]) -> Vec<&'a str> {
	let previous: HashSet<&str> = previous.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();

	current
		.iter()
		.map(String::as_str)
		.filter(|subtopic| previous.contains(subtopic) && seen.insert(*subtopic))
		.collect()
}
