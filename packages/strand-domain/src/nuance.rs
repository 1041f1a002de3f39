use unicode_segmentation::UnicodeSegmentation;

use strand_config::ResolverNuance;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NuanceSimilarity {
	pub raw_ratio: f32,
	pub boost: f32,
	pub score: f32,
}
impl NuanceSimilarity {
	const NONE: Self = Self { raw_ratio: 0.0, boost: 0.0, score: 0.0 };
}

/// Fuzzy similarity between two nuance descriptors, with a boost when both phrasings are terse
/// and already match well.
pub fn nuance_similarity(current: &str, previous: &str, policy: &ResolverNuance) -> NuanceSimilarity {
	let current = current.trim();
	let previous = previous.trim();

	if current.is_empty() || previous.is_empty() {
		return NuanceSimilarity::NONE;
	}

	let raw_ratio = sequence_ratio(&current.to_lowercase(), &previous.to_lowercase());
	let longest = current.unicode_words().count().max(previous.unicode_words().count());
	let boost = if raw_ratio > policy.boost_min_ratio && longest <= policy.short_max_words as usize {
		policy.short_boost
	} else {
		0.0
	};

	NuanceSimilarity { raw_ratio, boost, score: (raw_ratio + boost).min(1.0) }
}

/// Ratcliff/Obershelp similarity: twice the matched characters over the combined length.
///
/// Matching blocks are found by repeatedly taking the longest common run (earliest in `a`, then
/// earliest in `b`) and recursing on both sides of it.
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	let total = a.len() + b.len();

	if total == 0 {
		return 1.0;
	}

	2.0 * matching_characters(&a, &b) as f32 / total as f32
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
	let mut pending = vec![(0, a.len(), 0, b.len())];
	let mut matched = 0;

	while let Some((alo, ahi, blo, bhi)) = pending.pop() {
		let (i, j, size) = longest_match(a, b, (alo, ahi), (blo, bhi));

		if size == 0 {
			continue;
		}

		matched += size;

		if alo < i && blo < j {
			pending.push((alo, i, blo, j));
		}
		if i + size < ahi && j + size < bhi {
			pending.push((i + size, ahi, j + size, bhi));
		}
	}

	matched
}

fn longest_match(
	a: &[char],
	b: &[char],
	(alo, ahi): (usize, usize),
	(blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
	let width = bhi - blo + 1;
	let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
	let mut previous_row = vec![0_usize; width];

	for i in alo..ahi {
		let mut row = vec![0_usize; width];

		for j in blo..bhi {
			if a[i] != b[j] {
				continue;
			}

			let run = previous_row[j - blo] + 1;

			row[j - blo + 1] = run;

			if run > best_size {
				best_i = i + 1 - run;
				best_j = j + 1 - run;
				best_size = run;
			}
		}

		previous_row = row;
	}

	(best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn approx(left: f32, right: f32) -> bool {
		(left - right).abs() < 1e-4
	}

	#[test]
	fn ratio_matches_reference_values() {
		// "abcd" vs "bcde": one block "bcd" => 2 * 3 / 8.
		assert!(approx(sequence_ratio("abcd", "bcde"), 0.75));
		assert!(approx(sequence_ratio("", ""), 1.0));
		assert!(approx(sequence_ratio("abc", ""), 0.0));
		assert!(approx(sequence_ratio("same", "same"), 1.0));
	}

	#[test]
	fn ratio_recurses_around_longest_block() {
		// Blocks: "ab" then "d" on the right side => 2 * 3 / 8.
		assert!(approx(sequence_ratio("abxd", "abyd"), 0.75));
	}

	#[test]
	fn short_phrases_get_boosted() {
		let policy = ResolverNuance::default();
		let similarity = nuance_similarity("where is my money", "where is my refund", &policy);

		assert!(similarity.raw_ratio > 0.5);
		assert!(approx(similarity.boost, 0.15));
		assert!(approx(similarity.score, (similarity.raw_ratio + 0.15).min(1.0)));
	}

	#[test]
	fn long_phrases_are_not_boosted() {
		let policy = ResolverNuance::default();
		let similarity = nuance_similarity(
			"trouble falling asleep after late coffee at work",
			"trouble falling asleep after late tea at work",
			&policy,
		);

		assert!(similarity.raw_ratio > 0.5);
		assert!(approx(similarity.boost, 0.0));
	}

	#[test]
	fn boost_needs_both_phrases_short() {
		let policy = ResolverNuance::default();
		let similarity = nuance_similarity(
			"trouble sleeping",
			"trouble sleeping at night lately again",
			&policy,
		);

		assert!(approx(similarity.raw_ratio, 0.5926));
		assert_eq!(similarity.boost, 0.0);
		assert!(similarity.score < policy.threshold);
	}

	#[test]
	fn blank_nuance_scores_zero() {
		let policy = ResolverNuance::default();

		assert_eq!(nuance_similarity("", "anything", &policy).score, 0.0);
		assert_eq!(nuance_similarity("anything", "   ", &policy).score, 0.0);
	}

	#[test]
	fn comparison_ignores_case() {
		let policy = ResolverNuance::default();

		assert!(approx(nuance_similarity("Rent Increase", "rent increase", &policy).score, 1.0));
	}
}
