use crate::{Error, Result, vector};

/// Append-only exact nearest-neighbor index over unit vectors.
///
/// Vectors are stored contiguously and scanned in full on every search, so results are exact and
/// ties keep insertion order. Entries are never removed individually; [`VectorIndex::reset`] drops
/// everything at once.
#[derive(Debug)]
pub struct VectorIndex<R> {
	dim: usize,
	data: Vec<f32>,
	refs: Vec<R>,
}
impl<R> VectorIndex<R> {
	pub fn new(dim: usize) -> Result<Self> {
		if dim == 0 {
			return Err(Error::ZeroDimension);
		}

		Ok(Self { dim, data: Vec::new(), refs: Vec::new() })
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn len(&self) -> usize {
		self.refs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.refs.is_empty()
	}

	pub fn reset(&mut self) {
		self.data.clear();
		self.refs.clear();
	}

	/// Normalizes and appends a vector. Returns the position of the new entry.
	pub fn insert(&mut self, vector: &[f32], reference: R) -> Result<usize> {
		self.check_dim(vector)?;

		let unit = vector::normalize(vector)?;

		self.data.extend_from_slice(&unit);
		self.refs.push(reference);

		Ok(self.refs.len() - 1)
	}

	pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_, R>>> {
		self.search_filtered(query, k, |_| true)
	}

	/// Top-k among entries whose reference passes `keep`, closest first.
	pub fn search_filtered<F>(&self, query: &[f32], k: usize, keep: F) -> Result<Vec<SearchHit<'_, R>>>
	where
		F: Fn(&R) -> bool,
	{
		self.check_dim(query)?;

		if k == 0 || self.is_empty() {
			return Ok(Vec::new());
		}

		let unit = vector::normalize(query)?;
		let mut hits: Vec<SearchHit<'_, R>> = self
			.refs
			.iter()
			.enumerate()
			.filter(|(_, reference)| keep(*reference))
			.map(|(position, reference)| {
				let distance = vector::squared_l2(&unit, self.vector_at(position));

				SearchHit { position, distance, similarity: 1.0 - distance / 2.0, reference }
			})
			.collect();

		hits.sort_by(|left, right| {
			left.distance.total_cmp(&right.distance).then(left.position.cmp(&right.position))
		});
		hits.truncate(k);

		Ok(hits)
	}

	pub fn vector_at(&self, position: usize) -> &[f32] {
		&self.data[position * self.dim..(position + 1) * self.dim]
	}

	pub fn references(&self) -> impl Iterator<Item = &R> {
		self.refs.iter()
	}

	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.dim {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
		}

		Ok(())
	}
}

#[derive(Debug)]
pub struct SearchHit<'a, R> {
	pub position: usize,
	/// Squared L2 distance between unit vectors, in `[0, 4]`.
	pub distance: f32,
	/// Cosine similarity recovered from the distance.
	pub similarity: f32,
	pub reference: &'a R,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_index_returns_no_hits() {
		let index: VectorIndex<&str> = VectorIndex::new(2).expect("index");

		assert!(index.search(&[1.0, 0.0], 5).expect("search").is_empty());
	}

	#[test]
	fn zero_dimension_is_rejected() {
		assert!(matches!(VectorIndex::<()>::new(0), Err(Error::ZeroDimension)));
	}

	#[test]
	fn dimension_mismatch_is_fatal() {
		let mut index = VectorIndex::new(3).expect("index");

		assert!(matches!(
			index.insert(&[1.0, 0.0], "a"),
			Err(Error::DimensionMismatch { expected: 3, actual: 2 })
		));
		assert!(matches!(
			index.search(&[1.0, 0.0], 1),
			Err(Error::DimensionMismatch { expected: 3, actual: 2 })
		));
	}

	#[test]
	fn search_orders_by_distance_and_keeps_insertion_order_on_ties() {
		let mut index = VectorIndex::new(2).expect("index");

		index.insert(&[0.0, 1.0], "up").expect("insert");
		index.insert(&[1.0, 0.0], "right-a").expect("insert");
		index.insert(&[2.0, 0.0], "right-b").expect("insert");

		let hits = index.search(&[1.0, 0.1], 3).expect("search");
		let order: Vec<_> = hits.iter().map(|hit| *hit.reference).collect();

		assert_eq!(order, vec!["right-a", "right-b", "up"]);
		assert!((hits[0].similarity - hits[1].similarity).abs() < 1e-6);
		assert!(hits[0].similarity > hits[2].similarity);
	}

	#[test]
	fn stored_vectors_are_normalized() {
		let mut index = VectorIndex::new(2).expect("index");
		let position = index.insert(&[3.0, 4.0], ()).expect("insert");
		let stored = index.vector_at(position);

		assert!((vector::l2_norm(stored) - 1.0).abs() < 1e-6);
	}

	#[test]
	fn filtered_search_applies_predicate_before_truncation() {
		let mut index = VectorIndex::new(2).expect("index");

		index.insert(&[1.0, 0.0], ("other", 1)).expect("insert");
		index.insert(&[1.0, 0.05], ("other", 2)).expect("insert");
		index.insert(&[0.0, 1.0], ("mine", 3)).expect("insert");

		let hits =
			index.search_filtered(&[1.0, 0.0], 1, |(owner, _)| *owner == "mine").expect("search");

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].reference.1, 3);
	}

	#[test]
	fn reset_drops_all_entries() {
		let mut index = VectorIndex::new(2).expect("index");

		index.insert(&[1.0, 0.0], 1).expect("insert");
		index.reset();

		assert!(index.is_empty());
		assert!(index.search(&[1.0, 0.0], 1).expect("search").is_empty());
	}
}
