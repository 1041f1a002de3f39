use crate::{Error, Result};

/// L2 norm accumulated in f64.
pub fn l2_norm(vector: &[f32]) -> f64 {
	vector.iter().map(|value| f64::from(*value) * f64::from(*value)).sum::<f64>().sqrt()
}

/// Returns a unit-length copy of the vector.
pub fn normalize(vector: &[f32]) -> Result<Vec<f32>> {
	if vector.is_empty() {
		return Err(Error::InvalidVector { message: "vector is empty.".to_string() });
	}
	if vector.iter().any(|value| !value.is_finite()) {
		return Err(Error::InvalidVector {
			message: "vector contains non-finite values.".to_string(),
		});
	}

	let norm = l2_norm(vector);

	if norm <= f64::EPSILON {
		return Err(Error::InvalidVector { message: "vector has zero norm.".to_string() });
	}

	Ok(vector.iter().map(|value| (f64::from(*value) / norm) as f32).collect())
}

/// Like [`normalize`], but maps unusable input (empty, zero, non-finite) to `None`.
pub fn try_normalize(vector: &[f32]) -> Option<Vec<f32>> {
	normalize(vector).ok()
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity used as a scoring signal: 0 for empty, zero-norm, or mismatched inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (&x, &y) in a.iter().zip(b) {
		let x = f64::from(x);
		let y = f64::from(y);

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	let denom = norm_a.sqrt() * norm_b.sqrt();

	if !denom.is_finite() || denom <= f64::EPSILON {
		return 0.0;
	}

	(dot / denom) as f32
}
