mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Index, Providers, Resolver, ResolverNuance, ResolverWeights,
	Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.index.vector_dim == 0 {
		return Err(Error::Validation {
			message: "index.vector_dim must be greater than zero.".to_string(),
		});
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if embedding.dimensions != cfg.index.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match index.vector_dim.".to_string(),
			});
		}
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.api_key must be non-empty.".to_string(),
			});
		}
		if embedding.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	validate_resolver(&cfg.resolver)
}

/// Upper bound for `resolver.recency_window_days`, roughly one hundred years.
pub const MAX_RECENCY_WINDOW_DAYS: i64 = 36_500;

/// Checks a resolver policy on its own, so per-request overrides can reuse the same rules.
pub fn validate_resolver(resolver: &Resolver) -> Result<()> {
	validate_unit_range("resolver.embedding_threshold", resolver.embedding_threshold)?;

	if !(1..=MAX_RECENCY_WINDOW_DAYS).contains(&resolver.recency_window_days) {
		return Err(Error::Validation {
			message: format!(
				"resolver.recency_window_days must be between 1 and {MAX_RECENCY_WINDOW_DAYS}."
			),
		});
	}

	validate_non_negative("resolver.guardrail_score", resolver.guardrail_score)?;

	if resolver.signature_top_k == 0 {
		return Err(Error::Validation {
			message: "resolver.signature_top_k must be greater than zero.".to_string(),
		});
	}

	validate_unit_range("resolver.nuance.threshold", resolver.nuance.threshold)?;
	validate_unit_range("resolver.nuance.boost_min_ratio", resolver.nuance.boost_min_ratio)?;
	validate_non_negative("resolver.nuance.short_boost", resolver.nuance.short_boost)?;

	for (label, weight) in [
		("resolver.weights.topic_match", resolver.weights.topic_match),
		("resolver.weights.subtopic_overlap", resolver.weights.subtopic_overlap),
		("resolver.weights.ambiguous_reference", resolver.weights.ambiguous_reference),
	] {
		validate_non_negative(label, weight)?;
	}

	Ok(())
}

fn validate_unit_range(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn validate_non_negative(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value < 0.0 {
		return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.admin_bind.as_deref().map(|bind| bind.trim().is_empty()).unwrap_or(false) {
		cfg.service.admin_bind = None;
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
