pub mod embedding;

mod error;

pub use error::Error;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, header_value(&format!("Bearer {api_key}"))?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidHeader {
				message: format!("Default header {key} must be a string."),
			});
		};
		let name = HeaderName::from_bytes(key.as_bytes())
			.map_err(|err| Error::InvalidHeader { message: format!("{key}: {err}") })?;

		headers.insert(name, header_value(raw)?);
	}

	Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(raw).map_err(|err| Error::InvalidHeader { message: err.to_string() })
}
