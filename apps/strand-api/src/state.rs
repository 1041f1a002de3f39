use std::sync::Arc;

use strand_service::{Providers, StrandService};
use strand_storage::MemoryEventLog;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<StrandService>,
}
impl AppState {
	pub fn new(config: strand_config::Config) -> color_eyre::Result<Self> {
		let log = Arc::new(MemoryEventLog::new());
		let service = StrandService::new(config, log, Providers::default())?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: StrandService) -> Self {
		Self { service: Arc::new(service) }
	}
}
