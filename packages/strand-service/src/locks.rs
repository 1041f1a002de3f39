use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user, so resolve-and-commit never overlaps for the same user while
/// different users proceed concurrently.
#[derive(Default)]
pub(crate) struct UserLocks {
	users: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl UserLocks {
	pub(crate) async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
		let lock = {
			let mut users = self.users.lock().unwrap_or_else(|err| err.into_inner());

			users.entry(user_id.to_string()).or_default().clone()
		};

		lock.lock_owned().await
	}
}
