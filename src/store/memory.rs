//! In-process [`CredentialStore`] for tests, demos, and short-lived tools.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{CredentialStore, StoreError},
};

/// Thread-safe store that keeps the pair in memory; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<CredentialPair>>>);
impl MemoryStore {
	/// Creates a store that already holds `pair`.
	pub fn with_pair(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}

	/// Returns the current access token value; test and debugging convenience.
	pub fn access_token(&self) -> Option<String> {
		self.0.read().as_ref().map(|pair| pair.access_token.expose().to_owned())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
		Ok(self.0.read().clone())
	}

	fn set(&self, pair: CredentialPair) -> Result<(), StoreError> {
		*self.0.write() = Some(pair);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
