//! Storage contract and built-in [`CredentialStore`] implementations.
//!
//! The contract is synchronous on purpose: the gateway reads the stored pair inside the
//! same critical section that flips the renewal phase, and that section must not suspend.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Holder of the current session's [`CredentialPair`].
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current pair, if a session exists.
	fn get(&self) -> Result<Option<CredentialPair>, StoreError>;

	/// Replaces the current pair.
	fn set(&self, pair: CredentialPair) -> Result<(), StoreError>;

	/// Removes the current pair. Clearing an empty store succeeds.
	fn clear(&self) -> Result<(), StoreError>;
}
impl<S> CredentialStore for Arc<S>
where
	S: ?Sized + CredentialStore,
{
	fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
		(**self).get()
	}

	fn set(&self, pair: CredentialPair) -> Result<(), StoreError> {
		(**self).set(pair)
	}

	fn clear(&self) -> Result<(), StoreError> {
		(**self).clear()
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
