// std
use std::{sync::Arc, thread};
// crates.io
use time::macros;
// self
use auth_gateway::{
	auth::CredentialPair,
	store::{CredentialStore, MemoryStore},
};

fn build_pair(access: &str, refresh: Option<&str>) -> CredentialPair {
	let pair = CredentialPair::new(access).with_issued_at(macros::datetime!(2025-11-10 12:00 UTC));

	match refresh {
		Some(refresh) => pair.with_refresh_token(refresh),
		None => pair,
	}
}

#[test]
fn set_get_clear_round_trip() {
	let store = MemoryStore::default();

	assert!(store.get().expect("Empty store should read.").is_none());

	store.set(build_pair("access-1", Some("refresh-1"))).expect("Set should succeed.");

	let fetched = store.get().expect("Store should read.").expect("Pair should be present.");

	assert_eq!(fetched, build_pair("access-1", Some("refresh-1")));
	assert!(fetched.can_renew());

	store.clear().expect("Clear should succeed.");
	store.clear().expect("Clearing an empty store should succeed.");

	assert!(store.get().expect("Store should read.").is_none());
}

#[test]
fn clones_share_one_session() {
	let store = MemoryStore::default();
	let clone = store.clone();

	clone.set(build_pair("shared", None)).expect("Set through the clone should succeed.");

	assert_eq!(store.access_token().as_deref(), Some("shared"));
	assert!(!store.get().expect("Store should read.").expect("Pair should exist.").can_renew());
}

#[test]
fn concurrent_writers_leave_one_complete_pair() {
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let writers = (0..8)
		.map(|i| {
			let store = store.clone();

			thread::spawn(move || {
				let access = format!("access-{i}");
				let refresh = format!("refresh-{i}");

				store
					.set(build_pair(&access, Some(&refresh)))
					.expect("Concurrent set should succeed.");
			})
		})
		.collect::<Vec<_>>();

	for writer in writers {
		writer.join().expect("Writer thread should not panic.");
	}

	let pair = store.get().expect("Store should read.").expect("A pair should be stored.");
	let suffix = pair
		.access_token
		.expose()
		.strip_prefix("access-")
		.expect("Access token should carry the writer index.");

	assert_eq!(
		pair.refresh_token.as_ref().map(|secret| secret.expose().to_owned()),
		Some(format!("refresh-{suffix}"))
	);
}
