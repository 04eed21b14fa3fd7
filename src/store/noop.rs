//! [`StorageBackend`] that persists nothing.

// self
use crate::store::{StorageBackend, StoreFuture};

/// Backend for hosts without durable storage; every read misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStorage;
impl StorageBackend for NoopStorage {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async { Ok(None) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: String) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}
