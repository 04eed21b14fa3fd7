//! Process-local [`StorageBackend`] for tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	store::{StorageBackend, StoreError, StoreFuture},
};

type EntryMap = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe storage backend that keeps entries in-process.
///
/// Clones share the same map, mirroring one storage area shared by several clients.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(EntryMap);
impl MemoryStorage {
	/// Returns a copy of every entry currently stored.
	pub fn snapshot(&self) -> HashMap<String, String> {
		self.0.read().clone()
	}

	fn get_now(map: EntryMap, key: &str) -> Result<Option<String>, StoreError> {
		Ok(map.read().get(key).cloned())
	}

	fn set_now(map: EntryMap, key: &str, value: String) -> Result<(), StoreError> {
		map.write().insert(key.to_owned(), value);

		Ok(())
	}

	fn remove_now(map: EntryMap, key: &str) -> Result<(), StoreError> {
		map.write().remove(key);

		Ok(())
	}
}
impl StorageBackend for MemoryStorage {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Self::get_now(map, key) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, key, value) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::remove_now(map, key) })
	}
}
