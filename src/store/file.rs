//! File-backed [`StorageBackend`] shared by every client pointing at the same path.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{StorageBackend, StoreError, StoreFuture},
};

/// Persists entries as a JSON object, re-reading the file on every access.
///
/// Writes go through a temporary file and an atomic rename. There is no cross-process
/// coordination: concurrent writers race and the last rename wins.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStorage {
	/// Opens (or prepares) storage at the provided path.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, write_lock: Default::default() })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(BTreeMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create storage directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &BTreeMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize storage snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn update(
		&self,
		mutate: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
	) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock();
		// A corrupt file is replaced on any write, including a removal that finds nothing.
		let (mut snapshot, corrupt) = match Self::load_snapshot(&self.path) {
			Ok(snapshot) => (snapshot, false),
			Err(StoreError::Serialization { .. }) => (BTreeMap::new(), true),
			Err(e) => return Err(e),
		};

		if mutate(&mut snapshot) || corrupt {
			self.persist(&snapshot)?;
		}

		Ok(())
	}
}
impl StorageBackend for FileStorage {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::load_snapshot(&self.path)?.remove(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.update(|snapshot| {
				snapshot.insert(key.to_owned(), value);

				true
			})
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.update(|snapshot| snapshot.remove(key).is_some()) })
	}
}
