//! In-process [`StorageBackend`] used for the ephemeral tier, tests, and demos.

// self
use crate::{
	_prelude::*,
	store::{StorageBackend, StoreFuture},
};

type Area = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe key/value area that lives as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Area);
impl MemoryStorage {
	/// Returns true if `key` currently holds a value.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl StorageBackend for MemoryStorage {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let area = self.0.clone();

		Box::pin(async move { Ok(area.read().get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let area = self.0.clone();

		Box::pin(async move {
			area.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let area = self.0.clone();

		Box::pin(async move {
			area.write().remove(key);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn clones_share_one_area() {
		let storage = MemoryStorage::default();
		let alias = storage.clone();

		storage.set("k", "v".into()).await.expect("Memory writes should not fail.");

		assert_eq!(alias.get("k").await.expect("Memory reads should not fail."), Some("v".into()));

		alias.remove("k").await.expect("Memory removes should not fail.");
		alias.remove("k").await.expect("Removing a missing key should succeed.");

		assert!(storage.is_empty());
	}
}
