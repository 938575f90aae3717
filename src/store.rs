//! Two-tier persistence for the delegated token.
//!
//! A [`StorageBackend`] is a plain key/value area, the way browser `localStorage` and
//! `sessionStorage` are. [`TokenStore`] layers the token contract on top of one durable and
//! one ephemeral backend and keeps the two tiers mutually exclusive: a token is persisted to
//! exactly one tier at a time.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs::{self, AuthOp},
};

/// Boxed future returned by [`StorageBackend`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key names written to each tier.
pub mod keys {
	/// Bearer value of the delegated token.
	pub const DELEGATED_TOKEN: &str = "delegated_token";
	/// Expiry instant as epoch milliseconds.
	pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";
	/// `"true"` or `"false"`; the user's "keep me signed in" choice.
	pub const KEEP_SIGNED_IN: &str = "keep_signed_in";

	/// Every key owned by the token store.
	pub const ALL: [&str; 3] = [DELEGATED_TOKEN, TOKEN_EXPIRES_AT, KEEP_SIGNED_IN];
}

/// Key/value storage area backing one tier.
pub trait StorageBackend
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Writes `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Deletes `key`; deleting a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`StorageBackend`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (quota, permissions, I/O).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persistence tier chosen at sign-in by the "keep me signed in" preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
	/// Survives browser restarts.
	Durable,
	/// Scoped to the current tab or session.
	Ephemeral,
}
impl StorageTier {
	/// Tier implied by the "keep me signed in" preference.
	pub const fn for_preference(keep_signed_in: bool) -> Self {
		if keep_signed_in { Self::Durable } else { Self::Ephemeral }
	}

	/// The opposite tier.
	pub const fn other(self) -> Self {
		match self {
			Self::Durable => Self::Ephemeral,
			Self::Ephemeral => Self::Durable,
		}
	}

	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Durable => "durable",
			Self::Ephemeral => "ephemeral",
		}
	}
}
impl Display for StorageTier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token restored from storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedToken {
	/// Bearer value.
	pub token: TokenSecret,
	/// Tier the token was found in.
	pub tier: StorageTier,
	/// Expiry instant (millisecond precision).
	pub expires_at: OffsetDateTime,
}

/// Token persistence over a durable and an ephemeral [`StorageBackend`].
#[derive(Clone)]
pub struct TokenStore {
	durable: Arc<dyn StorageBackend>,
	ephemeral: Arc<dyn StorageBackend>,
}
impl TokenStore {
	/// Creates a store over the two provided tiers.
	pub fn new(durable: Arc<dyn StorageBackend>, ephemeral: Arc<dyn StorageBackend>) -> Self {
		Self { durable, ephemeral }
	}

	/// Store backed by two independent in-memory areas.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryStorage::default()), Arc::new(MemoryStorage::default()))
	}

	/// Backend serving `tier`.
	pub fn backend(&self, tier: StorageTier) -> &dyn StorageBackend {
		match tier {
			StorageTier::Durable => self.durable.as_ref(),
			StorageTier::Ephemeral => self.ephemeral.as_ref(),
		}
	}

	/// Persists the token to `tier` and deletes any copy from the other tier.
	///
	/// The stale tier is emptied first; if that fails nothing is written, so both tiers
	/// never hold a token at the same time.
	pub async fn save(
		&self,
		token: &TokenSecret,
		tier: StorageTier,
		expires_at: OffsetDateTime,
	) -> Result<(), StoreError> {
		Self::remove_all(self.backend(tier.other())).await?;

		let target = self.backend(tier);

		target.set(keys::DELEGATED_TOKEN, token.expose().to_owned()).await?;
		target.set(keys::TOKEN_EXPIRES_AT, encode_epoch_ms(expires_at)).await?;
		target
			.set(keys::KEEP_SIGNED_IN, encode_flag(matches!(tier, StorageTier::Durable)))
			.await
	}

	/// Loads the persisted token, preferring the durable tier; storage failures read as absent.
	pub async fn load(&self) -> Option<PersistedToken> {
		match self.try_load().await {
			Ok(found) => found,
			Err(e) => {
				obs::warn_swallowed(AuthOp::Restore, &e);

				None
			},
		}
	}

	/// Like [`load`](Self::load) but surfaces backend failures.
	pub async fn try_load(&self) -> Result<Option<PersistedToken>, StoreError> {
		for tier in [StorageTier::Durable, StorageTier::Ephemeral] {
			if let Some(found) = Self::load_tier(self.backend(tier), tier).await? {
				return Ok(Some(found));
			}
		}

		Ok(None)
	}

	/// Removes every token key from both tiers. Idempotent.
	///
	/// Both tiers are always attempted; the first failure is reported.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let durable = Self::remove_all(self.durable.as_ref()).await;
		let ephemeral = Self::remove_all(self.ephemeral.as_ref()).await;

		durable.and(ephemeral)
	}

	/// Records the "keep me signed in" choice in the durable tier so it survives a redirect.
	pub async fn save_preference(&self, keep_signed_in: bool) -> Result<(), StoreError> {
		self.durable.set(keys::KEEP_SIGNED_IN, encode_flag(keep_signed_in)).await
	}

	/// Reads the "keep me signed in" choice (durable first); defaults to `false`.
	pub async fn load_preference(&self) -> bool {
		for tier in [StorageTier::Durable, StorageTier::Ephemeral] {
			match self.backend(tier).get(keys::KEEP_SIGNED_IN).await {
				Ok(Some(raw)) => return raw == "true",
				Ok(None) => continue,
				Err(e) => obs::warn_swallowed(AuthOp::Restore, &e),
			}
		}

		false
	}

	async fn load_tier(
		backend: &dyn StorageBackend,
		tier: StorageTier,
	) -> Result<Option<PersistedToken>, StoreError> {
		let Some(token) = backend.get(keys::DELEGATED_TOKEN).await?.filter(|v| !v.is_empty())
		else {
			return Ok(None);
		};
		let Some(expires_at) =
			backend.get(keys::TOKEN_EXPIRES_AT).await?.as_deref().and_then(decode_epoch_ms)
		else {
			return Ok(None);
		};

		Ok(Some(PersistedToken { token: TokenSecret::new(token), tier, expires_at }))
	}

	async fn remove_all(backend: &dyn StorageBackend) -> Result<(), StoreError> {
		let mut first_err = None;

		for key in keys::ALL {
			if let Err(e) = backend.remove(key).await {
				first_err.get_or_insert(e);
			}
		}

		first_err.map_or(Ok(()), Err)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenStore(..)")
	}
}

fn encode_flag(value: bool) -> String {
	if value { "true".into() } else { "false".into() }
}

fn encode_epoch_ms(instant: OffsetDateTime) -> String {
	(instant.unix_timestamp_nanos() / 1_000_000).to_string()
}

fn decode_epoch_ms(raw: &str) -> Option<OffsetDateTime> {
	let millis = raw.trim().parse::<i128>().ok()?;

	OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
}
