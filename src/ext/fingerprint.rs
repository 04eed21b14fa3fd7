//! Fingerprint provider contract.

// crates.io
use async_lock::OnceCell;
// self
use crate::_prelude::*;

/// Boxed future returned by [`FingerprintProvider::fingerprint`].
pub type FingerprintFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + 'a + Send>>;

/// Supplies an opaque, stable identifier for the end-user's device.
///
/// Returning `None` means no fingerprint is available; the client then omits it.
pub trait FingerprintProvider
where
	Self: Send + Sync,
{
	/// Produces the fingerprint. The client calls this at most once per instance.
	fn fingerprint(&self) -> FingerprintFuture<'_>;
}

/// Provider returning a fixed value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticFingerprint(pub String);
impl StaticFingerprint {
	/// Wraps a fixed fingerprint.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}
}
impl FingerprintProvider for StaticFingerprint {
	fn fingerprint(&self) -> FingerprintFuture<'_> {
		let value = self.0.clone();

		Box::pin(async move { Some(value) })
	}
}

/// Per-client fingerprint cache: the provider runs at most once per instance.
#[derive(Default)]
pub struct CachedFingerprint {
	provider: Option<Arc<dyn FingerprintProvider>>,
	cell: OnceCell<Option<String>>,
}
impl CachedFingerprint {
	/// Wraps an optional provider; `None` means the client never sends a fingerprint.
	pub fn new(provider: Option<Arc<dyn FingerprintProvider>>) -> Self {
		Self { provider, cell: OnceCell::new() }
	}

	/// Returns the cached fingerprint, computing it on first use.
	pub async fn get(&self) -> Option<String> {
		self.cell
			.get_or_init(|| async {
				match &self.provider {
					Some(provider) => provider.fingerprint().await.filter(|value| !value.is_empty()),
					None => None,
				}
			})
			.await
			.clone()
	}
}
impl Debug for CachedFingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedFingerprint")
			.field("has_provider", &self.provider.is_some())
			.field("resolved", &self.cell.is_initialized())
			.finish()
	}
}
